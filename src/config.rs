//! Harness configuration: identity-provider coordinates, management credential, and the
//! protected API base URL.
//!
//! Every value is supplied out-of-band through the environment. [`HarnessConfig::from_env`] fails
//! fast, listing every missing variable at once, before the harness opens a single connection.

// self
use crate::{
	_prelude::*,
	auth::{Audience, TokenSecret},
	error::ConfigError,
};

/// Identity-provider domain, e.g. `tenant.eu.auth0.com`. `https://` is assumed without a scheme.
pub const ENV_DOMAIN: &str = "AUTH0_DOMAIN";
/// Resource-server identifier and token audience.
pub const ENV_AUDIENCE: &str = "AUTH0_AUDIENCE";
/// Privileged management API bearer token.
pub const ENV_MANAGEMENT_TOKEN: &str = "AUTH0_MANAGEMENT_API_TOKEN";
/// Base URL of the protected API under test.
pub const ENV_API_URL: &str = "API_URL";
/// Optional per-request timeout in whole seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "AUTHZ_REQUEST_TIMEOUT_SECS";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);
const DEFAULT_EXPIRY_LIFETIME: Duration = Duration::SECOND;
const DEFAULT_EXPIRY_MARGIN: Duration = Duration::SECOND;
const DEFAULT_CLIENT_NAME_PREFIX: &str = "authz-conformance";

/// Identity-provider side of the configuration.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
	/// Base URL for management and token endpoints.
	pub base_url: Url,
	/// Audience the resource server is registered under.
	pub audience: Audience,
	/// Privileged management API credential.
	pub management_token: TokenSecret,
}

/// Complete harness configuration.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
	/// Identity-provider coordinates.
	pub identity: IdentityConfig,
	/// Base URL of the protected API under test.
	pub api_base_url: Url,
	/// Upper bound for any single HTTP call.
	pub request_timeout: Duration,
	/// Token lifetime forced onto the resource server for the expiry context.
	pub expiry_lifetime: Duration,
	/// Extra wait on top of [`expiry_lifetime`](Self::expiry_lifetime) before probing.
	pub expiry_margin: Duration,
	/// Prefix for the per-suite OAuth client name.
	pub client_name_prefix: String,
}
impl HarnessConfig {
	/// Builds a configuration from explicit values.
	pub fn new(
		domain: &str,
		audience: &str,
		management_token: impl Into<String>,
		api_url: &str,
	) -> Result<Self, ConfigError> {
		let base_url = parse_domain(domain)?;
		let audience = Audience::new(audience)
			.map_err(|source| ConfigError::InvalidIdentifier { name: ENV_AUDIENCE, source })?;
		let api_base_url = parse_base_url(ENV_API_URL, api_url)?;

		Ok(Self {
			identity: IdentityConfig {
				base_url,
				audience,
				management_token: TokenSecret::new(management_token),
			},
			api_base_url,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			expiry_lifetime: DEFAULT_EXPIRY_LIFETIME,
			expiry_margin: DEFAULT_EXPIRY_MARGIN,
			client_name_prefix: DEFAULT_CLIENT_NAME_PREFIX.into(),
		})
	}

	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads the configuration through an arbitrary key lookup.
	///
	/// Blank values count as missing.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
		let required = [ENV_DOMAIN, ENV_AUDIENCE, ENV_MANAGEMENT_TOKEN, ENV_API_URL];
		let missing = required.into_iter().filter(|key| read(key).is_none()).collect::<Vec<_>>();

		if !missing.is_empty() {
			return Err(ConfigError::MissingVariables { names: missing });
		}

		let value = |key: &str| read(key).unwrap_or_default();
		let mut config = Self::new(
			value(ENV_DOMAIN).trim(),
			value(ENV_AUDIENCE).trim(),
			value(ENV_MANAGEMENT_TOKEN).trim(),
			value(ENV_API_URL).trim(),
		)?;

		if let Some(raw) = read(ENV_REQUEST_TIMEOUT) {
			config.request_timeout = parse_seconds(ENV_REQUEST_TIMEOUT, &raw)?;
		}

		Ok(config)
	}

	/// Overrides the per-request timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the forced token lifetime and the extra wait used by the expiry context.
	pub fn with_expiry(mut self, lifetime: Duration, margin: Duration) -> Self {
		self.expiry_lifetime = lifetime;
		self.expiry_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the OAuth client name prefix.
	pub fn with_client_name_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.client_name_prefix = prefix.into();

		self
	}

	/// Total wait before an expired-token probe.
	pub fn expiry_wait(&self) -> Duration {
		self.expiry_lifetime + self.expiry_margin
	}
}

fn parse_domain(domain: &str) -> Result<Url, ConfigError> {
	if domain.contains("://") {
		parse_base_url(ENV_DOMAIN, domain)
	} else {
		parse_base_url(ENV_DOMAIN, &format!("https://{domain}"))
	}
}

fn parse_base_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { name, source })?;

	if url.cannot_be_a_base() {
		return Err(ConfigError::CannotBeABase { name });
	}

	Ok(url)
}

fn parse_seconds(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
	match raw.trim().parse::<u32>() {
		Ok(secs) if secs > 0 => Ok(Duration::seconds(secs.into())),
		_ => Err(ConfigError::InvalidNumber { name, value: raw.to_owned() }),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map = pairs
			.iter()
			.map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
			.collect::<HashMap<_, _>>();

		move |key| map.get(key).cloned()
	}

	#[test]
	fn missing_variables_fail_fast_and_together() {
		let err = HarnessConfig::from_lookup(lookup(&[
			(ENV_AUDIENCE, "https://api.example.com"),
			(ENV_MANAGEMENT_TOKEN, "   "),
		]))
		.expect_err("Incomplete configuration must be rejected.");

		match err {
			ConfigError::MissingVariables { names } =>
				assert_eq!(names, vec![ENV_DOMAIN, ENV_MANAGEMENT_TOKEN, ENV_API_URL]),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn bare_domain_defaults_to_https() {
		let config = HarnessConfig::from_lookup(lookup(&[
			(ENV_DOMAIN, "tenant.eu.auth0.com"),
			(ENV_AUDIENCE, "https://api.example.com"),
			(ENV_MANAGEMENT_TOKEN, "mgmt"),
			(ENV_API_URL, "http://localhost:3010"),
		]))
		.expect("Complete configuration should load.");

		assert_eq!(config.identity.base_url.as_str(), "https://tenant.eu.auth0.com/");
		assert_eq!(config.identity.audience.as_ref(), "https://api.example.com");
		assert_eq!(config.api_base_url.as_str(), "http://localhost:3010/");
		assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
		assert_eq!(config.expiry_wait(), Duration::seconds(2));
		assert!(!format!("{config:?}").contains("mgmt"));
	}

	#[test]
	fn explicit_scheme_is_kept_for_local_providers() {
		let config = HarnessConfig::new("http://127.0.0.1:8080", "urn:test", "t", "http://api")
			.expect("Configuration should build.");

		assert_eq!(config.identity.base_url.as_str(), "http://127.0.0.1:8080/");
	}

	#[test]
	fn invalid_values_are_described() {
		assert!(matches!(
			HarnessConfig::new("tenant.auth0.com", "has space", "t", "http://api"),
			Err(ConfigError::InvalidIdentifier { name: ENV_AUDIENCE, .. })
		));
		assert!(matches!(
			HarnessConfig::new("tenant.auth0.com", "urn:test", "t", "not a url"),
			Err(ConfigError::InvalidUrl { name: ENV_API_URL, .. })
		));
		assert!(matches!(
			HarnessConfig::from_lookup(lookup(&[
				(ENV_DOMAIN, "tenant.auth0.com"),
				(ENV_AUDIENCE, "urn:test"),
				(ENV_MANAGEMENT_TOKEN, "mgmt"),
				(ENV_API_URL, "http://api"),
				(ENV_REQUEST_TIMEOUT, "0"),
			])),
			Err(ConfigError::InvalidNumber { name: ENV_REQUEST_TIMEOUT, .. })
		));
	}

	#[test]
	fn negative_margin_is_clamped() {
		let config = HarnessConfig::new("tenant.auth0.com", "urn:test", "t", "http://api")
			.expect("Configuration should build.")
			.with_expiry(Duration::seconds(3), Duration::seconds(-5));

		assert_eq!(config.expiry_wait(), Duration::seconds(3));
	}
}
