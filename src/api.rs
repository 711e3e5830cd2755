//! Thin client for the protected API under test.
//!
//! One attempt per request: no retries, no redirects, and the `Authorization` header is sent
//! verbatim (or omitted entirely) so malformed values reach the server exactly as constructed.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};
// self
use crate::{
	_prelude::*,
	error::{AssertionError, TransportError},
	http::{self, ObservedResponse, ReqwestHttpClient},
	obs::{Phase, PhaseSpan},
};

/// Endpoints exposed by the protected API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
	/// `GET /api/public`, open to anyone.
	Public,
	/// `GET /api/private`, any valid token.
	Private,
	/// `GET /api/private-scoped`, a valid token carrying `read:messages`.
	PrivateScoped,
}
impl Endpoint {
	/// Every endpoint, in probing order.
	pub const ALL: [Endpoint; 3] = [Endpoint::Public, Endpoint::Private, Endpoint::PrivateScoped];
	/// Endpoints that demand a bearer token.
	pub const PROTECTED: [Endpoint; 2] = [Endpoint::Private, Endpoint::PrivateScoped];

	/// Request path relative to the API base URL.
	pub const fn path(self) -> &'static str {
		match self {
			Endpoint::Public => "/api/public",
			Endpoint::Private => "/api/private",
			Endpoint::PrivateScoped => "/api/private-scoped",
		}
	}

	/// Scope a token must carry, beyond being valid.
	pub const fn required_scope(self) -> Option<&'static str> {
		match self {
			Endpoint::PrivateScoped => Some("read:messages"),
			Endpoint::Public | Endpoint::Private => None,
		}
	}

	/// Returns true when the endpoint rejects requests without a valid token.
	pub const fn requires_token(self) -> bool {
		!matches!(self, Endpoint::Public)
	}

	fn segments(self) -> impl Iterator<Item = &'static str> {
		self.path().split('/').filter(|segment| !segment.is_empty())
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.path())
	}
}

/// Failures that prevent a probe from producing a response.
#[derive(Debug, ThisError)]
pub enum ProbeError {
	/// The header value contains bytes HTTP cannot carry.
	#[error("Authorization header value cannot be encoded.")]
	InvalidHeader(#[source] InvalidHeaderValue),
	/// The endpoint URL cannot be derived from the API base URL.
	#[error("Cannot build the request URL.")]
	InvalidUrl,
	/// The API could not be reached.
	#[error("Network failure while calling the protected API.")]
	Network(#[source] TransportError),
}
impl ProbeError {
	/// Attributes the failure to the scenario that issued the probe.
	pub fn into_assertion(self, scenario: impl Into<String>) -> AssertionError {
		let scenario = scenario.into();

		match self {
			ProbeError::InvalidHeader(source) => AssertionError::InvalidHeader { scenario, source },
			ProbeError::InvalidUrl => AssertionError::InvalidUrl { scenario },
			ProbeError::Network(source) => AssertionError::Network { scenario, source },
		}
	}
}

/// HTTP client for the protected API.
#[derive(Clone)]
pub struct ProtectedApiClient {
	http_client: ReqwestHttpClient,
	base_url: Url,
}
impl ProtectedApiClient {
	/// Creates a client rooted at `base_url`.
	pub fn new(http_client: ReqwestHttpClient, base_url: Url) -> Self {
		Self { http_client, base_url }
	}

	/// API base URL.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Issues `GET endpoint`, sending `authorization` verbatim when present.
	pub async fn get(
		&self,
		endpoint: Endpoint,
		authorization: Option<&str>,
	) -> Result<ObservedResponse, ProbeError> {
		let url =
			http::endpoint(&self.base_url, endpoint.segments()).ok_or(ProbeError::InvalidUrl)?;
		let mut request = self.http_client.get(url.clone());

		if let Some(value) = authorization {
			let mut value = HeaderValue::from_str(value).map_err(ProbeError::InvalidHeader)?;

			value.set_sensitive(true);
			request = request.header(AUTHORIZATION, value);
		}

		let span = PhaseSpan::new(Phase::Scenario, endpoint.path());

		span.instrument(async move {
			let response = request
				.send()
				.await
				.map_err(|e| ProbeError::Network(TransportError::from_reqwest(&url, e)))?;

			ObservedResponse::read(response)
				.await
				.map_err(|e| ProbeError::Network(TransportError::from_reqwest(&url, e)))
		})
		.await
	}
}
impl Debug for ProtectedApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProtectedApiClient").field("base_url", &self.base_url.as_str()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn endpoint_paths_and_policy() {
		assert_eq!(Endpoint::PrivateScoped.to_string(), "/api/private-scoped");
		assert_eq!(Endpoint::PrivateScoped.segments().collect::<Vec<_>>(), ["api", "private-scoped"]);
		assert_eq!(Endpoint::PrivateScoped.required_scope(), Some("read:messages"));
		assert!(!Endpoint::Public.requires_token());
		assert!(Endpoint::PROTECTED.iter().all(|endpoint| endpoint.requires_token()));
	}

	#[test]
	fn probe_errors_carry_the_scenario() {
		let err = ProbeError::InvalidUrl.into_assertion("GET /api/private with no header");

		assert_eq!(err.to_string(), "GET /api/private with no header: cannot build the request URL.");
	}

	#[tokio::test]
	async fn unencodable_header_is_rejected_before_sending() {
		let client = ProtectedApiClient::new(
			ReqwestHttpClient::default(),
			Url::parse("http://127.0.0.1:9").expect("URL should parse."),
		);
		let err = client
			.get(Endpoint::Private, Some("Bearer \n"))
			.await
			.expect_err("Newlines cannot be sent in a header.");

		assert!(matches!(err, ProbeError::InvalidHeader(_)));
	}
}
