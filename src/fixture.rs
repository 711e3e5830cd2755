//! Fixture provisioning on the identity provider.
//!
//! A suite owns one OAuth client and one resource server ([`Session`]); every issued-token
//! context owns one client grant for the duration of [`Session::with_grant`]. Cleanup is
//! structural: scoped helpers delete what they created even when the body fails or panics.

pub mod session;
pub mod state;

pub use session::*;
pub use state::*;

// std
use std::panic::{self, AssertUnwindSafe};
// crates.io
use futures::FutureExt;
// self
use crate::{
	_prelude::*,
	admin::IdentityAdminClient,
	auth::ScopeCatalog,
	config::HarnessConfig,
	error::SetupError,
};

/// What [`Session::provision`] creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixturePlan {
	/// OAuth client display name.
	pub client_name: String,
	/// Resource server display name.
	pub resource_server_name: String,
	/// Scopes declared on the resource server.
	pub scopes: ScopeCatalog,
}
impl FixturePlan {
	/// Plan with explicit names and the message API scope catalog.
	pub fn new(client_name: impl Into<String>, resource_server_name: impl Into<String>) -> Self {
		Self {
			client_name: client_name.into(),
			resource_server_name: resource_server_name.into(),
			scopes: ScopeCatalog::messages(),
		}
	}

	/// Plan for `config`, naming the client `<prefix>-<random hex>` so runs never collide.
	pub fn for_config(config: &HarnessConfig) -> Self {
		let prefix = &config.client_name_prefix;

		Self::new(format!("{prefix}-{:016x}", rand::random::<u64>()), format!("{prefix} API"))
	}

	/// Replaces the declared scope catalog.
	pub fn with_scopes(mut self, scopes: ScopeCatalog) -> Self {
		self.scopes = scopes;

		self
	}
}

/// Provisions a [`Session`], runs `f`, and always tears the session down.
///
/// A panic inside `f` resumes after teardown. Provisioning failures are returned before `f` runs
/// (with the client already rolled back).
pub async fn scoped<F, T>(
	admin: IdentityAdminClient,
	plan: &FixturePlan,
	f: F,
) -> Result<(T, TeardownReport), SetupError>
where
	F: AsyncFnOnce(&mut Session) -> T,
{
	let mut session = Session::provision(admin, plan).await?;
	let outcome = AssertUnwindSafe(f(&mut session)).catch_unwind().await;
	let report = session.teardown().await;

	match outcome {
		Ok(value) => Ok((value, report)),
		Err(payload) => panic::resume_unwind(payload),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn plan_names_are_unique_per_call() {
		let config = HarnessConfig::new("tenant.auth0.com", "urn:test", "t", "http://api")
			.expect("Configuration should build.")
			.with_client_name_prefix("nightly");
		let first = FixturePlan::for_config(&config);
		let second = FixturePlan::for_config(&config);

		assert!(first.client_name.starts_with("nightly-"));
		assert_eq!(first.client_name.len(), "nightly-".len() + 16);
		assert_ne!(first.client_name, second.client_name);
		assert_eq!(first.resource_server_name, "nightly API");
		assert_eq!(first.scopes, ScopeCatalog::messages());

		let read_only = first.with_scopes(
			ScopeCatalog::new([crate::auth::ScopeDefinition::new("read:messages", "Read")])
				.expect("Catalog should be valid."),
		);

		assert_eq!(read_only.scopes.definitions().len(), 1);
	}
}
