//! Runs the standard conformance suite against a live Auth0 tenant and protected API.
//!
//! Requires `AUTH0_DOMAIN`, `AUTH0_AUDIENCE`, `AUTH0_MANAGEMENT_API_TOKEN`, and `API_URL`. Set
//! `RUST_LOG=authz_conformance=debug` to follow every management call and probe.

// crates.io
use color_eyre::{Result, eyre::eyre};
use tracing_subscriber::EnvFilter;
// self
use authz_conformance::suite::ConformanceSuite;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let suite = ConformanceSuite::from_env()?;
	let report = suite.run().await;

	println!("{report}");

	if report.is_success() {
		Ok(())
	} else {
		Err(eyre!("The protected API does not conform to the expected authorization policy."))
	}
}
