//! Token acquisition against the identity provider's token endpoint.

mod client_credentials;

// self
use crate::{_prelude::*, auth::Audience, config::IdentityConfig, http::ReqwestHttpClient};

/// Mints access tokens for the suite's OAuth client via the client-credentials grant.
///
/// Requests always target the configured audience. Whether a token is usable is never decided
/// here; the acquirer only reports what the token endpoint issued.
#[derive(Clone)]
pub struct TokenAcquirer {
	http_client: ReqwestHttpClient,
	base_url: Url,
	audience: Audience,
}
impl TokenAcquirer {
	/// Creates an acquirer bound to the identity provider described by `identity`.
	pub fn new(http_client: ReqwestHttpClient, identity: &IdentityConfig) -> Self {
		Self {
			http_client,
			base_url: identity.base_url.clone(),
			audience: identity.audience.clone(),
		}
	}

	/// Audience tokens are requested for.
	pub fn audience(&self) -> &Audience {
		&self.audience
	}
}
impl Debug for TokenAcquirer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenAcquirer")
			.field("base_url", &self.base_url.as_str())
			.field("audience", &self.audience)
			.finish()
	}
}
