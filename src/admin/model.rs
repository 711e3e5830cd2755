//! Management API payloads and the fixture records decoded from them.

// crates.io
use oauth2::{ClientId, ClientSecret};
// self
use crate::{
	_prelude::*,
	auth::{Audience, ClientGrantId, OAuthClientId, ScopeCatalog, ScopeSet},
};

const APP_TYPE_MACHINE_TO_MACHINE: &str = "non_interactive";
const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// OAuth client registered for one suite.
///
/// Owned by the fixture session for the lifetime of the suite; the secret never leaves this type
/// except through [`ClientSecret::secret`].
#[derive(Clone)]
pub struct OAuthClient {
	/// Identifier assigned by the identity provider.
	pub id: OAuthClientId,
	/// Client secret used for the client-credentials exchange.
	pub secret: ClientSecret,
}
impl OAuthClient {
	/// Builds a client from known credentials.
	pub fn new(id: OAuthClientId, secret: impl Into<String>) -> Self {
		Self { id, secret: ClientSecret::new(secret.into()) }
	}

	/// Client identifier in the `oauth2` crate's representation.
	pub fn client_id(&self) -> ClientId {
		ClientId::new(self.id.to_string())
	}
}
impl Debug for OAuthClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthClient").field("id", &self.id).field("secret", &"<redacted>").finish()
	}
}
impl From<ClientRecord> for OAuthClient {
	fn from(record: ClientRecord) -> Self {
		Self::new(record.client_id, record.client_secret)
	}
}

/// `POST /api/v2/clients` body.
#[derive(Clone, Debug, Serialize)]
pub struct NewClient<'a> {
	/// Display name.
	pub name: &'a str,
	/// Application type; machine-to-machine clients use `non_interactive`.
	pub app_type: &'static str,
	/// Grants the client may use.
	pub grant_types: [&'static str; 1],
}
impl<'a> NewClient<'a> {
	/// Machine-to-machine client limited to the client-credentials grant.
	pub fn machine_to_machine(name: &'a str) -> Self {
		Self {
			name,
			app_type: APP_TYPE_MACHINE_TO_MACHINE,
			grant_types: [GRANT_TYPE_CLIENT_CREDENTIALS],
		}
	}
}

/// Subset of the client record returned on creation.
#[derive(Clone, Deserialize)]
pub struct ClientRecord {
	/// Identifier assigned by the identity provider.
	pub client_id: OAuthClientId,
	/// Generated client secret.
	pub client_secret: String,
	/// Display name echoed back.
	#[serde(default)]
	pub name: Option<String>,
}
impl Debug for ClientRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientRecord")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("name", &self.name)
			.finish()
	}
}

/// `POST /api/v2/resource-servers` body.
#[derive(Clone, Debug, Serialize)]
pub struct NewResourceServer<'a> {
	/// Audience identifier.
	pub identifier: &'a Audience,
	/// Display name.
	pub name: &'a str,
	/// Declared scopes.
	pub scopes: &'a ScopeCatalog,
}

/// Resource server as reported by the management API.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ResourceServerRecord {
	/// Audience identifier.
	pub identifier: Audience,
	/// Access-token lifetime in seconds.
	#[serde(default)]
	pub token_lifetime: Option<i64>,
	/// Declared scopes.
	#[serde(default)]
	pub scopes: ScopeCatalog,
}
impl ResourceServerRecord {
	/// Token lifetime as a duration, when reported.
	pub fn token_lifetime(&self) -> Option<Duration> {
		self.token_lifetime.map(Duration::seconds)
	}
}

/// `PATCH /api/v2/resource-servers/{identifier}` body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceServerPatch {
	/// New access-token lifetime in whole seconds.
	pub token_lifetime: i64,
}
impl ResourceServerPatch {
	/// Sets the access-token lifetime, rounded down to whole seconds (minimum one).
	pub fn token_lifetime(lifetime: Duration) -> Self {
		Self { token_lifetime: lifetime.whole_seconds().max(1) }
	}
}

/// `POST /api/v2/client-grants` body.
#[derive(Clone, Debug, Serialize)]
pub struct NewClientGrant<'a> {
	/// Client receiving the grant.
	pub client_id: &'a OAuthClientId,
	/// Resource server the grant targets.
	pub audience: &'a Audience,
	/// Scopes the client may request.
	pub scope: &'a ScopeSet,
}

/// Client grant binding an OAuth client to the resource server with a scope subset.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ClientGrant {
	/// Identifier assigned by the identity provider.
	pub id: ClientGrantId,
	/// Client holding the grant.
	pub client_id: OAuthClientId,
	/// Resource server the grant targets.
	pub audience: Audience,
	/// Scopes granted to the client.
	#[serde(default)]
	pub scope: ScopeSet,
}

/// Error body returned by the management API.
#[derive(Clone, Debug, Deserialize)]
pub struct ManagementError {
	/// Human-readable explanation.
	#[serde(default)]
	pub message: Option<String>,
	/// Short error label, e.g. `Conflict`.
	#[serde(default)]
	pub error: Option<String>,
}
impl ManagementError {
	/// Most descriptive text the provider supplied.
	pub fn into_message(self) -> Option<String> {
		let present = |text: &String| !text.trim().is_empty();

		self.message.filter(present).or_else(|| self.error.filter(present))
	}
}
