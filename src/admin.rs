//! Typed client for the identity provider's management API (Auth0 Management API v2).
//!
//! Every call carries the privileged management token from [`IdentityConfig`] and suspends until
//! the provider answers. Non-2xx answers become [`SetupError::Rejected`]; they are never retried,
//! because a half-built fixture set must abort the enclosing scope instead of limping on.
//! Deletes treat `404` as [`Deletion::AlreadyAbsent`] so teardown stays idempotent.

pub mod model;

pub use model::*;

// crates.io
use reqwest::{Method, RequestBuilder};
// self
use crate::{
	_prelude::*,
	auth::{Audience, ClientGrantId, OAuthClientId, ScopeCatalog, ScopeSet},
	config::IdentityConfig,
	error::{SetupError, TransportError},
	http::{self, ObservedResponse, ReqwestHttpClient},
	obs::{self, Outcome, Phase, PhaseSpan},
};

/// Management operations, used to label errors, spans, and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdminOperation {
	/// `POST /api/v2/clients`.
	CreateClient,
	/// `DELETE /api/v2/clients/{id}`.
	DeleteClient,
	/// `POST /api/v2/resource-servers`.
	CreateResourceServer,
	/// `PATCH /api/v2/resource-servers/{identifier}`.
	PatchResourceServer,
	/// `DELETE /api/v2/resource-servers/{identifier}`.
	DeleteResourceServer,
	/// `POST /api/v2/client-grants`.
	CreateClientGrant,
	/// `DELETE /api/v2/client-grants/{id}`.
	DeleteClientGrant,
}
impl AdminOperation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AdminOperation::CreateClient => "create_client",
			AdminOperation::DeleteClient => "delete_client",
			AdminOperation::CreateResourceServer => "create_resource_server",
			AdminOperation::PatchResourceServer => "patch_resource_server",
			AdminOperation::DeleteResourceServer => "delete_resource_server",
			AdminOperation::CreateClientGrant => "create_client_grant",
			AdminOperation::DeleteClientGrant => "delete_client_grant",
		}
	}

	/// Phase the operation is observed under.
	pub const fn phase(self) -> Phase {
		if self.is_delete() { Phase::Teardown } else { Phase::Setup }
	}

	const fn is_delete(self) -> bool {
		matches!(
			self,
			AdminOperation::DeleteClient
				| AdminOperation::DeleteResourceServer
				| AdminOperation::DeleteClientGrant
		)
	}
}
impl Display for AdminOperation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Result of a delete call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deletion {
	/// The provider deleted the record.
	Deleted,
	/// The record did not exist (already deleted, or never created).
	AlreadyAbsent,
}

/// Management API client bound to one identity provider.
#[derive(Clone)]
pub struct IdentityAdminClient {
	http_client: ReqwestHttpClient,
	identity: IdentityConfig,
}
impl IdentityAdminClient {
	/// Creates a client that reuses `http_client` for every management call.
	pub fn new(http_client: ReqwestHttpClient, identity: IdentityConfig) -> Self {
		Self { http_client, identity }
	}

	/// Audience the harness provisions resource servers and grants for.
	pub fn audience(&self) -> &Audience {
		&self.identity.audience
	}

	/// Registers a machine-to-machine OAuth client.
	pub async fn create_client(&self, name: &str) -> Result<OAuthClient, SetupError> {
		const OP: AdminOperation = AdminOperation::CreateClient;

		let body = NewClient::machine_to_machine(name);
		let response = self.send(OP, Method::POST, ["clients"], |req| req.json(&body)).await?;
		let created = OAuthClient::from(decode::<ClientRecord>(OP, &response)?);

		tracing::info!(client_id = %created.id, name, "Created OAuth client.");

		Ok(created)
	}

	/// Deletes an OAuth client.
	pub async fn delete_client(&self, id: &OAuthClientId) -> Result<Deletion, SetupError> {
		self.delete(AdminOperation::DeleteClient, ["clients", id.as_ref()]).await
	}

	/// Declares a resource server and its scope catalog.
	pub async fn create_resource_server(
		&self,
		identifier: &Audience,
		name: &str,
		scopes: &ScopeCatalog,
	) -> Result<ResourceServerRecord, SetupError> {
		const OP: AdminOperation = AdminOperation::CreateResourceServer;

		let body = NewResourceServer { identifier, name, scopes };
		let response =
			self.send(OP, Method::POST, ["resource-servers"], |req| req.json(&body)).await?;
		let created = decode::<ResourceServerRecord>(OP, &response)?;

		tracing::info!(
			identifier = %identifier,
			token_lifetime = ?created.token_lifetime,
			"Created resource server."
		);

		Ok(created)
	}

	/// Updates a resource server's access-token lifetime.
	pub async fn patch_resource_server(
		&self,
		identifier: &Audience,
		patch: &ResourceServerPatch,
	) -> Result<ResourceServerRecord, SetupError> {
		const OP: AdminOperation = AdminOperation::PatchResourceServer;

		let segments = ["resource-servers", identifier.as_ref()];
		let response = self.send(OP, Method::PATCH, segments, |req| req.json(patch)).await?;
		let patched = decode::<ResourceServerRecord>(OP, &response)?;

		tracing::info!(
			identifier = %identifier,
			token_lifetime = ?patched.token_lifetime,
			"Patched resource server."
		);

		Ok(patched)
	}

	/// Deletes a resource server.
	pub async fn delete_resource_server(
		&self,
		identifier: &Audience,
	) -> Result<Deletion, SetupError> {
		let segments = ["resource-servers", identifier.as_ref()];

		self.delete(AdminOperation::DeleteResourceServer, segments).await
	}

	/// Binds `client_id` to `audience` with the given scope subset.
	pub async fn create_client_grant(
		&self,
		client_id: &OAuthClientId,
		audience: &Audience,
		scopes: &ScopeSet,
	) -> Result<ClientGrant, SetupError> {
		const OP: AdminOperation = AdminOperation::CreateClientGrant;

		let body = NewClientGrant { client_id, audience, scope: scopes };
		let response = self.send(OP, Method::POST, ["client-grants"], |req| req.json(&body)).await?;
		let grant = decode::<ClientGrant>(OP, &response)?;

		tracing::info!(grant_id = %grant.id, scopes = %grant.scope, "Created client grant.");

		Ok(grant)
	}

	/// Deletes a client grant.
	pub async fn delete_client_grant(&self, id: &ClientGrantId) -> Result<Deletion, SetupError> {
		self.delete(AdminOperation::DeleteClientGrant, ["client-grants", id.as_ref()]).await
	}

	async fn delete<'a, const N: usize>(
		&self,
		op: AdminOperation,
		segments: [&'a str; N],
	) -> Result<Deletion, SetupError> {
		match self.send(op, Method::DELETE, segments, |req| req).await {
			Ok(_) => {
				tracing::info!(operation = %op, target = segments[N - 1], "Deleted fixture.");

				Ok(Deletion::Deleted)
			},
			Err(SetupError::Rejected { status: 404, .. }) => {
				tracing::debug!(operation = %op, target = segments[N - 1], "Fixture already absent.");

				Ok(Deletion::AlreadyAbsent)
			},
			Err(e) => Err(e),
		}
	}

	async fn send<'a, const N: usize, F>(
		&self,
		op: AdminOperation,
		method: Method,
		segments: [&'a str; N],
		decorate: F,
	) -> Result<ObservedResponse, SetupError>
	where
		F: FnOnce(RequestBuilder) -> RequestBuilder,
	{
		let url = http::endpoint(&self.identity.base_url, ["api", "v2"].into_iter().chain(segments))
			.ok_or(SetupError::InvalidUrl { operation: op })?;
		let phase = op.phase();
		let span = PhaseSpan::new(phase, op.as_str());

		obs::record_phase_outcome(phase, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let request = self
					.http_client
					.request(method, url.clone())
					.bearer_auth(self.identity.management_token.expose());
				let response = decorate(request).send().await.map_err(|e| network(op, &url, e))?;
				let observed =
					ObservedResponse::read(response).await.map_err(|e| network(op, &url, e))?;

				if observed.is_success() {
					return Ok(observed);
				}
				if !(op.is_delete() && observed.status == 404) {
					tracing::warn!(
						operation = %op,
						status = observed.status,
						"Identity provider rejected management call."
					);
				}

				Err(SetupError::Rejected {
					operation: op,
					status: observed.status,
					message: rejection_message(&observed),
					retry_after: observed.retry_after,
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_phase_outcome(phase, Outcome::Success),
			Err(SetupError::Rejected { status: 404, .. }) if op.is_delete() =>
				obs::record_phase_outcome(phase, Outcome::Success),
			Err(_) => obs::record_phase_outcome(phase, Outcome::Failure),
		}

		result
	}
}
impl Debug for IdentityAdminClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityAdminClient")
			.field("base_url", &self.identity.base_url.as_str())
			.field("audience", &self.identity.audience)
			.finish()
	}
}

fn decode<T>(op: AdminOperation, response: &ObservedResponse) -> Result<T, SetupError>
where
	T: serde::de::DeserializeOwned,
{
	response.decode().map_err(|source| SetupError::MalformedResponse { operation: op, source })
}

fn network(op: AdminOperation, url: &Url, err: ReqwestError) -> SetupError {
	SetupError::Network { operation: op, source: TransportError::from_reqwest(url, err) }
}

fn rejection_message(response: &ObservedResponse) -> String {
	response
		.decode::<ManagementError>()
		.ok()
		.and_then(ManagementError::into_message)
		.unwrap_or_else(|| response.body_preview())
}
