//! The fixture session: suite-level fixtures plus scoped per-context grants.

// std
use std::panic::{self, AssertUnwindSafe};
// crates.io
use futures::FutureExt;
// self
use crate::{
	_prelude::*,
	admin::{
		ClientGrant, Deletion, IdentityAdminClient, OAuthClient, ResourceServerPatch,
		ResourceServerRecord,
	},
	auth::{AccessToken, Audience, ScopeCatalog, ScopeSet},
	error::{AcquisitionError, SetupError},
	fixture::{FixturePlan, GrantState, SuiteState},
	flows::TokenAcquirer,
	obs::{Phase, PhaseSpan},
};

/// Lifetime Auth0 assigns to new resource servers when none is reported.
const PROVIDER_DEFAULT_TOKEN_LIFETIME: Duration = Duration::seconds(86_400);

/// Kind of fixture a cleanup step targeted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixtureKind {
	/// The suite's OAuth client.
	Client,
	/// The suite's resource server.
	ResourceServer,
	/// A per-context client grant.
	ClientGrant,
	/// The resource server's original token lifetime.
	TokenLifetime,
}
impl FixtureKind {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			FixtureKind::Client => "client",
			FixtureKind::ResourceServer => "resource_server",
			FixtureKind::ClientGrant => "client_grant",
			FixtureKind::TokenLifetime => "token_lifetime",
		}
	}
}
impl Display for FixtureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A cleanup step that failed and may have left state behind on the identity provider.
#[derive(Debug)]
pub struct CleanupFailure {
	/// Fixture the step targeted.
	pub fixture: FixtureKind,
	/// Identifier of the fixture.
	pub target: String,
	/// Management API failure.
	pub error: SetupError,
}

/// Outcome of suite teardown.
#[derive(Debug, Default)]
pub struct TeardownReport {
	/// Client deletion result, `None` when the delete failed.
	pub client: Option<Deletion>,
	/// Resource-server deletion result, `None` when the delete failed.
	pub resource_server: Option<Deletion>,
	/// Every cleanup step that failed during the session, teardown included.
	pub failures: Vec<CleanupFailure>,
}
impl TeardownReport {
	/// Returns true when every cleanup step succeeded.
	pub fn is_clean(&self) -> bool {
		self.failures.is_empty()
	}
}

/// View handed to the body of [`Session::with_grant`].
///
/// Borrowing keeps the grant id local to the context: it cannot outlive the closure, and the
/// session cannot start another grant while this view exists.
#[derive(Clone, Copy, Debug)]
pub struct GrantContext<'a> {
	client: &'a OAuthClient,
	grant: &'a ClientGrant,
}
impl<'a> GrantContext<'a> {
	/// Suite OAuth client.
	pub fn client(&self) -> &'a OAuthClient {
		self.client
	}

	/// Active client grant.
	pub fn grant(&self) -> &'a ClientGrant {
		self.grant
	}

	/// Scopes bound by the active grant.
	pub fn scopes(&self) -> &'a ScopeSet {
		&self.grant.scope
	}

	/// Mints a token bounded by the active grant.
	pub async fn acquire(
		&self,
		acquirer: &TokenAcquirer,
	) -> Result<AccessToken, AcquisitionError> {
		acquirer.acquire_within(self.client, self.grant).await
	}
}

/// Suite-level fixtures and the management client that owns them.
///
/// Created by [`Session::provision`], spent by [`Session::teardown`]. Contexts borrow it mutably,
/// so at most one client grant is live at any time.
pub struct Session {
	admin: IdentityAdminClient,
	state: SuiteState,
	grant_state: GrantState,
	client: OAuthClient,
	resource_server: ResourceServerRecord,
	catalog: ScopeCatalog,
	original_token_lifetime: Duration,
	failures: Vec<CleanupFailure>,
}
impl Session {
	/// Creates the OAuth client, then the resource server.
	///
	/// When the resource server cannot be created the client is deleted (best effort) before the
	/// error is returned, so a failed provision leaves nothing behind.
	pub async fn provision(
		admin: IdentityAdminClient,
		plan: &FixturePlan,
	) -> Result<Self, SetupError> {
		let span = PhaseSpan::new(Phase::Setup, "provision");

		span.instrument(async move {
			let mut state = SuiteState::Uninitialized;
			let client = admin.create_client(&plan.client_name).await?;

			state.transition(SuiteState::ClientCreated)?;

			let audience = admin.audience().clone();
			let resource_server = match admin
				.create_resource_server(&audience, &plan.resource_server_name, &plan.scopes)
				.await
			{
				Ok(record) => record,
				Err(e) => {
					state.transition(SuiteState::TearingDown)?;
					rollback_client(&admin, &client).await;
					state.transition(SuiteState::Destroyed)?;

					return Err(e);
				},
			};

			state.transition(SuiteState::ResourceServerCreated)?;
			state.transition(SuiteState::Ready)?;

			let original_token_lifetime =
				resource_server.token_lifetime().unwrap_or(PROVIDER_DEFAULT_TOKEN_LIFETIME);

			tracing::info!(
				client_id = %client.id,
				audience = %audience,
				token_lifetime = %original_token_lifetime,
				"Suite fixtures ready."
			);

			Ok(Self {
				admin,
				state,
				grant_state: GrantState::NoGrant,
				client,
				resource_server,
				catalog: plan.scopes.clone(),
				original_token_lifetime,
				failures: Vec::new(),
			})
		})
		.await
	}

	/// Suite OAuth client.
	pub fn client(&self) -> &OAuthClient {
		&self.client
	}

	/// Audience of the suite resource server.
	pub fn audience(&self) -> &Audience {
		&self.resource_server.identifier
	}

	/// Current suite lifecycle state.
	pub fn state(&self) -> SuiteState {
		self.state
	}

	/// Current per-context grant state.
	pub fn grant_state(&self) -> GrantState {
		self.grant_state
	}

	/// Returns true once any cleanup step failed during the session.
	pub fn is_tainted(&self) -> bool {
		!self.failures.is_empty()
	}

	/// Creates a client grant for `scopes`, runs `f`, and deletes the grant afterward.
	///
	/// `scopes` must be declared by the resource server's catalog; otherwise nothing is created
	/// and [`SetupError::ScopesOutsideCatalog`] is returned.
	///
	/// The grant is deleted even when `f` panics; the panic resumes once cleanup is done. A failed
	/// delete is logged and recorded for the teardown report rather than masking `f`'s result.
	pub async fn with_grant<F, T>(&mut self, scopes: &ScopeSet, f: F) -> Result<T, SetupError>
	where
		F: AsyncFnOnce(&GrantContext<'_>) -> T,
	{
		if !self.catalog.covers(scopes) {
			return Err(SetupError::ScopesOutsideCatalog {
				requested: scopes.clone(),
				declared: self.catalog.values(),
			});
		}

		let audience = self.resource_server.identifier.clone();
		let grant = self.admin.create_client_grant(&self.client.id, &audience, scopes).await?;

		self.grant_state = GrantState::GrantCreated;

		let outcome = {
			let context = GrantContext { client: &self.client, grant: &grant };

			AssertUnwindSafe(f(&context)).catch_unwind().await
		};

		if let Err(error) = self.admin.delete_client_grant(&grant.id).await {
			tracing::error!(grant_id = %grant.id, %error, "Client grant could not be deleted.");

			self.record_failure(FixtureKind::ClientGrant, grant.id.to_string(), error);
		}

		self.grant_state = GrantState::NoGrant;

		match outcome {
			Ok(value) => Ok(value),
			Err(payload) => panic::resume_unwind(payload),
		}
	}

	/// Sets the resource server's token lifetime to `lifetime`, runs `f`, and restores the
	/// lifetime the resource server was created with.
	///
	/// A failed restore taints the session: it is logged and listed in the teardown report.
	pub async fn with_token_lifetime<F, T>(
		&mut self,
		lifetime: Duration,
		f: F,
	) -> Result<T, SetupError>
	where
		F: AsyncFnOnce(&mut Session) -> T,
	{
		let audience = self.resource_server.identifier.clone();

		self.admin
			.patch_resource_server(&audience, &ResourceServerPatch::token_lifetime(lifetime))
			.await?;

		let outcome = AssertUnwindSafe(f(&mut *self)).catch_unwind().await;
		let restore = ResourceServerPatch::token_lifetime(self.original_token_lifetime);

		if let Err(error) = self.admin.patch_resource_server(&audience, &restore).await {
			tracing::error!(
				audience = %audience,
				token_lifetime = %self.original_token_lifetime,
				%error,
				"Resource server token lifetime could not be restored."
			);

			self.record_failure(FixtureKind::TokenLifetime, audience.to_string(), error);
		}

		match outcome {
			Ok(value) => Ok(value),
			Err(payload) => panic::resume_unwind(payload),
		}
	}

	/// Deletes the OAuth client and the resource server.
	///
	/// Both deletes are attempted regardless of the other's outcome. Consuming `self` guarantees
	/// teardown runs at most once.
	pub async fn teardown(mut self) -> TeardownReport {
		let span = PhaseSpan::new(Phase::Teardown, "suite");

		span.instrument(async move {
			if let Err(error) = self.state.transition(SuiteState::TearingDown) {
				tracing::warn!(%error, "Tearing down a session that was not ready.");

				self.state = SuiteState::TearingDown;
			}

			let client_id = self.client.id.clone();
			let audience = self.resource_server.identifier.clone();
			let client = match self.admin.delete_client(&client_id).await {
				Ok(deletion) => Some(deletion),
				Err(error) => {
					tracing::error!(
						client_id = %client_id,
						%error,
						"OAuth client could not be deleted."
					);

					self.record_failure(FixtureKind::Client, client_id.to_string(), error);

					None
				},
			};
			let resource_server = match self.admin.delete_resource_server(&audience).await {
				Ok(deletion) => Some(deletion),
				Err(error) => {
					tracing::error!(
						audience = %audience,
						%error,
						"Resource server could not be deleted."
					);

					self.record_failure(FixtureKind::ResourceServer, audience.to_string(), error);

					None
				},
			};

			self.state = SuiteState::Destroyed;

			let report = TeardownReport {
				client,
				resource_server,
				failures: std::mem::take(&mut self.failures),
			};

			if report.is_clean() {
				tracing::info!("Suite fixtures deleted.");
			} else {
				tracing::warn!(
					failures = report.failures.len(),
					"Suite teardown left fixtures behind."
				);
			}

			report
		})
		.await
	}

	fn record_failure(&mut self, fixture: FixtureKind, target: String, error: SetupError) {
		self.failures.push(CleanupFailure { fixture, target, error });
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("state", &self.state)
			.field("grant_state", &self.grant_state)
			.field("client", &self.client)
			.field("audience", &self.resource_server.identifier)
			.field("failures", &self.failures.len())
			.finish()
	}
}
impl Drop for Session {
	fn drop(&mut self) {
		if self.state != SuiteState::Destroyed {
			tracing::error!(
				client_id = %self.client.id,
				audience = %self.resource_server.identifier,
				"Fixture session dropped without teardown; fixtures remain on the identity provider."
			);
		}
	}
}

async fn rollback_client(admin: &IdentityAdminClient, client: &OAuthClient) {
	match admin.delete_client(&client.id).await {
		Ok(_) => tracing::info!(client_id = %client.id, "Rolled back OAuth client."),
		Err(error) => tracing::error!(
			client_id = %client.id,
			%error,
			"OAuth client could not be rolled back."
		),
	}
}
