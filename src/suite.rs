//! The standard conformance run.
//!
//! Static contexts (no fixtures needed) run first. Then one [`Session`] is provisioned and every
//! issued-token context runs inside its own client grant. The session is torn down at the end
//! whatever happened in between.

// self
use crate::{
	_prelude::*,
	admin::IdentityAdminClient,
	api::{Endpoint, ProtectedApiClient},
	auth::{AccessToken, ScopeSet},
	clock::{Sleeper, TokioSleeper},
	config::HarnessConfig,
	error::{ConfigError, SetupError},
	fixture::{self, CleanupFailure, FixturePlan, GrantContext, Session, TeardownReport},
	flows::TokenAcquirer,
	http::ReqwestHttpClient,
	scenario::{AuthorizationHeader, Credential, MatrixRunner, ScenarioMatrix, ScenarioOutcome},
};

/// How an issued token is presented to the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenUse {
	/// `Bearer <token>` exactly as issued.
	AsIssued,
	/// Signature extended with a random base64url suffix.
	Tampered,
	/// Followed by a whitespace-separated garbage segment.
	TrailingGarbage,
	/// Issued under a shortened lifetime and presented after it elapsed.
	Expired,
}

/// A context that needs a freshly issued token.
#[derive(Clone, Debug)]
pub struct IssuedContext {
	/// Context label.
	pub label: String,
	/// Scopes granted to the suite client for this context.
	pub scopes: ScopeSet,
	/// How the token is presented.
	pub usage: TokenUse,
}
impl IssuedContext {
	/// Creates a context.
	pub fn new(label: impl Into<String>, scopes: ScopeSet, usage: TokenUse) -> Self {
		Self { label: label.into(), scopes, usage }
	}

	/// Scenarios for `token`, judged against what the API should conclude about it.
	pub fn matrix(&self, token: &AccessToken) -> ScenarioMatrix {
		let (header, credential) = match self.usage {
			TokenUse::AsIssued => (
				AuthorizationHeader::bearer(&token.secret),
				Credential::Valid(token.effective_scope(&self.scopes)),
			),
			TokenUse::Tampered =>
				(AuthorizationHeader::tampered(&token.secret), Credential::Invalid),
			TokenUse::TrailingGarbage =>
				(AuthorizationHeader::trailing_garbage(&token.secret), Credential::Invalid),
			TokenUse::Expired => (AuthorizationHeader::bearer(&token.secret), Credential::Invalid),
		};

		ScenarioMatrix::new(self.label.clone()).probe(Endpoint::PROTECTED, &header, &credential)
	}
}

/// How a context ended.
#[derive(Debug)]
pub enum ContextOutcome {
	/// Every scenario ran; individual verdicts may still be failures.
	Completed(Vec<ScenarioOutcome>),
	/// A setup or acquisition failure stopped the context before its scenarios ran.
	Aborted(Error),
}

/// Result of one context.
#[derive(Debug)]
pub struct ContextReport {
	/// Context label.
	pub context: String,
	/// What happened.
	pub outcome: ContextOutcome,
}
impl ContextReport {
	/// Scenario verdicts, empty when the context aborted.
	pub fn scenarios(&self) -> &[ScenarioOutcome] {
		match &self.outcome {
			ContextOutcome::Completed(outcomes) => outcomes,
			ContextOutcome::Aborted(_) => &[],
		}
	}

	/// Returns true when the context aborted.
	pub fn is_aborted(&self) -> bool {
		matches!(self.outcome, ContextOutcome::Aborted(_))
	}
}

/// Result of a full run.
#[derive(Debug, Default)]
pub struct SuiteReport {
	/// Every context, in execution order.
	pub contexts: Vec<ContextReport>,
	/// Suite-level provisioning failure; issued-token contexts did not run.
	pub setup_failure: Option<SetupError>,
	/// Suite teardown, when provisioning succeeded.
	pub teardown: Option<TeardownReport>,
}
impl SuiteReport {
	/// Number of passing scenarios.
	pub fn passed(&self) -> usize {
		self.scenarios().filter(|outcome| outcome.passed()).count()
	}

	/// Number of failing scenarios.
	pub fn failed(&self) -> usize {
		self.scenarios().filter(|outcome| !outcome.passed()).count()
	}

	/// Number of aborted contexts.
	pub fn aborted(&self) -> usize {
		self.contexts.iter().filter(|context| context.is_aborted()).count()
	}

	/// Returns true when nothing failed, aborted, or leaked.
	pub fn is_success(&self) -> bool {
		self.failed() == 0
			&& self.aborted() == 0
			&& self.setup_failure.is_none()
			&& self.teardown.as_ref().is_none_or(TeardownReport::is_clean)
	}

	/// Looks up a context by label.
	pub fn context(&self, label: &str) -> Option<&ContextReport> {
		self.contexts.iter().find(|context| context.context == label)
	}

	fn scenarios(&self) -> impl Iterator<Item = &ScenarioOutcome> {
		self.contexts.iter().flat_map(ContextReport::scenarios)
	}
}
impl Display for SuiteReport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for context in &self.contexts {
			writeln!(f, "{}", context.context)?;

			match &context.outcome {
				ContextOutcome::Completed(outcomes) =>
					for outcome in outcomes {
						writeln!(f, "  {outcome}")?;
					},
				ContextOutcome::Aborted(e) => writeln!(f, "  ABORTED: {e}")?,
			}
		}

		if let Some(e) = &self.setup_failure {
			writeln!(f, "Suite setup failed: {e}")?;
		}
		if let Some(teardown) = &self.teardown {
			for failure in &teardown.failures {
				let CleanupFailure { fixture, target, error } = failure;

				writeln!(f, "Cleanup failed for {fixture} {target}: {error}")?;
			}
		}

		write!(f, "{} passed, {} failed, {} aborted", self.passed(), self.failed(), self.aborted())
	}
}

/// Wires configuration, fixtures, token acquisition, and the runner into the standard run.
pub struct ConformanceSuite {
	config: HarnessConfig,
	admin: IdentityAdminClient,
	acquirer: TokenAcquirer,
	runner: MatrixRunner,
	sleeper: Arc<dyn Sleeper>,
}
impl ConformanceSuite {
	/// Builds a suite with an HTTP client honoring the configured timeout.
	pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;

		Ok(Self::with_http_client(config, http_client))
	}

	/// Builds a suite from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::new(HarnessConfig::from_env()?)
	}

	/// Builds a suite that shares `http_client` across every component.
	pub fn with_http_client(config: HarnessConfig, http_client: ReqwestHttpClient) -> Self {
		let admin = IdentityAdminClient::new(http_client.clone(), config.identity.clone());
		let acquirer = TokenAcquirer::new(http_client.clone(), &config.identity);
		let runner =
			MatrixRunner::new(ProtectedApiClient::new(http_client, config.api_base_url.clone()));

		Self { config, admin, acquirer, runner, sleeper: Arc::new(TokioSleeper) }
	}

	/// Replaces the sleeper used by the expiry context.
	pub fn with_sleeper(mut self, sleeper: impl 'static + Sleeper) -> Self {
		self.sleeper = Arc::new(sleeper);

		self
	}

	/// Contexts that need no fixtures: missing and malformed headers.
	pub fn static_contexts() -> Vec<ScenarioMatrix> {
		let malformed = |label: &str, value: &str| {
			ScenarioMatrix::new(label).probe(
				Endpoint::PROTECTED,
				&AuthorizationHeader::literal(value),
				&Credential::Invalid,
			)
		};

		vec![
			ScenarioMatrix::new("Request without authorization header").probe(
				Endpoint::ALL,
				&AuthorizationHeader::Absent,
				&Credential::Missing,
			),
			malformed("Authorization header with value 'Bearer '", "Bearer "),
			malformed("Authorization header with value ' '", " "),
			malformed("Authorization header with invalid token", "Bearer invalidToken"),
			malformed(
				"Authorization header with value 'Bearer invalidToken abc'",
				"Bearer invalidToken abc",
			),
		]
	}

	/// Contexts that run inside a client grant, in execution order.
	pub fn issued_contexts() -> Vec<IssuedContext> {
		let scopes = |values: &[&'static str]| {
			ScopeSet::new(values.iter().copied()).expect("Static scope literals are valid.")
		};

		vec![
			IssuedContext::new(
				"Token with invalid signature",
				ScopeSet::empty(),
				TokenUse::Tampered,
			),
			IssuedContext::new(
				"Valid token without any scope",
				ScopeSet::empty(),
				TokenUse::AsIssued,
			),
			IssuedContext::new(
				"Valid token with read:messages scope",
				scopes(&["read:messages"]),
				TokenUse::AsIssued,
			),
			IssuedContext::new(
				"Valid token with write:messages scope",
				scopes(&["write:messages"]),
				TokenUse::AsIssued,
			),
			IssuedContext::new(
				"Valid token with read:messages and write:messages scopes",
				scopes(&["read:messages", "write:messages"]),
				TokenUse::AsIssued,
			),
			IssuedContext::new(
				"Valid token followed by a garbage segment",
				scopes(&["read:messages"]),
				TokenUse::TrailingGarbage,
			),
			IssuedContext::new("Expired token", scopes(&["read:messages"]), TokenUse::Expired),
		]
	}

	/// Runs the standard plan with a fresh, randomly named OAuth client.
	pub async fn run(&self) -> SuiteReport {
		self.run_plan(&FixturePlan::for_config(&self.config), &Self::issued_contexts()).await
	}

	/// Runs the static contexts, then `issued` inside fixtures built from `plan`.
	pub async fn run_plan(&self, plan: &FixturePlan, issued: &[IssuedContext]) -> SuiteReport {
		let mut report = SuiteReport::default();

		for matrix in Self::static_contexts() {
			let outcomes = self.runner.run_matrix(&matrix).await;

			report.contexts.push(ContextReport {
				context: matrix.context,
				outcome: ContextOutcome::Completed(outcomes),
			});
		}

		let scoped = fixture::scoped(self.admin.clone(), plan, async |session: &mut Session| {
			let mut contexts = Vec::with_capacity(issued.len());

			for context in issued {
				contexts.push(self.run_issued(session, context).await);
			}

			contexts
		})
		.await;

		match scoped {
			Ok((contexts, teardown)) => {
				report.contexts.extend(contexts);
				report.teardown = Some(teardown);
			},
			Err(e) => {
				tracing::error!(error = %e, "Suite fixtures could not be provisioned.");

				report.setup_failure = Some(e);
			},
		}

		tracing::info!(
			passed = report.passed(),
			failed = report.failed(),
			aborted = report.aborted(),
			"Conformance run finished."
		);

		report
	}

	async fn run_issued(&self, session: &mut Session, context: &IssuedContext) -> ContextReport {
		let result = match context.usage {
			TokenUse::Expired => session
				.with_token_lifetime(self.config.expiry_lifetime, async |session: &mut Session| {
					self.probe_within_grant(session, context).await
				})
				.await
				.map_err(Error::from)
				.and_then(|inner| inner),
			_ => self.probe_within_grant(session, context).await,
		};
		let outcome = match result {
			Ok(outcomes) => ContextOutcome::Completed(outcomes),
			Err(e) => {
				tracing::warn!(context = %context.label, error = %e, "Context aborted.");

				ContextOutcome::Aborted(e)
			},
		};

		ContextReport { context: context.label.clone(), outcome }
	}

	async fn probe_within_grant(
		&self,
		session: &mut Session,
		context: &IssuedContext,
	) -> Result<Vec<ScenarioOutcome>> {
		session
			.with_grant(&context.scopes, async |grant: &GrantContext<'_>| {
				let token = grant.acquire(&self.acquirer).await?;

				if context.usage == TokenUse::Expired {
					self.await_expiry(&token).await;
				}

				Ok::<_, Error>(self.runner.run_matrix(&context.matrix(&token)).await)
			})
			.await?
	}

	async fn await_expiry(&self, token: &AccessToken) {
		let wait = self.config.expiry_wait();

		if token.expires_in.is_some() && !token.is_expired_at(token.issued_at + wait) {
			tracing::warn!(
				expires_at = ?token.expires_at(),
				requested = %self.config.expiry_lifetime,
				"Token outlives the shortened lifetime; the expiry probe may not observe expiry."
			);
		}

		tracing::debug!(fingerprint = %token.fingerprint(), %wait, "Waiting for token expiry.");

		self.sleeper.sleep(wait).await;
	}
}
impl Debug for ConformanceSuite {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConformanceSuite")
			.field("config", &self.config)
			.field("admin", &self.admin)
			.field("acquirer", &self.acquirer)
			.field("runner", &self.runner)
			.finish()
	}
}
