//! Executes scenarios against the protected API and judges the responses.

// self
use crate::{
	_prelude::*,
	api::{Endpoint, ProtectedApiClient},
	error::AssertionError,
	http::ObservedResponse,
	obs,
	scenario::{JSON_MEDIA_TYPE, Scenario, ScenarioMatrix},
};

/// Verdict for one scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
	/// Scenario description.
	pub description: String,
	/// Probed endpoint.
	pub endpoint: Endpoint,
	/// Expected status.
	pub expected_status: u16,
	/// Observed status, when a response arrived.
	pub actual_status: Option<u16>,
	/// `Ok` when every assertion held.
	pub result: Result<(), AssertionError>,
}
impl ScenarioOutcome {
	/// Returns true when every assertion held.
	pub fn passed(&self) -> bool {
		self.result.is_ok()
	}
}
impl Display for ScenarioOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let verdict = if self.passed() { "PASS" } else { "FAIL" };

		write!(f, "{verdict} {} (expected {}, got ", self.description, self.expected_status)?;

		match self.actual_status {
			Some(status) => write!(f, "{status})"),
			None => f.write_str("no response)"),
		}?;

		if let Err(e) = &self.result {
			write!(f, ": {e}")?;
		}

		Ok(())
	}
}

/// Runs scenarios one at a time; a failing scenario never stops its siblings.
#[derive(Clone, Debug)]
pub struct MatrixRunner {
	api: ProtectedApiClient,
}
impl MatrixRunner {
	/// Creates a runner probing `api`.
	pub fn new(api: ProtectedApiClient) -> Self {
		Self { api }
	}

	/// Runs every scenario of `matrix` in order.
	pub async fn run_matrix(&self, matrix: &ScenarioMatrix) -> Vec<ScenarioOutcome> {
		let mut outcomes = Vec::with_capacity(matrix.len());

		for scenario in &matrix.scenarios {
			outcomes.push(self.run(scenario).await);
		}

		outcomes
	}

	/// Runs one scenario.
	pub async fn run(&self, scenario: &Scenario) -> ScenarioOutcome {
		let header = scenario.authorization.render();
		let probe = self.api.get(scenario.endpoint, header.as_deref()).await;
		let (actual_status, result) = match probe {
			Ok(response) => (Some(response.status), judge(scenario, &response)),
			Err(e) => (None, Err(e.into_assertion(scenario.description.clone()))),
		};
		let outcome = ScenarioOutcome {
			description: scenario.description.clone(),
			endpoint: scenario.endpoint,
			expected_status: scenario.expected_status,
			actual_status,
			result,
		};

		obs::record_scenario_outcome(scenario.endpoint.path(), outcome.passed());

		if outcome.passed() {
			tracing::info!(
				scenario = %outcome.description,
				status = ?actual_status,
				"Scenario passed."
			);
		} else {
			tracing::warn!(
				scenario = %outcome.description,
				expected = scenario.expected_status,
				actual = ?actual_status,
				"Scenario failed."
			);
		}

		outcome
	}
}

/// Checks status first, then the declared content type and body shape.
fn judge(scenario: &Scenario, response: &ObservedResponse) -> Result<(), AssertionError> {
	if response.status != scenario.expected_status {
		return Err(AssertionError::StatusMismatch {
			scenario: scenario.description.clone(),
			expected: scenario.expected_status,
			actual: response.status,
		});
	}

	let Some(media_type) = scenario.expected_content_type else {
		return Ok(());
	};

	if !response.has_media_type(media_type) {
		return Err(AssertionError::ContentTypeMismatch {
			scenario: scenario.description.clone(),
			expected: media_type.into(),
			actual: response.content_type.clone(),
		});
	}
	if media_type == JSON_MEDIA_TYPE {
		serde_json::from_slice::<serde_json::Value>(&response.body).map_err(|source| {
			AssertionError::MalformedJson { scenario: scenario.description.clone(), source }
		})?;
	}

	Ok(())
}
