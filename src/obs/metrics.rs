// self
use crate::obs::{Outcome, Phase};

/// Records a phase outcome via the global metrics recorder (when enabled).
pub fn record_phase_outcome(phase: Phase, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"authz_conformance_phase_total",
			"phase" => phase.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (phase, outcome);
	}
}

/// Records a scenario verdict for `endpoint` (a request path such as `/api/private`).
pub fn record_scenario_outcome(endpoint: &'static str, passed: bool) {
	#[cfg(feature = "metrics")]
	{
		let outcome = if passed { Outcome::Success } else { Outcome::Failure };

		metrics::counter!(
			"authz_conformance_scenario_total",
			"endpoint" => endpoint,
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (endpoint, passed);
	}
}
