//! Observability helpers shared by every harness phase.
//!
//! Spans are always emitted through `tracing` and are named `authz_conformance.phase`, carrying
//! the `phase` and `stage` (call site) fields.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment `authz_conformance_phase_total` for every attempt/success/
//!   failure (labeled by `phase` + `outcome`) and `authz_conformance_scenario_total` for every
//!   scenario verdict (labeled by `endpoint` + `outcome`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Harness phases observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Management API calls that build or mutate fixtures.
	Setup,
	/// Client-credentials token exchange.
	Acquisition,
	/// Requests against the protected API.
	Scenario,
	/// Fixture deletion at the end of a context or suite.
	Teardown,
}
impl Phase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Phase::Setup => "setup",
			Phase::Acquisition => "acquisition",
			Phase::Scenario => "scenario",
			Phase::Teardown => "teardown",
		}
	}
}
impl Display for Phase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a phase helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}

	/// Maps a finished result onto [`Outcome::Success`] or [`Outcome::Failure`].
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Outcome::Success } else { Outcome::Failure }
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
