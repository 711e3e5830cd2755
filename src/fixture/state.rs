//! Lifecycle states for suite-level fixtures and per-context grants.

// self
use crate::{_prelude::*, error::SetupError};

/// Suite-level fixture lifecycle.
///
/// ```text
/// Uninitialized -> ClientCreated -> ResourceServerCreated -> Ready -> TearingDown -> Destroyed
///                        |                                               ^
///                        +------ resource-server creation failed --------+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SuiteState {
	/// Nothing exists on the identity provider yet.
	Uninitialized,
	/// The OAuth client exists.
	ClientCreated,
	/// The OAuth client and the resource server exist.
	ResourceServerCreated,
	/// Every suite-level fixture exists; contexts may run.
	Ready,
	/// Suite-level fixtures are being deleted.
	TearingDown,
	/// Teardown finished; the session is spent.
	Destroyed,
}
impl SuiteState {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			SuiteState::Uninitialized => "uninitialized",
			SuiteState::ClientCreated => "client_created",
			SuiteState::ResourceServerCreated => "resource_server_created",
			SuiteState::Ready => "ready",
			SuiteState::TearingDown => "tearing_down",
			SuiteState::Destroyed => "destroyed",
		}
	}

	/// Returns true when `next` is a legal successor of `self`.
	pub const fn can_transition_to(self, next: SuiteState) -> bool {
		matches!(
			(self, next),
			(SuiteState::Uninitialized, SuiteState::ClientCreated)
				| (SuiteState::ClientCreated, SuiteState::ResourceServerCreated)
				| (SuiteState::ClientCreated, SuiteState::TearingDown)
				| (SuiteState::ResourceServerCreated, SuiteState::Ready)
				| (SuiteState::Ready, SuiteState::TearingDown)
				| (SuiteState::TearingDown, SuiteState::Destroyed)
		)
	}

	/// Moves to `next`, rejecting illegal transitions.
	pub fn transition(&mut self, next: SuiteState) -> Result<(), SetupError> {
		if !self.can_transition_to(next) {
			return Err(SetupError::InvalidTransition { from: *self, to: next });
		}

		tracing::trace!(from = %self, to = %next, "Fixture state transition.");

		*self = next;

		Ok(())
	}
}
impl Display for SuiteState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Per-context grant lifecycle: `NoGrant -> GrantCreated -> NoGrant`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GrantState {
	/// No client grant is live.
	#[default]
	NoGrant,
	/// Exactly one client grant is live.
	GrantCreated,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn happy_path_reaches_destroyed() {
		let mut state = SuiteState::Uninitialized;

		for next in [
			SuiteState::ClientCreated,
			SuiteState::ResourceServerCreated,
			SuiteState::Ready,
			SuiteState::TearingDown,
			SuiteState::Destroyed,
		] {
			state.transition(next).expect("Forward transition should be legal.");
		}

		assert_eq!(state, SuiteState::Destroyed);
	}

	#[test]
	fn rollback_is_allowed_only_before_ready() {
		assert!(SuiteState::ClientCreated.can_transition_to(SuiteState::TearingDown));
		assert!(!SuiteState::Uninitialized.can_transition_to(SuiteState::TearingDown));
		assert!(!SuiteState::Destroyed.can_transition_to(SuiteState::TearingDown));
	}

	#[test]
	fn illegal_transition_is_rejected_and_state_kept() {
		let mut state = SuiteState::Uninitialized;
		let err = state.transition(SuiteState::Ready).expect_err("Skipping states must fail.");

		assert_eq!(err.to_string(), "Illegal fixture transition from uninitialized to ready.");
		assert_eq!(state, SuiteState::Uninitialized);
	}
}
