//! Named groups of scenarios sharing one credential context.

// self
use crate::{
	api::Endpoint,
	scenario::{AuthorizationHeader, Credential, Scenario},
};

/// Scenarios for one context, e.g. "Valid token with read:messages scope".
#[derive(Clone, Debug)]
pub struct ScenarioMatrix {
	/// Context label.
	pub context: String,
	/// Scenarios in execution order.
	pub scenarios: Vec<Scenario>,
}
impl ScenarioMatrix {
	/// Creates an empty matrix.
	pub fn new(context: impl Into<String>) -> Self {
		Self { context: context.into(), scenarios: Vec::new() }
	}

	/// Adds one scenario per endpoint, all sending `header` and judged as `credential`.
	pub fn probe<I>(
		mut self,
		endpoints: I,
		header: &AuthorizationHeader,
		credential: &Credential,
	) -> Self
	where
		I: IntoIterator<Item = Endpoint>,
	{
		self.scenarios.extend(
			endpoints
				.into_iter()
				.map(|endpoint| Scenario::new(endpoint, header.clone(), credential)),
		);

		self
	}

	/// Number of scenarios.
	pub fn len(&self) -> usize {
		self.scenarios.len()
	}

	/// Returns true when the matrix holds no scenarios.
	pub fn is_empty(&self) -> bool {
		self.scenarios.is_empty()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ScopeSet;

	#[test]
	fn probe_expands_per_endpoint() {
		let read = ScopeSet::new(["read:messages"]).expect("Scope set should be valid.");
		let header = AuthorizationHeader::literal("Bearer placeholder");
		let matrix = ScenarioMatrix::new("read only")
			.probe(Endpoint::PROTECTED, &header, &Credential::Valid(read))
			.probe([Endpoint::Private], &AuthorizationHeader::Absent, &Credential::Missing);
		let statuses = matrix.scenarios.iter().map(|s| s.expected_status).collect::<Vec<_>>();

		assert_eq!(matrix.len(), 3);
		assert_eq!(statuses, [200, 200, 401]);
	}
}
