//! Scope modeling: normalized scope sets and the resource-server scope catalog.

// std
use std::{collections::BTreeSet, slice::Iter};
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Normalized set of OAuth scopes.
///
/// Scopes are deduplicated and sorted so equality and subset checks do not depend on the order
/// a grant or token endpoint happened to list them in. The empty set is valid and meaningful: a
/// client grant with no scopes still yields a validly signed token.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self(normalize(scopes)?))
	}

	/// The empty scope set.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Returns true when every scope in `self` also appears in `other`.
	pub fn is_subset_of(&self, other: &ScopeSet) -> bool {
		self.iter().all(|scope| other.contains(scope))
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|s| s.as_str())
	}

	/// Returns the normalized string representation (space-delimited).
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.0
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.0).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		if self.is_empty() { f.write_str("<none>") } else { f.write_str(&self.normalized()) }
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|s| s.as_str())
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		ScopeIter { inner: self.0.iter() }
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.0.len()))?;

		for scope in self.0.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}

/// A scope declared on a resource server, as sent to the management API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDefinition {
	/// Scope value, e.g. `read:messages`.
	pub value: String,
	/// Human-readable description shown in the identity provider's dashboard.
	#[serde(default)]
	pub description: String,
}
impl ScopeDefinition {
	/// Creates a new scope definition.
	pub fn new(value: impl Into<String>, description: impl Into<String>) -> Self {
		Self { value: value.into(), description: description.into() }
	}
}

/// Full universe of scopes a resource server declares; every grant is a subset of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeCatalog(Vec<ScopeDefinition>);
impl ScopeCatalog {
	/// Builds a catalog, rejecting invalid or duplicate scope values.
	pub fn new(
		definitions: impl IntoIterator<Item = ScopeDefinition>,
	) -> Result<Self, ScopeValidationError> {
		let mut seen = BTreeSet::new();
		let mut catalog = Vec::new();

		for definition in definitions {
			normalize([definition.value.as_str()])?;

			if seen.insert(definition.value.clone()) {
				catalog.push(definition);
			}
		}

		Ok(Self(catalog))
	}

	/// Catalog used by the message API samples: `read:messages` and `write:messages`.
	pub fn messages() -> Self {
		Self(vec![
			ScopeDefinition::new("read:messages", "Read messages"),
			ScopeDefinition::new("write:messages", "Write messages"),
		])
	}

	/// Declared definitions in insertion order.
	pub fn definitions(&self) -> &[ScopeDefinition] {
		&self.0
	}

	/// All declared values as a normalized set.
	pub fn values(&self) -> ScopeSet {
		let values = self.0.iter().map(|d| d.value.clone()).collect::<BTreeSet<_>>();

		ScopeSet(Arc::from(values.into_iter().collect::<Vec<_>>()))
	}

	/// Returns true when the catalog declares every scope in `scopes`.
	pub fn covers(&self, scopes: &ScopeSet) -> bool {
		scopes.is_subset_of(&self.values())
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for scope in scopes {
		let owned: String = scope.into();

		if owned.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if owned.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
		}

		set.insert(owned);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_normalize_and_compare_stably() {
		let lhs = ScopeSet::new(["write:messages", "read:messages", "read:messages"])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::new(["read:messages", "write:messages"])
			.expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.normalized(), "read:messages write:messages");
	}

	#[test]
	fn scopes_reject_whitespace_padding() {
		let err = ScopeSet::new([" read:messages "]).expect_err("Padded scopes must be rejected.");

		assert!(matches!(err, ScopeValidationError::ContainsWhitespace { .. }));
		assert!(ScopeSet::from_str("").is_ok(), "Empty string represents an empty scope set.");
		assert!(ScopeSet::from_str("   ").is_err(), "Whitespace-only input must be rejected.");
		assert!(ScopeSet::new([""]).is_err());
	}

	#[test]
	fn subset_checks_cover_empty_sets() {
		let read = ScopeSet::new(["read:messages"]).expect("Scope set should be valid.");
		let both = ScopeSet::new(["read:messages", "write:messages"])
			.expect("Scope set should be valid.");

		assert!(ScopeSet::empty().is_subset_of(&read));
		assert!(read.is_subset_of(&both));
		assert!(!both.is_subset_of(&read));
		assert_eq!(ScopeSet::empty().to_string(), "<none>");
	}

	#[test]
	fn catalog_deduplicates_and_covers() {
		let catalog = ScopeCatalog::new([
			ScopeDefinition::new("read:messages", "Read messages"),
			ScopeDefinition::new("read:messages", "Duplicate"),
			ScopeDefinition::new("write:messages", "Write messages"),
		])
		.expect("Catalog should build.");

		assert_eq!(catalog.definitions().len(), 2);
		assert_eq!(catalog, ScopeCatalog::messages());
		assert!(catalog.covers(&ScopeSet::new(["write:messages"]).expect("Valid scope set.")));
		assert!(!catalog.covers(&ScopeSet::new(["admin"]).expect("Valid scope set.")));
		assert!(ScopeCatalog::new([ScopeDefinition::new("bad scope", "x")]).is_err());
	}

	#[test]
	fn catalog_serializes_as_management_payload() {
		let json = serde_json::to_value(ScopeCatalog::messages()).expect("Catalog should serialize.");

		assert_eq!(
			json,
			serde_json::json!([
				{ "value": "read:messages", "description": "Read messages" },
				{ "value": "write:messages", "description": "Write messages" },
			])
		);
	}
}
