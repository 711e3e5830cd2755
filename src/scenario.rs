//! Scenarios: one request, one expectation.
//!
//! [`expected_for`] is the endpoint policy written down once; every scenario's expectation is
//! derived from it rather than spelled out per test case.

pub mod matrix;
pub mod runner;

pub use matrix::*;
pub use runner::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	api::Endpoint,
	auth::{ScopeSet, TokenSecret},
};

/// Media type every successful endpoint answers with.
pub const JSON_MEDIA_TYPE: &str = "application/json";

const TAMPER_SUFFIX_BYTES: usize = 12;
const TRAILING_GARBAGE: &str = "abc";

/// How the `Authorization` header of a probe is built.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthorizationHeader {
	/// Header omitted entirely.
	Absent,
	/// Header sent with this exact value.
	Literal(String),
	/// `Bearer <token>`.
	Bearer(TokenSecret),
	/// `Bearer <token><suffix>`: a validly issued token whose signature no longer verifies.
	Tampered {
		/// Issued token.
		token: TokenSecret,
		/// Base64url characters appended to the signature.
		suffix: String,
	},
	/// `Bearer <token> <garbage>`: a validly issued token followed by an extra segment.
	TrailingGarbage {
		/// Issued token.
		token: TokenSecret,
		/// Whitespace-separated trailing segment.
		garbage: String,
	},
}
impl AuthorizationHeader {
	/// Header with a literal value.
	pub fn literal(value: impl Into<String>) -> Self {
		Self::Literal(value.into())
	}

	/// `Bearer <token>`.
	pub fn bearer(token: &TokenSecret) -> Self {
		Self::Bearer(token.clone())
	}

	/// `Bearer <token><random base64url suffix>`.
	pub fn tampered(token: &TokenSecret) -> Self {
		let bytes = rand::random::<[u8; TAMPER_SUFFIX_BYTES]>();

		Self::Tampered { token: token.clone(), suffix: URL_SAFE_NO_PAD.encode(bytes) }
	}

	/// `Bearer <token> abc`.
	pub fn trailing_garbage(token: &TokenSecret) -> Self {
		Self::TrailingGarbage { token: token.clone(), garbage: TRAILING_GARBAGE.into() }
	}

	/// Header value to send, `None` when the header is omitted.
	pub fn render(&self) -> Option<String> {
		match self {
			Self::Absent => None,
			Self::Literal(value) => Some(value.clone()),
			Self::Bearer(token) => Some(format!("Bearer {}", token.expose())),
			Self::Tampered { token, suffix } => Some(format!("Bearer {}{suffix}", token.expose())),
			Self::TrailingGarbage { token, garbage } =>
				Some(format!("Bearer {} {garbage}", token.expose())),
		}
	}

	/// Log-safe description of the header.
	pub fn describe(&self) -> String {
		match self {
			Self::Absent => "no Authorization header".into(),
			Self::Literal(value) => format!("Authorization `{value}`"),
			Self::Bearer(token) => format!("bearer token {}", token.fingerprint()),
			Self::Tampered { token, .. } => format!("tampered bearer token {}", token.fingerprint()),
			Self::TrailingGarbage { token, garbage } =>
				format!("bearer token {} followed by `{garbage}`", token.fingerprint()),
		}
	}
}
impl Debug for AuthorizationHeader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AuthorizationHeader({})", self.describe())
	}
}

/// What the protected API should conclude about a credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
	/// No credential presented.
	Missing,
	/// Presented, but not a bearer token the API can verify: malformed, tampered, expired, or
	/// followed by garbage.
	Invalid,
	/// A verifiable, unexpired token carrying these scopes.
	Valid(ScopeSet),
}

/// Expected response for a probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expectation {
	/// Exact HTTP status.
	pub status: u16,
	/// Media type the response must declare and parse as, when any.
	pub content_type: Option<&'static str>,
}
impl Expectation {
	/// `200` with a JSON body.
	pub const fn ok_json() -> Self {
		Self { status: 200, content_type: Some(JSON_MEDIA_TYPE) }
	}

	/// A bare status with no body expectation.
	pub const fn status(status: u16) -> Self {
		Self { status, content_type: None }
	}
}

/// Endpoint policy oracle.
///
/// `/api/public` needs nothing, `/api/private` needs any valid token, and `/api/private-scoped`
/// needs a valid token whose scopes include `read:messages`. Missing or invalid credentials yield
/// `401`; a valid token lacking the required scope yields `403`.
pub fn expected_for(endpoint: Endpoint, credential: &Credential) -> Expectation {
	if !endpoint.requires_token() {
		return Expectation::ok_json();
	}

	match credential {
		Credential::Missing | Credential::Invalid => Expectation::status(401),
		Credential::Valid(scopes) => match endpoint.required_scope() {
			Some(scope) if !scopes.contains(scope) => Expectation::status(403),
			_ => Expectation::ok_json(),
		},
	}
}

/// The atomic unit of verification: one request and its expected response.
#[derive(Clone, Debug)]
pub struct Scenario {
	/// Human-readable description, safe to log.
	pub description: String,
	/// Endpoint to probe.
	pub endpoint: Endpoint,
	/// `Authorization` header to send.
	pub authorization: AuthorizationHeader,
	/// Exact expected status.
	pub expected_status: u16,
	/// Media type the response must declare and parse as, when any.
	pub expected_content_type: Option<&'static str>,
}
impl Scenario {
	/// Builds a scenario whose expectation comes from [`expected_for`].
	pub fn new(
		endpoint: Endpoint,
		authorization: AuthorizationHeader,
		credential: &Credential,
	) -> Self {
		Self::with_expectation(endpoint, authorization, expected_for(endpoint, credential))
	}

	/// Builds a scenario with an explicit expectation.
	pub fn with_expectation(
		endpoint: Endpoint,
		authorization: AuthorizationHeader,
		expectation: Expectation,
	) -> Self {
		let description = format!("GET {endpoint} with {}", authorization.describe());

		Self {
			description,
			endpoint,
			authorization,
			expected_status: expectation.status,
			expected_content_type: expectation.content_type,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn scopes(values: &[&str]) -> ScopeSet {
		ScopeSet::new(values.iter().copied()).expect("Scope set should be valid.")
	}

	#[test]
	fn policy_matches_endpoint_requirements() {
		let cases = [
			(Endpoint::Public, Credential::Missing, 200),
			(Endpoint::Private, Credential::Missing, 401),
			(Endpoint::PrivateScoped, Credential::Invalid, 401),
			(Endpoint::Private, Credential::Valid(ScopeSet::empty()), 200),
			(Endpoint::PrivateScoped, Credential::Valid(ScopeSet::empty()), 403),
			(Endpoint::PrivateScoped, Credential::Valid(scopes(&["write:messages"])), 403),
			(Endpoint::PrivateScoped, Credential::Valid(scopes(&["read:messages"])), 200),
			(
				Endpoint::PrivateScoped,
				Credential::Valid(scopes(&["read:messages", "write:messages"])),
				200,
			),
		];

		for (endpoint, credential, status) in cases {
			let expectation = expected_for(endpoint, &credential);

			assert_eq!(expectation.status, status, "{endpoint} with {credential:?}");
			assert_eq!(expectation.content_type.is_some(), status == 200);
		}
	}

	#[test]
	fn headers_render_verbatim() {
		let token = TokenSecret::new("aaa.bbb.ccc");

		assert_eq!(AuthorizationHeader::Absent.render(), None);
		assert_eq!(AuthorizationHeader::literal(" ").render().as_deref(), Some(" "));
		assert_eq!(
			AuthorizationHeader::bearer(&token).render().as_deref(),
			Some("Bearer aaa.bbb.ccc")
		);
		assert_eq!(
			AuthorizationHeader::trailing_garbage(&token).render().as_deref(),
			Some("Bearer aaa.bbb.ccc abc")
		);
	}

	#[test]
	fn tampered_header_extends_signature_with_base64url() {
		let token = TokenSecret::new("aaa.bbb.ccc");
		let header = AuthorizationHeader::tampered(&token);
		let rendered = header.render().expect("Tampered header should render.");
		let suffix = rendered.strip_prefix("Bearer aaa.bbb.ccc").expect("Token should be kept.");

		assert_eq!(suffix.len(), 16);
		assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
	}

	#[test]
	fn descriptions_never_contain_tokens() {
		let token = TokenSecret::new("aaa.bbb.ccc");

		for header in [
			AuthorizationHeader::bearer(&token),
			AuthorizationHeader::tampered(&token),
			AuthorizationHeader::trailing_garbage(&token),
		] {
			let scenario = Scenario::new(Endpoint::Private, header, &Credential::Invalid);

			assert!(!scenario.description.contains("aaa.bbb.ccc"));
			assert!(!format!("{scenario:?}").contains("aaa.bbb.ccc"));
			assert_eq!(scenario.expected_status, 401);
		}

		let scenario =
			Scenario::new(Endpoint::Public, AuthorizationHeader::Absent, &Credential::Missing);

		assert_eq!(scenario.description, "GET /api/public with no Authorization header");
		assert_eq!(scenario.expected_content_type, Some(JSON_MEDIA_TYPE));
	}
}
