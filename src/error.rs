//! Harness-level error taxonomy shared by fixtures, token acquisition, and scenario checks.
//!
//! Errors are classified by the phase that raised them rather than by transport cause: a network
//! failure while provisioning is a [`SetupError`], the same failure while minting a token is an
//! [`AcquisitionError`], and while probing the protected API it is an [`AssertionError`].

// self
use crate::{_prelude::*, admin::AdminOperation, auth::ScopeSet, fixture::SuiteState};

/// Harness-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical harness error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem, raised before any network call.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Fixture provisioning or teardown failed.
	#[error(transparent)]
	Setup(#[from] SetupError),
	/// Token issuance failed.
	#[error(transparent)]
	Acquisition(#[from] AcquisitionError),
	/// Observed API behavior did not match the expectation.
	#[error(transparent)]
	Assertion(#[from] AssertionError),
}

/// Configuration failures raised while assembling a [`HarnessConfig`](crate::config::HarnessConfig).
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// One or more required environment variables are absent.
	#[error("Missing required configuration: {}. Set them in the environment before running the suite.", .names.join(", "))]
	MissingVariables {
		/// Every absent variable name.
		names: Vec<&'static str>,
	},
	/// A configured URL cannot be parsed.
	#[error("Configuration value `{name}` is not a valid URL.")]
	InvalidUrl {
		/// Variable or field holding the URL.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured URL cannot carry path segments (e.g. `mailto:`).
	#[error("Configuration value `{name}` cannot be used as a base URL.")]
	CannotBeABase {
		/// Variable or field holding the URL.
		name: &'static str,
	},
	/// A configured identifier failed validation.
	#[error("Configuration value `{name}` is invalid.")]
	InvalidIdentifier {
		/// Variable or field holding the identifier.
		name: &'static str,
		/// Underlying validation failure.
		#[source]
		source: crate::auth::IdentifierError,
	},
	/// A numeric setting cannot be parsed.
	#[error("Configuration value `{name}` must be a positive integer, got `{value}`.")]
	InvalidNumber {
		/// Variable holding the number.
		name: &'static str,
		/// Raw value.
		value: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Fixture provisioning/teardown failures. Fatal for the scope that owns the fixture.
#[derive(Debug, ThisError)]
pub enum SetupError {
	/// Identity provider answered with a non-2xx status.
	#[error("Identity provider rejected {operation} with HTTP {status}: {message}.")]
	Rejected {
		/// Management operation that failed.
		operation: AdminOperation,
		/// HTTP status code.
		status: u16,
		/// Provider-supplied message, or a body preview.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Identity provider could not be reached.
	#[error("Network failure during {operation}.")]
	Network {
		/// Management operation that failed.
		operation: AdminOperation,
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// Identity provider returned a body that does not match the expected shape.
	#[error("Identity provider returned malformed JSON for {operation}.")]
	MalformedResponse {
		/// Management operation that failed.
		operation: AdminOperation,
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// Endpoint URL could not be derived from the configured base URL.
	#[error("Cannot build the endpoint URL for {operation}.")]
	InvalidUrl {
		/// Management operation that failed.
		operation: AdminOperation,
	},
	/// A client grant asked for scopes the resource server does not declare.
	#[error("Grant scopes `{requested}` are not all declared by the resource server `{declared}`.")]
	ScopesOutsideCatalog {
		/// Scopes the grant would have bound.
		requested: ScopeSet,
		/// Scopes declared on the suite resource server.
		declared: ScopeSet,
	},
	/// The fixture session was driven through an illegal state transition.
	#[error("Illegal fixture transition from {from} to {to}.")]
	InvalidTransition {
		/// Current state.
		from: SuiteState,
		/// Requested state.
		to: SuiteState,
	},
}
impl SetupError {
	/// Returns the HTTP status when the provider rejected the call.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Token issuance failures. Fatal for the owning scenario context only.
#[derive(Debug, ThisError)]
pub enum AcquisitionError {
	/// Token endpoint answered with a non-2xx status.
	#[error("Token endpoint rejected the client-credentials exchange with HTTP {status}{}.", describe_oauth_error(.error.as_deref(), .description.as_deref()))]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// OAuth `error` code, when the body carried one.
		error: Option<String>,
		/// OAuth `error_description`, when the body carried one.
		description: Option<String>,
	},
	/// Token endpoint could not be reached.
	#[error("Network failure while calling the token endpoint.")]
	Network(#[source] TransportError),
	/// Token endpoint returned a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse(#[source] JsonPathError),
	/// Token endpoint URL could not be derived from the configured base URL.
	#[error("Cannot build the token endpoint URL.")]
	InvalidUrl,
	/// Issued token carries scopes outside the active client grant.
	#[error("Issued token scopes `{issued}` exceed the active grant `{granted}`.")]
	ScopesExceedGrant {
		/// Scopes bound by the active grant.
		granted: ScopeSet,
		/// Scopes reported by the token endpoint.
		issued: ScopeSet,
	},
	/// Token endpoint returned scopes that cannot be normalized.
	#[error("Token endpoint returned invalid scopes.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
}

/// Per-scenario verification failures. Never abort sibling scenarios.
#[derive(Debug, ThisError)]
pub enum AssertionError {
	/// Status code differs from the expectation.
	#[error("{scenario}: expected HTTP {expected}, got HTTP {actual}.")]
	StatusMismatch {
		/// Scenario description.
		scenario: String,
		/// Expected status code.
		expected: u16,
		/// Observed status code.
		actual: u16,
	},
	/// Content type differs from the expectation.
	#[error("{scenario}: expected content type `{expected}`, got `{}`.", .actual.as_deref().unwrap_or("<none>"))]
	ContentTypeMismatch {
		/// Scenario description.
		scenario: String,
		/// Expected media type.
		expected: String,
		/// Observed `Content-Type` header.
		actual: Option<String>,
	},
	/// Body was declared JSON but failed to parse.
	#[error("{scenario}: response body is not well-formed JSON.")]
	MalformedJson {
		/// Scenario description.
		scenario: String,
		/// Parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// The scenario's header value cannot be sent over HTTP.
	#[error("{scenario}: Authorization header value cannot be encoded.")]
	InvalidHeader {
		/// Scenario description.
		scenario: String,
		/// Encoding failure.
		#[source]
		source: reqwest::header::InvalidHeaderValue,
	},
	/// Endpoint URL could not be derived from the configured base URL.
	#[error("{scenario}: cannot build the request URL.")]
	InvalidUrl {
		/// Scenario description.
		scenario: String,
	},
	/// Protected API could not be reached.
	#[error("{scenario}: network failure while calling the protected API.")]
	Network {
		/// Scenario description.
		scenario: String,
		/// Transport failure.
		#[source]
		source: TransportError,
	},
}

/// Transport-level failures (network, IO). Always wrapped by a phase error.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL, without credentials.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured timeout.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Target URL, without credentials.
		url: String,
	},
}
impl TransportError {
	/// Classifies a reqwest failure for the given target URL.
	pub fn from_reqwest(url: &Url, err: ReqwestError) -> Self {
		if err.is_timeout() {
			return Self::Timeout { url: url.to_string() };
		}

		Self::Network { url: url.to_string(), source: Box::new(err.without_url()) }
	}
}

fn describe_oauth_error(error: Option<&str>, description: Option<&str>) -> String {
	match (error, description) {
		(Some(error), Some(description)) => format!(" ({error}: {description})"),
		(Some(error), None) => format!(" ({error})"),
		(None, Some(description)) => format!(" ({description})"),
		(None, None) => String::new(),
	}
}
