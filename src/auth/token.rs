//! Access tokens minted for scenario contexts and the redacting secret wrapper they travel in.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeSet};

const FINGERPRINT_LEN: usize = 12;

/// Redacted secret wrapper keeping bearer tokens and management credentials out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Short, stable digest of the secret that is safe to log.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());
		let mut encoded = STANDARD_NO_PAD.encode(digest);

		encoded.truncate(FINGERPRINT_LEN);

		encoded
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Opaque bearer credential returned by the token endpoint.
///
/// The harness never validates the token itself; whether the protected API accepts it is exactly
/// what scenarios check. The only local check is that reported scopes stay within the active
/// client grant (see [`AccessToken::is_bounded_by`]).
#[derive(Clone)]
pub struct AccessToken {
	/// Raw token value.
	pub secret: TokenSecret,
	/// Scopes reported by the token endpoint, when it reported any.
	pub scope: Option<ScopeSet>,
	/// Instant the harness received the token.
	pub issued_at: OffsetDateTime,
	/// Lifetime reported by the token endpoint.
	pub expires_in: Option<Duration>,
}
impl AccessToken {
	/// Wraps a raw token value issued now.
	pub fn new(raw: impl Into<String>) -> Self {
		Self {
			secret: TokenSecret::new(raw),
			scope: None,
			issued_at: OffsetDateTime::now_utc(),
			expires_in: None,
		}
	}

	/// Records the scopes reported by the token endpoint.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Records the lifetime reported by the token endpoint.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_in = Some(expires_in);

		self
	}

	/// Returns the raw token value.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}

	/// Log-safe digest of the token.
	pub fn fingerprint(&self) -> String {
		self.secret.fingerprint()
	}

	/// Scopes the token should carry: the reported ones, or the grant's when none were reported.
	pub fn effective_scope(&self, granted: &ScopeSet) -> ScopeSet {
		self.scope.clone().unwrap_or_else(|| granted.clone())
	}

	/// Returns true unless the token endpoint reported scopes outside `granted`.
	pub fn is_bounded_by(&self, granted: &ScopeSet) -> bool {
		self.scope.as_ref().is_none_or(|scope| scope.is_subset_of(granted))
	}

	/// Expiry instant, when the token endpoint reported a lifetime.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_in.map(|lifetime| self.issued_at + lifetime)
	}

	/// Returns true once the reported lifetime has elapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at().is_some_and(|expiry| instant >= expiry)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("fingerprint", &self.fingerprint())
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "super-secret");
	}

	#[test]
	fn fingerprint_is_short_stable_and_distinct() {
		let token = AccessToken::new("eyJhbGciOi.payload.signature");

		assert_eq!(token.fingerprint().len(), FINGERPRINT_LEN);
		assert_eq!(token.fingerprint(), AccessToken::new("eyJhbGciOi.payload.signature").fingerprint());
		assert_ne!(token.fingerprint(), AccessToken::new("other").fingerprint());
		assert!(!format!("{token:?}").contains("payload"));
	}

	#[test]
	fn scope_bounds_follow_reported_scopes() {
		let granted = ScopeSet::new(["read:messages"]).expect("Scope set should be valid.");
		let unreported = AccessToken::new("t");

		assert!(unreported.is_bounded_by(&granted));
		assert_eq!(unreported.effective_scope(&granted), granted);

		let narrowed = AccessToken::new("t").with_scope(ScopeSet::empty());

		assert!(narrowed.is_bounded_by(&granted));
		assert!(narrowed.effective_scope(&granted).is_empty());

		let widened = AccessToken::new("t").with_scope(
			ScopeSet::new(["read:messages", "write:messages"]).expect("Scope set should be valid."),
		);

		assert!(!widened.is_bounded_by(&granted));
	}

	#[test]
	fn expiry_uses_reported_lifetime() {
		let token = AccessToken::new("t").with_expires_in(Duration::SECOND);
		let issued_at = token.issued_at;

		assert_eq!(token.expires_at(), Some(issued_at + Duration::SECOND));
		assert!(!token.is_expired_at(issued_at));
		assert!(token.is_expired_at(issued_at + Duration::SECOND));
		assert!(!AccessToken::new("t").is_expired_at(OffsetDateTime::now_utc()));
	}
}
