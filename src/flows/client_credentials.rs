//! Client-credentials exchange (`POST /oauth/token`).
//!
//! The request is a JSON body rather than a form, matching what Auth0 documents for
//! machine-to-machine clients. Success and error bodies are still the standard RFC 6749 shapes,
//! so they decode through the `oauth2` crate's basic response types.

// crates.io
use oauth2::{
	TokenResponse,
	basic::{BasicErrorResponse, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	admin::{ClientGrant, OAuthClient},
	auth::{AccessToken, ScopeSet},
	error::{AcquisitionError, TransportError},
	flows::TokenAcquirer,
	http::{self, ObservedResponse},
	obs::{self, Outcome, Phase, PhaseSpan},
};

const GRANT_TYPE: &str = "client_credentials";

#[derive(Serialize)]
struct ClientCredentialsRequest<'a> {
	client_id: &'a str,
	client_secret: &'a str,
	audience: &'a str,
	grant_type: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	scope: Option<String>,
}

impl TokenAcquirer {
	/// Exchanges the client's credentials for an access token.
	///
	/// `scopes` is advisory: the identity provider issues whatever the active grant allows. An
	/// empty set omits the `scope` parameter entirely.
	pub async fn acquire(
		&self,
		client: &OAuthClient,
		scopes: &ScopeSet,
	) -> Result<AccessToken, AcquisitionError> {
		const PHASE: Phase = Phase::Acquisition;

		let span = PhaseSpan::new(PHASE, "client_credentials");

		obs::record_phase_outcome(PHASE, Outcome::Attempt);

		let result = span.instrument(self.exchange(client, scopes)).await;

		obs::record_phase_outcome(PHASE, Outcome::of(&result));

		result
	}

	/// Like [`acquire`](Self::acquire), requesting the grant's scopes and rejecting tokens whose
	/// reported scopes exceed them.
	pub async fn acquire_within(
		&self,
		client: &OAuthClient,
		grant: &ClientGrant,
	) -> Result<AccessToken, AcquisitionError> {
		let token = self.acquire(client, &grant.scope).await?;

		if !token.is_bounded_by(&grant.scope) {
			tracing::warn!(
				grant_id = %grant.id,
				granted = %grant.scope,
				fingerprint = %token.fingerprint(),
				"Token endpoint issued scopes outside the active grant."
			);

			return Err(AcquisitionError::ScopesExceedGrant {
				granted: grant.scope.clone(),
				issued: token.effective_scope(&grant.scope),
			});
		}

		Ok(token)
	}

	async fn exchange(
		&self,
		client: &OAuthClient,
		scopes: &ScopeSet,
	) -> Result<AccessToken, AcquisitionError> {
		let url = http::endpoint(&self.base_url, ["oauth", "token"])
			.ok_or(AcquisitionError::InvalidUrl)?;
		let client_id = client.client_id();
		let body = ClientCredentialsRequest {
			client_id: client_id.as_str(),
			client_secret: client.secret.secret(),
			audience: self.audience.as_ref(),
			grant_type: GRANT_TYPE,
			scope: (!scopes.is_empty()).then(|| scopes.normalized()),
		};
		let response = self
			.http_client
			.post(url.clone())
			.json(&body)
			.send()
			.await
			.map_err(|e| AcquisitionError::Network(TransportError::from_reqwest(&url, e)))?;
		let observed = ObservedResponse::read(response)
			.await
			.map_err(|e| AcquisitionError::Network(TransportError::from_reqwest(&url, e)))?;

		if !observed.is_success() {
			let err = rejection(&observed);

			tracing::warn!(client_id = %client.id, error = %err, "Token request rejected.");

			return Err(err);
		}

		let decoded = observed.decode().map_err(AcquisitionError::MalformedResponse)?;
		let token = into_access_token(decoded)?;

		tracing::debug!(
			client_id = %client.id,
			fingerprint = %token.fingerprint(),
			scope = ?token.scope,
			"Issued access token."
		);

		Ok(token)
	}
}

fn into_access_token(response: BasicTokenResponse) -> Result<AccessToken, AcquisitionError> {
	let mut token = AccessToken::new(response.access_token().secret().to_owned());

	if let Some(scopes) = response.scopes() {
		let reported = scopes.iter().map(|scope| scope.as_str()).filter(|scope| !scope.is_empty());

		token = token.with_scope(ScopeSet::new(reported)?);
	}
	if let Some(lifetime) = response.expires_in().and_then(|value| Duration::try_from(value).ok()) {
		token = token.with_expires_in(lifetime);
	}

	Ok(token)
}

fn rejection(response: &ObservedResponse) -> AcquisitionError {
	match response.decode::<BasicErrorResponse>() {
		Ok(body) => AcquisitionError::Rejected {
			status: response.status,
			error: Some(body.error().as_ref().to_owned()),
			description: body.error_description().cloned(),
		},
		Err(_) => AcquisitionError::Rejected {
			status: response.status,
			error: None,
			description: None,
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn observed(status: u16, body: &str) -> ObservedResponse {
		ObservedResponse {
			status,
			content_type: Some("application/json".into()),
			retry_after: None,
			body: body.as_bytes().to_vec(),
		}
	}

	#[test]
	fn empty_scope_is_omitted_from_request() {
		let body = ClientCredentialsRequest {
			client_id: "abc",
			client_secret: "shh",
			audience: "urn:authz-conformance:api",
			grant_type: GRANT_TYPE,
			scope: None,
		};
		let json = serde_json::to_value(body).expect("Request should serialize.");

		assert_eq!(
			json,
			serde_json::json!({
				"client_id": "abc",
				"client_secret": "shh",
				"audience": "urn:authz-conformance:api",
				"grant_type": "client_credentials",
			})
		);
	}

	#[test]
	fn token_response_maps_scope_and_lifetime() {
		let response = observed(
			200,
			r#"{"access_token":"eyJ.a.b","token_type":"Bearer","expires_in":86400,"scope":"write:messages read:messages"}"#,
		)
		.decode::<BasicTokenResponse>()
		.expect("Token response should decode.");
		let token = into_access_token(response).expect("Token should map.");

		assert_eq!(token.expose(), "eyJ.a.b");
		assert_eq!(token.expires_in, Some(Duration::days(1)));
		assert_eq!(
			token.scope,
			Some(ScopeSet::new(["read:messages", "write:messages"]).expect("Valid scopes."))
		);
	}

	#[test]
	fn blank_reported_scope_is_empty_set() {
		let response = observed(200, r#"{"access_token":"t","token_type":"Bearer","scope":""}"#)
			.decode::<BasicTokenResponse>()
			.expect("Token response should decode.");
		let token = into_access_token(response).expect("Token should map.");

		assert_eq!(token.scope, Some(ScopeSet::empty()));
		assert_eq!(token.expires_in, None);
	}

	#[test]
	fn rejection_reads_oauth_error_body() {
		let err = rejection(&observed(
			403,
			r#"{"error":"access_denied","error_description":"Client is not authorized to access \"urn:authz-conformance:api\"."}"#,
		));

		match err {
			AcquisitionError::Rejected { status, error, description } => {
				assert_eq!(status, 403);
				assert_eq!(error.as_deref(), Some("access_denied"));
				assert!(description.is_some_and(|text| text.starts_with("Client is not authorized")));
			},
			other => panic!("Unexpected error: {other:?}."),
		}

		assert!(matches!(
			rejection(&observed(502, "<html>Bad gateway</html>")),
			AcquisitionError::Rejected { status: 502, error: None, description: None }
		));
	}
}
