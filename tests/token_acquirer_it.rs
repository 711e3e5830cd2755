mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
// self
use authz_conformance::{
	admin::{ClientGrant, OAuthClient},
	auth::{Audience, ClientGrantId, OAuthClientId, ScopeSet},
	error::AcquisitionError,
	flows::TokenAcquirer,
};
use common::*;

fn acquirer(server: &MockServer) -> TokenAcquirer {
	TokenAcquirer::new(http_client(), &config(server, server).identity)
}

fn client() -> OAuthClient {
	let id = OAuthClientId::new(CLIENT_ID).expect("Client id should be valid.");

	OAuthClient::new(id, CLIENT_SECRET)
}

fn grant(scopes: &[&str]) -> ClientGrant {
	ClientGrant {
		id: ClientGrantId::new("cgr_1").expect("Grant id should be valid."),
		client_id: OAuthClientId::new(CLIENT_ID).expect("Client id should be valid."),
		audience: Audience::new(AUDIENCE).expect("Audience should be valid."),
		scope: ScopeSet::new(scopes.iter().copied()).expect("Scope set should be valid."),
	}
}

#[tokio::test]
async fn empty_scope_request_omits_scope_parameter() {
	let server = MockServer::start_async().await;
	let mock = mock_token(&server, None, "aaa.bbb.ccc", None).await;
	let token = acquirer(&server)
		.acquire(&client(), &ScopeSet::empty())
		.await
		.expect("Token request should succeed.");

	mock.assert_async().await;

	assert_eq!(token.expose(), "aaa.bbb.ccc");
	assert_eq!(token.scope, None);
	assert_eq!(token.expires_in, Some(Duration::days(1)));
}

#[tokio::test]
async fn scoped_request_reports_issued_scopes() {
	let server = MockServer::start_async().await;
	let mock = mock_token(
		&server,
		Some("read:messages write:messages"),
		"rw.token.sig",
		Some("write:messages read:messages"),
	)
	.await;
	let token = acquirer(&server)
		.acquire_within(&client(), &grant(&["write:messages", "read:messages"]))
		.await
		.expect("Token request should succeed.");

	mock.assert_async().await;

	let expected =
		ScopeSet::new(["read:messages", "write:messages"]).expect("Scope set should be valid.");

	assert_eq!(token.scope, Some(expected));
}

#[tokio::test]
async fn tokens_exceeding_the_grant_are_refused() {
	let server = MockServer::start_async().await;

	mock_token(
		&server,
		Some("read:messages"),
		"wide.token.sig",
		Some("read:messages write:messages"),
	)
	.await;

	let err = acquirer(&server)
		.acquire_within(&client(), &grant(&["read:messages"]))
		.await
		.expect_err("Widened scopes must be refused.");

	assert!(matches!(err, AcquisitionError::ScopesExceedGrant { .. }));
}

#[tokio::test]
async fn oauth_error_body_is_decoded() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(403).header("content-type", "application/json").body(
				json!({
					"error": "access_denied",
					"error_description": "Client has not been granted scopes: read:messages",
				})
				.to_string(),
			);
		})
		.await;

	let scopes = ScopeSet::new(["read:messages"]).expect("Scope set should be valid.");
	let err = acquirer(&server)
		.acquire(&client(), &scopes)
		.await
		.expect_err("A 403 must fail.");

	match err {
		AcquisitionError::Rejected { status, error, description } => {
			assert_eq!(status, 403);
			assert_eq!(error.as_deref(), Some("access_denied"));
			assert_eq!(
				description.as_deref(),
				Some("Client has not been granted scopes: read:messages")
			);
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn non_oauth_error_body_still_reports_status() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(502).header("content-type", "text/html").body("<h1>Bad gateway</h1>");
		})
		.await;

	let err = acquirer(&server)
		.acquire(&client(), &ScopeSet::empty())
		.await
		.expect_err("A 502 must fail.");

	assert!(matches!(err, AcquisitionError::Rejected { status: 502, error: None, .. }));
}

#[tokio::test]
async fn token_response_without_access_token_is_malformed() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!({ "token_type": "Bearer" }).to_string());
		})
		.await;

	let err = acquirer(&server)
		.acquire(&client(), &ScopeSet::empty())
		.await
		.expect_err("A body without access_token must fail.");

	assert!(matches!(err, AcquisitionError::MalformedResponse(_)));
}
