#![allow(dead_code)]

// crates.io
use httpmock::{Mock, prelude::*};
use serde_json::{Value, json};
use time::Duration;
// self
use authz_conformance::{
	admin::IdentityAdminClient,
	config::HarnessConfig,
	http::ReqwestHttpClient,
	reqwest::{Client as ReqwestClient, redirect::Policy},
};

pub const AUDIENCE: &str = "urn:authz-conformance:api";
pub const MANAGEMENT_TOKEN: &str = "management-token";
pub const CLIENT_ID: &str = "suite-client";
pub const CLIENT_SECRET: &str = "suite-secret";
pub const RESOURCE_SERVER_PATH: &str = "/api/v2/resource-servers/urn:authz-conformance:api";

pub fn config(identity: &MockServer, api: &MockServer) -> HarnessConfig {
	HarnessConfig::new(&identity.base_url(), AUDIENCE, MANAGEMENT_TOKEN, &api.base_url())
		.expect("Mock configuration should build.")
		.with_request_timeout(Duration::seconds(5))
}

/// Accepts the self-signed certificates `httpmock` serves with; redirects stay disabled.
pub fn http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(Policy::none())
		.timeout(std::time::Duration::from_secs(5))
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn admin(identity: &MockServer) -> IdentityAdminClient {
	let config = config(identity, identity);

	IdentityAdminClient::new(http_client(), config.identity)
}

pub async fn mock_create_client(server: &MockServer) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v2/clients")
				.header("authorization", format!("Bearer {MANAGEMENT_TOKEN}"));
			then.status(201).header("content-type", "application/json").body(
				json!({
					"client_id": CLIENT_ID,
					"client_secret": CLIENT_SECRET,
					"name": "authz-conformance-test",
				})
				.to_string(),
			);
		})
		.await
}

pub async fn mock_create_resource_server(server: &MockServer, token_lifetime: i64) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v2/resource-servers");
			then.status(201).header("content-type", "application/json").body(
				json!({
					"identifier": AUDIENCE,
					"token_lifetime": token_lifetime,
					"scopes": [
						{ "value": "read:messages", "description": "Read messages" },
						{ "value": "write:messages", "description": "Write messages" },
					],
				})
				.to_string(),
			);
		})
		.await
}

pub async fn mock_patch_lifetime(server: &MockServer, token_lifetime: i64) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path(RESOURCE_SERVER_PATH)
				.json_body(json!({ "token_lifetime": token_lifetime }));
			then.status(200).header("content-type", "application/json").body(
				json!({ "identifier": AUDIENCE, "token_lifetime": token_lifetime }).to_string(),
			);
		})
		.await
}

pub async fn mock_delete_client(server: &MockServer, status: u16) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(DELETE).path(format!("/api/v2/clients/{CLIENT_ID}"));
			then.status(status);
		})
		.await
}

pub async fn mock_delete_resource_server(server: &MockServer, status: u16) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(DELETE).path(RESOURCE_SERVER_PATH);
			then.status(status);
		})
		.await
}

/// Answers `POST /api/v2/client-grants` for one exact scope list with grant `id`.
pub async fn mock_create_grant<'a>(
	server: &'a MockServer,
	id: &str,
	scopes: &[&str],
) -> Mock<'a> {
	let scope = Value::from(scopes.to_vec());

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v2/client-grants").json_body(json!({
				"client_id": CLIENT_ID,
				"audience": AUDIENCE,
				"scope": scope.clone(),
			}));
			then.status(201).header("content-type", "application/json").body(
				json!({
					"id": id,
					"client_id": CLIENT_ID,
					"audience": AUDIENCE,
					"scope": scope,
				})
				.to_string(),
			);
		})
		.await
}

pub async fn mock_delete_grant<'a>(server: &'a MockServer, id: &str, status: u16) -> Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(DELETE).path(format!("/api/v2/client-grants/{id}"));
			then.status(status);
		})
		.await
}

/// Answers `POST /oauth/token` with `access_token`, reporting `scope` when given.
pub async fn mock_token<'a>(
	server: &'a MockServer,
	requested_scope: Option<&str>,
	access_token: &str,
	reported_scope: Option<&str>,
) -> Mock<'a> {
	let mut request = json!({
		"client_id": CLIENT_ID,
		"client_secret": CLIENT_SECRET,
		"audience": AUDIENCE,
		"grant_type": "client_credentials",
	});
	let mut response = json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"expires_in": 86400,
	});

	if let Some(scope) = requested_scope {
		request["scope"] = scope.into();
	}
	if let Some(scope) = reported_scope {
		response["scope"] = scope.into();
	}

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").json_body(request);
			then.status(200).header("content-type", "application/json").body(response.to_string());
		})
		.await
}

/// Answers `GET path` for an exact `Authorization` header value.
pub async fn mock_api_with_header<'a>(
	server: &'a MockServer,
	path: &str,
	authorization: &str,
	status: u16,
) -> Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(GET).path(path).header("authorization", authorization);
			respond(then, status);
		})
		.await
}

/// Answers `GET path` for any request, typically registered after the specific mocks.
pub async fn mock_api<'a>(server: &'a MockServer, path: &str, status: u16) -> Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(GET).path(path);
			respond(then, status);
		})
		.await
}

fn respond(then: httpmock::Then, status: u16) {
	if status == 200 {
		then.status(200)
			.header("content-type", "application/json; charset=utf-8")
			.body(json!({ "message": "Hello from the API." }).to_string());
	} else {
		then.status(status).header("content-type", "text/plain").body("Unauthorized");
	}
}
