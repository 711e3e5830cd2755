//! Shared HTTP plumbing for the management API, the token endpoint, and the protected API.
//!
//! Every outbound call goes through [`ReqwestHttpClient`] and comes back as an
//! [`ObservedResponse`]: status, `Content-Type`, `Retry-After`, and the raw body, captured before
//! any interpretation so each phase can classify failures its own way.

// std
use std::ops::Deref;
// crates.io
use reqwest::{
	Response,
	header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The harness never follows redirects: a protected API that answers `302` to an unauthenticated
/// request must be reported as such, not silently resolved to a login page.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with redirects disabled and the given per-request timeout.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let timeout = std::time::Duration::try_from(timeout).unwrap_or_default();
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.timeout(timeout)
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}

/// Everything the harness inspects about an HTTP response.
#[derive(Clone, Debug)]
pub struct ObservedResponse {
	/// HTTP status code.
	pub status: u16,
	/// `Content-Type` header, when present and valid UTF-8.
	pub content_type: Option<String>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ObservedResponse {
	/// Drains a reqwest response into an owned observation.
	pub async fn read(response: Response) -> Result<Self, ReqwestError> {
		let status = response.status().as_u16();
		let headers = response.headers().to_owned();
		let body = response.bytes().await?.to_vec();

		Ok(Self {
			status,
			content_type: header_str(&headers, CONTENT_TYPE.as_str()),
			retry_after: parse_retry_after(&headers),
			body,
		})
	}

	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns true when the `Content-Type` media type equals `media_type` (parameters ignored).
	pub fn has_media_type(&self, media_type: &str) -> bool {
		self.content_type.as_deref().is_some_and(|value| {
			let essence = value.split(';').next().unwrap_or_default();

			essence.trim().eq_ignore_ascii_case(media_type)
		})
	}

	/// Decodes the body as `T`, reporting the JSON path of any mismatch.
	pub fn decode<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
	}

	/// Lossy UTF-8 preview of the body for error messages.
	pub fn body_preview(&self) -> String {
		let text = String::from_utf8_lossy(&self.body);
		let trimmed = text.trim();

		if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
			return trimmed.to_owned();
		}

		let mut preview = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

		preview.push('…');

		preview
	}
}

/// Appends path segments to `base`, percent-encoding each segment individually.
///
/// Returns `None` when `base` cannot carry a path.
pub fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Option<Url> {
	let mut url = base.clone();

	url.set_query(None);
	url.set_fragment(None);
	url.path_segments_mut().ok()?.pop_if_empty().extend(segments);

	Some(url)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
	headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
