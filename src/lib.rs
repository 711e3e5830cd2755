//! Authorization-conformance harness: provision OAuth fixtures on an identity provider, mint
//! scoped access tokens, and verify how a protected HTTP API enforces bearer tokens and scopes.
//!
//! The crate is organized leaf-first:
//!
//! - [`admin`] talks to the identity provider's management API.
//! - [`fixture`] owns the per-suite OAuth client + resource server and per-context client grants.
//! - [`flows`] exchanges client credentials for access tokens.
//! - [`api`] issues requests to the protected API under test.
//! - [`scenario`] encodes the expected endpoint policy and runs scenario matrices.
//! - [`suite`] wires everything into the standard conformance run.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod admin;
pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod fixture;
pub mod flows;
pub mod http;
pub mod obs;
pub mod scenario;
pub mod suite;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_subscriber as _};
