//! Data sessions: the CRUD surface of a directory instance.
//!
//! The synchronizer only talks to [`DataSession`], so tests can substitute
//! an in-memory implementation. [`MolgenisSession`] is the HTTP
//! implementation used against real directories.

pub mod molgenis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::catalogue::{EntityMeta, Record};

pub use molgenis::{MolgenisSession, MolgenisSessionProvider};

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("{method} {url} returned {status}: {body}")]
	Status {
		method: String,
		url: String,
		status: StatusCode,
		body: String,
	},

	#[error("invalid url: {0}")]
	Url(#[from] url::ParseError),

	#[error("unexpected response for {entity}: {message}")]
	Decode { entity: String, message: String },

	#[error("login response did not contain a token")]
	MissingToken,
}

/// HTTP client tuning shared by every session the synchronizer opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
	pub page_size: u32,
	pub batch_size: usize,
	pub timeout: Duration,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			page_size: 10_000,
			batch_size: 1_000,
			timeout: Duration::from_secs(300),
		}
	}
}

/// Entity CRUD against a single directory instance.
#[async_trait]
pub trait DataSession: Send + Sync {
	/// Authenticate; later requests carry the session token.
	async fn login(&self, username: &str, password: &str) -> Result<(), SessionError>;

	/// Every row of `entity`, following pagination to the end.
	async fn get_all_rows(&self, entity: &str) -> Result<Vec<Record>, SessionError>;

	/// Attribute metadata of `entity`.
	async fn get_entity_meta(&self, entity: &str) -> Result<EntityMeta, SessionError>;

	/// Insert `rows` into `entity`; returns the number of rows written.
	async fn add_all(&self, entity: &str, rows: &[Record]) -> Result<usize, SessionError>;

	/// Delete the rows of `entity` with the given ids.
	async fn delete_rows(&self, entity: &str, ids: &[String]) -> Result<(), SessionError>;
}

/// Opens sessions on national node source directories.
pub trait SessionProvider: Send + Sync {
	fn open(&self, source: &Url) -> Result<Arc<dyn DataSession>, SessionError>;
}
