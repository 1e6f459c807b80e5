use thiserror::Error;

use crate::config::NodeError;
use crate::session::SessionError;

/// Errors raised by the synchronizer. Configuration problems are reported
/// before any request is made; session errors abort the run where they occur.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("invalid national node: {0}")]
	Node(#[from] NodeError),

	#[error("no national nodes found to update")]
	NoNationalNodes,

	#[error("national node '{0}' is not configured")]
	UnknownNode(String),

	#[error(transparent)]
	Session(#[from] SessionError),

	#[error("invalid id pattern: {0}")]
	Pattern(#[from] regex::Error),

	#[error("metrics registration failed: {0}")]
	Metrics(#[from] prometheus::Error),
}
