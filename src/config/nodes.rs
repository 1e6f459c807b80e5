use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::catalogue::is_node_code;

/// A national node as it appears in configuration. Both keys are optional
/// here so that a missing key can be reported as a configuration error
/// instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
	#[serde(default)]
	pub national_node: Option<String>,
	#[serde(default)]
	pub source: Option<String>,
}

impl NodeDescriptor {
	pub fn new(national_node: impl Into<String>, source: impl Into<String>) -> Self {
		Self {
			national_node: Some(national_node.into()),
			source: Some(source.into()),
		}
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
	#[error(
		"national node should have key: 'national_node', which is the prefix of the national node, for example 'NL'"
	)]
	MissingNationalNode,

	#[error(
		"national node '{0}' should have key: 'source', which is the complete url to the source directory"
	)]
	MissingSource(String),

	#[error("national node code '{0}' must be two uppercase letters")]
	InvalidCode(String),

	#[error("source '{url}' of national node '{code}' is not a valid url: {reason}")]
	InvalidSource {
		code: String,
		url: String,
		reason: url::ParseError,
	},
}

/// A validated national node: its code and the API root of its source
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NationalNode {
	pub code: String,
	pub source_url: Url,
}

impl NationalNode {
	pub fn new(code: &str, source: &str) -> Result<Self, NodeError> {
		NodeDescriptor::new(code, source).try_into()
	}
}

impl TryFrom<NodeDescriptor> for NationalNode {
	type Error = NodeError;

	fn try_from(descriptor: NodeDescriptor) -> Result<Self, Self::Error> {
		let code = descriptor
			.national_node
			.filter(|c| !c.is_empty())
			.ok_or(NodeError::MissingNationalNode)?;
		let source = descriptor
			.source
			.filter(|s| !s.is_empty())
			.ok_or_else(|| NodeError::MissingSource(code.clone()))?;

		if !is_node_code(&code) {
			return Err(NodeError::InvalidCode(code));
		}

		let source_url = Url::parse(&source).map_err(|reason| NodeError::InvalidSource {
			code: code.clone(),
			url: source.clone(),
			reason,
		})?;

		Ok(Self { code, source_url })
	}
}

/// Parse the compact `CODE=url;CODE=url` form used by the
/// `ERIC_SYNC_NATIONAL_NODES` environment variable. An entry without `=`
/// keeps its code and loses its source, which validation then rejects.
pub fn parse_node_list(value: &str) -> Vec<NodeDescriptor> {
	value
		.split(';')
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.map(|entry| match entry.split_once('=') {
			Some((code, source)) => NodeDescriptor::new(code.trim(), source.trim()),
			None => NodeDescriptor {
				national_node: Some(entry.to_string()),
				source: None,
			},
		})
		.collect()
}
