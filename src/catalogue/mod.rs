//! Catalogue schema knowledge shared by the synchronizer: the entity types
//! that are replicated, how their tables are named and what attribute
//! metadata looks like.

pub mod meta;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use meta::{Attribute, AttributeKind, EntityMeta};

/// Package prefix of every directory table.
pub const PACKAGE: &str = "eu_bbmri_eric_";

/// A single catalogue row as returned by (and sent to) the data API.
pub type Record = Map<String, Value>;

/// Entity types that are synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
	Persons,
	Networks,
	Biobanks,
	Collections,
}

impl Entity {
	/// Import order: referenced entities come before the entities that
	/// reference them. Deletion walks this list backwards.
	pub const IMPORT_ORDER: [Entity; 4] = [
		Entity::Persons,
		Entity::Networks,
		Entity::Biobanks,
		Entity::Collections,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Entity::Persons => "persons",
			Entity::Networks => "networks",
			Entity::Biobanks => "biobanks",
			Entity::Collections => "collections",
		}
	}

	/// Entity types in deletion order.
	pub fn deletion_order() -> impl Iterator<Item = Entity> {
		Self::IMPORT_ORDER.into_iter().rev()
	}

	/// Fully qualified table name, either the combined table or the
	/// node-scoped copy when a node code is given.
	pub fn table_name(&self, node_code: Option<&str>) -> String {
		match node_code {
			Some(code) => format!("{PACKAGE}{code}_{}", self.as_str()),
			None => format!("{PACKAGE}{}", self.as_str()),
		}
	}

	/// Recover the entity type from a qualified table name such as
	/// `eu_bbmri_eric_NL_persons` or `eu_bbmri_eric_collections`. Lookup
	/// tables and foreign packages yield `None`.
	pub fn from_table_name(name: &str) -> Option<Entity> {
		let local = name.strip_prefix(PACKAGE)?;
		let local = match local.split_once('_') {
			Some((code, rest)) if is_node_code(code) => rest,
			_ => local,
		};
		Self::IMPORT_ORDER
			.into_iter()
			.find(|entity| entity.as_str() == local)
	}
}

impl fmt::Display for Entity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// National node codes are two uppercase ASCII letters (`NL`, `DE`, `EU`).
pub fn is_node_code(code: &str) -> bool {
	code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// The `id` of a record, when it is a string.
pub fn record_id(record: &Record) -> Option<&str> {
	record.get("id").and_then(Value::as_str)
}

/// Collect the ids of all rows, skipping rows without a string id.
pub fn all_ids(rows: &[Record]) -> Vec<String> {
	rows.iter()
		.filter_map(record_id)
		.map(str::to_string)
		.collect()
}
