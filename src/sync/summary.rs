use serde::Serialize;

use crate::catalogue::Entity;

/// Which copy a synchronization run wrote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
	/// Node-scoped tables on the target.
	Own,
	/// Combined ERIC tables on the target.
	Combined,
}

impl Flow {
	pub fn as_str(&self) -> &'static str {
		match self {
			Flow::Own => "own",
			Flow::Combined => "combined",
		}
	}
}

/// Outcome for one entity type. Rejected rows are only counted, never
/// listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
	pub entity: Entity,
	pub table: String,
	pub fetched: usize,
	pub uploaded: usize,
	pub invalid_id: usize,
	pub already_present: usize,
	pub invalid_reference: usize,
}

impl EntitySummary {
	pub fn new(entity: Entity, table: impl Into<String>) -> Self {
		Self {
			entity,
			table: table.into(),
			fetched: 0,
			uploaded: 0,
			invalid_id: 0,
			already_present: 0,
			invalid_reference: 0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
	pub node: String,
	pub flow: Flow,
	pub entities: Vec<EntitySummary>,
}

impl SyncSummary {
	pub fn new(node: impl Into<String>, flow: Flow) -> Self {
		Self {
			node: node.into(),
			flow,
			entities: Vec::new(),
		}
	}

	pub fn entity(&self, entity: Entity) -> Option<&EntitySummary> {
		self.entities.iter().find(|s| s.entity == entity)
	}

	pub fn total_uploaded(&self) -> usize {
		self.entities.iter().map(|s| s.uploaded).sum()
	}

	pub fn total_rejected(&self) -> usize {
		self.entities
			.iter()
			.map(|s| s.invalid_id + s.invalid_reference)
			.sum()
	}
}

/// Ids removed from one node-scoped table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgedEntity {
	pub entity: Entity,
	pub table: String,
	pub ids: Vec<String>,
}
