//! Id and reference rules a node-scoped record must satisfy before it is
//! promoted into a combined table.

use std::collections::HashMap;

use log::trace;
use regex::Regex;
use serde_json::Value;

use crate::catalogue::{Attribute, Entity, Record};
use crate::sync::transform::reference_ids;

/// Node whose records may be referenced from every national node.
pub const SHARED_NODE: &str = "EU";

/// Id namespace of an entity type.
fn id_type(entity: Entity) -> &'static str {
	match entity {
		Entity::Persons => "contactID",
		Entity::Networks => "networkID",
		Entity::Biobanks | Entity::Collections => "ID",
	}
}

fn id_pattern(entity: Entity, code: &str) -> Result<Regex, regex::Error> {
	Regex::new(&format!(
		r"^bbmri-eric:{}:{}_[A-Za-z0-9_\-:@.]+$",
		id_type(entity),
		regex::escape(code)
	))
}

/// Compiled id patterns for one national node and the shared node.
#[derive(Debug, Clone)]
pub struct IdValidator {
	code: String,
	own: HashMap<Entity, Regex>,
	shared: HashMap<Entity, Regex>,
}

impl IdValidator {
	pub fn new(code: &str) -> Result<Self, regex::Error> {
		let mut own = HashMap::new();
		let mut shared = HashMap::new();
		for entity in Entity::IMPORT_ORDER {
			own.insert(entity, id_pattern(entity, code)?);
			shared.insert(entity, id_pattern(entity, SHARED_NODE)?);
		}
		Ok(Self {
			code: code.to_string(),
			own,
			shared,
		})
	}

	pub fn code(&self) -> &str {
		&self.code
	}

	/// Whether `id` is a well-formed id of `entity` owned by this node.
	pub fn is_valid_id(&self, entity: Entity, id: &str) -> bool {
		self.own.get(&entity).is_some_and(|re| re.is_match(id))
	}

	/// Whether a referenced id is acceptable: owned by this node or by the
	/// shared node.
	pub fn is_valid_reference(&self, entity: Entity, id: &str) -> bool {
		self.is_valid_id(entity, id) || self.shared.get(&entity).is_some_and(|re| re.is_match(id))
	}

	/// Check every reference of `entry` against the reference attributes of
	/// its table. References into tables that are not synchronized (lookup
	/// lists) are not checked.
	pub fn has_valid_references(&self, entry: &Record, references: &[Attribute]) -> bool {
		references.iter().all(|attr| {
			let Some(target) = attr.target_entity() else {
				return true;
			};
			let Some(value) = entry.get(&attr.name) else {
				return true;
			};
			let ok = reference_ids(value)
				.iter()
				.all(|id| self.is_valid_reference(target, id));
			if !ok {
				trace!(
					"{} has an invalid reference in {}",
					entry.get("id").and_then(Value::as_str).unwrap_or("<no id>"),
					attr.name
				);
			}
			ok
		})
	}
}

/// One-shot check of a single id, compiling the pattern on the fly.
pub fn validate_bbmri_id(entity: Entity, code: &str, id: &str) -> bool {
	id_pattern(entity, code).is_ok_and(|re| re.is_match(id))
}
