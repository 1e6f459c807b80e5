use serde::{Deserialize, Serialize};

use super::Entity;

/// How an attribute relates to other tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
	Scalar,
	/// Single reference (XREF, CATEGORICAL, FILE).
	Xref,
	/// Multi-value reference (MREF, CATEGORICAL_MREF).
	Mref,
	/// Child collection owned by the referencing side (ONE_TO_MANY).
	OneToMany,
}

impl AttributeKind {
	/// Map a MOLGENIS `fieldType` onto an attribute kind.
	pub fn from_field_type(field_type: &str) -> Self {
		match field_type {
			"XREF" | "CATEGORICAL" | "FILE" => AttributeKind::Xref,
			"MREF" | "CATEGORICAL_MREF" => AttributeKind::Mref,
			"ONE_TO_MANY" => AttributeKind::OneToMany,
			_ => AttributeKind::Scalar,
		}
	}

	pub fn is_reference(&self) -> bool {
		!matches!(self, AttributeKind::Scalar)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
	pub name: String,
	pub kind: AttributeKind,
	/// Qualified name of the referenced table, for reference attributes.
	#[serde(default)]
	pub ref_entity: Option<String>,
}

impl Attribute {
	pub fn scalar(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: AttributeKind::Scalar,
			ref_entity: None,
		}
	}

	pub fn reference(
		name: impl Into<String>,
		kind: AttributeKind,
		ref_entity: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			kind,
			ref_entity: Some(ref_entity.into()),
		}
	}

	/// The synchronized entity type this attribute points at, if any.
	pub fn target_entity(&self) -> Option<Entity> {
		self.ref_entity.as_deref().and_then(Entity::from_table_name)
	}
}

/// Attribute metadata of a single table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
	pub name: String,
	pub attributes: Vec<Attribute>,
}

impl EntityMeta {
	pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
		Self {
			name: name.into(),
			attributes,
		}
	}

	/// Names of the one-to-many attributes.
	pub fn one_to_manys(&self) -> Vec<String> {
		self.attributes
			.iter()
			.filter(|a| a.kind == AttributeKind::OneToMany)
			.map(|a| a.name.clone())
			.collect()
	}

	/// All reference attributes: xrefs, mrefs and one-to-manys.
	pub fn references(&self) -> impl Iterator<Item = &Attribute> {
		self.attributes.iter().filter(|a| a.kind.is_reference())
	}
}
