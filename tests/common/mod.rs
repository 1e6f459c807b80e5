//! Common test utilities: an in-memory directory standing in for the
//! MOLGENIS API, and fixtures shaped like directory rows.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use bbmri_eric_sync::catalogue::{Attribute, AttributeKind, Entity, EntityMeta, Record, record_id};
use bbmri_eric_sync::session::{DataSession, SessionError, SessionProvider};

/// A call made against a [`MemorySession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	GetRows(String),
	GetMeta(String),
	Add(String, usize),
	Delete(String, Vec<String>),
	Login(String),
}

#[derive(Default)]
struct State {
	tables: HashMap<String, Vec<Record>>,
	meta: HashMap<String, EntityMeta>,
	calls: Vec<Call>,
}

/// In-memory directory. Tables without explicit metadata get the
/// directory schema from [`directory_meta`].
#[derive(Clone, Default)]
pub struct MemorySession {
	state: Arc<Mutex<State>>,
}

impl MemorySession {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
		self.insert(table, rows.into_iter().map(to_record).collect());
		self
	}

	pub fn insert(&self, table: &str, rows: Vec<Record>) {
		let mut state = self.state.lock().unwrap();
		state.tables.entry(table.to_string()).or_default().extend(rows);
	}

	pub fn rows(&self, table: &str) -> Vec<Record> {
		let state = self.state.lock().unwrap();
		state.tables.get(table).cloned().unwrap_or_default()
	}

	pub fn ids(&self, table: &str) -> Vec<String> {
		self.rows(table)
			.iter()
			.filter_map(|r| record_id(r).map(str::to_string))
			.collect()
	}

	pub fn calls(&self) -> Vec<Call> {
		self.state.lock().unwrap().calls.clone()
	}

	/// Tables deleted from, in call order.
	pub fn deleted_tables(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				Call::Delete(table, _) => Some(table),
				_ => None,
			})
			.collect()
	}

	/// Tables added to, in call order.
	pub fn added_tables(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				Call::Add(table, _) => Some(table),
				_ => None,
			})
			.collect()
	}

	pub fn has_network_calls(&self) -> bool {
		!self.calls().is_empty()
	}
}

#[async_trait]
impl DataSession for MemorySession {
	async fn login(&self, username: &str, _password: &str) -> Result<(), SessionError> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(Call::Login(username.to_string()));
		Ok(())
	}

	async fn get_all_rows(&self, entity: &str) -> Result<Vec<Record>, SessionError> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(Call::GetRows(entity.to_string()));
		Ok(state.tables.get(entity).cloned().unwrap_or_default())
	}

	async fn get_entity_meta(&self, entity: &str) -> Result<EntityMeta, SessionError> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(Call::GetMeta(entity.to_string()));
		Ok(state
			.meta
			.get(entity)
			.cloned()
			.unwrap_or_else(|| directory_meta(entity)))
	}

	async fn add_all(&self, entity: &str, rows: &[Record]) -> Result<usize, SessionError> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(Call::Add(entity.to_string(), rows.len()));
		state
			.tables
			.entry(entity.to_string())
			.or_default()
			.extend(rows.iter().cloned());
		Ok(rows.len())
	}

	async fn delete_rows(&self, entity: &str, ids: &[String]) -> Result<(), SessionError> {
		let mut state = self.state.lock().unwrap();
		state
			.calls
			.push(Call::Delete(entity.to_string(), ids.to_vec()));
		if let Some(rows) = state.tables.get_mut(entity) {
			rows.retain(|r| !record_id(r).is_some_and(|id| ids.iter().any(|d| d == id)));
		}
		Ok(())
	}
}

/// Hands out in-memory sessions by source URL.
#[derive(Clone, Default)]
pub struct MemoryProvider {
	sources: Arc<Mutex<HashMap<String, MemorySession>>>,
}

impl MemoryProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_source(self, url: &str, session: MemorySession) -> Self {
		let key = Url::parse(url).unwrap().to_string();
		self.sources.lock().unwrap().insert(key, session);
		self
	}
}

impl SessionProvider for MemoryProvider {
	fn open(&self, source: &Url) -> Result<Arc<dyn DataSession>, SessionError> {
		let session = self
			.sources
			.lock()
			.unwrap()
			.entry(source.to_string())
			.or_default()
			.clone();
		Ok(Arc::new(session))
	}
}

pub fn to_record(value: Value) -> Record {
	value.as_object().cloned().expect("fixture rows are objects")
}

/// Table prefix (`eu_bbmri_eric_` or `eu_bbmri_eric_NL_`) of a qualified name.
fn table_prefix(table: &str) -> String {
	Entity::IMPORT_ORDER
		.iter()
		.find_map(|e| table.strip_suffix(e.as_str()))
		.unwrap_or("eu_bbmri_eric_")
		.to_string()
}

/// Directory schema for the four synchronized tables. References point to
/// tables with the same prefix, as they do on real directories.
pub fn directory_meta(table: &str) -> EntityMeta {
	let p = table_prefix(table);
	let r = |name: &str, kind: AttributeKind, entity: &str| {
		Attribute::reference(name, kind, format!("{p}{entity}"))
	};
	let attributes = match Entity::from_table_name(table) {
		Some(Entity::Persons) => vec![
			Attribute::scalar("id"),
			Attribute::scalar("first_name"),
			Attribute::scalar("last_name"),
			Attribute::reference("country", AttributeKind::Xref, "eu_bbmri_eric_countries"),
		],
		Some(Entity::Networks) => vec![
			Attribute::scalar("id"),
			Attribute::scalar("name"),
			r("contact", AttributeKind::Xref, "persons"),
			r("parent_network", AttributeKind::Mref, "networks"),
		],
		Some(Entity::Biobanks) => vec![
			Attribute::scalar("id"),
			Attribute::scalar("name"),
			r("contact", AttributeKind::Xref, "persons"),
			r("network", AttributeKind::Mref, "networks"),
			r("collections", AttributeKind::OneToMany, "collections"),
		],
		Some(Entity::Collections) => vec![
			Attribute::scalar("id"),
			Attribute::scalar("name"),
			r("biobank", AttributeKind::Xref, "biobanks"),
			r("contact", AttributeKind::Xref, "persons"),
			r("network", AttributeKind::Mref, "networks"),
			r("parent_collection", AttributeKind::Xref, "collections"),
			r("sub_collections", AttributeKind::OneToMany, "collections"),
		],
		None => vec![Attribute::scalar("id")],
	};
	EntityMeta::new(table, attributes)
}

pub fn person(id: &str) -> Value {
	json!({
		"_href": format!("/api/v2/eu_bbmri_eric_persons/{id}"),
		"id": id,
		"first_name": "Jan",
		"last_name": "Jansen",
		"country": {"_href": "/api/v2/eu_bbmri_eric_countries/NL", "id": "NL"}
	})
}

pub fn network(id: &str, contact: &str) -> Value {
	json!({
		"id": id,
		"name": "Network",
		"contact": {"id": contact},
		"parent_network": []
	})
}

pub fn biobank(id: &str, contact: &str, networks: &[&str], collections: &[&str]) -> Value {
	json!({
		"id": id,
		"name": "Biobank",
		"contact": {"id": contact},
		"network": networks.iter().map(|n| json!({"id": n})).collect::<Vec<_>>(),
		"collections": collections.iter().map(|c| json!({"id": c})).collect::<Vec<_>>()
	})
}

pub fn collection(id: &str, biobank: &str, contact: &str) -> Value {
	json!({
		"id": id,
		"name": "Collection",
		"biobank": {"id": biobank},
		"contact": {"id": contact},
		"network": [],
		"sub_collections": []
	})
}

pub const NL_SOURCE: &str = "https://catalogue.bbmri.nl/api/";
pub const DE_SOURCE: &str = "https://directory.bbmri.de/api/";

/// A small but complete national node directory for `code`.
pub fn node_directory(code: &str) -> MemorySession {
	let person_id = format!("bbmri-eric:contactID:{code}_p1");
	let network_id = format!("bbmri-eric:networkID:{code}_n1");
	let biobank_id = format!("bbmri-eric:ID:{code}_b1");
	let collection_id = format!("bbmri-eric:ID:{code}_b1:collection:c1");

	MemorySession::new()
		.with_rows("eu_bbmri_eric_persons", vec![person(&person_id)])
		.with_rows("eu_bbmri_eric_networks", vec![network(&network_id, &person_id)])
		.with_rows(
			"eu_bbmri_eric_biobanks",
			vec![biobank(&biobank_id, &person_id, &[&network_id], &[&collection_id])],
		)
		.with_rows(
			"eu_bbmri_eric_collections",
			vec![collection(&collection_id, &biobank_id, &person_id)],
		)
}
