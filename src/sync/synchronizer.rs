use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info};

use crate::catalogue::{self, Attribute, Entity, Record};
use crate::config::{NationalNode, NodeDescriptor};
use crate::error::SyncError;
use crate::observability::MetricsRegistry;
use crate::session::{DataSession, SessionProvider};
use crate::sync::summary::{EntitySummary, Flow, PurgedEntity, SyncSummary};
use crate::sync::transform::to_upload_format;
use crate::sync::validation::IdValidator;

/// Replicates national node directories into a target directory.
///
/// Every operation is sequential: one table at a time, one request at a
/// time. Request failures abort the operation; rows that fail id or
/// reference validation are left out of the combined tables and counted.
pub struct Synchronizer {
	target: Arc<dyn DataSession>,
	target_name: String,
	sources: Arc<dyn SessionProvider>,
	national_nodes: Vec<NationalNode>,
	combined_cache: HashMap<Entity, Vec<Record>>,
	metrics: Arc<MetricsRegistry>,
}

impl Synchronizer {
	/// Validates every descriptor before anything else happens; a missing
	/// `national_node` or `source` key fails here.
	pub fn new(
		target: Arc<dyn DataSession>,
		sources: Arc<dyn SessionProvider>,
		national_nodes: Vec<NodeDescriptor>,
	) -> Result<Self, SyncError> {
		let national_nodes = national_nodes
			.into_iter()
			.map(NationalNode::try_from)
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			target,
			target_name: "target".to_string(),
			sources,
			national_nodes,
			combined_cache: HashMap::new(),
			metrics: Arc::new(MetricsRegistry::try_new()?),
		})
	}

	/// Name used for the target in log lines (usually its URL).
	pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
		self.target_name = name.into();
		self
	}

	pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
		self.metrics = metrics;
		self
	}

	pub fn metrics(&self) -> Arc<MetricsRegistry> {
		Arc::clone(&self.metrics)
	}

	pub fn national_nodes(&self) -> &[NationalNode] {
		&self.national_nodes
	}

	pub fn national_node_codes(&self) -> Vec<&str> {
		self.national_nodes.iter().map(|n| n.code.as_str()).collect()
	}

	/// Look up a configured node by its code.
	pub fn node(&self, code: &str) -> Result<&NationalNode, SyncError> {
		self.national_nodes
			.iter()
			.find(|n| n.code == code)
			.ok_or_else(|| SyncError::UnknownNode(code.to_string()))
	}

	fn register(&mut self, node: &NationalNode) {
		if !self.national_nodes.contains(node) {
			self.national_nodes.push(node.clone());
		}
	}

	fn require_nodes(&self) -> Result<Vec<NationalNode>, SyncError> {
		if self.national_nodes.is_empty() {
			return Err(SyncError::NoNationalNodes);
		}
		Ok(self.national_nodes.clone())
	}

	/// Copy the node's canonical tables verbatim into its node-scoped tables
	/// on the target.
	pub async fn sync_own_entities(&mut self, node: &NationalNode) -> Result<SyncSummary, SyncError> {
		self.register(node);
		let _timer = self
			.metrics
			.flow_duration_seconds
			.with_label_values(&[Flow::Own.as_str()])
			.start_timer();

		let source = self.sources.open(&node.source_url)?;
		let mut summary = SyncSummary::new(&node.code, Flow::Own);

		for entity in Entity::IMPORT_ORDER {
			let target_table = entity.table_name(Some(&node.code));
			let source_table = entity.table_name(None);
			let mut entity_summary = EntitySummary::new(entity, &target_table);

			let rows = source.get_all_rows(&source_table).await?;
			let one_to_manys = source.get_entity_meta(&source_table).await?.one_to_manys();
			entity_summary.fetched = rows.len();
			self.metrics
				.records_fetched_total
				.with_label_values(&[source_table.as_str()])
				.inc_by(rows.len() as u64);

			if !rows.is_empty() {
				info!("Importing data to {}", target_table);
				let prepped = to_upload_format(&rows, &one_to_manys);
				entity_summary.uploaded = self.upload(&target_table, &prepped).await?;
			}

			summary.entities.push(entity_summary);
		}

		Ok(summary)
	}

	/// Promote the node-scoped rows that pass id and reference validation and
	/// are not yet present into the combined tables.
	pub async fn sync_combined_entities(
		&mut self,
		node: &NationalNode,
	) -> Result<SyncSummary, SyncError> {
		self.register(node);
		let _timer = self
			.metrics
			.flow_duration_seconds
			.with_label_values(&[Flow::Combined.as_str()])
			.start_timer();

		let validator = IdValidator::new(&node.code)?;
		let mut summary = SyncSummary::new(&node.code, Flow::Combined);
		info!("Importing data for {} on {}", node.code, self.target_name);

		for entity in Entity::IMPORT_ORDER {
			let target_table = entity.table_name(None);
			let source_table = entity.table_name(Some(&node.code));
			let mut entity_summary = EntitySummary::new(entity, &target_table);

			let source_rows = self.target.get_all_rows(&source_table).await?;
			entity_summary.fetched = source_rows.len();
			self.metrics
				.records_fetched_total
				.with_label_values(&[source_table.as_str()])
				.inc_by(source_rows.len() as u64);

			// The combined table may hold leftovers of this node from earlier runs.
			let target_rows = self.target.get_all_rows(&target_table).await?;
			let target_ids: HashSet<String> = catalogue::all_ids(&target_rows).into_iter().collect();

			let meta = self.target.get_entity_meta(&source_table).await?;
			let references: Vec<Attribute> = meta.references().cloned().collect();

			let mut valid_source = Vec::new();
			for row in source_rows {
				let Some(id) = catalogue::record_id(&row) else {
					entity_summary.invalid_id += 1;
					continue;
				};
				if !validator.is_valid_id(entity, id) {
					entity_summary.invalid_id += 1;
					continue;
				}
				if target_ids.contains(id) {
					entity_summary.already_present += 1;
					continue;
				}
				if !validator.has_valid_references(&row, &references) {
					entity_summary.invalid_reference += 1;
					continue;
				}
				valid_source.push(row);
			}

			self.record_rejections(&entity_summary);
			debug!(
				"{}: {} fetched, {} invalid id, {} already present, {} invalid reference",
				source_table,
				entity_summary.fetched,
				entity_summary.invalid_id,
				entity_summary.already_present,
				entity_summary.invalid_reference
			);

			if !valid_source.is_empty() {
				info!("Importing data to {}", target_table);
				let prepped = to_upload_format(&valid_source, &meta.one_to_manys());
				entity_summary.uploaded = self.upload(&target_table, &prepped).await?;
			}

			summary.entities.push(entity_summary);
		}

		Ok(summary)
	}

	/// Empty the node-scoped tables of `node`, children first. Returns the
	/// ids that were removed per table, in the order the tables were visited.
	pub async fn purge_node_own_entities(
		&mut self,
		node: &NationalNode,
	) -> Result<Vec<PurgedEntity>, SyncError> {
		self.register(node);
		let _timer = self
			.metrics
			.flow_duration_seconds
			.with_label_values(&["purge"])
			.start_timer();

		info!("Deleting data for {} on {}", node.code, self.target_name);
		let mut purged = Vec::new();

		for entity in Entity::deletion_order() {
			let table = entity.table_name(Some(&node.code));
			let rows = self.target.get_all_rows(&table).await?;
			let ids = catalogue::all_ids(&rows);

			if !ids.is_empty() {
				info!("Deleting data in {}", table);
				self.target.delete_rows(&table, &ids).await?;
				self.metrics
					.records_deleted_total
					.with_label_values(&[table.as_str()])
					.inc_by(ids.len() as u64);
			}

			purged.push(PurgedEntity { entity, table, ids });
		}

		Ok(purged)
	}

	/// Refresh the node-scoped tables of every configured node: purge, then
	/// import again from the node's source.
	pub async fn update_own_entities(&mut self) -> Result<Vec<SyncSummary>, SyncError> {
		let nodes = self.require_nodes()?;
		let mut summaries = Vec::with_capacity(nodes.len());
		for node in &nodes {
			self.purge_node_own_entities(node).await?;
			summaries.push(self.sync_own_entities(node).await?);
		}
		Ok(summaries)
	}

	/// Promote every configured node's records into the combined tables.
	pub async fn update_combined_entities(&mut self) -> Result<Vec<SyncSummary>, SyncError> {
		let nodes = self.require_nodes()?;
		let mut summaries = Vec::with_capacity(nodes.len());
		for node in &nodes {
			summaries.push(self.sync_combined_entities(node).await?);
		}
		Ok(summaries)
	}

	/// Read every combined table into the cache, in upload format.
	pub async fn cache_combined_entities(&mut self) -> Result<(), SyncError> {
		for entity in Entity::IMPORT_ORDER {
			let table = entity.table_name(None);
			let rows = self.target.get_all_rows(&table).await?;
			let one_to_manys = self.target.get_entity_meta(&table).await?.one_to_manys();
			self.metrics
				.records_fetched_total
				.with_label_values(&[table.as_str()])
				.inc_by(rows.len() as u64);
			self.combined_cache
				.insert(entity, to_upload_format(&rows, &one_to_manys));
		}
		debug!("Cached {} combined tables", self.combined_cache.len());
		Ok(())
	}

	pub fn cached_combined(&self, entity: Entity) -> Option<&[Record]> {
		self.combined_cache.get(&entity).map(Vec::as_slice)
	}

	async fn upload(&self, table: &str, rows: &[Record]) -> Result<usize, SyncError> {
		if rows.is_empty() {
			return Ok(0);
		}
		let written = self.target.add_all(table, rows).await?;
		self.metrics
			.records_uploaded_total
			.with_label_values(&[table])
			.inc_by(written as u64);
		Ok(written)
	}

	fn record_rejections(&self, summary: &EntitySummary) {
		for (reason, count) in [
			("invalid_id", summary.invalid_id),
			("already_present", summary.already_present),
			("invalid_reference", summary.invalid_reference),
		] {
			if count > 0 {
				self.metrics
					.records_rejected_total
					.with_label_values(&[summary.entity.as_str(), reason])
					.inc_by(count as u64);
			}
		}
	}
}
