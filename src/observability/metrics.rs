use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

const NAMESPACE: &str = "eric_sync";

/// Central registry for the synchronizer's Prometheus metrics
pub struct MetricsRegistry {
	registry: Registry,

	/// Rows read, by qualified table name
	pub records_fetched_total: IntCounterVec,
	/// Rows written, by qualified table name
	pub records_uploaded_total: IntCounterVec,
	/// Rows deleted, by qualified table name
	pub records_deleted_total: IntCounterVec,
	/// Rows kept out of a combined table, by entity and reason
	pub records_rejected_total: IntCounterVec,
	/// Duration of a per-node flow (own, combined, purge)
	pub flow_duration_seconds: HistogramVec,
}

impl MetricsRegistry {
	pub fn try_new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let records_fetched_total = IntCounterVec::new(
			Opts::new("records_fetched_total", "Rows read from catalogue tables").namespace(NAMESPACE),
			&["table"],
		)?;

		let records_uploaded_total = IntCounterVec::new(
			Opts::new("records_uploaded_total", "Rows added to catalogue tables").namespace(NAMESPACE),
			&["table"],
		)?;

		let records_deleted_total = IntCounterVec::new(
			Opts::new("records_deleted_total", "Rows deleted from node-scoped tables")
				.namespace(NAMESPACE),
			&["table"],
		)?;

		let records_rejected_total = IntCounterVec::new(
			Opts::new(
				"records_rejected_total",
				"Rows not promoted to a combined table",
			)
			.namespace(NAMESPACE),
			&["entity", "reason"],
		)?;

		let flow_duration_seconds = HistogramVec::new(
			HistogramOpts::new(
				"flow_duration_seconds",
				"Duration of a synchronization flow for one national node",
			)
			.namespace(NAMESPACE)
			.buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
			&["flow"],
		)?;

		registry.register(Box::new(records_fetched_total.clone()))?;
		registry.register(Box::new(records_uploaded_total.clone()))?;
		registry.register(Box::new(records_deleted_total.clone()))?;
		registry.register(Box::new(records_rejected_total.clone()))?;
		registry.register(Box::new(flow_duration_seconds.clone()))?;

		Ok(Self {
			registry,
			records_fetched_total,
			records_uploaded_total,
			records_deleted_total,
			records_rejected_total,
			flow_duration_seconds,
		})
	}

	/// Encode metrics in Prometheus text format
	pub fn encode(&self) -> String {
		let encoder = TextEncoder::new();
		let metric_families = self.registry.gather();
		match encoder.encode_to_string(&metric_families) {
			Ok(s) => s,
			Err(e) => {
				log::error!("Failed to encode metrics: {}", e);
				String::new()
			}
		}
	}
}

/// Create the metrics registry shared by a run
pub fn init_metrics() -> anyhow::Result<Arc<MetricsRegistry>> {
	Ok(Arc::new(MetricsRegistry::try_new()?))
}
