use std::path::PathBuf;

use anyhow::Context;
use bbmri_eric_sync::catalogue::Entity;
use bbmri_eric_sync::sync::SyncSummary;
use bbmri_eric_sync::{config, connect, observability};
use clap::{Parser, Subcommand};
use log::{Level, info};

#[derive(Parser)]
#[command(
	name = "eric-sync",
	about = "Synchronize national node directories into the BBMRI-ERIC directory"
)]
struct Cli {
	/// Additional JSON/TOML/YAML settings file
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	/// Write Prometheus metrics in text format to this file when done
	#[arg(long, global = true)]
	metrics_file: Option<PathBuf>,
	/// Override the configured log level
	#[arg(long, global = true)]
	log_level: Option<Level>,
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Refresh the node-scoped tables, then update the combined tables (default)
	Run,
	/// Purge and re-import the node-scoped tables of every national node
	Own,
	/// Copy validated node-scoped records into the combined tables
	Combined,
	/// Delete the node-scoped tables of one or all national nodes
	Purge {
		/// Code of the national node to purge; all nodes when omitted
		#[arg(long)]
		node: Option<String>,
	},
	/// Read the combined tables and write them as JSON
	Snapshot {
		#[arg(long)]
		output: PathBuf,
	},
}

fn report(summaries: &[SyncSummary]) {
	for summary in summaries {
		info!(
			"{} ({}): {} uploaded, {} rejected",
			summary.node,
			summary.flow.as_str(),
			summary.total_uploaded(),
			summary.total_rejected()
		);
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let mut settings = config::load_from(cli.config.as_deref()).context("failed to load config")?;
	if let Some(level) = cli.log_level {
		settings.log_level = level;
	}
	observability::init_logging(settings.log_level)?;

	let metrics = observability::init_metrics()?;
	let mut synchronizer = connect(&settings, metrics.clone())
		.await
		.with_context(|| format!("failed to connect to {}", settings.target))?;

	match cli.command.unwrap_or(Commands::Run) {
		Commands::Run => {
			report(&synchronizer.update_own_entities().await?);
			report(&synchronizer.update_combined_entities().await?);
		}
		Commands::Own => report(&synchronizer.update_own_entities().await?),
		Commands::Combined => report(&synchronizer.update_combined_entities().await?),
		Commands::Purge { node } => {
			let nodes = match node {
				Some(code) => vec![synchronizer.node(&code)?.clone()],
				None => synchronizer.national_nodes().to_vec(),
			};
			for node in &nodes {
				let purged = synchronizer.purge_node_own_entities(node).await?;
				let total: usize = purged.iter().map(|p| p.ids.len()).sum();
				info!("{}: deleted {} rows", node.code, total);
			}
		}
		Commands::Snapshot { output } => {
			synchronizer.cache_combined_entities().await?;
			let mut snapshot = serde_json::Map::new();
			for entity in Entity::IMPORT_ORDER {
				let rows = synchronizer.cached_combined(entity).unwrap_or_default();
				snapshot.insert(entity.to_string(), serde_json::to_value(rows)?);
			}
			std::fs::write(&output, serde_json::to_vec_pretty(&snapshot)?)
				.with_context(|| format!("failed to write {}", output.display()))?;
			info!("Wrote combined snapshot to {}", output.display());
		}
	}

	if let Some(path) = cli.metrics_file {
		std::fs::write(&path, metrics.encode())
			.with_context(|| format!("failed to write metrics to {}", path.display()))?;
	}

	Ok(())
}
