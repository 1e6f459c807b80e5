pub mod catalogue;
pub mod config;
pub mod error;
pub mod observability;
pub mod session;
pub mod sync;

use std::sync::Arc;

use log::info;

pub use error::SyncError;
pub use sync::Synchronizer;

use crate::config::Settings;
use crate::observability::MetricsRegistry;
use crate::session::{DataSession, MolgenisSession, MolgenisSessionProvider};

/// Build a synchronizer for the configured target directory.
///
/// Node descriptors are validated first so that configuration mistakes are
/// reported before any request is sent. The target session logs in when
/// both a username and a password are configured; source sessions stay
/// anonymous.
pub async fn connect(
	settings: &Settings,
	metrics: Arc<MetricsRegistry>,
) -> Result<Synchronizer, SyncError> {
	settings.nodes()?;

	let client_settings = settings.client_settings();
	let target = MolgenisSession::new(&settings.target, client_settings.clone())?;
	if let Some((username, password)) = settings.credentials() {
		target.login(username, password).await?;
	}
	info!("Connected to target {}", settings.target);

	let target: Arc<dyn DataSession> = Arc::new(target);
	let sources = Arc::new(MolgenisSessionProvider::new(client_settings));

	Ok(
		Synchronizer::new(target, sources, settings.national_nodes.clone())?
			.with_target_name(settings.target.as_str())
			.with_metrics(metrics),
	)
}
