pub mod nodes;

use std::path::Path;
use std::time::Duration;

use log::Level;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub use nodes::{NationalNode, NodeDescriptor, NodeError, parse_node_list};

use crate::session::ClientSettings;

/// Runtime configuration for the synchronizer.
///
/// Values are loaded from (in order): `/etc/bbmri/eric-sync.json`, the user
/// config folders (optional), an explicit file passed on the command line,
/// and environment variables prefixed with `ERIC_SYNC_` (e.g.
/// `ERIC_SYNC_TARGET`).
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Settings {
	/// API root of the directory that receives the data.
	pub target: Url,
	pub username: Option<String>,
	pub password: Option<String>,
	pub national_nodes: Vec<NodeDescriptor>,
	pub log_level: Level,
	/// Rows requested per page when reading a table.
	pub page_size: u32,
	/// Rows per bulk add or delete request.
	pub batch_size: usize,
	pub timeout_secs: u64,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			target: Url::parse("http://localhost/api/").expect("static url parses"),
			username: None,
			password: None,
			national_nodes: vec![
				NodeDescriptor::new("DE", "https://directory.bbmri.de/api/"),
				NodeDescriptor::new("NL", "https://catalogue.bbmri.nl/api/"),
			],
			log_level: Level::Info,
			page_size: 10_000,
			batch_size: 1_000,
			timeout_secs: 300,
		}
	}
}

impl Settings {
	/// Validate the configured node descriptors. Fails on the first
	/// descriptor with a missing or malformed key.
	pub fn nodes(&self) -> Result<Vec<NationalNode>, NodeError> {
		self.national_nodes
			.iter()
			.cloned()
			.map(NationalNode::try_from)
			.collect()
	}

	/// Credentials, when both a username and a password are configured.
	pub fn credentials(&self) -> Option<(&str, &str)> {
		match (self.username.as_deref(), self.password.as_deref()) {
			(Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
			_ => None,
		}
	}

	pub fn client_settings(&self) -> ClientSettings {
		ClientSettings {
			page_size: self.page_size,
			batch_size: self.batch_size,
			timeout: Duration::from_secs(self.timeout_secs),
		}
	}
}

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("configuration error: {0}")]
	Config(#[from] config::ConfigError),
}

/// Load settings from the default locations and the environment.
pub fn load() -> Result<Settings, SettingsError> {
	load_from(None)
}

/// Load settings, layering `explicit` (when given) above the default
/// locations and below the environment.
pub fn load_from(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
	let mut builder = config::Config::builder()
		.add_source(config::File::with_name("/etc/bbmri/eric-sync.json").required(false));

	if let Some(folder) = dirs::config_dir() {
		let user_config_path = folder.join("bbmri").join("eric-sync.json");
		builder = builder.add_source(config::File::from(user_config_path).required(false));
	}
	if let Some(folder) = dirs::config_local_dir() {
		let local_config_path = folder.join("bbmri").join("eric-sync.json");
		builder = builder.add_source(config::File::from(local_config_path).required(false));
	}
	if let Some(path) = explicit {
		builder = builder.add_source(config::File::from(path).required(true));
	}

	builder = builder.add_source(config::Environment::with_prefix("ERIC_SYNC").separator("__"));

	let cfg = builder.build()?;

	let mut s: Settings = cfg.try_deserialize()?;

	// Direct environment variables win over whatever the layered sources
	// produced, including the list form of the national nodes which the
	// `config` crate cannot map.
	if let Ok(t) = std::env::var("ERIC_SYNC_TARGET") {
		if let Ok(parsed) = Url::parse(&t) {
			s.target = parsed;
		}
	}
	if let Ok(u) = std::env::var("ERIC_SYNC_USERNAME") {
		if !u.is_empty() {
			s.username = Some(u);
		}
	}
	if let Ok(p) = std::env::var("ERIC_SYNC_PASSWORD") {
		if !p.is_empty() {
			s.password = Some(p);
		}
	}
	if let Ok(n) = std::env::var("ERIC_SYNC_NATIONAL_NODES") {
		if !n.is_empty() {
			s.national_nodes = parse_node_list(&n);
		}
	}
	if let Ok(l) = std::env::var("ERIC_SYNC_LOG_LEVEL") {
		if let Ok(parsed) = l.parse::<Level>() {
			s.log_level = parsed;
		}
	}
	if let Ok(p) = std::env::var("ERIC_SYNC_PAGE_SIZE") {
		if let Ok(parsed) = p.parse::<u32>() {
			s.page_size = parsed;
		}
	}
	if let Ok(b) = std::env::var("ERIC_SYNC_BATCH_SIZE") {
		if let Ok(parsed) = b.parse::<usize>() {
			s.batch_size = parsed;
		}
	}
	if let Ok(t) = std::env::var("ERIC_SYNC_TIMEOUT_SECS") {
		if let Ok(parsed) = t.parse::<u64>() {
			s.timeout_secs = parsed;
		}
	}

	Ok(s)
}

#[cfg(test)]
#[cfg(feature = "unit-tests")]
mod tests {
	use std::env;
	use std::io::Write;

	use log::Level;

	use crate::config::{NodeDescriptor, NodeError, Settings, load, load_from};

	const VARS: [&str; 8] = [
		"ERIC_SYNC_TARGET",
		"ERIC_SYNC_USERNAME",
		"ERIC_SYNC_PASSWORD",
		"ERIC_SYNC_NATIONAL_NODES",
		"ERIC_SYNC_LOG_LEVEL",
		"ERIC_SYNC_PAGE_SIZE",
		"ERIC_SYNC_BATCH_SIZE",
		"ERIC_SYNC_TIMEOUT_SECS",
	];

	// Both scenarios touch the process environment, so they run in a single
	// test to avoid racing each other.
	#[test]
	fn test_load_defaults_file_and_env_overlay() {
		let originals: Vec<_> = VARS.iter().map(|v| (*v, env::var_os(v))).collect();
		for var in VARS {
			unsafe { env::remove_var(var) };
		}

		let s = load().expect("load should succeed with defaults");
		let d = Settings::default();
		assert_eq!(s.target, d.target);
		assert_eq!(s.batch_size, d.batch_size);
		assert_eq!(s.log_level, d.log_level);

		// Explicit file layer
		let mut file = tempfile::Builder::new()
			.suffix(".json")
			.tempfile()
			.expect("temp file");
		write!(
			file,
			r#"{{
				"target": "https://directory.example.org/api/",
				"batch_size": 250,
				"national_nodes": [
					{{"national_node": "BE", "source": "https://directory.bbmri.be/api/"}}
				]
			}}"#
		)
		.expect("write config");

		let s1 = load_from(Some(file.path())).expect("load should succeed with file");
		assert_eq!(s1.target.as_str(), "https://directory.example.org/api/");
		assert_eq!(s1.batch_size, 250);
		assert_eq!(
			s1.national_nodes,
			vec![NodeDescriptor::new("BE", "https://directory.bbmri.be/api/")]
		);

		// Environment overlay beats the file
		unsafe { env::set_var("ERIC_SYNC_TARGET", "https://eric.example.org/api/") };
		unsafe { env::set_var("ERIC_SYNC_USERNAME", "admin") };
		unsafe { env::set_var("ERIC_SYNC_PASSWORD", "secret") };
		unsafe { env::set_var("ERIC_SYNC_NATIONAL_NODES", "NL=https://catalogue.bbmri.nl/api/") };
		unsafe { env::set_var("ERIC_SYNC_LOG_LEVEL", "debug") };
		unsafe { env::set_var("ERIC_SYNC_BATCH_SIZE", "50") };

		let s2 = load_from(Some(file.path())).expect("load should succeed with env");
		assert_eq!(s2.target.as_str(), "https://eric.example.org/api/");
		assert_eq!(s2.credentials(), Some(("admin", "secret")));
		assert_eq!(s2.log_level, Level::Debug);
		assert_eq!(s2.batch_size, 50);
		let nodes = s2.nodes().expect("nodes validate");
		assert_eq!(nodes.len(), 1);
		assert_eq!(nodes[0].code, "NL");

		// A descriptor without a source fails validation
		unsafe { env::set_var("ERIC_SYNC_NATIONAL_NODES", "NL") };
		let s3 = load().expect("load should succeed");
		assert_eq!(s3.nodes(), Err(NodeError::MissingSource("NL".into())));

		for (var, value) in originals {
			match value {
				Some(v) => unsafe { env::set_var(var, v) },
				None => unsafe { env::remove_var(var) },
			}
		}
	}

	#[test]
	fn credentials_require_both_parts() {
		let mut s = Settings::default();
		assert_eq!(s.credentials(), None);
		s.username = Some("admin".into());
		assert_eq!(s.credentials(), None);
		s.password = Some("pw".into());
		assert_eq!(s.credentials(), Some(("admin", "pw")));
	}

	#[test]
	fn default_nodes_validate() {
		let nodes = Settings::default().nodes().expect("default nodes are valid");
		let codes: Vec<&str> = nodes.iter().map(|n| n.code.as_str()).collect();
		assert_eq!(codes, vec!["DE", "NL"]);
	}
}
