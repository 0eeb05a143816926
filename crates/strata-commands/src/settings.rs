//! `strata.toml` loading
//!
//! ```toml
//! [database]
//! engine = "mysql"
//! host = "localhost"
//! database = "app"
//! username = "root"
//! password = "secret"
//! table_options = "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
//!
//! [migrations]
//! directory = "db/migrate"
//! table = "migrations"
//! schema_directory = "db/schema"
//! ```
//!
//! A connection URL (`--database-url` or `DATABASE_URL`) replaces the
//! `[database]` section; its `table_options` are kept.

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use strata_db::backends::DatabaseConfig;
use strata_db::migrations::DEFAULT_TRACKING_TABLE;

fn default_directory() -> PathBuf {
	PathBuf::from("db/migrate")
}

fn default_table() -> String {
	DEFAULT_TRACKING_TABLE.to_string()
}

fn default_schema_directory() -> PathBuf {
	PathBuf::from("db/schema")
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MigrationSettings {
	#[serde(default = "default_directory")]
	pub directory: PathBuf,
	#[serde(default = "default_table")]
	pub table: String,
	#[serde(default = "default_schema_directory")]
	pub schema_directory: PathBuf,
}

impl Default for MigrationSettings {
	fn default() -> Self {
		Self {
			directory: default_directory(),
			table: default_table(),
			schema_directory: default_schema_directory(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
	pub database: Option<DatabaseConfig>,
	#[serde(default)]
	pub migrations: MigrationSettings,
}

impl Settings {
	/// Read `path` if it exists, then apply the URL override
	pub fn load(path: &Path, database_url: Option<&str>) -> anyhow::Result<Self> {
		let mut settings = if path.exists() {
			let content = std::fs::read_to_string(path)
				.with_context(|| format!("Failed to read {}", path.display()))?;
			Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))?
		} else {
			Self::default()
		};

		if let Some(url) = database_url.filter(|u| !u.is_empty()) {
			let mut config = DatabaseConfig::from_url(url)?;
			config.table_options = settings
				.database
				.as_ref()
				.and_then(|db| db.table_options.clone());
			settings.database = Some(config);
		}
		Ok(settings)
	}

	pub fn parse(content: &str) -> anyhow::Result<Self> {
		Ok(toml::from_str(content)?)
	}

	/// The datasource, required by every command that connects
	pub fn database(&self) -> anyhow::Result<&DatabaseConfig> {
		match &self.database {
			Some(database) => Ok(database),
			None => bail!("no [database] section and no DATABASE_URL"),
		}
	}
}
