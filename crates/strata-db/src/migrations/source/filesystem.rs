//! Filesystem-based migration source
//!
//! Loads units from `<version><Name>.toml` files in a single directory, e.g.
//! `db/migrate/20190327131200CreateUsers.toml`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{MigrationSource, ordered};
use crate::migrations::{Migration, MigrationError, Result};

static FILE_NAME: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^([0-9]{14})(.*)\.toml$").expect("FILE_NAME: invalid regex pattern")
});

static MIGRATION_NAME: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("MIGRATION_NAME: invalid regex pattern")
});

/// Split a migration file name into version and name
///
/// Returns `None` for files that are not migrations.
pub fn parse_file_name(file_name: &str) -> Option<(String, String)> {
	let captures = FILE_NAME.captures(file_name)?;
	Some((captures[1].to_string(), captures[2].to_string()))
}

/// Migration source that loads from a directory
pub struct FilesystemSource {
	/// Directory containing migration files
	root_dir: PathBuf,
}

impl FilesystemSource {
	/// Create a new FilesystemSource
	///
	/// ```rust,no_run
	/// use strata_db::migrations::FilesystemSource;
	/// let source = FilesystemSource::new("db/migrate");
	/// ```
	pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
		Self {
			root_dir: root_dir.as_ref().to_path_buf(),
		}
	}

	pub fn root_dir(&self) -> &Path {
		&self.root_dir
	}

	fn parse_migration_file(&self, path: &Path, version: String, name: String) -> Result<Migration> {
		let content = std::fs::read_to_string(path).map_err(|e| {
			MigrationError::IoError(std::io::Error::other(format!(
				"Failed to read {}: {}",
				path.display(),
				e
			)))
		})?;
		Migration::from_toml(version, name, &content).map_err(|e| {
			MigrationError::InvalidMigration(format!("Failed to parse {}: {}", path.display(), e))
		})
	}
}

#[async_trait]
impl MigrationSource for FilesystemSource {
	async fn all_migrations(&self) -> Result<Vec<Migration>> {
		if !self.root_dir.is_dir() {
			debug!(path = %self.root_dir.display(), "Migration directory does not exist");
			return Ok(Vec::new());
		}

		let mut migrations = Vec::new();
		for entry in walkdir::WalkDir::new(&self.root_dir)
			.min_depth(1)
			.max_depth(1)
			.follow_links(true)
			.into_iter()
			.filter_map(|e| e.ok())
			.filter(|e| e.file_type().is_file())
		{
			let path = entry.path();
			let Some((version, name)) = entry.file_name().to_str().and_then(parse_file_name) else {
				debug!(path = %path.display(), "Skipping non-migration file");
				continue;
			};
			migrations.push(self.parse_migration_file(path, version, name)?);
		}

		ordered(migrations)
	}
}

const TEMPLATE: &str = r#"# Operations applied by `strata migrate`, in order.
#
# [[up]]
# op = "create_table"
# name = "users"
# columns = [
#   { name = "id", type = "primaryKey" },
#   { name = "email", type = "string", limit = 150, nullable = false },
# ]
#
# Optional explicit reverse, replayed by `strata rollback`. Without it the
# inverse captured while applying is used.
#
# [[down]]
# op = "drop_table"
# name = "users"
"#;

/// Write an empty migration file named after `timestamp` and `name`
pub fn create_migration_file(dir: &Path, name: &str, timestamp: DateTime<Utc>) -> Result<PathBuf> {
	if !MIGRATION_NAME.is_match(name) {
		return Err(MigrationError::InvalidMigration(format!(
			"migration name {:?} must be PascalCase letters and digits",
			name
		)));
	}
	std::fs::create_dir_all(dir)?;

	let version = timestamp.format("%Y%m%d%H%M%S").to_string();
	let path = dir.join(format!("{}{}.toml", version, name));
	if path.exists() {
		return Err(MigrationError::InvalidMigration(format!(
			"{} already exists",
			path.display()
		)));
	}
	std::fs::write(&path, format!("# {} {}\n{}", version, name, TEMPLATE))?;
	Ok(path)
}
