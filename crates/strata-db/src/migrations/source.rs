//! Where migration units come from
//!
//! - [`filesystem::FilesystemSource`] reads `<version><Name>.toml` files from a directory
//! - [`registry::RegistrySource`] serves units compiled into the binary

pub mod filesystem;
pub mod registry;

use async_trait::async_trait;

use super::{Migration, MigrationError, Result};

#[async_trait]
pub trait MigrationSource: Send + Sync {
	/// Every known unit, sorted ascending by version
	async fn all_migrations(&self) -> Result<Vec<Migration>>;

	async fn get_migration(&self, version: &str) -> Result<Migration> {
		self.all_migrations()
			.await?
			.into_iter()
			.find(|m| m.version == version)
			.ok_or_else(|| MigrationError::NotFound(format!("migration {}", version)))
	}
}

/// Sort units ascending by version, rejecting duplicate versions
pub fn ordered(mut migrations: Vec<Migration>) -> Result<Vec<Migration>> {
	migrations.sort_by(|a, b| {
		a.version_number()
			.cmp(&b.version_number())
			.then_with(|| a.name.cmp(&b.name))
	});
	if let Some(pair) = migrations.windows(2).find(|pair| pair[0].version == pair[1].version) {
		return Err(MigrationError::InvalidMigration(format!(
			"duplicate version {} ({} and {})",
			pair[0].version, pair[0].name, pair[1].name
		)));
	}
	Ok(migrations)
}
