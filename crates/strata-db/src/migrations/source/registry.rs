//! Compiled-in migration units

use async_trait::async_trait;

use super::{MigrationSource, ordered};
use crate::migrations::{Migration, MigrationProvider, Result};

/// Migration source over a fixed list of units
///
/// ```rust
/// use strata_db::migrations::{Migration, Operation, RegistrySource};
///
/// let source = RegistrySource::new(vec![
///     Migration::new("20190101000000", "DropLegacy")
///         .unwrap()
///         .operation(Operation::DropTable { name: "legacy".to_string() }),
/// ]);
/// assert_eq!(source.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistrySource {
	migrations: Vec<Migration>,
}

impl RegistrySource {
	pub fn new(migrations: Vec<Migration>) -> Self {
		Self { migrations }
	}

	pub fn from_provider<P: MigrationProvider>() -> Self {
		Self::new(P::migrations())
	}

	pub fn push(&mut self, migration: Migration) {
		self.migrations.push(migration);
	}

	pub fn len(&self) -> usize {
		self.migrations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.migrations.is_empty()
	}
}

#[async_trait]
impl MigrationSource for RegistrySource {
	async fn all_migrations(&self) -> Result<Vec<Migration>> {
		ordered(self.migrations.clone())
	}
}
