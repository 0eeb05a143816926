//! Migration units

use serde::{Deserialize, Serialize};

use super::operations::Operation;
use super::{MigrationError, Result};

/// Number of digits in a version, `YYYYMMDDhhmmss`
pub const VERSION_LENGTH: usize = 14;

/// Check that `version` is exactly [`VERSION_LENGTH`] ASCII digits
pub fn validate_version(version: &str) -> Result<()> {
	if version.len() == VERSION_LENGTH && version.bytes().all(|b| b.is_ascii_digit()) {
		Ok(())
	} else {
		Err(MigrationError::InvalidMigration(format!(
			"version {:?} is not a {}-digit timestamp",
			version, VERSION_LENGTH
		)))
	}
}

/// Body of a migration file
#[derive(Debug, Deserialize)]
struct MigrationBody {
	#[serde(default, alias = "change")]
	up: Vec<Operation>,
	#[serde(default)]
	down: Option<Vec<Operation>>,
}

/// A versioned migration unit
///
/// ```
/// use strata_db::migrations::{Migration, Operation};
///
/// let migration = Migration::new("20190101000000", "CreateUsers")
///     .unwrap()
///     .operation(Operation::DropTable { name: "legacy_users".to_string() });
/// assert_eq!(migration.up.len(), 1);
/// assert!(migration.down.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
	pub version: String,
	pub name: String,
	pub up: Vec<Operation>,
	/// Explicit reverse; `None` replays the inverse captured while applying
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub down: Option<Vec<Operation>>,
}

impl Migration {
	pub fn new(version: impl Into<String>, name: impl Into<String>) -> Result<Self> {
		let version = version.into();
		validate_version(&version)?;
		Ok(Self {
			version,
			name: name.into(),
			up: Vec::new(),
			down: None,
		})
	}

	/// Parse a migration file body
	pub fn from_toml(version: impl Into<String>, name: impl Into<String>, content: &str) -> Result<Self> {
		let body: MigrationBody = toml::from_str(content)?;
		let mut migration = Self::new(version, name)?;
		migration.up = body.up;
		migration.down = body.down;
		Ok(migration)
	}

	pub fn operation(mut self, operation: Operation) -> Self {
		self.up.push(operation);
		self
	}

	pub fn down(mut self, operations: Vec<Operation>) -> Self {
		self.down = Some(operations);
		self
	}

	/// Version as an integer, for ordering
	pub fn version_number(&self) -> u64 {
		self.version.parse().unwrap_or(0)
	}

	/// `<version> <name>`, as shown in logs and console output
	pub fn label(&self) -> String {
		format!("{} {}", self.version, self.name)
	}
}

/// Compiled-in migrations
///
/// ```rust
/// use strata_db::migrations::{Migration, MigrationProvider, Operation};
///
/// pub struct AppMigrations;
///
/// impl MigrationProvider for AppMigrations {
///     fn migrations() -> Vec<Migration> {
///         vec![
///             Migration::new("20190101000000", "DropLegacy")
///                 .unwrap()
///                 .operation(Operation::DropTable { name: "legacy".to_string() }),
///         ]
///     }
/// }
/// ```
pub trait MigrationProvider {
	fn migrations() -> Vec<Migration>;
}
