//! Migration recorder
//!
//! Applied units are tracked in a table (default `migrations`) holding one row
//! per unit: its version, its name and the JSON-encoded statements that undo
//! it. Every method takes a [`SqlExecutor`] so the record is written in the
//! same transaction as the unit's DDL.

use tracing::{debug, info};

use super::operations::ReverseStatement;
use super::{MigrationError, Result};
use crate::backends::executor::SqlExecutor;
use crate::backends::introspection::SchemaIntrospector;
use crate::backends::schema::{
	AbstractColumnType, ColumnDefinition, SchemaEditor, TableDefinition, validate_identifier,
};
use crate::backends::types::{DatabaseType, QueryValue, Row};

use super::migration::VERSION_LENGTH;

pub const DEFAULT_TRACKING_TABLE: &str = "migrations";

/// One applied unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
	pub version: String,
	pub name: String,
	/// JSON array of [`ReverseStatement`]s, in execution order
	pub rollback: String,
}

impl MigrationRecord {
	pub fn new(
		version: impl Into<String>,
		name: impl Into<String>,
		rollback: &[ReverseStatement],
	) -> Result<Self> {
		Ok(Self {
			version: version.into(),
			name: name.into(),
			rollback: serde_json::to_string(rollback)?,
		})
	}

	pub fn reverse_statements(&self) -> Result<Vec<ReverseStatement>> {
		if self.rollback.trim().is_empty() {
			return Ok(Vec::new());
		}
		Ok(serde_json::from_str(&self.rollback)?)
	}

	fn from_row(row: &Row) -> Result<Self> {
		Ok(Self {
			version: row.get("version")?,
			name: row.get("name")?,
			rollback: row.get_text("rollback").unwrap_or_default(),
		})
	}
}

/// Reads and writes the tracking table
#[derive(Debug, Clone)]
pub struct MigrationRecorder {
	database_type: DatabaseType,
	table: String,
}

impl MigrationRecorder {
	pub fn new(database_type: DatabaseType) -> Self {
		Self {
			database_type,
			table: DEFAULT_TRACKING_TABLE.to_string(),
		}
	}

	pub fn with_table(mut self, table: impl Into<String>) -> Result<Self> {
		let table = table.into();
		validate_identifier(&table)?;
		self.table = table;
		Ok(self)
	}

	pub fn table(&self) -> &str {
		&self.table
	}

	/// Layout of the tracking table
	pub fn table_definition(&self) -> TableDefinition {
		TableDefinition::new(&self.table)
			.column(ColumnDefinition::new("id", AbstractColumnType::PrimaryKey))
			.column(
				ColumnDefinition::new("version", AbstractColumnType::String)
					.limit(VERSION_LENGTH as u32)
					.not_null(),
			)
			.column(ColumnDefinition::new("name", AbstractColumnType::String).not_null())
			.column(ColumnDefinition::new("rollback", AbstractColumnType::Text))
	}

	/// Create the tracking table unless it already exists
	///
	/// Returns `true` when the table was created.
	pub async fn ensure_table(
		&self,
		executor: &mut dyn SqlExecutor,
		editor: &dyn SchemaEditor,
		introspector: &dyn SchemaIntrospector,
	) -> Result<bool> {
		if !introspector.describe(executor, &self.table).await?.is_empty() {
			return Ok(false);
		}
		let sql = editor.create_table_sql(&self.table_definition())?;
		info!(table = %self.table, sql = %sql, "Creating migration tracking table");
		executor.execute(&sql, vec![]).await?;
		Ok(true)
	}

	/// Applied units, ascending by version
	pub async fn applied(&self, executor: &mut dyn SqlExecutor) -> Result<Vec<MigrationRecord>> {
		let sql = format!(
			"SELECT version, name, rollback FROM {} ORDER BY version ASC",
			self.table
		);
		debug!(sql = %sql, "Loading applied migrations");
		executor
			.fetch_all(&sql, vec![])
			.await?
			.iter()
			.map(MigrationRecord::from_row)
			.collect()
	}

	/// Highest applied version
	pub async fn last_version(&self, executor: &mut dyn SqlExecutor) -> Result<Option<String>> {
		Ok(self.applied(executor).await?.pop().map(|r| r.version))
	}

	pub async fn find(
		&self,
		executor: &mut dyn SqlExecutor,
		version: &str,
	) -> Result<Option<MigrationRecord>> {
		let sql = format!(
			"SELECT version, name, rollback FROM {} WHERE version = {}",
			self.table,
			self.database_type.placeholder(1)
		);
		executor
			.fetch_optional(&sql, vec![QueryValue::from(version)])
			.await?
			.as_ref()
			.map(MigrationRecord::from_row)
			.transpose()
	}

	pub async fn record(&self, executor: &mut dyn SqlExecutor, record: &MigrationRecord) -> Result<()> {
		let sql = format!(
			"INSERT INTO {} (version, name, rollback) VALUES ({}, {}, {})",
			self.table,
			self.database_type.placeholder(1),
			self.database_type.placeholder(2),
			self.database_type.placeholder(3)
		);
		executor
			.execute(
				&sql,
				vec![
					QueryValue::from(record.version.as_str()),
					QueryValue::from(record.name.as_str()),
					QueryValue::from(record.rollback.as_str()),
				],
			)
			.await?;
		Ok(())
	}

	pub async fn remove(&self, executor: &mut dyn SqlExecutor, version: &str) -> Result<()> {
		let sql = format!(
			"DELETE FROM {} WHERE version = {}",
			self.table,
			self.database_type.placeholder(1)
		);
		let result = executor.execute(&sql, vec![QueryValue::from(version)]).await?;
		if result.rows_affected == 0 {
			return Err(MigrationError::NotFound(format!("migration record {}", version)));
		}
		Ok(())
	}
}
