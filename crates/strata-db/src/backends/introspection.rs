//! Reading live table structure back into abstract descriptions
//!
//! Introspectors never fail for a missing table: [`SchemaIntrospector::describe`]
//! returns an empty [`SchemaSnapshot`] and the list queries return empty
//! vectors. Use [`SchemaIntrospector::table_exists`] to tell the cases apart
//! without reading columns.
//!
//! All methods take a [`SqlExecutor`] so they can run inside the transaction of
//! a migration unit as well as against a plain connection.

use async_trait::async_trait;

use super::drivers::mysql::MySqlIntrospector;
use super::drivers::postgresql::PostgresIntrospector;
use super::executor::SqlExecutor;
use super::schema::{ForeignKeyDefinition, IndexDefinition, SchemaResult, SchemaSnapshot};
use super::types::{DatabaseType, Row};

#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
	fn database_type(&self) -> DatabaseType;

	/// Columns of `table` in ordinal order
	async fn describe(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<SchemaSnapshot>;

	/// Base tables of the current database, sorted by name
	async fn list_tables(&self, executor: &mut dyn SqlExecutor) -> SchemaResult<Vec<String>>;

	async fn table_exists(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<bool>;

	/// Secondary indexes of `table`; primary key indexes are excluded
	async fn indexes(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<Vec<IndexDefinition>>;

	/// Single-column foreign keys declared on `table`
	async fn foreign_keys(
		&self,
		executor: &mut dyn SqlExecutor,
		table: &str,
	) -> SchemaResult<Vec<ForeignKeyDefinition>>;
}

/// One definition per constraint; composite constraints keep their first column.
pub(crate) fn foreign_keys_from_rows(table: &str, rows: &[Row]) -> Vec<ForeignKeyDefinition> {
	let mut foreign_keys: Vec<ForeignKeyDefinition> = Vec::new();
	for row in rows {
		let (Some(name), Some(column), Some(to_table), Some(to_column)) = (
			row.get_text("constraint_name"),
			row.get_text("column_name"),
			row.get_text("referenced_table"),
			row.get_text("referenced_column"),
		) else {
			continue;
		};
		if foreign_keys.iter().any(|fk| fk.name == name) {
			continue;
		}
		foreign_keys.push(
			ForeignKeyDefinition::new(table, column, to_table)
				.named(name)
				.references_column(to_column),
		);
	}
	foreign_keys
}

/// Introspector for a dialect, with default settings
pub fn introspector_for(database_type: DatabaseType) -> Box<dyn SchemaIntrospector> {
	match database_type {
		DatabaseType::Mysql => Box::new(MySqlIntrospector::new()),
		DatabaseType::Postgres => Box::new(PostgresIntrospector::new()),
	}
}
