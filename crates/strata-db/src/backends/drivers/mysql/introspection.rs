//! MySQL schema introspection
//!
//! Columns come from `SHOW FULL COLUMNS`, indexes from `SHOW INDEX` and foreign
//! keys from `information_schema.KEY_COLUMN_USAGE`. Existence is checked first
//! because `SHOW FULL COLUMNS` fails on a missing table.

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::backends::executor::SqlExecutor;
use crate::backends::introspection::{SchemaIntrospector, foreign_keys_from_rows};
use crate::backends::schema::column_types::split_native_type;
use crate::backends::schema::{
	AbstractColumnType, ColumnDefault, ColumnSnapshot, ColumnTypeRegistry, ForeignKeyDefinition,
	IndexDefinition, SchemaResult, SchemaSnapshot, validate_identifier,
};
use crate::backends::types::{DatabaseType, Row};

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) AS table_count FROM information_schema.tables \
	WHERE table_schema = DATABASE() AND table_name = ?";

const FOREIGN_KEYS_SQL: &str = "SELECT CONSTRAINT_NAME AS constraint_name, \
	COLUMN_NAME AS column_name, \
	REFERENCED_TABLE_NAME AS referenced_table, \
	REFERENCED_COLUMN_NAME AS referenced_column \
	FROM information_schema.KEY_COLUMN_USAGE \
	WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND REFERENCED_TABLE_NAME IS NOT NULL \
	ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION";

/// MySQL schema introspector
#[derive(Debug, Clone)]
pub struct MySqlIntrospector {
	registry: ColumnTypeRegistry,
}

impl MySqlIntrospector {
	pub fn new() -> Self {
		Self {
			registry: ColumnTypeRegistry::mysql(),
		}
	}

	/// Convert one `SHOW FULL COLUMNS` row
	///
	/// Returns the column name and its snapshot, or `None` when the row has no
	/// `Field`.
	pub fn column_from_row(&self, table: &str, row: &Row) -> Option<(String, ColumnSnapshot)> {
		let name = row.get_text("Field")?;
		let native = row.get_text("Type").unwrap_or_default();
		let column_type = self.registry.reverse_resolve(&native).unwrap_or_else(|_| {
			warn!(table, column = %name, native = %native, "Unknown MySQL type, reading as text");
			AbstractColumnType::Text
		});

		let (_, args) = split_native_type(&native);
		let arg = |i: usize| args.get(i).and_then(|a| a.parse::<u32>().ok());

		let mut column = ColumnSnapshot::new(column_type);
		match column_type {
			AbstractColumnType::String => column.limit = arg(0),
			AbstractColumnType::Decimal | AbstractColumnType::Float => {
				column.precision = arg(0);
				column.scale = arg(1);
			}
			// Display widths and `tinyint(1)` carry no meaning once mapped
			_ => {}
		}

		let extra = row.get_text("Extra").unwrap_or_default().to_ascii_lowercase();
		column.nullable = row.get_text("Null").is_some_and(|n| n.eq_ignore_ascii_case("YES"));
		column.primary_key = row.get_text("Key").is_some_and(|k| k.eq_ignore_ascii_case("PRI"));
		column.auto_increment = extra.contains("auto_increment");
		column.default = row
			.get_text("Default")
			.and_then(|default| parse_default(column_type, &default, &extra));

		Some((name, column))
	}
}

impl Default for MySqlIntrospector {
	fn default() -> Self {
		Self::new()
	}
}

/// Computed temporal defaults such as `CURRENT_TIMESTAMP` cannot be expressed
/// as a static default and are dropped.
fn parse_default(column_type: AbstractColumnType, default: &str, extra: &str) -> Option<ColumnDefault> {
	let computed = extra.contains("default_generated")
		|| default.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
		|| default.to_ascii_uppercase().starts_with("CURRENT_TIMESTAMP(")
		|| default.ends_with("()");
	if column_type.is_temporal() && computed {
		return None;
	}
	if computed {
		return Some(ColumnDefault::expression(default));
	}
	Some(ColumnDefault::Value(default.to_string()))
}

#[async_trait]
impl SchemaIntrospector for MySqlIntrospector {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Mysql
	}

	async fn describe(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<SchemaSnapshot> {
		if !self.table_exists(executor, table).await? {
			debug!(table, "Table does not exist, returning empty snapshot");
			return Ok(SchemaSnapshot::new());
		}

		let sql = format!("SHOW FULL COLUMNS FROM {}", table);
		debug!(sql = %sql, "Describing table");
		let rows = executor.fetch_all(&sql, vec![]).await?;

		let mut snapshot = SchemaSnapshot::new();
		for row in &rows {
			if let Some((name, column)) = self.column_from_row(table, row) {
				snapshot.insert(name, column);
			}
		}
		Ok(snapshot)
	}

	async fn list_tables(&self, executor: &mut dyn SqlExecutor) -> SchemaResult<Vec<String>> {
		let rows = executor.fetch_all("SHOW TABLES", vec![]).await?;
		Ok(rows.iter().filter_map(Row::first_text).collect())
	}

	async fn table_exists(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<bool> {
		validate_identifier(table)?;
		let row = executor
			.fetch_optional(TABLE_EXISTS_SQL, vec![table.into()])
			.await?;
		Ok(row.and_then(|r| r.get_int("table_count")).unwrap_or(0) > 0)
	}

	async fn indexes(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<Vec<IndexDefinition>> {
		if !self.table_exists(executor, table).await? {
			return Ok(Vec::new());
		}

		let sql = format!("SHOW INDEX FROM {}", table);
		let mut rows = executor.fetch_all(&sql, vec![]).await?;
		rows.sort_by_key(|row| row.get_int("Seq_in_index").unwrap_or(0));

		let mut grouped: IndexMap<String, IndexDefinition> = IndexMap::new();
		for row in &rows {
			let (Some(name), Some(column)) = (row.get_text("Key_name"), row.get_text("Column_name")) else {
				continue;
			};
			if name == "PRIMARY" {
				continue;
			}
			let unique = row.get_int("Non_unique") == Some(0);
			grouped
				.entry(name.clone())
				.or_insert_with(|| IndexDefinition {
					name,
					columns: Vec::new(),
					unique,
				})
				.columns
				.push(column);
		}

		let mut indexes: Vec<IndexDefinition> = grouped.into_values().collect();
		indexes.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(indexes)
	}

	async fn foreign_keys(
		&self,
		executor: &mut dyn SqlExecutor,
		table: &str,
	) -> SchemaResult<Vec<ForeignKeyDefinition>> {
		validate_identifier(table)?;
		let rows = executor.fetch_all(FOREIGN_KEYS_SQL, vec![table.into()]).await?;
		Ok(foreign_keys_from_rows(table, &rows))
	}
}
