//! PostgreSQL schema introspection
//!
//! Reads `information_schema` for columns, constraints and tables, and
//! `pg_index` for indexes. Domain types from `information_schema` are cast to
//! `text` / `int4` in every query so rows decode the same way on all server
//! versions.
//!
//! Catalog type names are mapped back through the registry's ordered substring
//! rules, so `character varying`, `timestamp without time zone` and friends all
//! resolve without an exhaustive alias table. An unbounded `character varying`
//! is read as `text` so that recreating the table does not narrow it.

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::backends::executor::SqlExecutor;
use crate::backends::introspection::{SchemaIntrospector, foreign_keys_from_rows};
use crate::backends::schema::{
	AbstractColumnType, ColumnDefault, ColumnSnapshot, ColumnTypeRegistry, ForeignKeyDefinition,
	IndexDefinition, SchemaResult, SchemaSnapshot, validate_identifier,
};
use crate::backends::types::{DatabaseType, Row};

const COLUMNS_SQL: &str = "SELECT column_name::text AS column_name, \
	data_type::text AS data_type, \
	character_maximum_length::int4 AS character_maximum_length, \
	numeric_precision::int4 AS numeric_precision, \
	numeric_scale::int4 AS numeric_scale, \
	is_nullable::text AS is_nullable, \
	column_default::text AS column_default \
	FROM information_schema.columns \
	WHERE table_catalog = current_database() AND table_schema = $1 AND table_name = $2 \
	ORDER BY ordinal_position";

const PRIMARY_KEY_SQL: &str = "SELECT kcu.column_name::text AS column_name \
	FROM information_schema.table_constraints tc \
	JOIN information_schema.key_column_usage kcu \
	ON tc.constraint_name = kcu.constraint_name \
	AND tc.table_schema = kcu.table_schema \
	AND tc.table_name = kcu.table_name \
	WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1 AND tc.table_name = $2 \
	ORDER BY kcu.ordinal_position";

const TABLES_SQL: &str = "SELECT table_name::text AS table_name \
	FROM information_schema.tables \
	WHERE table_schema = $1 AND table_type = 'BASE TABLE'";

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*)::int4 AS table_count \
	FROM information_schema.tables \
	WHERE table_schema = $1 AND table_name = $2";

const INDEXES_SQL: &str = "SELECT i.relname::text AS index_name, \
	a.attname::text AS column_name, \
	ix.indisunique AS is_unique, \
	k.ord::int4 AS position \
	FROM pg_class t \
	JOIN pg_namespace n ON n.oid = t.relnamespace \
	JOIN pg_index ix ON ix.indrelid = t.oid \
	JOIN pg_class i ON i.oid = ix.indexrelid \
	JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON TRUE \
	JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
	WHERE t.relkind = 'r' AND n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary \
	ORDER BY i.relname, k.ord";

const FOREIGN_KEYS_SQL: &str = "SELECT tc.constraint_name::text AS constraint_name, \
	kcu.column_name::text AS column_name, \
	ccu.table_name::text AS referenced_table, \
	ccu.column_name::text AS referenced_column \
	FROM information_schema.table_constraints tc \
	JOIN information_schema.key_column_usage kcu \
	ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
	JOIN information_schema.constraint_column_usage ccu \
	ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema \
	WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1 AND tc.table_name = $2 \
	ORDER BY tc.constraint_name, kcu.ordinal_position";

/// How primary key columns are identified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrimaryKeyDetection {
	/// Read `PRIMARY KEY` constraints
	#[default]
	Constraints,
	/// Treat an integral column named `id` as the primary key.
	///
	/// Matches schema dumps produced by older tooling; composite keys and
	/// differently named keys are not detected.
	LegacyIdHeuristic,
}

/// PostgreSQL schema introspector
#[derive(Debug, Clone)]
pub struct PostgresIntrospector {
	registry: ColumnTypeRegistry,
	schema: String,
	primary_key_detection: PrimaryKeyDetection,
}

impl PostgresIntrospector {
	/// Introspector for the `public` schema
	pub fn new() -> Self {
		Self {
			registry: ColumnTypeRegistry::postgres(),
			schema: "public".to_string(),
			primary_key_detection: PrimaryKeyDetection::default(),
		}
	}

	pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
		self.schema = schema.into();
		self
	}

	pub fn with_primary_key_detection(mut self, detection: PrimaryKeyDetection) -> Self {
		self.primary_key_detection = detection;
		self
	}

	pub fn schema(&self) -> &str {
		&self.schema
	}

	/// Convert one `information_schema.columns` row
	pub fn column_from_row(&self, table: &str, row: &Row) -> Option<(String, ColumnSnapshot)> {
		let name = row.get_text("column_name")?;
		let native = row.get_text("data_type").unwrap_or_default();
		let column_type = self.registry.reverse_resolve(&native).unwrap_or_else(|_| {
			warn!(table, column = %name, native = %native, "Unknown PostgreSQL type, reading as text");
			AbstractColumnType::Text
		});

		let as_u32 = |key: &str| row.get_int(key).and_then(|v| u32::try_from(v).ok());

		// `character varying` without a length is unbounded; a `string` with no
		// limit would be recreated as VARCHAR(255)
		let limit = as_u32("character_maximum_length");
		let column_type = if column_type == AbstractColumnType::String && limit.is_none() {
			debug!(table, column = %name, native = %native, "Unbounded string, reading as text");
			AbstractColumnType::Text
		} else {
			column_type
		};

		let mut column = ColumnSnapshot::new(column_type);
		match column_type {
			AbstractColumnType::String => column.limit = limit,
			AbstractColumnType::Decimal => {
				column.precision = as_u32("numeric_precision");
				column.scale = as_u32("numeric_scale");
			}
			_ => {}
		}

		column.nullable = row
			.get_text("is_nullable")
			.is_some_and(|n| n.eq_ignore_ascii_case("YES"));

		if let Some(default) = row.get_text("column_default") {
			match parse_default(column_type, &default) {
				ParsedDefault::Sequence => column.auto_increment = true,
				ParsedDefault::Value(value) => column.default = Some(value),
				ParsedDefault::None => {}
			}
		}

		if self.primary_key_detection == PrimaryKeyDetection::LegacyIdHeuristic
			&& name == "id"
			&& column_type.is_integral()
		{
			column.primary_key = true;
		}

		Some((name, column))
	}

	async fn primary_key_columns(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<Vec<String>> {
		let rows = executor
			.fetch_all(PRIMARY_KEY_SQL, vec![self.schema.as_str().into(), table.into()])
			.await?;
		Ok(rows.iter().filter_map(|r| r.get_text("column_name")).collect())
	}
}

impl Default for PostgresIntrospector {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Debug, PartialEq)]
enum ParsedDefault {
	None,
	Sequence,
	Value(ColumnDefault),
}

/// Interpret a `column_default` expression
fn parse_default(column_type: AbstractColumnType, default: &str) -> ParsedDefault {
	let trimmed = default.trim();
	let lowered = trimmed.to_ascii_lowercase();

	if lowered.starts_with("nextval(") {
		return ParsedDefault::Sequence;
	}
	if lowered == "null" || lowered.starts_with("null::") {
		return ParsedDefault::None;
	}
	if let Some(literal) = quoted_literal(trimmed) {
		return ParsedDefault::Value(ColumnDefault::Value(literal));
	}
	if column_type.is_temporal()
		&& (lowered.starts_with("current_") || lowered.starts_with("now(") || lowered.starts_with("localtimestamp"))
	{
		return ParsedDefault::None;
	}

	// Bare numbers come back unquoted; negative ones are wrapped in parentheses
	let numeric = trimmed.trim_start_matches('(').trim_end_matches(')');
	if numeric.parse::<f64>().is_ok() || lowered == "true" || lowered == "false" {
		return ParsedDefault::Value(ColumnDefault::Value(numeric.to_string()));
	}
	ParsedDefault::Value(ColumnDefault::expression(trimmed))
}

/// `'it''s'::character varying` to `it's`
fn quoted_literal(default: &str) -> Option<String> {
	let rest = default.strip_prefix('\'')?;
	let mut literal = String::new();
	let mut chars = rest.chars().peekable();
	while let Some(c) = chars.next() {
		if c == '\'' {
			if chars.peek() == Some(&'\'') {
				chars.next();
				literal.push('\'');
			} else {
				return Some(literal);
			}
		} else {
			literal.push(c);
		}
	}
	None
}

#[async_trait]
impl SchemaIntrospector for PostgresIntrospector {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
	}

	async fn describe(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<SchemaSnapshot> {
		validate_identifier(table)?;
		debug!(table, schema = %self.schema, "Describing table");
		let rows = executor
			.fetch_all(COLUMNS_SQL, vec![self.schema.as_str().into(), table.into()])
			.await?;

		let mut snapshot = SchemaSnapshot::new();
		for row in &rows {
			if let Some((name, column)) = self.column_from_row(table, row) {
				snapshot.insert(name, column);
			}
		}

		if !snapshot.is_empty() && self.primary_key_detection == PrimaryKeyDetection::Constraints {
			for column_name in self.primary_key_columns(executor, table).await? {
				if let Some(column) = snapshot.columns.get_mut(&column_name) {
					column.primary_key = true;
				}
			}
		}

		Ok(snapshot)
	}

	async fn list_tables(&self, executor: &mut dyn SqlExecutor) -> SchemaResult<Vec<String>> {
		let rows = executor
			.fetch_all(TABLES_SQL, vec![self.schema.as_str().into()])
			.await?;
		let mut tables: Vec<String> = rows.iter().filter_map(|r| r.get_text("table_name")).collect();
		// Server order is not guaranteed
		tables.sort();
		Ok(tables)
	}

	async fn table_exists(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<bool> {
		validate_identifier(table)?;
		let row = executor
			.fetch_optional(TABLE_EXISTS_SQL, vec![self.schema.as_str().into(), table.into()])
			.await?;
		Ok(row.and_then(|r| r.get_int("table_count")).unwrap_or(0) > 0)
	}

	async fn indexes(&self, executor: &mut dyn SqlExecutor, table: &str) -> SchemaResult<Vec<IndexDefinition>> {
		validate_identifier(table)?;
		let rows = executor
			.fetch_all(INDEXES_SQL, vec![self.schema.as_str().into(), table.into()])
			.await?;

		let mut grouped: IndexMap<String, IndexDefinition> = IndexMap::new();
		for row in &rows {
			let (Some(name), Some(column)) = (row.get_text("index_name"), row.get_text("column_name")) else {
				continue;
			};
			let unique = row.get::<bool>("is_unique").unwrap_or(false);
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
		Ok(grouped.into_values().collect())
	}

	async fn foreign_keys(
		&self,
		executor: &mut dyn SqlExecutor,
		table: &str,
	) -> SchemaResult<Vec<ForeignKeyDefinition>> {
		validate_identifier(table)?;
		let rows = executor
			.fetch_all(FOREIGN_KEYS_SQL, vec![self.schema.as_str().into(), table.into()])
			.await?;
		Ok(foreign_keys_from_rows(table, &rows))
	}
}
