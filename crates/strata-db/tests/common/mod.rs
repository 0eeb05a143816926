//! In-memory database stand-ins for runner and introspection tests
//!
//! [`FakeMySql`] understands the statements the MySQL schema editor and the
//! migration recorder emit, keeps a tiny catalog of tables, columns and
//! indexes, and answers the introspection queries from it. Every executed
//! statement is logged, together with `BEGIN` / `COMMIT` / `ROLLBACK` markers.
//!
//! [`FakePostgres`] is read-only: it serves scripted `information_schema`
//! rows to the PostgreSQL introspector, in the order they were scripted.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;
use strata_db::backends::backend::DatabaseBackend;
use strata_db::backends::error::{DatabaseError, Result};
use strata_db::backends::types::{DatabaseType, QueryResult, QueryValue, Row, TransactionExecutor};
use strata_db::backends::DatabaseConnection;

#[derive(Debug, Clone)]
struct FakeIndex {
	name: String,
	columns: Vec<String>,
	unique: bool,
}

#[derive(Debug, Default)]
struct FakeTable {
	columns: IndexMap<String, Row>,
	indexes: Vec<FakeIndex>,
}

#[derive(Debug, Default)]
struct FakeState {
	tables: IndexMap<String, FakeTable>,
	records: Vec<(String, String, String)>,
	log: Vec<String>,
	fail_on: Vec<String>,
}

/// Scripted MySQL backend sharing its state between clones
#[derive(Debug, Clone, Default)]
pub struct FakeMySql {
	state: Arc<Mutex<FakeState>>,
}

impl FakeMySql {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn connection(&self) -> DatabaseConnection {
		DatabaseConnection::new(Arc::new(self.clone()))
	}

	fn state(&self) -> MutexGuard<'_, FakeState> {
		self.state.lock().unwrap()
	}

	/// Create a table directly, bypassing the log
	pub fn seed_table(&self, table: &str, clauses: &[&str]) {
		let mut state = self.state();
		let mut fake = FakeTable::default();
		for clause in clauses {
			let row = column_row(clause, false);
			fake.columns.insert(row_name(&row), row);
		}
		state.tables.insert(table.to_string(), fake);
	}

	/// Make every statement containing `fragment` fail
	pub fn fail_on(&self, fragment: &str) {
		self.state().fail_on.push(fragment.to_string());
	}

	/// Statements and transaction markers, in order
	pub fn log(&self) -> Vec<String> {
		self.state().log.clone()
	}

	/// Executed statements without transaction markers
	pub fn statements(&self) -> Vec<String> {
		self.log()
			.into_iter()
			.filter(|s| !matches!(s.as_str(), "BEGIN" | "COMMIT" | "ROLLBACK"))
			.collect()
	}

	pub fn clear_log(&self) {
		self.state().log.clear();
	}

	pub fn tables(&self) -> Vec<String> {
		let mut tables: Vec<String> = self.state().tables.keys().cloned().collect();
		tables.sort();
		tables
	}

	pub fn columns(&self, table: &str) -> Vec<String> {
		self.state()
			.tables
			.get(table)
			.map(|t| t.columns.keys().cloned().collect())
			.unwrap_or_default()
	}

	pub fn column(&self, table: &str, column: &str) -> Option<Row> {
		self.state().tables.get(table)?.columns.get(column).cloned()
	}

	pub fn index_names(&self, table: &str) -> Vec<String> {
		self.state()
			.tables
			.get(table)
			.map(|t| t.indexes.iter().map(|i| i.name.clone()).collect())
			.unwrap_or_default()
	}

	/// `(version, name)` of every tracking row, in insertion order
	pub fn records(&self) -> Vec<(String, String)> {
		self.state()
			.records
			.iter()
			.map(|(v, n, _)| (v.clone(), n.clone()))
			.collect()
	}

	pub fn rollback_json(&self, version: &str) -> Option<String> {
		self.state()
			.records
			.iter()
			.find(|(v, _, _)| v == version)
			.map(|(_, _, r)| r.clone())
	}
}

fn text(value: &QueryValue) -> String {
	match value {
		QueryValue::String(s) => s.clone(),
		QueryValue::Int(i) => i.to_string(),
		other => format!("{:?}", other),
	}
}

fn row_name(row: &Row) -> String {
	row.get_text("Field").unwrap_or_default()
}

/// `SHOW FULL COLUMNS` row for a rendered column clause
fn column_row(clause: &str, composite_key: bool) -> Row {
	let clause = clause.trim();
	let (name, rest) = clause.split_once(' ').unwrap_or((clause, ""));
	let (native, flags) = rest.split_once(' ').unwrap_or((rest, ""));
	let upper = flags.to_ascii_uppercase();

	let default = upper.find("DEFAULT ").and_then(|at| {
		let value = &flags[at + "DEFAULT ".len()..];
		match value.strip_prefix('\'') {
			Some(quoted) => quoted.find('\'').map(|end| quoted[..end].to_string()),
			None => value
				.split_whitespace()
				.next()
				.filter(|v| !v.eq_ignore_ascii_case("NULL"))
				.map(str::to_string),
		}
	});
	let auto_increment = upper.contains("AUTO_INCREMENT");
	let primary = composite_key || upper.contains("PRIMARY KEY");
	let not_null = upper.contains("NOT NULL") || auto_increment || primary;

	Row::new()
		.with("Field", name)
		.with("Type", native.to_ascii_lowercase())
		.with("Null", if not_null { "NO" } else { "YES" })
		.with("Key", if primary { "PRI" } else { "" })
		.with("Default", default)
		.with("Extra", if auto_increment { "auto_increment" } else { "" })
}

fn failure(sql: &str) -> DatabaseError {
	DatabaseError::SqlError(sqlx::Error::Protocol(format!("scripted failure: {}", sql)))
}

fn words_after<'a>(sql: &'a str, prefix: &str) -> Option<&'a str> {
	sql.strip_prefix(prefix).map(str::trim)
}

impl FakeState {
	fn execute(&mut self, sql: &str, params: &[QueryValue]) -> Result<QueryResult> {
		self.log.push(sql.to_string());
		if self.fail_on.iter().any(|fragment| sql.contains(fragment.as_str())) {
			return Err(failure(sql));
		}

		let mut affected = 0;
		if let Some(rest) = words_after(sql, "CREATE TABLE ") {
			let (name, body) = rest.split_once(" (\n").unwrap_or((rest, ""));
			let body = body.rsplit_once("\n)").map(|(b, _)| b).unwrap_or(body);
			let lines: Vec<&str> = body.split(",\n").collect();
			let composite: Vec<String> = lines
				.iter()
				.find_map(|l| l.strip_prefix("PRIMARY KEY ("))
				.map(|cols| cols.trim_end_matches(')').split(',').map(str::to_string).collect())
				.unwrap_or_default();
			let mut table = FakeTable::default();
			for line in lines.iter().filter(|l| !l.starts_with("PRIMARY KEY (")) {
				let row = column_row(line, false);
				let name = row_name(&row);
				let row = if composite.contains(&name) { column_row(line, true) } else { row };
				table.columns.insert(name, row);
			}
			self.tables.insert(name.to_string(), table);
		} else if let Some(name) = words_after(sql, "DROP TABLE ") {
			self.tables.shift_remove(name.trim_start_matches("IF EXISTS "));
		} else if let Some(rest) = words_after(sql, "RENAME TABLE ") {
			if let Some((from, to)) = rest.split_once(" TO ")
				&& let Some(table) = self.tables.shift_remove(from)
			{
				self.tables.insert(to.to_string(), table);
			}
		} else if let Some(rest) = words_after(sql, "ALTER TABLE ") {
			let (name, action) = rest.split_once(' ').unwrap_or((rest, ""));
			let table = self.tables.entry(name.to_string()).or_default();
			if let Some(clause) = action.strip_prefix("ADD COLUMN ") {
				let row = column_row(clause, false);
				table.columns.insert(row_name(&row), row);
			} else if let Some(clause) = action.strip_prefix("MODIFY COLUMN ") {
				let row = column_row(clause, false);
				table.columns.insert(row_name(&row), row);
			} else if let Some(renamed) = action.strip_prefix("RENAME COLUMN ") {
				if let Some((from, to)) = renamed.split_once(" TO ")
					&& let Some(mut row) = table.columns.shift_remove(from)
				{
					row.insert("Field".to_string(), QueryValue::from(to));
					table.columns.insert(to.to_string(), row);
				}
			} else if action.starts_with("DROP COLUMN ") {
				for dropped in action.split(", ") {
					if let Some(column) = dropped.strip_prefix("DROP COLUMN ") {
						table.columns.shift_remove(column);
					}
				}
			}
		} else if sql.starts_with("CREATE INDEX ") || sql.starts_with("CREATE UNIQUE INDEX ") {
			let unique = sql.starts_with("CREATE UNIQUE");
			let rest = sql.split_once("INDEX ").map(|(_, r)| r).unwrap_or_default();
			if let Some((name, rest)) = rest.split_once(" ON ")
				&& let Some((table, columns)) = rest.split_once(" (")
			{
				let columns = columns
					.trim_end_matches(')')
					.split(", ")
					.map(str::to_string)
					.collect();
				self.tables.entry(table.to_string()).or_default().indexes.push(FakeIndex {
					name: name.to_string(),
					columns,
					unique,
				});
			}
		} else if let Some(rest) = words_after(sql, "DROP INDEX ") {
			if let Some((name, table)) = rest.split_once(" ON ")
				&& let Some(table) = self.tables.get_mut(table)
			{
				table.indexes.retain(|i| i.name != name);
			}
		} else if sql.starts_with("INSERT INTO ") {
			let values: Vec<String> = params.iter().map(text).collect();
			if let [version, name, rollback] = values.as_slice() {
				self.records.push((version.clone(), name.clone(), rollback.clone()));
				affected = 1;
			}
		} else if sql.starts_with("DELETE FROM ") {
			let version = params.first().map(text).unwrap_or_default();
			let before = self.records.len();
			self.records.retain(|(v, _, _)| *v != version);
			affected = (before - self.records.len()) as u64;
		}

		Ok(QueryResult {
			rows_affected: affected,
		})
	}

	fn fetch_all(&mut self, sql: &str, params: &[QueryValue]) -> Result<Vec<Row>> {
		if self.fail_on.iter().any(|fragment| sql.contains(fragment.as_str())) {
			return Err(failure(sql));
		}
		let first = params.first().map(text).unwrap_or_default();

		if sql.contains("information_schema.tables") {
			let count = i64::from(self.tables.contains_key(&first));
			return Ok(vec![Row::new().with("table_count", count)]);
		}
		if let Some(table) = words_after(sql, "SHOW FULL COLUMNS FROM ") {
			return Ok(self
				.tables
				.get(table)
				.map(|t| t.columns.values().cloned().collect())
				.unwrap_or_default());
		}
		if let Some(table) = words_after(sql, "SHOW INDEX FROM ") {
			let mut rows = Vec::new();
			if let Some(table) = self.tables.get(table) {
				for index in &table.indexes {
					for (seq, column) in index.columns.iter().enumerate() {
						rows.push(
							Row::new()
								.with("Key_name", index.name.as_str())
								.with("Column_name", column.as_str())
								.with("Non_unique", i64::from(!index.unique))
								.with("Seq_in_index", seq as i64 + 1),
						);
					}
				}
			}
			return Ok(rows);
		}
		if sql == "SHOW TABLES" {
			let mut names: Vec<&String> = self.tables.keys().collect();
			names.sort();
			return Ok(names
				.into_iter()
				.map(|n| Row::new().with("Tables_in_app", n.as_str()))
				.collect());
		}
		if sql.starts_with("SELECT version, name, rollback FROM ") {
			let mut records = self.records.clone();
			records.sort();
			return Ok(records
				.into_iter()
				.filter(|(v, _, _)| !sql.contains("WHERE") || *v == first)
				.map(|(v, n, r)| {
					Row::new()
						.with("version", v)
						.with("name", n)
						.with("rollback", r)
				})
				.collect());
		}
		Ok(Vec::new())
	}
}

#[async_trait]
impl DatabaseBackend for FakeMySql {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Mysql
	}

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		self.state().execute(sql, &params)
	}

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		self.fetch_optional(sql, params)
			.await?
			.ok_or_else(|| DatabaseError::ColumnNotFound(format!("no row for {}", sql)))
	}

	async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		self.state().fetch_all(sql, &params)
	}

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		Ok(self.state().fetch_all(sql, &params)?.into_iter().next())
	}

	async fn begin(&self) -> Result<Box<dyn TransactionExecutor>> {
		self.state().log.push("BEGIN".to_string());
		Ok(Box::new(FakeTransaction {
			backend: self.clone(),
		}))
	}
}

/// Transaction over the shared fake state; rolling back only logs the marker
struct FakeTransaction {
	backend: FakeMySql,
}

#[async_trait]
impl TransactionExecutor for FakeTransaction {
	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		self.backend.state().execute(sql, &params)
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		self.backend.state().fetch_all(sql, &params)
	}

	async fn fetch_optional(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		Ok(self.backend.state().fetch_all(sql, &params)?.into_iter().next())
	}

	async fn commit(self: Box<Self>) -> Result<()> {
		self.backend.state().log.push("COMMIT".to_string());
		Ok(())
	}

	async fn rollback(self: Box<Self>) -> Result<()> {
		self.backend.state().log.push("ROLLBACK".to_string());
		Ok(())
	}
}

#[derive(Debug, Default)]
struct PostgresCatalog {
	tables: IndexMap<String, Vec<Row>>,
	primary_keys: IndexMap<String, Vec<String>>,
	queries: Vec<(String, Vec<String>)>,
}

/// Scripted PostgreSQL catalog sharing its state between clones
#[derive(Debug, Clone, Default)]
pub struct FakePostgres {
	catalog: Arc<Mutex<PostgresCatalog>>,
}

impl FakePostgres {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn connection(&self) -> DatabaseConnection {
		DatabaseConnection::new(Arc::new(self.clone()))
	}

	fn catalog(&self) -> MutexGuard<'_, PostgresCatalog> {
		self.catalog.lock().unwrap()
	}

	/// Add a table; `information_schema.tables` lists tables in this order
	pub fn table(&self, table: &str, columns: Vec<Row>) -> &Self {
		self.catalog().tables.insert(table.to_string(), columns);
		self
	}

	/// `PRIMARY KEY` constraint columns, served by the constraint query only
	pub fn primary_key(&self, table: &str, columns: &[&str]) -> &Self {
		self.catalog().primary_keys.insert(
			table.to_string(),
			columns.iter().map(|c| c.to_string()).collect(),
		);
		self
	}

	/// `(sql, params)` of every catalog query, in order
	pub fn queries(&self) -> Vec<(String, Vec<String>)> {
		self.catalog().queries.clone()
	}

	/// `information_schema.columns` row
	pub fn column(name: &str, data_type: &str, nullable: bool) -> Row {
		Row::new()
			.with("column_name", name)
			.with("data_type", data_type)
			.with("character_maximum_length", None::<i64>)
			.with("numeric_precision", None::<i64>)
			.with("numeric_scale", None::<i64>)
			.with("is_nullable", if nullable { "YES" } else { "NO" })
			.with("column_default", None::<&str>)
	}
}

impl PostgresCatalog {
	fn fetch_all(&mut self, sql: &str, params: &[QueryValue]) -> Vec<Row> {
		let params: Vec<String> = params.iter().map(text).collect();
		self.queries.push((sql.to_string(), params.clone()));
		let table = params.get(1).cloned().unwrap_or_default();

		if sql.contains("FROM information_schema.columns") {
			return self.tables.get(&table).cloned().unwrap_or_default();
		}
		if sql.contains("constraint_type = 'PRIMARY KEY'") {
			return self
				.primary_keys
				.get(&table)
				.map(|columns| {
					columns
						.iter()
						.map(|c| Row::new().with("column_name", c.as_str()))
						.collect()
				})
				.unwrap_or_default();
		}
		if sql.contains("table_type = 'BASE TABLE'") {
			return self
				.tables
				.keys()
				.map(|name| Row::new().with("table_name", name.as_str()))
				.collect();
		}
		if sql.contains("COUNT(*)") {
			let count = i64::from(self.tables.contains_key(&table));
			return vec![Row::new().with("table_count", count)];
		}
		Vec::new()
	}
}

#[async_trait]
impl DatabaseBackend for FakePostgres {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
	}

	async fn execute(&self, sql: &str, _params: Vec<QueryValue>) -> Result<QueryResult> {
		Err(failure(sql))
	}

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		self.fetch_optional(sql, params)
			.await?
			.ok_or_else(|| DatabaseError::ColumnNotFound(format!("no row for {}", sql)))
	}

	async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		Ok(self.catalog().fetch_all(sql, &params))
	}

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		Ok(self.catalog().fetch_all(sql, &params).into_iter().next())
	}

	async fn begin(&self) -> Result<Box<dyn TransactionExecutor>> {
		Err(DatabaseError::TransactionError(
			"scripted catalog does not open transactions".to_string(),
		))
	}
}
