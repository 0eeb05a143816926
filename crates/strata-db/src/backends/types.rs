//! Common type definitions for database abstraction

use super::error::{DatabaseError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Database type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
	Mysql,
	Postgres,
}

impl DatabaseType {
	/// Check if this database type supports transactional DDL
	///
	/// - PostgreSQL: Supports transactional DDL
	/// - MySQL/MariaDB: Does NOT support transactional DDL (DDL causes implicit commit)
	///
	/// # Examples
	///
	/// ```
	/// use strata_db::backends::types::DatabaseType;
	///
	/// assert!(DatabaseType::Postgres.supports_transactional_ddl());
	/// assert!(!DatabaseType::Mysql.supports_transactional_ddl());
	/// ```
	pub fn supports_transactional_ddl(&self) -> bool {
		matches!(self, DatabaseType::Postgres)
	}

	/// Bind parameter placeholder for the 1-based parameter `index`
	pub fn placeholder(&self, index: usize) -> String {
		match self {
			DatabaseType::Mysql => "?".to_string(),
			DatabaseType::Postgres => format!("${}", index),
		}
	}

	/// Engine name as written in configuration files
	pub fn as_str(&self) -> &'static str {
		match self {
			DatabaseType::Mysql => "mysql",
			DatabaseType::Postgres => "pgsql",
		}
	}
}

impl fmt::Display for DatabaseType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Query value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Bytes(Vec<u8>),
	Timestamp(chrono::DateTime<chrono::Utc>),
}

impl QueryValue {
	pub fn is_null(&self) -> bool {
		matches!(self, QueryValue::Null)
	}
}

impl From<&str> for QueryValue {
	fn from(s: &str) -> Self {
		QueryValue::String(s.to_string())
	}
}

impl From<String> for QueryValue {
	fn from(s: String) -> Self {
		QueryValue::String(s)
	}
}

impl From<i64> for QueryValue {
	fn from(i: i64) -> Self {
		QueryValue::Int(i)
	}
}

impl From<i32> for QueryValue {
	fn from(i: i32) -> Self {
		QueryValue::Int(i as i64)
	}
}

impl From<f64> for QueryValue {
	fn from(f: f64) -> Self {
		QueryValue::Float(f)
	}
}

impl From<bool> for QueryValue {
	fn from(b: bool) -> Self {
		QueryValue::Bool(b)
	}
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(QueryValue::Null)
	}
}

/// Query result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
	pub rows_affected: u64,
}

/// Row from query result
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
	pub data: HashMap<String, QueryValue>,
}

impl Row {
	pub fn new() -> Self {
		Self {
			data: HashMap::new(),
		}
	}

	pub fn insert(&mut self, key: String, value: QueryValue) {
		self.data.insert(key, value);
	}

	/// Builder-style insert, mostly useful for canned rows in tests
	pub fn with(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
		self.data.insert(key.to_string(), value.into());
		self
	}

	pub fn get<T: TryFrom<QueryValue>>(&self, key: &str) -> std::result::Result<T, DatabaseError>
	where
		DatabaseError: From<<T as TryFrom<QueryValue>>::Error>,
	{
		self.data
			.get(key)
			.cloned()
			.ok_or_else(|| DatabaseError::ColumnNotFound(key.to_string()))
			.and_then(|v| v.try_into().map_err(Into::into))
	}

	/// Read a catalog value as text.
	///
	/// Missing keys and SQL NULL both yield `None`. Numbers and booleans are
	/// rendered, byte strings are decoded as UTF-8 when possible.
	pub fn get_text(&self, key: &str) -> Option<String> {
		match self.data.get(key)? {
			QueryValue::Null => None,
			QueryValue::String(s) => Some(s.clone()),
			QueryValue::Int(i) => Some(i.to_string()),
			QueryValue::Float(f) => Some(f.to_string()),
			QueryValue::Bool(b) => Some(b.to_string()),
			QueryValue::Bytes(b) => String::from_utf8(b.clone()).ok(),
			QueryValue::Timestamp(ts) => Some(ts.to_rfc3339()),
		}
	}

	/// Read a catalog value as an integer, parsing textual numbers.
	pub fn get_int(&self, key: &str) -> Option<i64> {
		match self.data.get(key)? {
			QueryValue::Int(i) => Some(*i),
			QueryValue::Bool(b) => Some(i64::from(*b)),
			QueryValue::Float(f) => Some(*f as i64),
			_ => self.get_text(key).and_then(|s| s.trim().parse().ok()),
		}
	}

	/// First value of a single-column row, such as the output of `SHOW TABLES`
	pub fn first_text(&self) -> Option<String> {
		let key = self.data.keys().next()?;
		self.get_text(key)
	}
}

impl Default for Row {
	fn default() -> Self {
		Self::new()
	}
}

// Type conversions for QueryValue
impl TryFrom<QueryValue> for i64 {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::Int(i) => Ok(i),
			_ => Err(DatabaseError::TypeError(format!(
				"Cannot convert {:?} to i64",
				value
			))),
		}
	}
}

impl TryFrom<QueryValue> for String {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::String(s) => Ok(s),
			QueryValue::Bytes(b) => String::from_utf8(b)
				.map_err(|e| DatabaseError::TypeError(format!("Invalid UTF-8 string: {}", e))),
			_ => Err(DatabaseError::TypeError(format!(
				"Cannot convert {:?} to String",
				value
			))),
		}
	}
}

impl TryFrom<QueryValue> for bool {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::Bool(b) => Ok(b),
			QueryValue::Int(i) => Ok(i != 0),
			_ => Err(DatabaseError::TypeError(format!(
				"Cannot convert {:?} to bool",
				value
			))),
		}
	}
}

/// An open transaction on one pooled connection
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult>;

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>>;

	async fn fetch_optional(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>>;

	async fn commit(self: Box<Self>) -> Result<()>;

	async fn rollback(self: Box<Self>) -> Result<()>;
}
