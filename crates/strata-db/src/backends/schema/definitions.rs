//! Table, column, index and foreign key descriptions
//!
//! Definitions describe desired state and leave unset what the dialect should
//! decide. Snapshots describe actual state as read back by an introspector.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::SchemaError;
use super::column_types::AbstractColumnType;

/// Column default value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDefault", into = "RawDefault")]
pub enum ColumnDefault {
	/// Explicit SQL `NULL`
	Null,
	/// Literal rendered single-quoted
	Value(String),
	/// Numeric literal rendered unquoted
	Number(String),
	/// SQL expression rendered verbatim, e.g. `CURRENT_TIMESTAMP`
	Expression(String),
}

impl ColumnDefault {
	/// Expand the string shorthand: `""` and `"nil"` mean SQL `NULL`, anything
	/// else is a quoted literal.
	pub fn from_shorthand(value: &str) -> Self {
		if is_null_shorthand(value) {
			ColumnDefault::Null
		} else {
			ColumnDefault::Value(value.to_string())
		}
	}

	pub fn number(value: impl ToString) -> Self {
		ColumnDefault::Number(value.to_string())
	}

	pub fn expression(value: impl Into<String>) -> Self {
		ColumnDefault::Expression(value.into())
	}

	pub fn to_sql(&self) -> String {
		match self {
			ColumnDefault::Null => "NULL".to_string(),
			ColumnDefault::Value(v) => format!("'{}'", v.replace('\'', "''")),
			ColumnDefault::Number(n) | ColumnDefault::Expression(n) => n.clone(),
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, ColumnDefault::Null)
	}
}

/// On-disk spelling of a default: a string (shorthand rules apply), a bare
/// number, a boolean, `{ expression = "..." }` or `{ value = "..." }`.
///
/// `{ value = "..." }` is always a literal, so it carries the strings that the
/// shorthand would read as `NULL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDefault {
	Integer(i64),
	Float(f64),
	Bool(bool),
	Text(String),
	Expression { expression: String },
	Literal { value: String },
}

fn is_null_shorthand(value: &str) -> bool {
	matches!(value, "" | "nil")
}

impl From<RawDefault> for ColumnDefault {
	fn from(raw: RawDefault) -> Self {
		match raw {
			RawDefault::Integer(i) => ColumnDefault::number(i),
			RawDefault::Float(f) => ColumnDefault::number(f),
			RawDefault::Bool(b) => ColumnDefault::Expression(if b { "TRUE" } else { "FALSE" }.to_string()),
			RawDefault::Text(s) => ColumnDefault::from_shorthand(&s),
			RawDefault::Expression { expression } => ColumnDefault::Expression(expression),
			RawDefault::Literal { value } => ColumnDefault::Value(value),
		}
	}
}

impl From<ColumnDefault> for RawDefault {
	fn from(default: ColumnDefault) -> Self {
		match default {
			ColumnDefault::Null => RawDefault::Text("nil".to_string()),
			ColumnDefault::Value(v) if is_null_shorthand(&v) => RawDefault::Literal { value: v },
			ColumnDefault::Value(v) => RawDefault::Text(v),
			ColumnDefault::Number(n) => {
				if let Ok(i) = n.parse::<i64>() {
					RawDefault::Integer(i)
				} else if let Ok(f) = n.parse::<f64>() {
					RawDefault::Float(f)
				} else {
					RawDefault::Expression { expression: n }
				}
			}
			ColumnDefault::Expression(expression) => RawDefault::Expression { expression },
		}
	}
}

/// Desired column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
	pub name: String,

	#[serde(rename = "type")]
	pub column_type: AbstractColumnType,

	/// Maximum length or display width
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub limit: Option<u32>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub precision: Option<u32>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scale: Option<u32>,

	/// Unset leaves nullability to the dialect
	#[serde(default, skip_serializing_if = "Option::is_none", alias = "null")]
	pub nullable: Option<bool>,

	#[serde(default, skip_serializing_if = "Option::is_none", alias = "defaultValue")]
	pub default: Option<ColumnDefault>,

	#[serde(default, alias = "primaryKey")]
	pub primary_key: bool,

	#[serde(default, alias = "autoIncrement")]
	pub auto_increment: bool,
}

impl ColumnDefinition {
	pub fn new(name: impl Into<String>, column_type: AbstractColumnType) -> Self {
		Self {
			name: name.into(),
			column_type,
			limit: None,
			precision: None,
			scale: None,
			nullable: None,
			default: None,
			primary_key: false,
			auto_increment: false,
		}
	}

	/// Build from a bare type name such as `"string"`
	pub fn from_shorthand(name: impl Into<String>, type_name: &str) -> Result<Self, SchemaError> {
		Ok(Self::new(name, type_name.parse()?))
	}

	pub fn limit(mut self, limit: u32) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn precision(mut self, precision: u32) -> Self {
		self.precision = Some(precision);
		self
	}

	pub fn scale(mut self, scale: u32) -> Self {
		self.scale = Some(scale);
		self
	}

	pub fn nullable(mut self) -> Self {
		self.nullable = Some(true);
		self
	}

	pub fn not_null(mut self) -> Self {
		self.nullable = Some(false);
		self
	}

	pub fn default(mut self, default: ColumnDefault) -> Self {
		self.default = Some(default);
		self
	}

	/// Default from the string shorthand, see [`ColumnDefault::from_shorthand`]
	pub fn default_value(self, value: &str) -> Self {
		self.default(ColumnDefault::from_shorthand(value))
	}

	pub fn primary_key(mut self) -> Self {
		self.primary_key = true;
		self
	}

	pub fn auto_increment(mut self) -> Self {
		self.auto_increment = true;
		self
	}

	/// `primaryKey` columns are always primary and auto-incrementing
	pub fn is_primary(&self) -> bool {
		self.primary_key || self.column_type == AbstractColumnType::PrimaryKey
	}

	pub fn is_auto_increment(&self) -> bool {
		self.auto_increment || self.column_type == AbstractColumnType::PrimaryKey
	}
}

/// Desired index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
	/// Empty means `idx_<table>_<columns>`
	#[serde(default)]
	pub name: String,
	pub columns: Vec<String>,
	#[serde(default)]
	pub unique: bool,
}

impl IndexDefinition {
	pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
		Self {
			name: name.into(),
			columns: columns.into_iter().map(Into::into).collect(),
			unique: false,
		}
	}

	pub fn unique(mut self) -> Self {
		self.unique = true;
		self
	}

	pub fn resolved_name(&self, table: &str) -> String {
		if self.name.is_empty() {
			format!("idx_{}_{}", table, self.columns.join("_"))
		} else {
			self.name.clone()
		}
	}
}

fn default_referenced_column() -> String {
	"id".to_string()
}

/// Desired foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
	/// Empty means `fk_<from_table>_<from_column>`
	#[serde(default)]
	pub name: String,
	pub from_table: String,
	pub from_column: String,
	pub to_table: String,
	#[serde(default = "default_referenced_column")]
	pub to_column: String,
}

impl ForeignKeyDefinition {
	/// Reference `to_table.id`
	pub fn new(
		from_table: impl Into<String>,
		from_column: impl Into<String>,
		to_table: impl Into<String>,
	) -> Self {
		Self {
			name: String::new(),
			from_table: from_table.into(),
			from_column: from_column.into(),
			to_table: to_table.into(),
			to_column: default_referenced_column(),
		}
	}

	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn references_column(mut self, column: impl Into<String>) -> Self {
		self.to_column = column.into();
		self
	}

	pub fn resolved_name(&self) -> String {
		if self.name.is_empty() {
			format!("fk_{}_{}", self.from_table, self.from_column)
		} else {
			self.name.clone()
		}
	}
}

/// Desired table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
	pub name: String,
	/// Insertion order is DDL column order
	pub columns: Vec<ColumnDefinition>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub indexes: Vec<IndexDefinition>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub foreign_keys: Vec<ForeignKeyDefinition>,
	/// Dialect table options appended after the closing parenthesis
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub options: Option<String>,
}

impl TableDefinition {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			columns: Vec::new(),
			indexes: Vec::new(),
			foreign_keys: Vec::new(),
			options: None,
		}
	}

	pub fn column(mut self, column: ColumnDefinition) -> Self {
		self.columns.push(column);
		self
	}

	pub fn index(mut self, index: IndexDefinition) -> Self {
		self.indexes.push(index);
		self
	}

	pub fn foreign_key(mut self, foreign_key: ForeignKeyDefinition) -> Self {
		self.foreign_keys.push(foreign_key);
		self
	}

	pub fn with_options(mut self, options: impl Into<String>) -> Self {
		self.options = Some(options.into());
		self
	}

	pub fn primary_key_columns(&self) -> Vec<&str> {
		self.columns
			.iter()
			.filter(|c| c.is_primary())
			.map(|c| c.name.as_str())
			.collect()
	}

	/// Check names before any DDL is rendered
	pub fn validate(&self) -> Result<(), SchemaError> {
		validate_identifier(&self.name)?;
		if self.columns.is_empty() {
			return Err(SchemaError::InvalidDefinition(format!(
				"table {} has no columns",
				self.name
			)));
		}
		let mut seen = HashSet::new();
		for column in &self.columns {
			validate_identifier(&column.name)?;
			if !seen.insert(column.name.as_str()) {
				return Err(SchemaError::InvalidDefinition(format!(
					"duplicate column {} in table {}",
					column.name, self.name
				)));
			}
		}
		Ok(())
	}
}

/// Identifiers are emitted unquoted, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
	let mut chars = name.chars();
	let valid = match chars.next() {
		Some(first) => {
			(first.is_ascii_alphabetic() || first == '_')
				&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
		}
		None => false,
	};
	if valid {
		Ok(())
	} else {
		Err(SchemaError::InvalidIdentifier(name.to_string()))
	}
}

/// Actual state of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
	pub column_type: AbstractColumnType,
	pub limit: Option<u32>,
	pub precision: Option<u32>,
	pub scale: Option<u32>,
	pub default: Option<ColumnDefault>,
	pub nullable: bool,
	pub primary_key: bool,
	pub auto_increment: bool,
}

impl ColumnSnapshot {
	pub fn new(column_type: AbstractColumnType) -> Self {
		Self {
			column_type,
			limit: None,
			precision: None,
			scale: None,
			default: None,
			nullable: true,
			primary_key: false,
			auto_increment: false,
		}
	}

	/// Definition that recreates this column
	pub fn to_definition(&self, name: &str) -> ColumnDefinition {
		ColumnDefinition {
			name: name.to_string(),
			column_type: self.column_type,
			limit: self.limit,
			precision: self.precision,
			scale: self.scale,
			nullable: Some(self.nullable),
			default: self.default.clone(),
			primary_key: self.primary_key,
			auto_increment: self.auto_increment,
		}
	}
}

/// Introspected table: column name to column state, in table order.
///
/// An empty snapshot means the table does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
	pub columns: IndexMap<String, ColumnSnapshot>,
}

impl SchemaSnapshot {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<String>, column: ColumnSnapshot) {
		self.columns.insert(name.into(), column);
	}

	pub fn get(&self, name: &str) -> Option<&ColumnSnapshot> {
		self.columns.get(name)
	}

	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}

	pub fn len(&self) -> usize {
		self.columns.len()
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.keys().map(String::as_str).collect()
	}

	pub fn column_definition(&self, name: &str) -> Option<ColumnDefinition> {
		self.columns.get(name).map(|c| c.to_definition(name))
	}

	/// Definition that recreates the table's columns
	pub fn to_table_definition(&self, table: &str) -> TableDefinition {
		self.columns
			.iter()
			.fold(TableDefinition::new(table), |table, (name, column)| {
				table.column(column.to_definition(name))
			})
	}
}
