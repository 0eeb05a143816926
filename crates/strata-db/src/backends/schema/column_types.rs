//! Abstract column types and their per-dialect native mappings
//!
//! Every dialect owns one constant table in each direction. Forward lookups
//! ([`ColumnTypeRegistry::resolve`]) are exact. Reverse lookups differ by
//! dialect:
//!
//! - MySQL matches the lowercased base type exactly against an alias table.
//!   `tinyint(1)` is read as `boolean`, any other `tinyint` as `integer`.
//! - PostgreSQL applies ordered substring rules to the catalog type name, since
//!   the same type is reported as `character varying`, `varchar(255)` or
//!   `timestamp(0) without time zone` depending on the server and the query.
//!
//! Lossy aliases, where the reverse mapping does not return the type that was
//! written:
//!
//! | Dialect | Native | Reads back as |
//! |---------|--------|---------------|
//! | both | `primaryKey` column | `integer` (primary key, auto increment) |
//! | MySQL | `char`, `varchar` | `string` |
//! | MySQL | `tinytext`, `mediumtext`, `longtext` | `text` |
//! | MySQL | `smallint`, `mediumint`, `tinyint(n>1)` | `integer` |
//! | MySQL | `double`, `real` | `float` |
//! | MySQL | `numeric` | `decimal` |
//! | MySQL | `tinyblob`, `mediumblob`, `longblob`, `binary`, `varbinary` | `binary` |
//! | PostgreSQL | `timestamp` abstract type | `datetime` |
//! | PostgreSQL | `smallint`, `serial` | `integer` |
//! | PostgreSQL | `bigserial`, `int8` | `biginteger` |
//! | PostgreSQL | `character`, `bpchar` | `string` |
//! | PostgreSQL | `character varying` without a length | `text` (introspection only) |
//! | PostgreSQL | `real`, `double precision` | `float` |
//! | PostgreSQL | `numeric` | `decimal` |
//!
//! PostgreSQL names that contain a rule's needle without being that type
//! (`interval`, `point` and the range types) are reported as unknown instead
//! of matching the `int` or `date` rule.
//!
//! Known gap: PostgreSQL's `FLOAT` takes a single binary precision, so `float`
//! columns never render a length clause on that dialect.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::SchemaError;
use crate::backends::types::DatabaseType;

/// Database-agnostic column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbstractColumnType {
	#[serde(rename = "primaryKey")]
	PrimaryKey,
	#[serde(rename = "string")]
	String,
	#[serde(rename = "text")]
	Text,
	#[serde(rename = "integer")]
	Integer,
	#[serde(rename = "biginteger", alias = "bigint")]
	BigInteger,
	#[serde(rename = "float")]
	Float,
	#[serde(rename = "decimal")]
	Decimal,
	#[serde(rename = "datetime")]
	DateTime,
	#[serde(rename = "timestamp")]
	Timestamp,
	#[serde(rename = "date")]
	Date,
	#[serde(rename = "time")]
	Time,
	#[serde(rename = "binary")]
	Binary,
	#[serde(rename = "boolean")]
	Boolean,
}

impl AbstractColumnType {
	pub const ALL: [AbstractColumnType; 13] = [
		AbstractColumnType::PrimaryKey,
		AbstractColumnType::String,
		AbstractColumnType::Text,
		AbstractColumnType::Integer,
		AbstractColumnType::BigInteger,
		AbstractColumnType::Float,
		AbstractColumnType::Decimal,
		AbstractColumnType::DateTime,
		AbstractColumnType::Timestamp,
		AbstractColumnType::Date,
		AbstractColumnType::Time,
		AbstractColumnType::Binary,
		AbstractColumnType::Boolean,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			AbstractColumnType::PrimaryKey => "primaryKey",
			AbstractColumnType::String => "string",
			AbstractColumnType::Text => "text",
			AbstractColumnType::Integer => "integer",
			AbstractColumnType::BigInteger => "biginteger",
			AbstractColumnType::Float => "float",
			AbstractColumnType::Decimal => "decimal",
			AbstractColumnType::DateTime => "datetime",
			AbstractColumnType::Timestamp => "timestamp",
			AbstractColumnType::Date => "date",
			AbstractColumnType::Time => "time",
			AbstractColumnType::Binary => "binary",
			AbstractColumnType::Boolean => "boolean",
		}
	}

	pub fn is_temporal(&self) -> bool {
		matches!(
			self,
			AbstractColumnType::DateTime
				| AbstractColumnType::Timestamp
				| AbstractColumnType::Date
				| AbstractColumnType::Time
		)
	}

	pub fn is_integral(&self) -> bool {
		matches!(
			self,
			AbstractColumnType::PrimaryKey
				| AbstractColumnType::Integer
				| AbstractColumnType::BigInteger
		)
	}
}

impl fmt::Display for AbstractColumnType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AbstractColumnType {
	type Err = SchemaError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lowered = s.trim().to_ascii_lowercase();
		if lowered == "bigint" {
			return Ok(AbstractColumnType::BigInteger);
		}
		AbstractColumnType::ALL
			.iter()
			.copied()
			.find(|t| t.as_str().eq_ignore_ascii_case(&lowered))
			.ok_or_else(|| SchemaError::UnknownColumnType(s.to_string()))
	}
}

/// How a native type takes its length arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthStyle {
	/// Never rendered with a length clause
	None,
	/// `(limit)`
	Single,
	/// `(precision,scale)`
	PrecisionScale,
}

/// Native rendering of one abstract type on one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTypeSpec {
	pub sql_name: &'static str,
	pub default_limit: Option<u32>,
	pub default_precision: Option<u32>,
	pub default_scale: Option<u32>,
	pub length_style: LengthStyle,
}

impl NativeTypeSpec {
	const fn plain(sql_name: &'static str) -> Self {
		Self {
			sql_name,
			default_limit: None,
			default_precision: None,
			default_scale: None,
			length_style: LengthStyle::None,
		}
	}

	const fn sized(sql_name: &'static str, default_limit: Option<u32>) -> Self {
		Self {
			sql_name,
			default_limit,
			default_precision: None,
			default_scale: None,
			length_style: LengthStyle::Single,
		}
	}

	const fn numeric(sql_name: &'static str, precision: Option<u32>, scale: Option<u32>) -> Self {
		Self {
			sql_name,
			default_limit: None,
			default_precision: precision,
			default_scale: scale,
			length_style: LengthStyle::PrecisionScale,
		}
	}

	/// Length clause for explicit arguments, falling back to the defaults.
	///
	/// Returns an empty string when nothing was supplied or defaulted.
	pub fn length_clause(&self, limit: Option<u32>, precision: Option<u32>, scale: Option<u32>) -> String {
		match self.length_style {
			LengthStyle::None => String::new(),
			LengthStyle::Single => limit
				.or(self.default_limit)
				.map(|l| format!("({})", l))
				.unwrap_or_default(),
			LengthStyle::PrecisionScale => match precision.or(self.default_precision) {
				Some(p) => match scale.or(self.default_scale) {
					Some(s) => format!("({},{})", p, s),
					None => format!("({})", p),
				},
				None => String::new(),
			},
		}
	}

	/// The type as a catalog would report it with default arguments,
	/// e.g. `VARCHAR(255)` or `TINYINT(1)`
	pub fn catalog_name(&self) -> String {
		format!("{}{}", self.sql_name, self.length_clause(None, None, None))
	}
}

const MYSQL_TYPES: &[(AbstractColumnType, NativeTypeSpec)] = &[
	(AbstractColumnType::PrimaryKey, NativeTypeSpec::plain("INT")),
	(AbstractColumnType::String, NativeTypeSpec::sized("VARCHAR", Some(255))),
	(AbstractColumnType::Text, NativeTypeSpec::plain("TEXT")),
	(AbstractColumnType::Integer, NativeTypeSpec::sized("INT", None)),
	(AbstractColumnType::BigInteger, NativeTypeSpec::sized("BIGINT", None)),
	(AbstractColumnType::Float, NativeTypeSpec::numeric("FLOAT", None, None)),
	(AbstractColumnType::Decimal, NativeTypeSpec::numeric("DECIMAL", Some(10), Some(0))),
	(AbstractColumnType::DateTime, NativeTypeSpec::plain("DATETIME")),
	(AbstractColumnType::Timestamp, NativeTypeSpec::plain("TIMESTAMP")),
	(AbstractColumnType::Date, NativeTypeSpec::plain("DATE")),
	(AbstractColumnType::Time, NativeTypeSpec::plain("TIME")),
	(AbstractColumnType::Binary, NativeTypeSpec::plain("BLOB")),
	(AbstractColumnType::Boolean, NativeTypeSpec::sized("TINYINT", Some(1))),
];

const MYSQL_ALIASES: &[(&str, AbstractColumnType)] = &[
	("varchar", AbstractColumnType::String),
	("char", AbstractColumnType::String),
	("text", AbstractColumnType::Text),
	("tinytext", AbstractColumnType::Text),
	("mediumtext", AbstractColumnType::Text),
	("longtext", AbstractColumnType::Text),
	("int", AbstractColumnType::Integer),
	("integer", AbstractColumnType::Integer),
	("smallint", AbstractColumnType::Integer),
	("mediumint", AbstractColumnType::Integer),
	("tinyint", AbstractColumnType::Integer),
	("bigint", AbstractColumnType::BigInteger),
	("float", AbstractColumnType::Float),
	("double", AbstractColumnType::Float),
	("real", AbstractColumnType::Float),
	("decimal", AbstractColumnType::Decimal),
	("numeric", AbstractColumnType::Decimal),
	("datetime", AbstractColumnType::DateTime),
	("timestamp", AbstractColumnType::Timestamp),
	("date", AbstractColumnType::Date),
	("time", AbstractColumnType::Time),
	("blob", AbstractColumnType::Binary),
	("tinyblob", AbstractColumnType::Binary),
	("mediumblob", AbstractColumnType::Binary),
	("longblob", AbstractColumnType::Binary),
	("binary", AbstractColumnType::Binary),
	("varbinary", AbstractColumnType::Binary),
	("bool", AbstractColumnType::Boolean),
	("boolean", AbstractColumnType::Boolean),
];

const POSTGRES_TYPES: &[(AbstractColumnType, NativeTypeSpec)] = &[
	(AbstractColumnType::PrimaryKey, NativeTypeSpec::plain("SERIAL")),
	(AbstractColumnType::String, NativeTypeSpec::sized("VARCHAR", Some(255))),
	(AbstractColumnType::Text, NativeTypeSpec::plain("TEXT")),
	(AbstractColumnType::Integer, NativeTypeSpec::plain("INTEGER")),
	(AbstractColumnType::BigInteger, NativeTypeSpec::plain("BIGINT")),
	(AbstractColumnType::Float, NativeTypeSpec::plain("FLOAT")),
	(AbstractColumnType::Decimal, NativeTypeSpec::numeric("DECIMAL", None, None)),
	(AbstractColumnType::DateTime, NativeTypeSpec::plain("TIMESTAMP")),
	(AbstractColumnType::Timestamp, NativeTypeSpec::plain("TIMESTAMP")),
	(AbstractColumnType::Date, NativeTypeSpec::plain("DATE")),
	(AbstractColumnType::Time, NativeTypeSpec::plain("TIME")),
	(AbstractColumnType::Binary, NativeTypeSpec::plain("BYTEA")),
	(AbstractColumnType::Boolean, NativeTypeSpec::plain("BOOLEAN")),
];

/// Evaluated top to bottom; the first rule with a matching needle wins.
/// `timestamp` has to be tested before `time`, and `bigint` before `int`.
const POSTGRES_PATTERNS: &[(&[&str], AbstractColumnType)] = &[
	(&["timestamp"], AbstractColumnType::DateTime),
	(&["time"], AbstractColumnType::Time),
	(&["date"], AbstractColumnType::Date),
	(&["bigint", "int8", "bigserial"], AbstractColumnType::BigInteger),
	(&["int", "serial"], AbstractColumnType::Integer),
	(&["char"], AbstractColumnType::String),
	(&["text"], AbstractColumnType::Text),
	(&["numeric", "decimal"], AbstractColumnType::Decimal),
	(&["double", "real", "float"], AbstractColumnType::Float),
	(&["bool"], AbstractColumnType::Boolean),
	(&["bytea"], AbstractColumnType::Binary),
];

/// Catalog names that would otherwise hit a substring rule by accident:
/// `interval` and `point` contain `int`, and `daterange` contains `date`.
/// Checked before [`POSTGRES_PATTERNS`]; a match is an unknown native type.
const POSTGRES_UNMAPPED: &[&str] = &["interval", "point", "range"];

#[derive(Debug, Clone)]
enum ReverseMapping {
	Exact(HashMap<&'static str, AbstractColumnType>),
	Patterns {
		unmapped: &'static [&'static str],
		rules: &'static [(&'static [&'static str], AbstractColumnType)],
	},
}

/// Bidirectional type table for one dialect
///
/// Built once from constant tables and then passed by reference to the
/// components that render or read column types.
#[derive(Debug, Clone)]
pub struct ColumnTypeRegistry {
	dialect: DatabaseType,
	forward: HashMap<AbstractColumnType, NativeTypeSpec>,
	reverse: ReverseMapping,
}

impl ColumnTypeRegistry {
	pub fn for_dialect(dialect: DatabaseType) -> Self {
		match dialect {
			DatabaseType::Mysql => Self::mysql(),
			DatabaseType::Postgres => Self::postgres(),
		}
	}

	pub fn mysql() -> Self {
		Self {
			dialect: DatabaseType::Mysql,
			forward: MYSQL_TYPES.iter().copied().collect(),
			reverse: ReverseMapping::Exact(MYSQL_ALIASES.iter().copied().collect()),
		}
	}

	pub fn postgres() -> Self {
		Self {
			dialect: DatabaseType::Postgres,
			forward: POSTGRES_TYPES.iter().copied().collect(),
			reverse: ReverseMapping::Patterns {
				unmapped: POSTGRES_UNMAPPED,
				rules: POSTGRES_PATTERNS,
			},
		}
	}

	pub fn dialect(&self) -> DatabaseType {
		self.dialect
	}

	pub fn supports(&self, column_type: AbstractColumnType) -> bool {
		self.forward.contains_key(&column_type)
	}

	/// Native rendering of `column_type`
	///
	/// # Examples
	///
	/// ```
	/// use strata_db::backends::schema::{AbstractColumnType, ColumnTypeRegistry};
	///
	/// let registry = ColumnTypeRegistry::mysql();
	/// let spec = registry.resolve(AbstractColumnType::String).unwrap();
	/// assert_eq!(spec.sql_name, "VARCHAR");
	/// assert_eq!(spec.default_limit, Some(255));
	/// ```
	pub fn resolve(&self, column_type: AbstractColumnType) -> Result<&NativeTypeSpec, SchemaError> {
		self.forward.get(&column_type).ok_or_else(|| {
			SchemaError::UnknownColumnType(format!("{} has no {} mapping", column_type, self.dialect))
		})
	}

	/// Abstract type for a native catalog type name
	///
	/// Accepts full catalog spellings such as `int(10) unsigned` or
	/// `character varying(255)`.
	pub fn reverse_resolve(&self, native: &str) -> Result<AbstractColumnType, SchemaError> {
		let lowered = native.trim().to_ascii_lowercase();
		let resolved = match &self.reverse {
			ReverseMapping::Exact(aliases) => {
				let (base, args) = split_native_type(&lowered);
				if base == "tinyint" && args.first().map(String::as_str) == Some("1") {
					Some(AbstractColumnType::Boolean)
				} else {
					aliases.get(base.as_str()).copied()
				}
			}
			ReverseMapping::Patterns { unmapped, .. }
				if unmapped.iter().any(|name| lowered.contains(name)) =>
			{
				None
			}
			ReverseMapping::Patterns { rules, .. } => rules
				.iter()
				.find(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
				.map(|(_, column_type)| *column_type),
		};
		resolved.ok_or_else(|| SchemaError::UnknownNativeType {
			dialect: self.dialect,
			native: native.to_string(),
		})
	}
}

/// Split a catalog type such as `decimal(10,2) unsigned` into its base name and
/// its parenthesised arguments.
pub fn split_native_type(native: &str) -> (String, Vec<String>) {
	let lowered = native.trim().to_ascii_lowercase();
	let (head, args) = match lowered.split_once('(') {
		Some((head, rest)) => {
			let inner = rest.split(')').next().unwrap_or_default();
			let args = inner
				.split(',')
				.map(|a| a.trim().to_string())
				.filter(|a| !a.is_empty())
				.collect();
			(head.to_string(), args)
		}
		None => (lowered.clone(), Vec::new()),
	};
	let base = head
		.split_whitespace()
		.filter(|word| !matches!(*word, "unsigned" | "signed" | "zerofill"))
		.collect::<Vec<_>>()
		.join(" ");
	(base, args)
}
