//! On-disk table snapshots
//!
//! One TOML document per table:
//!
//! ```toml
//! table = "users"
//!
//! [[columns]]
//! name = "id"
//! type = "integer"
//! null = false
//! key = "primary"
//! autoIncrement = true
//!
//! [[columns]]
//! name = "email"
//! type = "string"
//! length = 150
//! null = false
//! ```
//!
//! Absent values are omitted. An explicit `NULL` default is written as
//! `default = "nil"`; the literals `''` and `'nil'` are written as
//! `default = { value = "" }` and `default = { value = "nil" }`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{MigrationError, Result};
use crate::backends::schema::{
	AbstractColumnType, ColumnDefault, ColumnSnapshot, SchemaSnapshot, validate_identifier,
};

const PRIMARY_KEY: &str = "primary";

fn is_false(value: &bool) -> bool {
	!*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnDump {
	name: String,
	#[serde(rename = "type")]
	column_type: AbstractColumnType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	length: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	precision: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	scale: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	default: Option<ColumnDefault>,
	#[serde(default = "default_null")]
	null: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	key: Option<String>,
	#[serde(default, rename = "autoIncrement", skip_serializing_if = "is_false")]
	auto_increment: bool,
}

fn default_null() -> bool {
	true
}

impl ColumnDump {
	fn from_snapshot(name: &str, column: &ColumnSnapshot) -> Self {
		Self {
			name: name.to_string(),
			column_type: column.column_type,
			length: column.limit,
			precision: column.precision,
			scale: column.scale,
			default: column.default.clone(),
			null: column.nullable,
			key: column.primary_key.then(|| PRIMARY_KEY.to_string()),
			auto_increment: column.auto_increment,
		}
	}

	fn into_snapshot(self) -> Result<(String, ColumnSnapshot)> {
		let primary_key = match self.key.as_deref() {
			None => false,
			Some(PRIMARY_KEY) => true,
			Some(other) => {
				return Err(MigrationError::InvalidMigration(format!(
					"column {}: unknown key {:?}",
					self.name, other
				)));
			}
		};
		let column = ColumnSnapshot {
			column_type: self.column_type,
			limit: self.length,
			precision: self.precision,
			scale: self.scale,
			default: self.default,
			nullable: self.null,
			primary_key,
			auto_increment: self.auto_increment,
		};
		Ok((self.name, column))
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct TableDump {
	table: String,
	#[serde(default)]
	columns: Vec<ColumnDump>,
}

/// Serialize a snapshot of `table`
pub fn dump_table(table: &str, snapshot: &SchemaSnapshot) -> Result<String> {
	let dump = TableDump {
		table: table.to_string(),
		columns: snapshot
			.columns
			.iter()
			.map(|(name, column)| ColumnDump::from_snapshot(name, column))
			.collect(),
	};
	Ok(toml::to_string(&dump)?)
}

/// Parse a document written by [`dump_table`]; column order is preserved
pub fn parse_table(text: &str) -> Result<(String, SchemaSnapshot)> {
	let dump: TableDump = toml::from_str(text)?;
	validate_identifier(&dump.table)?;
	let mut snapshot = SchemaSnapshot::new();
	for column in dump.columns {
		let (name, column) = column.into_snapshot()?;
		if snapshot.get(&name).is_some() {
			return Err(MigrationError::InvalidMigration(format!(
				"table {}: duplicate column {}",
				dump.table, name
			)));
		}
		snapshot.insert(name, column);
	}
	Ok((dump.table, snapshot))
}

/// Write `<dir>/<table>.toml`
pub fn write_table(dir: &Path, table: &str, snapshot: &SchemaSnapshot) -> Result<PathBuf> {
	validate_identifier(table)?;
	std::fs::create_dir_all(dir)?;
	let path = dir.join(format!("{}.toml", table));
	std::fs::write(&path, dump_table(table, snapshot)?)?;
	Ok(path)
}

/// Every `*.toml` dump in `dir`, sorted by file name
pub fn load_directory(dir: &Path) -> Result<Vec<(String, SchemaSnapshot)>> {
	if !dir.is_dir() {
		return Ok(Vec::new());
	}
	let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
		.min_depth(1)
		.max_depth(1)
		.into_iter()
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_file())
		.map(|e| e.into_path())
		.filter(|p| p.extension().and_then(|s| s.to_str()) == Some("toml"))
		.collect();
	paths.sort();

	paths
		.iter()
		.map(|path| {
			let text = std::fs::read_to_string(path)?;
			parse_table(&text).map_err(|e| {
				MigrationError::InvalidMigration(format!("{}: {}", path.display(), e))
			})
		})
		.collect()
}
