//! Schema editing: DDL generation for the supported dialects
//!
//! [`SchemaEditor`] renders abstract table and column descriptions into
//! dialect-correct DDL strings. The shared algorithm lives in the trait's
//! provided methods; the MySQL and PostgreSQL editors override only the
//! statements whose syntax differs.
//!
//! Identifiers are emitted unquoted and are validated instead.
//!
//! ## Column clause
//!
//! [`SchemaEditor::build_column_clause`] appends, in this order:
//!
//! 1. the native type name, uppercased
//! 2. `(limit)` or `(precision,scale)` when supplied or defaulted
//! 3. `DEFAULT <value>`
//! 4. the auto-increment marker (MySQL `AUTO_INCREMENT`; PostgreSQL swaps the
//!    type for `SERIAL`/`BIGSERIAL` instead)
//! 5. `PRIMARY KEY` when the column is the table's only primary key column
//! 6. `NULL` / `NOT NULL`, omitted for auto-increment columns
//!
//! ```
//! use strata_db::backends::schema::{editor_for, AbstractColumnType, ColumnDefinition};
//! use strata_db::backends::DatabaseType;
//!
//! let editor = editor_for(DatabaseType::Mysql);
//! let price = ColumnDefinition::new("price", AbstractColumnType::Decimal)
//!     .precision(5)
//!     .scale(2);
//! assert_eq!(editor.build_column_clause(&price).unwrap(), "price DECIMAL(5,2)");
//! ```

pub mod column_types;
pub mod definitions;

pub use column_types::{AbstractColumnType, ColumnTypeRegistry, LengthStyle, NativeTypeSpec};
pub use definitions::{
	ColumnDefault, ColumnDefinition, ColumnSnapshot, ForeignKeyDefinition, IndexDefinition,
	SchemaSnapshot, TableDefinition, validate_identifier,
};

use thiserror::Error;

use super::drivers::mysql::MySqlSchemaEditor;
use super::drivers::postgresql::PostgresSchemaEditor;
use super::error::DatabaseError;
use super::types::DatabaseType;

/// Schema errors
#[derive(Debug, Error)]
pub enum SchemaError {
	/// Abstract type has no mapping on the dialect
	#[error("Unknown column type: {0}")]
	UnknownColumnType(String),

	/// Catalog type with no abstract counterpart
	#[error("Unknown {dialect} native type: {native}")]
	UnknownNativeType {
		dialect: DatabaseType,
		native: String,
	},

	#[error("Invalid identifier: {0:?}")]
	InvalidIdentifier(String),

	#[error("Invalid definition: {0}")]
	InvalidDefinition(String),

	#[error("Database error: {0}")]
	Database(#[from] DatabaseError),
}

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Column alteration handled by [`SchemaEditor::alter_column_sql`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterColumnOperation {
	Add(ColumnDefinition),
	Change(ColumnDefinition),
	Rename { from: String, to: String },
	Remove(String),
}

/// DDL generator for one dialect
pub trait SchemaEditor: Send + Sync {
	fn database_type(&self) -> DatabaseType;

	fn registry(&self) -> &ColumnTypeRegistry;

	/// Native type and length clause for a column (steps 1 and 2)
	fn column_type_sql(&self, column: &ColumnDefinition) -> SchemaResult<String> {
		native_type_sql(self.registry(), column)
	}

	/// Keyword appended after the default for auto-increment columns
	fn auto_increment_keyword(&self) -> Option<&'static str> {
		None
	}

	/// Column clause with an explicit choice of inline `PRIMARY KEY`
	fn column_clause(&self, column: &ColumnDefinition, inline_primary_key: bool) -> SchemaResult<String> {
		validate_identifier(&column.name)?;

		let mut clause = format!("{} {}", column.name, self.column_type_sql(column)?);

		if let Some(default) = &column.default {
			clause.push_str(" DEFAULT ");
			clause.push_str(&default.to_sql());
		}

		let auto_increment = column.is_auto_increment();
		if auto_increment && let Some(keyword) = self.auto_increment_keyword() {
			clause.push(' ');
			clause.push_str(keyword);
		}

		if inline_primary_key {
			clause.push_str(" PRIMARY KEY");
		}

		// Auto-increment columns are NOT NULL at the engine level
		if !auto_increment {
			match column.nullable {
				Some(true) => clause.push_str(" NULL"),
				Some(false) => clause.push_str(" NOT NULL"),
				None => {}
			}
		}

		Ok(clause)
	}

	/// Column clause as it appears in `CREATE TABLE` or `ADD COLUMN`
	///
	/// A primary key column is rendered with an inline `PRIMARY KEY`; use
	/// [`SchemaEditor::create_table_sql`] for composite keys.
	fn build_column_clause(&self, column: &ColumnDefinition) -> SchemaResult<String> {
		self.column_clause(column, column.is_primary())
	}

	/// `CREATE TABLE` statement
	///
	/// Fails as a whole when any column's type cannot be resolved.
	fn create_table_sql(&self, table: &TableDefinition) -> SchemaResult<String> {
		table.validate()?;

		let primary_keys = table.primary_key_columns();
		let inline_primary = primary_keys.len() == 1;

		let mut lines = table
			.columns
			.iter()
			.map(|column| self.column_clause(column, inline_primary && column.is_primary()))
			.collect::<SchemaResult<Vec<_>>>()?;

		if primary_keys.len() > 1 {
			lines.push(format!("PRIMARY KEY ({})", primary_keys.join(",")));
		}

		let mut sql = format!("CREATE TABLE {} (\n{}\n)", table.name, lines.join(",\n"));
		if let Some(options) = table.options.as_deref().filter(|o| !o.trim().is_empty()) {
			sql.push(' ');
			sql.push_str(options);
		}
		Ok(sql)
	}

	/// `CREATE TABLE` followed by the table's indexes and foreign keys
	fn create_table_statements(&self, table: &TableDefinition) -> SchemaResult<Vec<String>> {
		let mut statements = vec![self.create_table_sql(table)?];
		for index in &table.indexes {
			statements.push(self.add_index_sql(&table.name, index)?);
		}
		for foreign_key in &table.foreign_keys {
			statements.push(self.add_foreign_key_sql(foreign_key)?);
		}
		Ok(statements)
	}

	fn drop_table_sql(&self, table: &str, if_exists: bool) -> SchemaResult<String> {
		validate_identifier(table)?;
		Ok(if if_exists {
			format!("DROP TABLE IF EXISTS {}", table)
		} else {
			format!("DROP TABLE {}", table)
		})
	}

	fn rename_table_sql(&self, from: &str, to: &str) -> SchemaResult<String>;

	fn alter_column_sql(&self, table: &str, operation: &AlterColumnOperation) -> SchemaResult<String> {
		match operation {
			AlterColumnOperation::Add(column) => self.add_column_sql(table, column),
			AlterColumnOperation::Change(column) => self.change_column_sql(table, column),
			AlterColumnOperation::Rename { from, to } => self.rename_column_sql(table, from, to),
			AlterColumnOperation::Remove(column) => self.remove_column_sql(table, column),
		}
	}

	fn add_column_sql(&self, table: &str, column: &ColumnDefinition) -> SchemaResult<String> {
		validate_identifier(table)?;
		Ok(format!(
			"ALTER TABLE {} ADD COLUMN {}",
			table,
			self.build_column_clause(column)?
		))
	}

	/// Redefine an existing column. Never re-declares the primary key.
	fn change_column_sql(&self, table: &str, column: &ColumnDefinition) -> SchemaResult<String>;

	fn rename_column_sql(&self, table: &str, from: &str, to: &str) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(from)?;
		validate_identifier(to)?;
		Ok(format!("ALTER TABLE {} RENAME COLUMN {} TO {}", table, from, to))
	}

	fn remove_column_sql(&self, table: &str, column: &str) -> SchemaResult<String> {
		self.remove_columns_sql(table, &[column])
	}

	/// One `ALTER TABLE` with a `DROP COLUMN` clause per column
	fn remove_columns_sql(&self, table: &str, columns: &[&str]) -> SchemaResult<String> {
		validate_identifier(table)?;
		if columns.is_empty() {
			return Err(SchemaError::InvalidDefinition(format!(
				"no columns to remove from {}",
				table
			)));
		}
		let clauses = columns
			.iter()
			.map(|column| validate_identifier(column).map(|_| format!("DROP COLUMN {}", column)))
			.collect::<SchemaResult<Vec<_>>>()?;
		Ok(format!("ALTER TABLE {} {}", table, clauses.join(", ")))
	}

	fn add_index_sql(&self, table: &str, index: &IndexDefinition) -> SchemaResult<String> {
		validate_identifier(table)?;
		if index.columns.is_empty() {
			return Err(SchemaError::InvalidDefinition(format!(
				"index on {} has no columns",
				table
			)));
		}
		for column in &index.columns {
			validate_identifier(column)?;
		}
		let name = index.resolved_name(table);
		validate_identifier(&name)?;
		Ok(format!(
			"CREATE {}INDEX {} ON {} ({})",
			if index.unique { "UNIQUE " } else { "" },
			name,
			table,
			index.columns.join(", ")
		))
	}

	fn remove_index_sql(&self, table: &str, name: &str) -> SchemaResult<String>;

	fn rename_index_sql(&self, table: &str, from: &str, to: &str) -> SchemaResult<String>;

	fn add_foreign_key_sql(&self, foreign_key: &ForeignKeyDefinition) -> SchemaResult<String> {
		let name = foreign_key.resolved_name();
		for identifier in [
			name.as_str(),
			&foreign_key.from_table,
			&foreign_key.from_column,
			&foreign_key.to_table,
			&foreign_key.to_column,
		] {
			validate_identifier(identifier)?;
		}
		Ok(format!(
			"ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
			foreign_key.from_table,
			name,
			foreign_key.from_column,
			foreign_key.to_table,
			foreign_key.to_column
		))
	}

	fn remove_foreign_key_sql(&self, table: &str, name: &str) -> SchemaResult<String>;
}

/// Registry rendering of a column's type, without any auto-increment rewriting
pub fn native_type_sql(registry: &ColumnTypeRegistry, column: &ColumnDefinition) -> SchemaResult<String> {
	let spec = registry.resolve(column.column_type)?;
	Ok(format!(
		"{}{}",
		spec.sql_name.to_uppercase(),
		spec.length_clause(column.limit, column.precision, column.scale)
	))
}

/// Schema editor for a dialect
pub fn editor_for(database_type: DatabaseType) -> Box<dyn SchemaEditor> {
	match database_type {
		DatabaseType::Mysql => Box::new(MySqlSchemaEditor::new()),
		DatabaseType::Postgres => Box::new(PostgresSchemaEditor::new()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn users_table() -> TableDefinition {
		TableDefinition::new("users")
			.column(ColumnDefinition::new("id", AbstractColumnType::PrimaryKey))
			.column(
				ColumnDefinition::new("email", AbstractColumnType::String)
					.limit(150)
					.not_null(),
			)
			.column(ColumnDefinition::new("bio", AbstractColumnType::Text).nullable())
	}

	#[rstest]
	fn test_integer_with_quoted_default() {
		// Arrange
		let editor = editor_for(DatabaseType::Mysql);
		let column = ColumnDefinition::new("age", AbstractColumnType::Integer)
			.not_null()
			.default_value("0");

		// Act
		let clause = editor.build_column_clause(&column).unwrap();

		// Assert
		assert_eq!(clause, "age INT DEFAULT '0' NOT NULL");
	}

	#[rstest]
	fn test_decimal_precision_scale() {
		// Arrange
		let editor = editor_for(DatabaseType::Mysql);
		let column = ColumnDefinition::new("price", AbstractColumnType::Decimal)
			.precision(5)
			.scale(2);

		// Act
		let clause = editor.build_column_clause(&column).unwrap();

		// Assert
		assert_eq!(clause, "price DECIMAL(5,2)");
	}

	#[rstest]
	#[case(DatabaseType::Mysql, "id INT AUTO_INCREMENT PRIMARY KEY")]
	#[case(DatabaseType::Postgres, "id SERIAL PRIMARY KEY")]
	fn test_primary_key_column(#[case] dialect: DatabaseType, #[case] expected: &str) {
		// Arrange
		let editor = editor_for(dialect);
		let column = ColumnDefinition::new("id", AbstractColumnType::PrimaryKey).not_null();

		// Act
		let clause = editor.build_column_clause(&column).unwrap();

		// Assert
		assert_eq!(clause, expected);
	}

	#[rstest]
	fn test_explicit_null_default() {
		// Arrange
		let editor = editor_for(DatabaseType::Mysql);
		let column = ColumnDefinition::new("deleted", AbstractColumnType::DateTime)
			.nullable()
			.default_value("nil");

		// Act
		let clause = editor.build_column_clause(&column).unwrap();

		// Assert
		assert_eq!(clause, "deleted DATETIME DEFAULT NULL NULL");
	}

	#[rstest]
	fn test_numeric_default_is_unquoted() {
		// Arrange
		let editor = editor_for(DatabaseType::Postgres);
		let column = ColumnDefinition::new("stock", AbstractColumnType::Integer)
			.default(ColumnDefault::number(10))
			.not_null();

		// Act
		let clause = editor.build_column_clause(&column).unwrap();

		// Assert
		assert_eq!(clause, "stock INTEGER DEFAULT 10 NOT NULL");
	}

	#[rstest]
	#[case(DatabaseType::Mysql, "CREATE TABLE users (\nid INT AUTO_INCREMENT PRIMARY KEY,\nemail VARCHAR(150) NOT NULL,\nbio TEXT NULL\n)")]
	#[case(DatabaseType::Postgres, "CREATE TABLE users (\nid SERIAL PRIMARY KEY,\nemail VARCHAR(150) NOT NULL,\nbio TEXT NULL\n)")]
	fn test_create_table(#[case] dialect: DatabaseType, #[case] expected: &str) {
		// Arrange
		let editor = editor_for(dialect);

		// Act
		let sql = editor.create_table_sql(&users_table()).unwrap();

		// Assert
		assert_eq!(sql, expected);
	}

	#[rstest]
	fn test_create_table_composite_primary_key() {
		// Arrange
		let editor = editor_for(DatabaseType::Mysql);
		let table = TableDefinition::new("memberships")
			.column(
				ColumnDefinition::new("user_id", AbstractColumnType::Integer)
					.primary_key()
					.not_null(),
			)
			.column(
				ColumnDefinition::new("group_id", AbstractColumnType::Integer)
					.primary_key()
					.not_null(),
			)
			.with_options("ENGINE=InnoDB");

		// Act
		let sql = editor.create_table_sql(&table).unwrap();

		// Assert
		assert_eq!(
			sql,
			"CREATE TABLE memberships (\nuser_id INT NOT NULL,\ngroup_id INT NOT NULL,\nPRIMARY KEY (user_id,group_id)\n) ENGINE=InnoDB"
		);
	}

	#[rstest]
	fn test_create_table_statements_include_indexes_and_foreign_keys() {
		// Arrange
		let editor = editor_for(DatabaseType::Postgres);
		let table = TableDefinition::new("posts")
			.column(ColumnDefinition::new("id", AbstractColumnType::PrimaryKey))
			.column(ColumnDefinition::new("user_id", AbstractColumnType::Integer).not_null())
			.index(IndexDefinition::new("", ["user_id"]))
			.foreign_key(ForeignKeyDefinition::new("posts", "user_id", "users"));

		// Act
		let statements = editor.create_table_statements(&table).unwrap();

		// Assert
		assert_eq!(statements.len(), 3);
		assert_eq!(statements[1], "CREATE INDEX idx_posts_user_id ON posts (user_id)");
		assert_eq!(
			statements[2],
			"ALTER TABLE posts ADD CONSTRAINT fk_posts_user_id FOREIGN KEY (user_id) REFERENCES users (id)"
		);
	}

	#[rstest]
	fn test_remove_columns_is_one_statement() {
		// Arrange
		let editor = editor_for(DatabaseType::Mysql);

		// Act
		let sql = editor.remove_columns_sql("users", &["a", "b", "c"]).unwrap();

		// Assert
		assert_eq!(sql, "ALTER TABLE users DROP COLUMN a, DROP COLUMN b, DROP COLUMN c");
		assert_eq!(sql.matches("ALTER TABLE").count(), 1);
		assert_eq!(sql.matches("DROP COLUMN").count(), 3);
	}

	#[rstest]
	#[case(DatabaseType::Mysql)]
	#[case(DatabaseType::Postgres)]
	fn test_alter_column_operations(#[case] dialect: DatabaseType) {
		// Arrange
		let editor = editor_for(dialect);
		let rename = AlterColumnOperation::Rename {
			from: "name".to_string(),
			to: "title".to_string(),
		};
		let remove = AlterColumnOperation::Remove("legacy".to_string());
		let add = AlterColumnOperation::Add(ColumnDefinition::new("body", AbstractColumnType::Text));

		// Act & Assert
		assert_eq!(
			editor.alter_column_sql("posts", &rename).unwrap(),
			"ALTER TABLE posts RENAME COLUMN name TO title"
		);
		assert_eq!(
			editor.alter_column_sql("posts", &remove).unwrap(),
			"ALTER TABLE posts DROP COLUMN legacy"
		);
		assert_eq!(
			editor.alter_column_sql("posts", &add).unwrap(),
			"ALTER TABLE posts ADD COLUMN body TEXT"
		);
	}

	#[rstest]
	fn test_unique_index() {
		// Arrange
		let editor = editor_for(DatabaseType::Mysql);
		let index = IndexDefinition::new("users_email_unique", ["email"]).unique();

		// Act
		let sql = editor.add_index_sql("users", &index).unwrap();

		// Assert
		assert_eq!(sql, "CREATE UNIQUE INDEX users_email_unique ON users (email)");
	}

	#[rstest]
	fn test_invalid_identifier_is_rejected() {
		// Arrange
		let editor = editor_for(DatabaseType::Mysql);
		let column = ColumnDefinition::new("bad name", AbstractColumnType::String);

		// Act
		let result = editor.add_column_sql("users", &column);

		// Assert
		assert!(matches!(result, Err(SchemaError::InvalidIdentifier(_))));
	}

	#[rstest]
	fn test_drop_table() {
		let editor = editor_for(DatabaseType::Postgres);
		assert_eq!(editor.drop_table_sql("users", false).unwrap(), "DROP TABLE users");
		assert_eq!(
			editor.drop_table_sql("users", true).unwrap(),
			"DROP TABLE IF EXISTS users"
		);
	}
}
