//! PostgreSQL-specific schema editor
//!
//! Auto-increment columns are rendered as `SERIAL` / `BIGSERIAL`. Column changes
//! are expressed as one `ALTER TABLE` with separate `ALTER COLUMN` actions for
//! the type, the nullability and the default, since PostgreSQL has no
//! `MODIFY COLUMN`.

use crate::backends::schema::{
	AbstractColumnType, ColumnDefinition, ColumnTypeRegistry, SchemaEditor, SchemaResult,
	native_type_sql, validate_identifier,
};
use crate::backends::types::DatabaseType;

/// PostgreSQL-specific schema editor
#[derive(Debug, Clone)]
pub struct PostgresSchemaEditor {
	registry: ColumnTypeRegistry,
}

impl PostgresSchemaEditor {
	pub fn new() -> Self {
		Self {
			registry: ColumnTypeRegistry::postgres(),
		}
	}

	/// Storage type of a column, as accepted by `ALTER COLUMN ... TYPE`
	///
	/// `SERIAL` is only a creation shorthand, so serial columns are altered
	/// through their integer type.
	fn storage_type_sql(&self, column: &ColumnDefinition) -> SchemaResult<String> {
		match column.column_type {
			AbstractColumnType::PrimaryKey => Ok("INTEGER".to_string()),
			_ => native_type_sql(&self.registry, column),
		}
	}
}

impl Default for PostgresSchemaEditor {
	fn default() -> Self {
		Self::new()
	}
}

impl SchemaEditor for PostgresSchemaEditor {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
	}

	fn registry(&self) -> &ColumnTypeRegistry {
		&self.registry
	}

	fn column_type_sql(&self, column: &ColumnDefinition) -> SchemaResult<String> {
		if column.is_auto_increment() {
			return Ok(match column.column_type {
				AbstractColumnType::BigInteger => "BIGSERIAL".to_string(),
				_ => "SERIAL".to_string(),
			});
		}
		native_type_sql(&self.registry, column)
	}

	fn rename_table_sql(&self, from: &str, to: &str) -> SchemaResult<String> {
		validate_identifier(from)?;
		validate_identifier(to)?;
		Ok(format!("ALTER TABLE {} RENAME TO {}", from, to))
	}

	fn change_column_sql(&self, table: &str, column: &ColumnDefinition) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(&column.name)?;

		let name = &column.name;
		let mut actions = vec![format!(
			"ALTER COLUMN {} TYPE {}",
			name,
			self.storage_type_sql(column)?
		)];

		if column.is_auto_increment() || column.nullable == Some(false) {
			actions.push(format!("ALTER COLUMN {} SET NOT NULL", name));
		} else {
			actions.push(format!("ALTER COLUMN {} DROP NOT NULL", name));
		}

		// The sequence default of a serial column is left alone
		if !column.is_auto_increment() {
			match &column.default {
				Some(default) => actions.push(format!(
					"ALTER COLUMN {} SET DEFAULT {}",
					name,
					default.to_sql()
				)),
				None => actions.push(format!("ALTER COLUMN {} DROP DEFAULT", name)),
			}
		}

		Ok(format!("ALTER TABLE {} {}", table, actions.join(", ")))
	}

	fn remove_index_sql(&self, table: &str, name: &str) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(name)?;
		Ok(format!("DROP INDEX {}", name))
	}

	fn rename_index_sql(&self, table: &str, from: &str, to: &str) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(from)?;
		validate_identifier(to)?;
		Ok(format!("ALTER INDEX {} RENAME TO {}", from, to))
	}

	fn remove_foreign_key_sql(&self, table: &str, name: &str) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(name)?;
		Ok(format!("ALTER TABLE {} DROP CONSTRAINT {}", table, name))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::schema::ColumnDefault;
	use rstest::rstest;

	#[rstest]
	#[case::integer(AbstractColumnType::Integer, "counter SERIAL")]
	#[case::biginteger(AbstractColumnType::BigInteger, "counter BIGSERIAL")]
	fn test_auto_increment_becomes_serial(#[case] column_type: AbstractColumnType, #[case] expected: &str) {
		// Arrange
		let editor = PostgresSchemaEditor::new();
		let column = ColumnDefinition::new("counter", column_type)
			.auto_increment()
			.nullable();

		// Act
		let clause = editor.build_column_clause(&column).unwrap();

		// Assert
		assert_eq!(clause, expected);
	}

	#[rstest]
	fn test_float_has_no_length_clause() {
		// Arrange
		let editor = PostgresSchemaEditor::new();
		let column = ColumnDefinition::new("ratio", AbstractColumnType::Float)
			.precision(8)
			.scale(2);

		// Act
		let clause = editor.build_column_clause(&column).unwrap();

		// Assert
		assert_eq!(clause, "ratio FLOAT");
	}

	#[rstest]
	fn test_change_column_not_null_with_default() {
		// Arrange
		let editor = PostgresSchemaEditor::new();
		let column = ColumnDefinition::new("status", AbstractColumnType::String)
			.limit(20)
			.default(ColumnDefault::from_shorthand("draft"))
			.not_null();

		// Act
		let sql = editor.change_column_sql("posts", &column).unwrap();

		// Assert
		assert_eq!(
			sql,
			"ALTER TABLE posts ALTER COLUMN status TYPE VARCHAR(20), ALTER COLUMN status SET NOT NULL, ALTER COLUMN status SET DEFAULT 'draft'"
		);
	}

	#[rstest]
	fn test_change_column_drops_not_null_and_default() {
		// Arrange
		let editor = PostgresSchemaEditor::new();
		let column = ColumnDefinition::new("body", AbstractColumnType::Text);

		// Act
		let sql = editor.change_column_sql("posts", &column).unwrap();

		// Assert
		assert_eq!(
			sql,
			"ALTER TABLE posts ALTER COLUMN body TYPE TEXT, ALTER COLUMN body DROP NOT NULL, ALTER COLUMN body DROP DEFAULT"
		);
	}

	#[rstest]
	fn test_change_serial_column_keeps_sequence() {
		// Arrange
		let editor = PostgresSchemaEditor::new();
		let column = ColumnDefinition::new("id", AbstractColumnType::PrimaryKey);

		// Act
		let sql = editor.change_column_sql("users", &column).unwrap();

		// Assert
		assert_eq!(
			sql,
			"ALTER TABLE users ALTER COLUMN id TYPE INTEGER, ALTER COLUMN id SET NOT NULL"
		);
	}

	#[rstest]
	fn test_dialect_statements() {
		// Arrange
		let editor = PostgresSchemaEditor::new();

		// Act & Assert
		assert_eq!(
			editor.rename_table_sql("posts", "articles").unwrap(),
			"ALTER TABLE posts RENAME TO articles"
		);
		assert_eq!(
			editor.remove_index_sql("posts", "idx_posts_slug").unwrap(),
			"DROP INDEX idx_posts_slug"
		);
		assert_eq!(
			editor.rename_index_sql("posts", "idx_a", "idx_b").unwrap(),
			"ALTER INDEX idx_a RENAME TO idx_b"
		);
		assert_eq!(
			editor.remove_foreign_key_sql("posts", "fk_posts_user_id").unwrap(),
			"ALTER TABLE posts DROP CONSTRAINT fk_posts_user_id"
		);
	}
}
