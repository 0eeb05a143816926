//! MySQL-specific schema editor
//!
//! MySQL renders auto-increment as a column attribute, renames tables with
//! `RENAME TABLE`, and redefines columns with `MODIFY COLUMN`. Index and
//! foreign key removal are table-scoped.

use crate::backends::schema::{
	ColumnDefinition, ColumnTypeRegistry, SchemaEditor, SchemaResult, validate_identifier,
};
use crate::backends::types::DatabaseType;

/// MySQL-specific schema editor
#[derive(Debug, Clone)]
pub struct MySqlSchemaEditor {
	registry: ColumnTypeRegistry,
}

impl MySqlSchemaEditor {
	pub fn new() -> Self {
		Self {
			registry: ColumnTypeRegistry::mysql(),
		}
	}
}

impl Default for MySqlSchemaEditor {
	fn default() -> Self {
		Self::new()
	}
}

impl SchemaEditor for MySqlSchemaEditor {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Mysql
	}

	fn registry(&self) -> &ColumnTypeRegistry {
		&self.registry
	}

	fn auto_increment_keyword(&self) -> Option<&'static str> {
		Some("AUTO_INCREMENT")
	}

	fn rename_table_sql(&self, from: &str, to: &str) -> SchemaResult<String> {
		validate_identifier(from)?;
		validate_identifier(to)?;
		Ok(format!("RENAME TABLE {} TO {}", from, to))
	}

	fn change_column_sql(&self, table: &str, column: &ColumnDefinition) -> SchemaResult<String> {
		validate_identifier(table)?;
		Ok(format!(
			"ALTER TABLE {} MODIFY COLUMN {}",
			table,
			self.column_clause(column, false)?
		))
	}

	fn remove_index_sql(&self, table: &str, name: &str) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(name)?;
		Ok(format!("DROP INDEX {} ON {}", name, table))
	}

	fn rename_index_sql(&self, table: &str, from: &str, to: &str) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(from)?;
		validate_identifier(to)?;
		Ok(format!("ALTER TABLE {} RENAME INDEX {} TO {}", table, from, to))
	}

	fn remove_foreign_key_sql(&self, table: &str, name: &str) -> SchemaResult<String> {
		validate_identifier(table)?;
		validate_identifier(name)?;
		Ok(format!("ALTER TABLE {} DROP FOREIGN KEY {}", table, name))
	}
}
