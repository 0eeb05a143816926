//! Desired-state operations and their inverses
//!
//! An [`Operation`] is resolved right before it runs: the dialect editor
//! renders the forward statements and, where the inverse depends on what is
//! being replaced or removed, the introspector reads the current definition
//! through the same executor. The inverse of a step is therefore always the
//! state the step overwrote.
//!
//! | operation | inverse |
//! |-----------|---------|
//! | `create_table` | `drop_table` |
//! | `drop_table` | re-create from introspected columns, indexes and foreign keys |
//! | `rename_table`, `rename_column`, `rename_index` | rename back |
//! | `add_column` | `remove_column` |
//! | `change_column` | change back to the introspected definition |
//! | `remove_column`, `remove_columns` | re-add the introspected definitions |
//! | `add_index` / `remove_index` | `remove_index` / re-add the introspected index |
//! | `add_foreign_key` / `remove_foreign_key` | the opposite |
//! | `execute` | its declared `reverse`, or irreversible |

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MigrationError, Result};
use crate::backends::executor::SqlExecutor;
use crate::backends::introspection::SchemaIntrospector;
use crate::backends::schema::{
	ColumnDefinition, ForeignKeyDefinition, IndexDefinition, SchemaEditor, TableDefinition,
};

fn default_referenced_column() -> String {
	"id".to_string()
}

/// Foreign key declared from the owning table's side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
	pub column: String,
	/// Referenced table
	pub references: String,
	#[serde(default = "default_referenced_column")]
	pub referenced_column: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl ForeignKeyReference {
	pub fn to_definition(&self, table: &str) -> ForeignKeyDefinition {
		let definition = ForeignKeyDefinition::new(table, &self.column, &self.references)
			.references_column(&self.referenced_column);
		match &self.name {
			Some(name) => definition.named(name),
			None => definition,
		}
	}
}

/// Abstract schema change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
	CreateTable {
		name: String,
		columns: Vec<ColumnDefinition>,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		indexes: Vec<IndexDefinition>,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		foreign_keys: Vec<ForeignKeyReference>,
		/// Table options suffix, overriding the runner's default
		#[serde(default, skip_serializing_if = "Option::is_none")]
		options: Option<String>,
	},
	DropTable {
		name: String,
	},
	RenameTable {
		from: String,
		to: String,
	},
	AddColumn {
		table: String,
		column: ColumnDefinition,
	},
	ChangeColumn {
		table: String,
		column: ColumnDefinition,
	},
	RenameColumn {
		table: String,
		from: String,
		to: String,
	},
	RemoveColumn {
		table: String,
		column: String,
	},
	RemoveColumns {
		table: String,
		columns: Vec<String>,
	},
	AddIndex {
		table: String,
		#[serde(default)]
		name: String,
		columns: Vec<String>,
		#[serde(default)]
		unique: bool,
	},
	RemoveIndex {
		table: String,
		name: String,
	},
	RenameIndex {
		table: String,
		from: String,
		to: String,
	},
	AddForeignKey {
		table: String,
		column: String,
		references: String,
		#[serde(default = "default_referenced_column")]
		referenced_column: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		name: Option<String>,
	},
	/// Addressed by constraint name, by column, or both
	RemoveForeignKey {
		table: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		name: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		column: Option<String>,
	},
	/// Raw SQL
	Execute {
		sql: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		reverse: Option<String>,
	},
}

/// One stored rollback step
///
/// Serialized as a plain JSON string, or as `{"irreversible": "<sql>"}` for a
/// forward statement without a known inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReverseStatement {
	Sql(String),
	Irreversible { irreversible: String },
}

impl ReverseStatement {
	pub fn is_irreversible(&self) -> bool {
		matches!(self, ReverseStatement::Irreversible { .. })
	}
}

/// Forward statements of one operation and the statements undoing them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOperation {
	pub forward: Vec<String>,
	/// In execution order
	pub reverse: Vec<ReverseStatement>,
}

impl ResolvedOperation {
	fn new(forward: Vec<String>, reverse: Vec<ReverseStatement>) -> Self {
		Self { forward, reverse }
	}

	fn single(forward: String, reverse: String) -> Self {
		Self::new(vec![forward], vec![ReverseStatement::Sql(reverse)])
	}
}

/// What an operation needs to render itself
pub struct ResolveContext<'a> {
	pub editor: &'a dyn SchemaEditor,
	pub introspector: &'a dyn SchemaIntrospector,
	/// Default suffix for `CREATE TABLE`
	pub table_options: Option<&'a str>,
}

impl Operation {
	/// Short description for logs, e.g. `add_column users.email`
	pub fn describe(&self) -> String {
		match self {
			Operation::CreateTable { name, .. } => format!("create_table {}", name),
			Operation::DropTable { name } => format!("drop_table {}", name),
			Operation::RenameTable { from, to } => format!("rename_table {} -> {}", from, to),
			Operation::AddColumn { table, column } => format!("add_column {}.{}", table, column.name),
			Operation::ChangeColumn { table, column } => {
				format!("change_column {}.{}", table, column.name)
			}
			Operation::RenameColumn { table, from, to } => {
				format!("rename_column {}.{} -> {}", table, from, to)
			}
			Operation::RemoveColumn { table, column } => format!("remove_column {}.{}", table, column),
			Operation::RemoveColumns { table, columns } => {
				format!("remove_columns {}.{}", table, columns.join(","))
			}
			Operation::AddIndex { table, columns, .. } => {
				format!("add_index {} ({})", table, columns.join(", "))
			}
			Operation::RemoveIndex { table, name } => format!("remove_index {}.{}", table, name),
			Operation::RenameIndex { table, from, to } => {
				format!("rename_index {}.{} -> {}", table, from, to)
			}
			Operation::AddForeignKey {
				table,
				column,
				references,
				..
			} => format!("add_foreign_key {}.{} -> {}", table, column, references),
			Operation::RemoveForeignKey { table, name, column } => format!(
				"remove_foreign_key {}.{}",
				table,
				name.as_deref().or(column.as_deref()).unwrap_or("?")
			),
			Operation::Execute { .. } => "execute".to_string(),
		}
	}

	/// Render forward statements and capture their inverse from the current schema
	pub async fn resolve(
		&self,
		context: &ResolveContext<'_>,
		executor: &mut dyn SqlExecutor,
	) -> Result<ResolvedOperation> {
		let editor = context.editor;
		let introspector = context.introspector;
		debug!(operation = %self.describe(), "Resolving operation");

		match self {
			Operation::CreateTable {
				name,
				columns,
				indexes,
				foreign_keys,
				options,
			} => {
				let table = TableDefinition {
					name: name.clone(),
					columns: columns.clone(),
					indexes: indexes.clone(),
					foreign_keys: foreign_keys.iter().map(|fk| fk.to_definition(name)).collect(),
					options: options.clone().or_else(|| context.table_options.map(str::to_string)),
				};
				Ok(ResolvedOperation::new(
					editor.create_table_statements(&table)?,
					vec![ReverseStatement::Sql(editor.drop_table_sql(name, false)?)],
				))
			}

			Operation::DropTable { name } => {
				let forward = editor.drop_table_sql(name, false)?;
				let snapshot = introspector.describe(executor, name).await?;
				if snapshot.is_empty() {
					return Ok(ResolvedOperation::new(
						vec![forward.clone()],
						vec![ReverseStatement::Irreversible {
							irreversible: forward,
						}],
					));
				}
				let mut table = snapshot.to_table_definition(name);
				table.indexes = introspector.indexes(executor, name).await?;
				table.foreign_keys = introspector.foreign_keys(executor, name).await?;
				table.options = context.table_options.map(str::to_string);
				let reverse = editor
					.create_table_statements(&table)?
					.into_iter()
					.map(ReverseStatement::Sql)
					.collect();
				Ok(ResolvedOperation::new(vec![forward], reverse))
			}

			Operation::RenameTable { from, to } => Ok(ResolvedOperation::single(
				editor.rename_table_sql(from, to)?,
				editor.rename_table_sql(to, from)?,
			)),

			Operation::AddColumn { table, column } => Ok(ResolvedOperation::single(
				editor.add_column_sql(table, column)?,
				editor.remove_column_sql(table, &column.name)?,
			)),

			Operation::ChangeColumn { table, column } => {
				let forward = editor.change_column_sql(table, column)?;
				let previous = current_column(introspector, executor, table, &column.name).await?;
				Ok(ResolvedOperation::single(
					forward,
					editor.change_column_sql(table, &previous)?,
				))
			}

			Operation::RenameColumn { table, from, to } => Ok(ResolvedOperation::single(
				editor.rename_column_sql(table, from, to)?,
				editor.rename_column_sql(table, to, from)?,
			)),

			Operation::RemoveColumn { table, column } => {
				let forward = editor.remove_column_sql(table, column)?;
				let previous = current_column(introspector, executor, table, column).await?;
				Ok(ResolvedOperation::single(
					forward,
					editor.add_column_sql(table, &previous)?,
				))
			}

			Operation::RemoveColumns { table, columns } => {
				let names: Vec<&str> = columns.iter().map(String::as_str).collect();
				let forward = editor.remove_columns_sql(table, &names)?;
				let snapshot = introspector.describe(executor, table).await?;
				let mut reverse = Vec::with_capacity(columns.len());
				for name in columns {
					let previous = snapshot
						.column_definition(name)
						.ok_or_else(|| missing_column(table, name))?;
					reverse.push(ReverseStatement::Sql(editor.add_column_sql(table, &previous)?));
				}
				Ok(ResolvedOperation::new(vec![forward], reverse))
			}

			Operation::AddIndex {
				table,
				name,
				columns,
				unique,
			} => {
				let index = IndexDefinition {
					name: name.clone(),
					columns: columns.clone(),
					unique: *unique,
				};
				Ok(ResolvedOperation::single(
					editor.add_index_sql(table, &index)?,
					editor.remove_index_sql(table, &index.resolved_name(table))?,
				))
			}

			Operation::RemoveIndex { table, name } => {
				let forward = editor.remove_index_sql(table, name)?;
				let existing = introspector
					.indexes(executor, table)
					.await?
					.into_iter()
					.find(|index| &index.name == name);
				let reverse = match existing {
					Some(index) => ReverseStatement::Sql(editor.add_index_sql(table, &index)?),
					None => ReverseStatement::Irreversible {
						irreversible: forward.clone(),
					},
				};
				Ok(ResolvedOperation::new(vec![forward], vec![reverse]))
			}

			Operation::RenameIndex { table, from, to } => Ok(ResolvedOperation::single(
				editor.rename_index_sql(table, from, to)?,
				editor.rename_index_sql(table, to, from)?,
			)),

			Operation::AddForeignKey {
				table,
				column,
				references,
				referenced_column,
				name,
			} => {
				let foreign_key = ForeignKeyReference {
					column: column.clone(),
					references: references.clone(),
					referenced_column: referenced_column.clone(),
					name: name.clone(),
				}
				.to_definition(table);
				Ok(ResolvedOperation::single(
					editor.add_foreign_key_sql(&foreign_key)?,
					editor.remove_foreign_key_sql(table, &foreign_key.resolved_name())?,
				))
			}

			Operation::RemoveForeignKey { table, name, column } => {
				if name.is_none() && column.is_none() {
					return Err(MigrationError::InvalidMigration(format!(
						"remove_foreign_key on {} needs a name or a column",
						table
					)));
				}
				let existing = introspector
					.foreign_keys(executor, table)
					.await?
					.into_iter()
					.find(|fk| {
						name.as_deref() == Some(fk.name.as_str())
							|| column.as_deref() == Some(fk.from_column.as_str())
					});
				match (existing, name) {
					(Some(foreign_key), _) => Ok(ResolvedOperation::single(
						editor.remove_foreign_key_sql(table, &foreign_key.name)?,
						editor.add_foreign_key_sql(&foreign_key)?,
					)),
					(None, Some(name)) => {
						let forward = editor.remove_foreign_key_sql(table, name)?;
						Ok(ResolvedOperation::new(
							vec![forward.clone()],
							vec![ReverseStatement::Irreversible {
								irreversible: forward,
							}],
						))
					}
					(None, None) => Err(MigrationError::NotFound(format!(
						"foreign key on {}.{}",
						table,
						column.as_deref().unwrap_or_default()
					))),
				}
			}

			Operation::Execute { sql, reverse } => {
				let reverse = match reverse {
					Some(reverse) => ReverseStatement::Sql(reverse.clone()),
					None => ReverseStatement::Irreversible {
						irreversible: sql.clone(),
					},
				};
				Ok(ResolvedOperation::new(vec![sql.clone()], vec![reverse]))
			}
		}
	}
}

fn missing_column(table: &str, column: &str) -> MigrationError {
	MigrationError::NotFound(format!("column {}.{}", table, column))
}

async fn current_column(
	introspector: &dyn SchemaIntrospector,
	executor: &mut dyn SqlExecutor,
	table: &str,
	column: &str,
) -> Result<ColumnDefinition> {
	introspector
		.describe(executor, table)
		.await?
		.column_definition(column)
		.ok_or_else(|| missing_column(table, column))
}
