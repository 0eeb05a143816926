//! Migration runner
//!
//! Drives units from a [`MigrationSource`] through the tracking table. Each
//! unit gets its own transaction and its own outcome; one failing unit never
//! stops the batch.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::operations::{Operation, ResolveContext, ReverseStatement};
use super::recorder::{MigrationRecord, MigrationRecorder};
use super::source::MigrationSource;
use super::{Migration, MigrationError, Result, validate_version};
use crate::backends::connection::DatabaseConnection;
use crate::backends::executor::{DatabaseTransaction, SqlExecutor};
use crate::backends::introspection::{SchemaIntrospector, introspector_for};
use crate::backends::schema::{SchemaEditor, editor_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Up,
	Down,
}

/// Why a unit did not complete
#[derive(Debug)]
pub struct UnitFailure {
	/// Statement that was executing, if the failure came from the database
	pub statement: Option<String>,
	pub error: MigrationError,
}

impl UnitFailure {
	fn new(statement: Option<&str>, error: impl Into<MigrationError>) -> Self {
		Self {
			statement: statement.map(str::to_string),
			error: error.into(),
		}
	}
}

/// Result of applying or reverting one unit
#[derive(Debug)]
pub struct UnitOutcome {
	pub version: String,
	pub name: String,
	/// Statements executed, in order, including a failing one
	pub statements: Vec<String>,
	pub failure: Option<UnitFailure>,
	pub elapsed: Duration,
}

impl UnitOutcome {
	pub fn is_success(&self) -> bool {
		self.failure.is_none()
	}
}

/// Outcome of a `migrate` or `rollback` batch
#[derive(Debug)]
pub struct MigrationReport {
	pub direction: Direction,
	pub outcomes: Vec<UnitOutcome>,
	pub elapsed: Duration,
}

impl MigrationReport {
	pub fn outcomes(&self) -> &[UnitOutcome] {
		&self.outcomes
	}

	pub fn is_success(&self) -> bool {
		self.outcomes.iter().all(UnitOutcome::is_success)
	}

	pub fn failed(&self) -> impl Iterator<Item = &UnitOutcome> {
		self.outcomes.iter().filter(|o| !o.is_success())
	}

	pub fn is_empty(&self) -> bool {
		self.outcomes.is_empty()
	}
}

/// Applied, pending and skipped units
#[derive(Debug)]
pub struct MigrationStatus {
	/// Ascending by version
	pub applied: Vec<MigrationRecord>,
	/// Source units newer than the last applied version, ascending
	pub pending: Vec<Migration>,
	/// Source units without a record that are older than the last applied
	/// version; `migrate` never applies them
	pub skipped: Vec<Migration>,
}

impl MigrationStatus {
	/// Highest applied version
	pub fn last_applied(&self) -> Option<&str> {
		self.applied.last().map(|r| r.version.as_str())
	}
}

/// How a unit is reverted
enum Reversal<'a> {
	/// The unit's explicit `down` operations
	Operations(&'a [Operation]),
	/// Statements captured while applying
	Statements(Vec<String>),
}

/// Applies and reverts migration units
///
/// The runner assumes it is the only one working on the database.
pub struct MigrationRunner<S: MigrationSource> {
	connection: DatabaseConnection,
	source: S,
	editor: Box<dyn SchemaEditor>,
	introspector: Box<dyn SchemaIntrospector>,
	recorder: MigrationRecorder,
	table_options: Option<String>,
}

impl<S: MigrationSource> MigrationRunner<S> {
	/// Build a runner for the connection's dialect
	pub fn new(connection: DatabaseConnection, source: S) -> Self {
		let database_type = connection.database_type();
		Self {
			connection,
			source,
			editor: editor_for(database_type),
			introspector: introspector_for(database_type),
			recorder: MigrationRecorder::new(database_type),
			table_options: None,
		}
	}

	/// Suffix appended to every `CREATE TABLE`, e.g. `ENGINE=InnoDB`
	pub fn with_table_options(mut self, options: impl Into<String>) -> Self {
		let options = options.into();
		self.table_options = (!options.trim().is_empty()).then_some(options);
		self
	}

	pub fn with_tracking_table(mut self, table: impl Into<String>) -> Result<Self> {
		self.recorder = self.recorder.with_table(table)?;
		Ok(self)
	}

	pub fn with_introspector(mut self, introspector: Box<dyn SchemaIntrospector>) -> Self {
		self.introspector = introspector;
		self
	}

	pub fn source(&self) -> &S {
		&self.source
	}

	pub fn recorder(&self) -> &MigrationRecorder {
		&self.recorder
	}

	pub fn connection(&self) -> &DatabaseConnection {
		&self.connection
	}

	/// Create the tracking table if needed; `true` when it was created
	pub async fn ensure_tracking_table(&self) -> Result<bool> {
		let mut connection = self.connection.clone();
		self.recorder
			.ensure_table(&mut connection, self.editor.as_ref(), self.introspector.as_ref())
			.await
	}

	/// Applied units, ascending by version
	pub async fn applied(&self) -> Result<Vec<MigrationRecord>> {
		self.ensure_tracking_table().await?;
		let mut connection = self.connection.clone();
		self.recorder.applied(&mut connection).await
	}

	/// Highest applied version
	pub async fn last_migration(&self) -> Result<Option<String>> {
		Ok(self.applied().await?.pop().map(|r| r.version))
	}

	pub async fn status(&self) -> Result<MigrationStatus> {
		let applied = self.applied().await?;
		let applied_versions: HashSet<&str> = applied.iter().map(|r| r.version.as_str()).collect();
		let frontier = applied
			.iter()
			.filter_map(|r| r.version.parse::<u64>().ok())
			.max()
			.unwrap_or(0);
		let (pending, skipped): (Vec<Migration>, Vec<Migration>) = self
			.source
			.all_migrations()
			.await?
			.into_iter()
			.filter(|m| !applied_versions.contains(m.version.as_str()))
			.partition(|m| m.version_number() > frontier);
		Ok(MigrationStatus {
			applied,
			pending,
			skipped,
		})
	}

	/// Apply units newer than the last applied version, up to and including
	/// `target`, ascending
	pub async fn migrate(&self, target: Option<&str>) -> Result<MigrationReport> {
		let target = target.map(parse_target).transpose()?;
		let started = Instant::now();

		let status = self.status().await?;
		for migration in &status.skipped {
			warn!(
				version = %migration.version,
				name = %migration.name,
				last_applied = status.last_applied().unwrap_or_default(),
				"Skipping unit older than the last applied migration"
			);
		}
		let pending: Vec<Migration> = status
			.pending
			.into_iter()
			.filter(|m| target.is_none_or(|t| m.version_number() <= t))
			.collect();

		if pending.is_empty() {
			info!("No migrations to apply");
		} else {
			self.warn_non_transactional_ddl();
		}

		let mut outcomes = Vec::with_capacity(pending.len());
		for migration in &pending {
			info!(version = %migration.version, name = %migration.name, "Migrating");
			let unit_started = Instant::now();
			let mut statements = Vec::new();
			let failure = self.apply(migration, &mut statements).await.err();
			outcomes.push(self.finish_unit(
				&migration.version,
				&migration.name,
				statements,
				failure,
				unit_started,
			));
		}

		Ok(MigrationReport {
			direction: Direction::Up,
			outcomes,
			elapsed: started.elapsed(),
		})
	}

	/// Revert applied units newer than `to`, descending
	///
	/// Without `to`, only the latest applied unit is reverted. `to = "0"`
	/// reverts everything.
	pub async fn rollback(&self, to: Option<&str>) -> Result<MigrationReport> {
		let to = to.map(parse_target).transpose()?;
		let started = Instant::now();

		let mut applied = self.applied().await?;
		applied.reverse();
		let selected: Vec<MigrationRecord> = match to {
			Some(to) => applied
				.into_iter()
				.filter(|r| r.version.parse::<u64>().unwrap_or(0) > to)
				.collect(),
			None => applied.into_iter().take(1).collect(),
		};

		if selected.is_empty() {
			info!("No migrations to roll back");
		} else {
			self.warn_non_transactional_ddl();
		}

		let known = self.source.all_migrations().await?;
		let mut outcomes = Vec::with_capacity(selected.len());
		for record in &selected {
			info!(version = %record.version, name = %record.name, "Rolling back");
			let unit_started = Instant::now();
			let mut statements = Vec::new();
			let explicit = known.iter().find(|m| m.version == record.version);
			let failure = self.revert(record, explicit, &mut statements).await.err();
			outcomes.push(self.finish_unit(
				&record.version,
				&record.name,
				statements,
				failure,
				unit_started,
			));
		}

		Ok(MigrationReport {
			direction: Direction::Down,
			outcomes,
			elapsed: started.elapsed(),
		})
	}

	fn resolve_context(&self) -> ResolveContext<'_> {
		ResolveContext {
			editor: self.editor.as_ref(),
			introspector: self.introspector.as_ref(),
			table_options: self.table_options.as_deref(),
		}
	}

	fn warn_non_transactional_ddl(&self) {
		let database_type = self.connection.database_type();
		if !database_type.supports_transactional_ddl() {
			warn!(
				database = %database_type,
				"DDL statements commit implicitly on this database; a failing unit may be left partially applied"
			);
		}
	}

	fn finish_unit(
		&self,
		version: &str,
		name: &str,
		statements: Vec<String>,
		failure: Option<UnitFailure>,
		started: Instant,
	) -> UnitOutcome {
		if let Some(failure) = &failure {
			error!(
				version = %version,
				name = %name,
				statement = failure.statement.as_deref().unwrap_or_default(),
				error = %failure.error,
				"Migration unit failed"
			);
		}
		UnitOutcome {
			version: version.to_string(),
			name: name.to_string(),
			statements,
			failure,
			elapsed: started.elapsed(),
		}
	}

	async fn apply(
		&self,
		migration: &Migration,
		executed: &mut Vec<String>,
	) -> std::result::Result<(), UnitFailure> {
		let mut transaction = self
			.connection
			.begin()
			.await
			.map_err(|e| UnitFailure::new(None, e))?;
		let result = self.apply_in(&mut transaction, migration, executed).await;
		finish_transaction(transaction, result).await
	}

	async fn apply_in(
		&self,
		transaction: &mut DatabaseTransaction,
		migration: &Migration,
		executed: &mut Vec<String>,
	) -> std::result::Result<(), UnitFailure> {
		let context = self.resolve_context();
		let mut reverse_groups = Vec::with_capacity(migration.up.len());
		for operation in &migration.up {
			let resolved = operation
				.resolve(&context, transaction)
				.await
				.map_err(|e| UnitFailure::new(None, e))?;
			execute_statements(transaction, &resolved.forward, executed).await?;
			reverse_groups.push(resolved.reverse);
		}

		// Later operations are undone first
		let rollback: Vec<ReverseStatement> = reverse_groups.into_iter().rev().flatten().collect();
		let record = MigrationRecord::new(&migration.version, &migration.name, &rollback)
			.map_err(|e| UnitFailure::new(None, e))?;
		self.recorder
			.record(transaction, &record)
			.await
			.map_err(|e| UnitFailure::new(None, e))
	}

	async fn revert(
		&self,
		record: &MigrationRecord,
		explicit: Option<&Migration>,
		executed: &mut Vec<String>,
	) -> std::result::Result<(), UnitFailure> {
		let reversal = match explicit.and_then(|m| m.down.as_deref()) {
			Some(operations) => Reversal::Operations(operations),
			None => {
				let statements = record
					.reverse_statements()
					.map_err(|e| UnitFailure::new(None, e))?;
				let mut sql = Vec::with_capacity(statements.len());
				for statement in statements {
					match statement {
						ReverseStatement::Sql(statement) => sql.push(statement),
						ReverseStatement::Irreversible { irreversible } => {
							return Err(UnitFailure::new(
								None,
								MigrationError::IrreversibleOperation {
									version: record.version.clone(),
									statement: irreversible,
								},
							));
						}
					}
				}
				Reversal::Statements(sql)
			}
		};

		let mut transaction = self
			.connection
			.begin()
			.await
			.map_err(|e| UnitFailure::new(None, e))?;
		let result = self
			.revert_in(&mut transaction, record, reversal, executed)
			.await;
		finish_transaction(transaction, result).await
	}

	async fn revert_in(
		&self,
		transaction: &mut DatabaseTransaction,
		record: &MigrationRecord,
		reversal: Reversal<'_>,
		executed: &mut Vec<String>,
	) -> std::result::Result<(), UnitFailure> {
		match reversal {
			Reversal::Operations(operations) => {
				let context = self.resolve_context();
				for operation in operations {
					let resolved = operation
						.resolve(&context, transaction)
						.await
						.map_err(|e| UnitFailure::new(None, e))?;
					execute_statements(transaction, &resolved.forward, executed).await?;
				}
			}
			Reversal::Statements(statements) => {
				execute_statements(transaction, &statements, executed).await?;
			}
		}
		self.recorder
			.remove(transaction, &record.version)
			.await
			.map_err(|e| UnitFailure::new(None, e))
	}
}

/// Parse a `--to` version; `0` is accepted as "before the first unit"
fn parse_target(version: &str) -> Result<u64> {
	if version != "0" {
		validate_version(version)?;
	}
	version
		.parse()
		.map_err(|_| MigrationError::InvalidMigration(format!("invalid target version {:?}", version)))
}

async fn execute_statements(
	executor: &mut dyn SqlExecutor,
	statements: &[String],
	executed: &mut Vec<String>,
) -> std::result::Result<(), UnitFailure> {
	for statement in statements {
		info!(sql = %statement, "Executing");
		executed.push(statement.clone());
		executor
			.execute(statement, vec![])
			.await
			.map_err(|e| UnitFailure::new(Some(statement), e))?;
	}
	Ok(())
}

async fn finish_transaction(
	transaction: DatabaseTransaction,
	result: std::result::Result<(), UnitFailure>,
) -> std::result::Result<(), UnitFailure> {
	match result {
		Ok(()) => transaction.commit().await.map_err(|e| UnitFailure::new(None, e)),
		Err(failure) => {
			if let Err(e) = transaction.rollback().await {
				warn!(error = %e, "Failed to roll back transaction");
			}
			Err(failure)
		}
	}
}
