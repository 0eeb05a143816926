//! # Migrations
//!
//! Versioned migration units and the runner that applies them.
//!
//! ## Units
//!
//! A [`Migration`] is identified by a 14-digit timestamp version and carries a
//! list of abstract [`Operation`]s (`create_table`, `add_column`, ...) plus an
//! optional explicit `down` list. Units come from a [`MigrationSource`]: the
//! [`FilesystemSource`] reads `db/migrate/<version><Name>.toml` files, the
//! [`RegistrySource`] serves units compiled into the binary.
//!
//! ## Applying
//!
//! [`MigrationRunner::migrate`] applies pending units in ascending version
//! order. Each unit runs in its own transaction: every operation is rendered by
//! the dialect's [`SchemaEditor`](crate::backends::SchemaEditor), its inverse is
//! captured from the live schema just before it executes, and the unit is
//! recorded in the `migrations` tracking table together with the JSON-encoded
//! inverse statements.
//!
//! A failing unit is rolled back and reported; the batch carries on with the
//! next unit.
//!
//! ## Rolling back
//!
//! [`MigrationRunner::rollback`] walks applied units in descending version
//! order. A unit still present in the source with an explicit `down` list runs
//! those operations; otherwise the stored inverse statements are replayed.
//! Units containing raw SQL without a declared reverse fail with
//! [`MigrationError::IrreversibleOperation`] before anything executes.
//!
//! ## Known limitations
//!
//! MySQL commits implicitly around every DDL statement, so a unit that fails
//! halfway leaves its earlier statements applied. Only one runner may work on a
//! database at a time; the tracking table is not locked.

pub mod migration;
pub mod operations;
pub mod recorder;
pub mod runner;
pub mod schema_dump;
pub mod source;

pub use migration::{Migration, MigrationProvider, VERSION_LENGTH, validate_version};
pub use operations::{
	ForeignKeyReference, Operation, ResolveContext, ResolvedOperation, ReverseStatement,
};
pub use recorder::{DEFAULT_TRACKING_TABLE, MigrationRecord, MigrationRecorder};
pub use runner::{
	Direction, MigrationReport, MigrationRunner, MigrationStatus, UnitFailure, UnitOutcome,
};
pub use source::{MigrationSource, filesystem::FilesystemSource, registry::RegistrySource};

use thiserror::Error;

use crate::backends::{DatabaseError, SchemaError};

#[derive(Debug, Error)]
pub enum MigrationError {
	#[error("Migration not found: {0}")]
	NotFound(String),

	#[error("Database error: {0}")]
	DatabaseError(#[from] DatabaseError),

	#[error("Schema error: {0}")]
	SchemaError(#[from] SchemaError),

	#[error("Invalid migration: {0}")]
	InvalidMigration(String),

	/// Rollback reached a statement with no known inverse
	#[error("Irreversible migration operation in {version}: {statement}")]
	IrreversibleOperation { version: String, statement: String },

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("TOML parse error: {0}")]
	TomlError(#[from] toml::de::Error),

	#[error("TOML serialize error: {0}")]
	TomlSerializeError(#[from] toml::ser::Error),

	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;
