//! # strata
//!
//! Schema introspection, DDL generation and versioned migrations for MySQL
//! and PostgreSQL.
//!
//! ## Feature Flags
//!
//! - `mysql` (default) - MySQL/MariaDB connections via sqlx
//! - `postgres` (default) - PostgreSQL connections via sqlx
//!
//! DDL generation and introspection parsing are always available; the flags
//! only gate the live connections.
//!
//! ## Components
//!
//! - [`ColumnTypeRegistry`]: abstract column types to native SQL per dialect
//! - [`SchemaIntrospector`]: reads a live table back into a [`SchemaSnapshot`](backends::SchemaSnapshot)
//! - [`SchemaEditor`]: renders abstract schema operations as DDL
//! - [`MigrationRunner`]: applies and reverts versioned migration units
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = DatabaseConnection::connect_url("mysql://root@localhost/app").await?;
//! let runner = MigrationRunner::new(connection, FilesystemSource::new("db/migrate"));
//! let report = runner.migrate(None).await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub use strata_db::{backends, migrations};

pub use strata_db::{
	ColumnTypeRegistry, DatabaseConfig, DatabaseConnection, DatabaseError, DatabaseType, Migration,
	MigrationError, MigrationRunner, Operation, SchemaEditor, SchemaError, SchemaIntrospector,
};

/// Commonly used types
pub mod prelude {
	pub use strata_db::backends::{
		AbstractColumnType, ColumnDefinition, DatabaseConfig, DatabaseConnection, DatabaseType,
		IndexDefinition, SchemaEditor, SchemaIntrospector, SchemaSnapshot, TableDefinition,
		editor_for, introspector_for,
	};
	pub use strata_db::migrations::{
		FilesystemSource, Migration, MigrationRunner, MigrationSource, Operation, RegistrySource,
	};
}
