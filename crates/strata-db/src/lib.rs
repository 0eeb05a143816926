//! # strata-db
//!
//! Database schema layer for MySQL and PostgreSQL.
//!
//! ## Overview
//!
//! The crate is split into two halves:
//!
//! - [`backends`]: connections, the per-dialect [`ColumnTypeRegistry`], the
//!   [`SchemaEditor`] DDL generators and the [`SchemaIntrospector`] readers
//! - [`migrations`]: versioned migration units, their sources, the tracking
//!   table recorder and the [`MigrationRunner`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata_db::backends::{DatabaseConfig, DatabaseConnection};
//! use strata_db::migrations::{FilesystemSource, MigrationRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig::mysql("app").with_credentials("root", "secret");
//! let connection = DatabaseConnection::connect(&config).await?;
//!
//! let runner = MigrationRunner::new(connection, FilesystemSource::new("db/migrate"));
//! let report = runner.migrate(None).await?;
//! for outcome in report.outcomes() {
//!     println!("{} {}", outcome.version, outcome.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Generating DDL without a connection
//!
//! ```rust
//! use strata_db::backends::schema::{editor_for, AbstractColumnType, ColumnDefinition};
//! use strata_db::backends::DatabaseType;
//!
//! let editor = editor_for(DatabaseType::Mysql);
//! let column = ColumnDefinition::new("age", AbstractColumnType::Integer)
//!     .not_null()
//!     .default_value("0");
//! assert_eq!(
//!     editor.build_column_clause(&column).unwrap(),
//!     "age INT DEFAULT '0' NOT NULL"
//! );
//! ```

pub mod backends;
pub mod migrations;

pub use backends::{
	ColumnTypeRegistry, DatabaseConfig, DatabaseConnection, DatabaseError, DatabaseType,
	SchemaEditor, SchemaError, SchemaIntrospector,
};
pub use migrations::{Migration, MigrationError, MigrationRunner, Operation};
