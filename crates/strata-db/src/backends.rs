//! # Database Backends
//!
//! Connection handling, DDL generation and schema introspection for the
//! supported dialects.
//!
//! ## Supported Databases
//!
//! | Database | Feature Flag | Backend Type | Schema Editor | Introspector |
//! |----------|--------------|--------------|---------------|--------------|
//! | MySQL/MariaDB | `mysql` | `MySqlBackend` | [`MySqlSchemaEditor`] | [`MySqlIntrospector`] |
//! | PostgreSQL | `postgres` | `PostgresBackend` | [`PostgresSchemaEditor`] | [`PostgresIntrospector`] |
//!
//! The schema editors and introspectors are pure SQL producers/consumers and are
//! always compiled; the feature flags only gate the sqlx-backed connections.
//!
//! ## Core Traits
//!
//! - **[`DatabaseBackend`]**: query execution against a live server
//! - **[`SqlExecutor`]**: the common surface of a connection and an open transaction
//! - **[`SchemaEditor`]**: DDL statement generation
//! - **[`SchemaIntrospector`]**: reading a table back into a [`SchemaSnapshot`]

pub mod backend;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod introspection;
pub mod schema;
pub mod types;

pub use backend::DatabaseBackend;
pub use config::{DatabaseConfig, Engine, build_dsn};
pub use connection::DatabaseConnection;
pub use error::{DatabaseError, Result};
pub use executor::{DatabaseTransaction, SqlExecutor};
pub use introspection::{SchemaIntrospector, introspector_for};
pub use schema::{
	AbstractColumnType, AlterColumnOperation, ColumnDefault, ColumnDefinition, ColumnSnapshot,
	ColumnTypeRegistry, ForeignKeyDefinition, IndexDefinition, LengthStyle, NativeTypeSpec,
	SchemaEditor, SchemaError, SchemaResult, SchemaSnapshot, TableDefinition, editor_for,
};
pub use types::{DatabaseType, QueryResult, QueryValue, Row, TransactionExecutor};

pub use drivers::mysql::{MySqlIntrospector, MySqlSchemaEditor};
pub use drivers::postgresql::{PostgresIntrospector, PostgresSchemaEditor, PrimaryKeyDetection};

#[cfg(feature = "mysql")]
pub use dialect::MySqlBackend;

#[cfg(feature = "postgres")]
pub use dialect::PostgresBackend;
