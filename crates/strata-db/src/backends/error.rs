//! Error types for database operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
	#[error("SQL error: {0}")]
	SqlError(#[from] sqlx::Error),

	#[error("Column not found: {0}")]
	ColumnNotFound(String),

	#[error("Type error: {0}")]
	TypeError(String),

	#[error("Transaction error: {0}")]
	TransactionError(String),

	#[error("Connection error: {0}")]
	ConnectionError(String),

	#[error("Configuration error: {0}")]
	ConfigError(String),

	/// The engine is known but its driver was compiled out
	#[error("Unsupported database: {0}")]
	UnsupportedDatabase(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
