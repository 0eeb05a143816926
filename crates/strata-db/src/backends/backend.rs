//! Database backend abstraction

use async_trait::async_trait;

use super::error::Result;
use super::types::{DatabaseType, QueryResult, QueryValue, Row, TransactionExecutor};

/// Query execution against one database server
///
/// Implemented by the sqlx-backed dialect backends. Tests substitute a scripted
/// implementation to drive the introspectors and the migration runner without a
/// live server.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
	fn database_type(&self) -> DatabaseType;

	fn placeholder(&self, index: usize) -> String {
		self.database_type().placeholder(index)
	}

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult>;

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row>;

	async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>>;

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>>;

	async fn begin(&self) -> Result<Box<dyn TransactionExecutor>>;
}
