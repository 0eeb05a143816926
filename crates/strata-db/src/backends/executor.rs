//! Statement execution shared by connections and transactions
//!
//! The introspectors and the migration recorder only need to run statements and
//! read rows. [`SqlExecutor`] lets them do that against either a bare
//! [`DatabaseConnection`] or an open [`DatabaseTransaction`], so a migration unit
//! can inspect the schema it is in the middle of changing.

use async_trait::async_trait;

use super::{
	connection::DatabaseConnection,
	error::Result,
	types::{DatabaseType, QueryResult, QueryValue, Row, TransactionExecutor},
};

#[async_trait]
pub trait SqlExecutor: Send {
	fn database_type(&self) -> DatabaseType;

	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult>;

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>>;

	async fn fetch_optional(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		Ok(self.fetch_all(sql, params).await?.into_iter().next())
	}
}

#[async_trait]
impl SqlExecutor for DatabaseConnection {
	fn database_type(&self) -> DatabaseType {
		DatabaseConnection::database_type(self)
	}

	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		DatabaseConnection::execute(self, sql, params).await
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		DatabaseConnection::fetch_all(self, sql, params).await
	}

	async fn fetch_optional(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		DatabaseConnection::fetch_optional(self, sql, params).await
	}
}

/// Transaction opened through [`DatabaseConnection::begin`]
pub struct DatabaseTransaction {
	database_type: DatabaseType,
	inner: Box<dyn TransactionExecutor>,
}

impl DatabaseTransaction {
	pub fn new(database_type: DatabaseType, inner: Box<dyn TransactionExecutor>) -> Self {
		Self {
			database_type,
			inner,
		}
	}

	pub async fn commit(self) -> Result<()> {
		self.inner.commit().await
	}

	pub async fn rollback(self) -> Result<()> {
		self.inner.rollback().await
	}
}

#[async_trait]
impl SqlExecutor for DatabaseTransaction {
	fn database_type(&self) -> DatabaseType {
		self.database_type
	}

	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		self.inner.execute(sql, params).await
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		self.inner.fetch_all(sql, params).await
	}

	async fn fetch_optional(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		self.inner.fetch_optional(sql, params).await
	}
}
