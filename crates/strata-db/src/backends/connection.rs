//! Database connection management

use std::sync::Arc;

use super::{
	backend::DatabaseBackend,
	config::{DatabaseConfig, Engine, build_dsn},
	error::Result,
	executor::DatabaseTransaction,
	types::{DatabaseType, QueryResult, QueryValue, Row},
};

/// Handle to one configured datasource
///
/// Cloning is cheap and every clone talks to the same backend. The dialect is
/// fixed for the lifetime of the handle.
#[derive(Clone)]
pub struct DatabaseConnection {
	backend: Arc<dyn DatabaseBackend>,
}

impl std::fmt::Debug for DatabaseConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DatabaseConnection")
			.field("database_type", &self.database_type())
			.finish()
	}
}

impl DatabaseConnection {
	pub fn new(backend: Arc<dyn DatabaseBackend>) -> Self {
		Self { backend }
	}

	/// Connect using a [`DatabaseConfig`]
	pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
		let dsn = build_dsn(config)?;
		match config.engine {
			Engine::Mysql => Self::connect_mysql(&dsn).await,
			Engine::Postgres => Self::connect_postgres(&dsn).await,
		}
	}

	/// Connect from a URL, picking the dialect from its scheme
	pub async fn connect_url(url: &str) -> Result<Self> {
		let engine = Engine::from_url(url)?;
		match engine {
			Engine::Mysql => Self::connect_mysql(url).await,
			Engine::Postgres => Self::connect_postgres(url).await,
		}
	}

	/// Connect to MySQL.
	///
	/// The pool holds a single connection: migration statements are issued one
	/// after another and never interleave.
	#[cfg(feature = "mysql")]
	pub async fn connect_mysql(url: &str) -> Result<Self> {
		use super::dialect::MySqlBackend;

		let pool = sqlx::mysql::MySqlPoolOptions::new()
			.max_connections(1)
			.connect(url)
			.await?;
		Ok(Self::new(Arc::new(MySqlBackend::new(pool))))
	}

	#[cfg(not(feature = "mysql"))]
	pub async fn connect_mysql(_url: &str) -> Result<Self> {
		Err(super::error::DatabaseError::UnsupportedDatabase(
			"mysql support is not compiled in".to_string(),
		))
	}

	/// Connect to PostgreSQL with a single-connection pool
	#[cfg(feature = "postgres")]
	pub async fn connect_postgres(url: &str) -> Result<Self> {
		use super::dialect::PostgresBackend;

		let pool = sqlx::postgres::PgPoolOptions::new()
			.max_connections(1)
			.connect(url)
			.await?;
		Ok(Self::new(Arc::new(PostgresBackend::new(pool))))
	}

	#[cfg(not(feature = "postgres"))]
	pub async fn connect_postgres(_url: &str) -> Result<Self> {
		Err(super::error::DatabaseError::UnsupportedDatabase(
			"pgsql support is not compiled in".to_string(),
		))
	}

	pub fn backend(&self) -> &Arc<dyn DatabaseBackend> {
		&self.backend
	}

	pub fn database_type(&self) -> DatabaseType {
		self.backend.database_type()
	}

	pub async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		self.backend.execute(sql, params).await
	}

	pub async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		self.backend.fetch_one(sql, params).await
	}

	pub async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		self.backend.fetch_all(sql, params).await
	}

	pub async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		self.backend.fetch_optional(sql, params).await
	}

	/// Open a transaction. Statements issued through the returned handle share
	/// one connection until it is committed or rolled back.
	pub async fn begin(&self) -> Result<DatabaseTransaction> {
		let inner = self.backend.begin().await?;
		Ok(DatabaseTransaction::new(self.database_type(), inner))
	}
}
