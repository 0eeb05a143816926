//! PostgreSQL dialect implementation

use async_trait::async_trait;
use sqlx::{Column, PgPool, Postgres, Row as SqlxRow, Transaction, ValueRef, postgres::PgRow};
use std::sync::Arc;

use crate::backends::{
	backend::DatabaseBackend,
	error::{DatabaseError, Result},
	types::{DatabaseType, QueryResult, QueryValue, Row, TransactionExecutor},
};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

fn bind_value<'q>(query: PgQuery<'q>, value: &'q QueryValue) -> PgQuery<'q> {
	match value {
		QueryValue::Null => query.bind(None::<i32>),
		QueryValue::Bool(b) => query.bind(b),
		QueryValue::Int(i) => query.bind(i),
		QueryValue::Float(f) => query.bind(f),
		QueryValue::String(s) => query.bind(s),
		QueryValue::Bytes(b) => query.bind(b),
		QueryValue::Timestamp(dt) => query.bind(dt),
	}
}

fn build_query<'q>(sql: &'q str, params: &'q [QueryValue]) -> PgQuery<'q> {
	params
		.iter()
		.fold(sqlx::query(sql), |query, param| bind_value(query, param))
}

/// Row conversion shared between the backend and the transaction executor
fn convert_row(pg_row: PgRow) -> Result<Row> {
	let mut row = Row::new();
	for (index, column) in pg_row.columns().iter().enumerate() {
		let column_name = column.name();

		if pg_row.try_get_raw(index)?.is_null() {
			row.insert(column_name.to_string(), QueryValue::Null);
		} else if let Ok(value) = pg_row.try_get::<bool, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Bool(value));
		} else if let Ok(value) = pg_row.try_get::<i64, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Int(value));
		} else if let Ok(value) = pg_row.try_get::<i32, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Int(value as i64));
		} else if let Ok(value) = pg_row.try_get::<i16, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Int(value as i64));
		} else if let Ok(value) = pg_row.try_get::<f64, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Float(value));
		} else if let Ok(value) = pg_row.try_get::<f32, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Float(value as f64));
		} else if let Ok(value) = pg_row.try_get::<String, _>(index) {
			row.insert(column_name.to_string(), QueryValue::String(value));
		} else if let Ok(value) = pg_row.try_get::<Vec<u8>, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Bytes(value));
		} else if let Ok(value) = pg_row.try_get::<chrono::NaiveDateTime, _>(index) {
			row.insert(
				column_name.to_string(),
				QueryValue::Timestamp(chrono::DateTime::from_naive_utc_and_offset(
					value,
					chrono::Utc,
				)),
			);
		} else if let Ok(value) = pg_row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Timestamp(value));
		} else {
			// Catalog queries cast to text/int4; anything else is a caller bug
			return Err(DatabaseError::TypeError(format!(
				"Unsupported PostgreSQL column type for {}",
				column_name
			)));
		}
	}
	Ok(row)
}

fn consumed() -> DatabaseError {
	DatabaseError::TransactionError("Transaction already consumed".to_string())
}

/// PostgreSQL database backend
pub struct PostgresBackend {
	pool: Arc<PgPool>,
}

impl PostgresBackend {
	pub fn new(pool: PgPool) -> Self {
		Self {
			pool: Arc::new(pool),
		}
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
	}

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		let result = build_query(sql, &params)
			.execute(self.pool.as_ref())
			.await?;
		Ok(QueryResult {
			rows_affected: result.rows_affected(),
		})
	}

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		let row = build_query(sql, &params)
			.fetch_one(self.pool.as_ref())
			.await?;
		convert_row(row)
	}

	async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		let rows = build_query(sql, &params)
			.fetch_all(self.pool.as_ref())
			.await?;
		rows.into_iter().map(convert_row).collect()
	}

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		let row = build_query(sql, &params)
			.fetch_optional(self.pool.as_ref())
			.await?;
		row.map(convert_row).transpose()
	}

	async fn begin(&self) -> Result<Box<dyn TransactionExecutor>> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(PgTransactionExecutor::new(tx)))
	}
}

/// PostgreSQL transaction executor
pub struct PgTransactionExecutor {
	tx: Option<Transaction<'static, Postgres>>,
}

impl PgTransactionExecutor {
	pub fn new(tx: Transaction<'static, Postgres>) -> Self {
		Self { tx: Some(tx) }
	}
}

#[async_trait]
impl TransactionExecutor for PgTransactionExecutor {
	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		let tx = self.tx.as_mut().ok_or_else(consumed)?;
		let result = build_query(sql, &params).execute(&mut **tx).await?;
		Ok(QueryResult {
			rows_affected: result.rows_affected(),
		})
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		let tx = self.tx.as_mut().ok_or_else(consumed)?;
		let rows = build_query(sql, &params).fetch_all(&mut **tx).await?;
		rows.into_iter().map(convert_row).collect()
	}

	async fn fetch_optional(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		let tx = self.tx.as_mut().ok_or_else(consumed)?;
		let row = build_query(sql, &params).fetch_optional(&mut **tx).await?;
		row.map(convert_row).transpose()
	}

	async fn commit(mut self: Box<Self>) -> Result<()> {
		let tx = self.tx.take().ok_or_else(consumed)?;
		tx.commit().await?;
		Ok(())
	}

	async fn rollback(mut self: Box<Self>) -> Result<()> {
		let tx = self.tx.take().ok_or_else(consumed)?;
		tx.rollback().await?;
		Ok(())
	}
}
