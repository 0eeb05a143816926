//! MySQL dialect implementation

use async_trait::async_trait;
use sqlx::{Column, MySql, MySqlPool, Row as SqlxRow, Transaction, ValueRef, mysql::MySqlRow};
use std::sync::Arc;

use crate::backends::{
	backend::DatabaseBackend,
	error::{DatabaseError, Result},
	types::{DatabaseType, QueryResult, QueryValue, Row, TransactionExecutor},
};

type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments>;

fn bind_value<'q>(query: MySqlQuery<'q>, value: &'q QueryValue) -> MySqlQuery<'q> {
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

fn build_query<'q>(sql: &'q str, params: &'q [QueryValue]) -> MySqlQuery<'q> {
	params
		.iter()
		.fold(sqlx::query(sql), |query, param| bind_value(query, param))
}

fn convert_row(mysql_row: MySqlRow) -> Result<Row> {
	let mut row = Row::new();
	for (index, column) in mysql_row.columns().iter().enumerate() {
		let column_name = column.name();
		if mysql_row.try_get_raw(index)?.is_null() {
			row.insert(column_name.to_string(), QueryValue::Null);
		} else if let Ok(value) = mysql_row.try_get::<bool, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Bool(value));
		} else if let Ok(value) = mysql_row.try_get::<i64, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Int(value));
		} else if let Ok(value) = mysql_row.try_get::<i32, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Int(value as i64));
		} else if let Ok(value) = mysql_row.try_get::<u64, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Int(value as i64));
		} else if let Ok(value) = mysql_row.try_get::<f64, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Float(value));
		} else if let Ok(value) = mysql_row.try_get::<String, _>(index) {
			row.insert(column_name.to_string(), QueryValue::String(value));
		} else if let Ok(value) = mysql_row.try_get::<Vec<u8>, _>(index) {
			// SHOW statements and information_schema report binary collation
			// columns that sqlx decodes as blobs.
			match String::from_utf8(value) {
				Ok(s) => row.insert(column_name.to_string(), QueryValue::String(s)),
				Err(e) => row.insert(column_name.to_string(), QueryValue::Bytes(e.into_bytes())),
			};
		} else if let Ok(value) = mysql_row.try_get::<chrono::NaiveDateTime, _>(index) {
			row.insert(
				column_name.to_string(),
				QueryValue::Timestamp(chrono::DateTime::from_naive_utc_and_offset(
					value,
					chrono::Utc,
				)),
			);
		} else if let Ok(value) = mysql_row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
			row.insert(column_name.to_string(), QueryValue::Timestamp(value));
		} else {
			return Err(DatabaseError::TypeError(format!(
				"Unsupported MySQL column type for {}",
				column_name
			)));
		}
	}
	Ok(row)
}

fn consumed() -> DatabaseError {
	DatabaseError::TransactionError("Transaction already consumed".to_string())
}

/// MySQL database backend
pub struct MySqlBackend {
	pool: Arc<MySqlPool>,
}

impl MySqlBackend {
	pub fn new(pool: MySqlPool) -> Self {
		Self {
			pool: Arc::new(pool),
		}
	}

	pub fn pool(&self) -> &MySqlPool {
		&self.pool
	}
}

#[async_trait]
impl DatabaseBackend for MySqlBackend {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Mysql
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
		let mysql_row = build_query(sql, &params)
			.fetch_one(self.pool.as_ref())
			.await?;
		convert_row(mysql_row)
	}

	async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		let mysql_rows = build_query(sql, &params)
			.fetch_all(self.pool.as_ref())
			.await?;
		mysql_rows.into_iter().map(convert_row).collect()
	}

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		let mysql_row = build_query(sql, &params)
			.fetch_optional(self.pool.as_ref())
			.await?;
		mysql_row.map(convert_row).transpose()
	}

	async fn begin(&self) -> Result<Box<dyn TransactionExecutor>> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(MySqlTransactionExecutor::new(tx)))
	}
}

/// MySQL transaction executor
pub struct MySqlTransactionExecutor {
	tx: Option<Transaction<'static, MySql>>,
}

impl MySqlTransactionExecutor {
	pub fn new(tx: Transaction<'static, MySql>) -> Self {
		Self { tx: Some(tx) }
	}
}

#[async_trait]
impl TransactionExecutor for MySqlTransactionExecutor {
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
