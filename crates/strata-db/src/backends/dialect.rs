//! sqlx-backed dialect backends

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlBackend, MySqlTransactionExecutor};
#[cfg(feature = "postgres")]
pub use postgres::{PgTransactionExecutor, PostgresBackend};
