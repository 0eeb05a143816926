//! PostgreSQL driver

pub mod introspection;
pub mod schema;

pub use introspection::{PostgresIntrospector, PrimaryKeyDetection};
pub use schema::PostgresSchemaEditor;
