//! MySQL / MariaDB driver

pub mod introspection;
pub mod schema;

pub use introspection::MySqlIntrospector;
pub use schema::MySqlSchemaEditor;
