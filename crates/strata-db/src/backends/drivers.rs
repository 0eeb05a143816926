//! Dialect drivers
//!
//! Each driver pairs a [`SchemaEditor`](super::schema::SchemaEditor) with a
//! [`SchemaIntrospector`](super::introspection::SchemaIntrospector). Neither
//! holds a connection, so both are available without the matching sqlx feature.

pub mod mysql;
pub mod postgresql;
