//! Database module: the git tag annotation store and its schema.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: embedded, versioned migrations (SQLite-first)
//! - `sqlite.rs`: the annotation store itself

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::GitTagAnnotation;
pub use sqlite::{AnnotationStore, SqlitePool, connect};
