//! Durable storage for the two Gatehouse aggregates.
//!
//! The core treats storage as an opaque load/save port with full-overwrite
//! semantics. This module provides:
//! - The port trait ([`PersistencePort`])
//! - A JSON file implementation for production ([`JsonFileStore`])
//! - An in-memory implementation for tests ([`MemoryStore`])
//! - Versioned encoding and load-time migrations ([`schema`])

pub mod file;
pub mod memory;
pub mod schema;
pub mod traits;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use schema::{load_or_default, save_or_warn, SchemaError, SCHEMA_VERSION};
pub use traits::{Document, PersistError, PersistResult, PersistencePort};
