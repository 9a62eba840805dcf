//! Trait abstraction for durable storage.
//!
//! The core only ever loads or overwrites whole documents. Enables an
//! in-memory port for unit tests and a file-backed port in production.

use std::fmt;

/// The two independently durable aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    /// Site lockdown flag and the active broadcast.
    SiteState,
    /// Client records, IP bans and the access-lockdown flag.
    AccessStore,
}

impl Document {
    /// Stable storage name for this document.
    pub fn name(&self) -> &'static str {
        match self {
            Document::SiteState => "site_state",
            Document::AccessStore => "access_store",
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on {document}: {source}")]
    Io {
        document: Document,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error on {document}: {source}")]
    Serialization {
        document: Document,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable load/save port.
///
/// `save` is a full-document overwrite; implementations must never expose a
/// partially written document to a later `load`.
pub trait PersistencePort: Send + Sync {
    /// Load a document. `Ok(None)` when it has never been saved.
    fn load(&self, document: Document) -> PersistResult<Option<String>>;

    /// Replace a document with `contents`.
    fn save(&self, document: Document, contents: &str) -> PersistResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_names_are_distinct() {
        assert_eq!(Document::SiteState.name(), "site_state");
        assert_eq!(Document::AccessStore.name(), "access_store");
        assert_ne!(Document::SiteState.name(), Document::AccessStore.name());
    }

    #[test]
    fn test_persist_error_display() {
        let err = PersistError::Unavailable("disk gone".to_string());
        assert_eq!(format!("{}", err), "Storage unavailable: disk gone");

        let err = PersistError::Io {
            document: Document::AccessStore,
            source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        };
        assert!(format!("{}", err).starts_with("I/O error on access_store"));
    }
}
