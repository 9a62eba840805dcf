//! In-memory persistence port for testing.

use super::traits::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory persistence port.
///
/// Clones share the same backing map, so a test can hand one clone to a
/// store and inspect what was saved through another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<HashMap<Document, String>>>,
    fail_saves: Arc<AtomicBool>,
    save_count: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document (for test setup).
    pub fn put(&self, document: Document, contents: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.insert(document, contents.into());
    }

    /// Read back the last saved contents of a document.
    pub fn get(&self, document: Document) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.get(&document).cloned()
    }

    /// Make every subsequent `save` fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

impl PersistencePort for MemoryStore {
    fn load(&self, document: Document) -> PersistResult<Option<String>> {
        Ok(self.get(document))
    }

    fn save(&self, document: Document, contents: &str) -> PersistResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable(format!(
                "save of {} rejected",
                document
            )));
        }
        self.put(document, contents);
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_document() {
        let store = MemoryStore::new();
        assert!(store.load(Document::SiteState).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        store.save(Document::AccessStore, "{}").unwrap();
        assert_eq!(
            store.load(Document::AccessStore).unwrap().as_deref(),
            Some("{}")
        );
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_failed_save_leaves_previous_contents() {
        let store = MemoryStore::new();
        store.save(Document::SiteState, "first").unwrap();

        store.set_fail_saves(true);
        assert!(store.save(Document::SiteState, "second").is_err());
        assert_eq!(store.get(Document::SiteState).as_deref(), Some("first"));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_clones_share_backing_map() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.save(Document::SiteState, "shared").unwrap();
        assert_eq!(other.get(Document::SiteState).as_deref(), Some("shared"));
    }
}
