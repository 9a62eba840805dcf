//! File-backed persistence port.
//!
//! Each document lives in its own JSON file inside the data directory:
//!
//! - `<data_dir>/site_state.json`
//! - `<data_dir>/access_store.json`
//!
//! Saves write a sibling `.tmp` file and rename it over the target, so a
//! crash mid-write leaves the previous document intact.

use super::traits::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON-file persistence rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store, creating the data directory if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> PersistResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| {
            PersistError::Unavailable(format!(
                "failed to create data directory '{}': {}",
                data_dir.display(),
                e
            ))
        })?;
        Ok(Self { data_dir })
    }

    /// Data directory this store writes into.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file holding `document`.
    pub fn path_for(&self, document: Document) -> PathBuf {
        self.data_dir.join(format!("{}.json", document.name()))
    }
}

impl PersistencePort for JsonFileStore {
    fn load(&self, document: Document) -> PersistResult<Option<String>> {
        match fs::read_to_string(self.path_for(document)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistError::Io { document, source }),
        }
    }

    fn save(&self, document: Document, contents: &str) -> PersistResult<()> {
        let target = self.path_for(document);
        let tmp = target.with_extension("json.tmp");

        fs::write(&tmp, contents).map_err(|source| PersistError::Io { document, source })?;
        fs::rename(&tmp, &target).map_err(|source| PersistError::Io { document, source })?;

        Ok(())
    }
}
