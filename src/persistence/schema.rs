//! Versioned document encoding.
//!
//! Every persisted document is a JSON object carrying a top-level
//! `version` field next to the aggregate's own fields. Documents written
//! before versioning existed have no `version` and are treated as v1.
//!
//! ## Migrations
//!
//! - v1 -> v2: client `status` strings are normalized. The legacy
//!   `"unbanned"` value (and anything unrecognised) becomes `"unverified"`.
//!
//! Loading never fails the process: a missing document yields defaults
//! silently, an unreadable or malformed one yields defaults with a warning.

use super::traits::{Document, PersistError, PersistResult, PersistencePort};
use crate::access::types::ClientStatus;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u64 = 2;

const VERSION_KEY: &str = "version";

/// Errors decoding a persisted document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("unsupported schema version {found} (newest known is {})", SCHEMA_VERSION)]
    UnsupportedVersion { found: u64 },
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    version: u64,
    #[serde(flatten)]
    data: &'a T,
}

/// Encode an aggregate at the current schema version.
pub fn encode<T: Serialize>(document: Document, value: &T) -> PersistResult<String> {
    serde_json::to_string_pretty(&Envelope {
        version: SCHEMA_VERSION,
        data: value,
    })
    .map_err(|source| PersistError::Serialization { document, source })
}

/// Decode a document, migrating it forward to the current version.
pub fn decode<T: DeserializeOwned>(document: Document, raw: &str) -> Result<T, SchemaError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut object) = value else {
        return Err(SchemaError::NotAnObject);
    };

    let version = match object.remove(VERSION_KEY) {
        Some(v) => v.as_u64().unwrap_or(1),
        None => 1,
    };
    if version > SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion { found: version });
    }

    if version < 2 {
        migrate_v1_to_v2(document, &mut object);
    }

    Ok(serde_json::from_value(Value::Object(object))?)
}

/// v1 -> v2: normalize client status strings.
fn migrate_v1_to_v2(document: Document, object: &mut Map<String, Value>) {
    if document != Document::AccessStore {
        return;
    }
    let Some(Value::Object(clients)) = object.get_mut("clients") else {
        return;
    };
    for record in clients.values_mut() {
        let Value::Object(record) = record else {
            continue;
        };
        let status = record
            .get("status")
            .and_then(Value::as_str)
            .map(ClientStatus::from_persisted)
            .unwrap_or_default();
        record.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
    }
}

/// Load a document through `port`, falling back to defaults.
pub fn load_or_default<T>(port: &dyn PersistencePort, document: Document) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match port.load(document) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(document = %document, error = %e, "failed to read persisted document, starting empty");
            return T::default();
        }
    };

    match decode(document, &raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(document = %document, error = %e, "persisted document unusable, starting empty");
            T::default()
        }
    }
}

/// Persist a document through `port`.
///
/// Failures are logged and swallowed: in-memory state stays authoritative
/// for the rest of the process lifetime. Returns whether the save landed.
pub fn save_or_warn<T: Serialize>(port: &dyn PersistencePort, document: Document, value: &T) -> bool {
    let result = encode(document, value).and_then(|contents| port.save(document, &contents));
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(document = %document, error = %e, "failed to persist document");
            false
        }
    }
}
