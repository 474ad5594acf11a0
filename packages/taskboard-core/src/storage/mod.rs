pub mod local;
pub mod memory;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Collection keys of the persisted record surface.
pub const USERS_KEY: &str = "users";
pub const BOARDS_KEY: &str = "boards";
pub const CURRENT_USER_KEY: &str = "currentUser";
pub const SELECTED_BOARD_KEY: &str = "selectedBoardId";

/// Durable key-value surface the engine persists into.
/// Implementations: LocalStore (one JSON file per key), MemoryStore.
pub trait RecordStore: Send + Sync {
    /// Raw serialized value for `key`, `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Typed record access on top of any [`RecordStore`].
///
/// Reads never fail on missing or malformed data: an unparsable collection
/// reads as empty and an unparsable element is skipped, both with a warning.
/// Only I/O failures are returned as errors.
pub trait RecordStoreExt: RecordStore {
    fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        let Some(raw) = self.get(key)? else {
            return Ok(Vec::new());
        };
        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                log::warn!(
                    "[taskboard.storage] Collection {} is unreadable, treating as empty: {}",
                    key,
                    e
                );
                return Ok(Vec::new());
            }
        };

        let total = values.len();
        let records: Vec<T> = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!(
                        "[taskboard.storage] Skipping malformed record {} in {}: {}",
                        index,
                        key,
                        e
                    );
                    None
                }
            })
            .collect();
        if records.len() != total {
            log::warn!(
                "[taskboard.storage] Read {}/{} records from {}",
                records.len(),
                total,
                key
            );
        }
        Ok(records)
    }

    fn write_collection<T: Serialize>(&self, key: &str, records: &[T]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(records).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &raw)
    }

    fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(record),
            Err(e) => {
                log::warn!(
                    "[taskboard.storage] Record {} is unreadable, treating as absent: {}",
                    key,
                    e
                );
                Ok(None)
            }
        }
    }

    fn write_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(record).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &raw)
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.remove(key)
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid collection key: {0:?}")]
    InvalidKey(String),

    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
