mod config;
pub mod database;
mod lock;
mod memory;

pub use config::{Config, MAX_MINUTES, MAX_SESSIONS_BEFORE_LONG, SETTINGS_KEY};
pub use database::{Database, PhaseStats, SessionRecord, Stats};
pub use lock::DriverLock;
pub use memory::{MemoryRecorder, MemoryStore};

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StorageError;

/// Key-value persistence adapter.
///
/// The engine is the only writer of its keys, so there is no
/// read-modify-write contract.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Sink for completed sessions.
pub trait SessionRecorder {
    fn record(&self, record: &SessionRecord) -> Result<(), StorageError>;
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

impl<T: SessionRecorder + ?Sized> SessionRecorder for &T {
    fn record(&self, record: &SessionRecord) -> Result<(), StorageError> {
        (**self).record(record)
    }
}

impl<T: SessionRecorder + ?Sized> SessionRecorder for Arc<T> {
    fn record(&self, record: &SessionRecord) -> Result<(), StorageError> {
        (**self).record(record)
    }
}

/// Returns `~/.config/blackhole[-dev]/` based on BLACKHOLE_ENV.
///
/// Set BLACKHOLE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("BLACKHOLE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("blackhole-dev")
    } else {
        base_dir.join("blackhole")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
