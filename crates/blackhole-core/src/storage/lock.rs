//! Exclusive claim on the timer for one process.
//!
//! The controller assumes it is the only writer of the timer snapshot, so a
//! process that persists timer state holds a `DriverLock` while it does.
//! SQLite's exclusive locking mode keeps the file lock until the connection
//! closes, and the OS releases it when the process dies.

use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;

use super::data_dir;
use crate::error::StorageError;

const LOCK_FILE: &str = "driver.lock";

#[derive(Debug)]
pub struct DriverLock {
    _conn: Connection,
}

impl DriverLock {
    /// Claim the timer in the default data directory.
    ///
    /// # Errors
    /// `StorageError::DriverBusy` while another process holds the lock.
    pub fn acquire() -> Result<Self, StorageError> {
        Self::acquire_in(&data_dir()?)
    }

    pub fn acquire_in(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(LOCK_FILE);
        let conn = Connection::open(&path).map_err(|source| StorageError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(Duration::ZERO)?;

        // The pragma itself takes no lock; the first write below does.
        conn.query_row("PRAGMA locking_mode = EXCLUSIVE", [], |row| {
            row.get::<_, String>(0)
        })?;

        let claimed = conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS holder (pid INTEGER NOT NULL);
                 DELETE FROM holder;",
            )
            .and_then(|()| {
                conn.execute(
                    "INSERT INTO holder (pid) VALUES (?1)",
                    params![std::process::id()],
                )
            });
        match claimed.map_err(StorageError::from) {
            Ok(_) => {
                tracing::debug!(path = %path.display(), "driver lock acquired");
                Ok(Self { _conn: conn })
            }
            Err(StorageError::Locked) => Err(StorageError::DriverBusy),
            Err(e) => Err(e),
        }
    }
}
