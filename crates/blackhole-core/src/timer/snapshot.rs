//! Persisted timer state and its JSON codec.
//!
//! A snapshot is written after every engine mutation and read once at
//! startup. Decoding is forgiving: anything unreadable yields `None` and the
//! caller starts fresh, and readable snapshots are repaired so that the engine
//! invariants hold (`running` implies an end time, `remaining <= total`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::Phase;
use crate::storage::{KvStore, MAX_MINUTES};

/// Storage key for the timer snapshot.
pub const SNAPSHOT_KEY: &str = "timer_snapshot";

/// Longest phase a valid configuration can produce.
const MAX_PHASE_SECS: u64 = (MAX_MINUTES * 60.0) as u64;

/// A phase expired and its transition had not finished yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransition {
    pub from: Phase,
    pub to: Phase,
    pub auto_start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub running: bool,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub focus_count: u32,
    #[serde(default)]
    pub last_start_was_auto: bool,
    /// When the current phase was last started.
    #[serde(default)]
    pub session_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transition: Option<PendingTransition>,
}

impl TimerSnapshot {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse and repair a stored snapshot. Returns `None` when the value
    /// cannot be used at all.
    pub fn decode(raw: &str) -> Option<Self> {
        let mut snap: TimerSnapshot = match serde_json::from_str(raw) {
            Ok(snap) => snap,
            Err(e) => {
                tracing::warn!(error = %e, "timer snapshot corrupt, starting fresh");
                return None;
            }
        };
        if snap.total_seconds == 0 && snap.transition.is_none() {
            tracing::warn!("timer snapshot has no duration, starting fresh");
            return None;
        }
        if snap.total_seconds > MAX_PHASE_SECS {
            tracing::warn!(
                total = snap.total_seconds,
                "timer snapshot duration out of range, starting fresh"
            );
            return None;
        }
        if snap.running && snap.end_at.is_none() {
            snap.running = false;
        }
        if snap.transition.is_some() {
            snap.running = false;
            snap.end_at = None;
        }
        snap.remaining_seconds = snap.remaining_seconds.min(snap.total_seconds);
        Some(snap)
    }

    /// Read the last snapshot; `None` when absent, unreadable or unusable.
    pub fn load<S: KvStore + ?Sized>(store: &S) -> Option<Self> {
        match store.get(SNAPSHOT_KEY) {
            Ok(Some(raw)) => Self::decode(&raw),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "timer snapshot unreadable, starting fresh");
                None
            }
        }
    }

    /// Write the snapshot. Failures are logged, never returned.
    pub fn save<S: KvStore + ?Sized>(&self, store: &S) {
        let encoded = match self.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode timer snapshot");
                return;
            }
        };
        if let Err(e) = store.set(SNAPSHOT_KEY, &encoded) {
            tracing::warn!(error = %e, "failed to persist timer snapshot");
        }
    }
}
