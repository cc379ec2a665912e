use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;
use crate::timer::{Phase, Signal, TimerState};

/// Every state change of the timer produces an Event.
/// Front ends render from them; the runner routes signals and transitions
/// to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        auto: bool,
        /// Begin cue; absent when suppressed or muted.
        signal: Option<Signal>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A running timer was rehydrated after a restart.
    TimerResumed {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// The displayed second changed.
    Tick {
        phase: Phase,
        remaining_secs: u64,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseSwitched {
        phase: Phase,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// The running phase reached zero. The transition to `next_phase` is
    /// pending until the dispatcher finishes animating `label`.
    PhaseExpired {
        record: SessionRecord,
        next_phase: Phase,
        label: String,
        signal: Option<Signal>,
        auto_start: bool,
        at: DateTime<Utc>,
    },
    PhaseAdvanced {
        phase: Phase,
        total_secs: u64,
        focus_count: u32,
        at: DateTime<Utc>,
    },
    ConfigApplied {
        phase: Phase,
        total_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        phase: Phase,
        remaining_secs: u64,
        total_secs: u64,
        focus_count: u32,
        end_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}
