//! # Blackhole Core Library
//!
//! Core logic for the Blackhole Pomodoro timer. The CLI binary and any other
//! front end are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. Every operation takes
//!   the current time and the caller invokes `tick()` while running
//! - **Controller**: Owns the engine, persists a snapshot after each change
//!   and records completed sessions
//! - **Runner**: Async loop that drives the controller from a command channel
//!   and awaits phase transitions on a [`Dispatcher`]
//! - **Storage**: SQLite-backed key-value store and session history, TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerController`]: Persistence and recording around the engine
//! - [`TimerRunner`]: Tick loop and transition hand-off
//! - [`Database`]: Session and statistics persistence
//! - [`Config`]: Timer configuration

pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, StorageError, TimerError, ValidationError};
pub use events::Event;
pub use storage::{Config, Database, KvStore, SessionRecord, SessionRecorder, Stats};
pub use timer::{
    Clock, Command, Dispatcher, Phase, SoundMode, SystemClock, TimerController, TimerEngine,
    TimerRunner, TimerState,
};
