mod clock;
mod controller;
mod cycle;
mod display;
mod engine;
mod phase;
mod runner;
mod signal;
mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::TimerController;
pub use cycle::{next_phase, PhaseStep};
pub use display::format_clock;
pub use engine::{StartOptions, TimerEngine, TimerState};
pub use phase::Phase;
pub use runner::{Command, TimerRunner, DEFAULT_TICK_INTERVAL, TRANSITION_SOFT_BUDGET};
pub use signal::{
    DispatchError, Dispatcher, Signal, SignalChoice, SignalKind, SoundCue, SoundMode,
};
pub use snapshot::{PendingTransition, TimerSnapshot, SNAPSHOT_KEY};
