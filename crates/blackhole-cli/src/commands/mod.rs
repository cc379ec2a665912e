pub mod config;
pub mod stats;
pub mod timer;

use std::sync::Arc;

use blackhole_core::storage::{Database, DriverLock};
use blackhole_core::timer::SystemClock;
use blackhole_core::{Event, StorageError, TimerController};

pub(crate) type DbController<'a> = TimerController<&'a Database, &'a Database>;

/// Claim the timer, open the controller for a one-shot command and run the
/// resume protocol. The lock must outlive the controller.
///
/// A one-shot invocation has nothing to animate, so a phase that expired
/// while no process was running is advanced on the spot.
pub(crate) fn open_controller(
    db: &Database,
) -> Result<(DriverLock, DbController<'_>, Vec<Event>), StorageError> {
    let lock = DriverLock::acquire()?;
    let mut ctl = TimerController::open(db, db, Arc::new(SystemClock));
    let resumed = ctl.resume();
    let events = settle(&mut ctl, resumed);
    Ok((lock, ctl, events))
}

/// Complete every transition announced in `events`.
pub(crate) fn settle(ctl: &mut DbController<'_>, events: Vec<Event>) -> Vec<Event> {
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        let expired = matches!(event, Event::PhaseExpired { .. });
        out.push(event);
        if expired {
            match ctl.finish_transition() {
                Ok(advanced) => out.extend(advanced),
                Err(e) => tracing::warn!(error = %e, "failed to finish transition"),
            }
        }
    }
    out
}

pub(crate) fn print_events(events: &[Event]) -> Result<(), serde_json::Error> {
    for event in events {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}
