//! Owner of the engine and its collaborators.
//!
//! The controller is the only object that mutates timer state. It reads the
//! clock, forwards commands to the engine, persists a snapshot after every
//! change and hands completed sessions to the recorder. Storage and recorder
//! failures are logged and never interrupt the timer.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::clock::Clock;
use super::engine::{StartOptions, TimerEngine, TimerState};
use super::phase::Phase;
use super::snapshot::TimerSnapshot;
use crate::error::{CoreError, TimerError};
use crate::events::Event;
use crate::storage::{Config, KvStore, SessionRecorder};

pub struct TimerController<S, R> {
    engine: TimerEngine,
    store: S,
    recorder: R,
    clock: Arc<dyn Clock>,
}

impl<S: KvStore, R: SessionRecorder> TimerController<S, R> {
    /// Rehydrate configuration and timer state from `store`.
    ///
    /// Never fails: unreadable or corrupt values fall back to the default
    /// configuration and a fresh idle Work phase.
    pub fn open(store: S, recorder: R, clock: Arc<dyn Clock>) -> Self {
        let config = Config::load(&store);
        let now = clock.now();
        let engine = match TimerSnapshot::load(&store) {
            Some(snap) => TimerEngine::restore(config, snap, now),
            None => TimerEngine::new(config),
        };
        tracing::debug!(
            phase = %engine.phase(),
            state = ?engine.state(),
            remaining = engine.remaining_secs(),
            "timer rehydrated"
        );
        Self {
            engine,
            store,
            recorder,
            clock,
        }
    }

    /// Resume protocol, run once after `open`.
    ///
    /// A running timer keeps running without a begin cue and expires at once
    /// if its end time passed while the process was gone. A transition
    /// interrupted by the restart is completed immediately.
    pub fn resume(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let mut events = Vec::new();
        match self.engine.state() {
            TimerState::Transitioning => {
                tracing::debug!("completing transition interrupted by restart");
                match self.engine.finish_transition(now) {
                    Ok(advanced) => events.extend(advanced),
                    Err(e) => tracing::warn!(error = %e, "failed to complete transition"),
                }
                self.persist();
            }
            TimerState::Running => {
                events.push(Event::TimerResumed {
                    phase: self.engine.phase(),
                    remaining_secs: self.engine.remaining_secs(),
                    at: now,
                });
                events.extend(self.tick());
            }
            TimerState::Idle => {}
        }
        events
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        self.engine.config()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn status(&self) -> Event {
        self.engine.status(self.clock.now())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// User-initiated start: plays the begin cue.
    pub fn start(&mut self) -> Result<Option<Event>, TimerError> {
        let event = self.engine.start(self.clock.now(), StartOptions::MANUAL)?;
        if event.is_some() {
            tracing::debug!(phase = %self.engine.phase(), "timer started");
            self.persist();
        }
        Ok(event)
    }

    pub fn pause(&mut self) -> Result<Option<Event>, TimerError> {
        let event = self.engine.pause(self.clock.now())?;
        if event.is_some() {
            tracing::debug!(remaining = self.engine.remaining_secs(), "timer paused");
            self.persist();
        }
        Ok(event)
    }

    /// Pause when running, start otherwise.
    pub fn toggle(&mut self) -> Result<Option<Event>, TimerError> {
        if self.engine.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) -> Result<Event, TimerError> {
        let event = self.engine.reset(self.clock.now())?;
        tracing::debug!(phase = %self.engine.phase(), "timer reset");
        self.persist();
        Ok(event)
    }

    pub fn switch_phase(&mut self, phase: Phase) -> Result<Event, TimerError> {
        let event = self.engine.switch_phase(phase, self.clock.now())?;
        tracing::debug!(%phase, "phase switched");
        self.persist();
        Ok(event)
    }

    /// Validate and apply a full replacement configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field, or a timer
    /// error while a transition is in flight. Nothing changes on error.
    pub fn apply_config(&mut self, candidate: Config) -> Result<Event, CoreError> {
        if self.engine.state() == TimerState::Transitioning {
            return Err(TimerError::TransitionInProgress.into());
        }
        candidate.validate()?;
        if let Err(e) = candidate.save(&self.store) {
            tracing::warn!(error = %e, "failed to persist settings, applying in memory");
        }
        let event = self.engine.apply_config(candidate, self.clock.now())?;
        tracing::debug!(total = self.engine.total_secs(), "settings applied");
        self.persist();
        Ok(event)
    }

    /// Change how minutes are rendered without restarting the focus cycle.
    pub fn set_leading_zero(&mut self, leading_zero: bool) {
        self.engine.set_leading_zero(leading_zero);
        if let Err(e) = self.engine.config().save(&self.store) {
            tracing::warn!(error = %e, "failed to persist settings, applying in memory");
        }
    }

    /// Advance the countdown. At expiry the completed session goes to the
    /// recorder before the event is returned.
    pub fn tick(&mut self) -> Option<Event> {
        let event = self.engine.tick(self.clock.now())?;
        if let Event::PhaseExpired {
            record, next_phase, ..
        } = &event
        {
            tracing::info!(
                phase = %record.phase,
                duration_secs = record.duration_secs,
                next = %next_phase,
                "session completed"
            );
            if let Err(e) = self.recorder.record(record) {
                tracing::warn!(error = %e, "failed to record session");
            }
        }
        self.persist();
        Some(event)
    }

    /// Load the next phase once the dispatcher is done with the transition.
    pub fn finish_transition(&mut self) -> Result<Vec<Event>, TimerError> {
        let events = self.engine.finish_transition(self.clock.now())?;
        tracing::info!(
            phase = %self.engine.phase(),
            running = self.engine.is_running(),
            "phase advanced"
        );
        self.persist();
        Ok(events)
    }

    fn persist(&self) {
        self.engine.snapshot().save(&self.store);
    }
}
