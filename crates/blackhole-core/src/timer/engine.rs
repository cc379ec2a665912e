//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads or read the clock itself: every operation takes `now`,
//! and the caller is responsible for calling `tick()` periodically while
//! running.
//!
//! Remaining time is always recomputed from the absolute end time, so a
//! suspended process or a sleeping machine cannot drift the countdown.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle                      (pause)
//! Running -> Transitioning -> Idle | Running   (expiry, then finish_transition)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(config);
//! engine.start(now, StartOptions::MANUAL)?;
//! // In a loop:
//! if let Some(Event::PhaseExpired { .. }) = engine.tick(now) {
//!     // play the transition, then
//!     engine.finish_transition(now)?;
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::clock::remaining_until;
use super::cycle::next_phase;
use super::phase::Phase;
use super::signal::{SignalChoice, SignalKind};
use super::snapshot::{PendingTransition, TimerSnapshot};
use crate::error::TimerError;
use crate::events::Event;
use crate::storage::{Config, SessionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// Not counting down; remaining may be partial.
    Idle,
    Running,
    /// The phase expired and the dispatcher is animating the hand-off.
    Transitioning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartOptions {
    /// Skip the begin cue (it already played at expiry).
    pub suppress_begin_signal: bool,
    /// Started by the auto-start chain rather than the user.
    pub auto: bool,
}

impl StartOptions {
    pub const MANUAL: StartOptions = StartOptions {
        suppress_begin_signal: false,
        auto: false,
    };
    pub const AUTO_CHAIN: StartOptions = StartOptions {
        suppress_begin_signal: true,
        auto: true,
    };
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    config: Config,
    phase: Phase,
    state: TimerState,
    total_secs: u64,
    remaining_secs: u64,
    end_at: Option<DateTime<Utc>>,
    focus_count: u32,
    session_started_at: Option<DateTime<Utc>>,
    last_start_was_auto: bool,
    pending: Option<PendingTransition>,
}

impl TimerEngine {
    /// Fresh engine: idle on a full Work phase.
    pub fn new(config: Config) -> Self {
        let total_secs = config.duration_secs(Phase::Work);
        Self {
            config,
            phase: Phase::Work,
            state: TimerState::Idle,
            total_secs,
            remaining_secs: total_secs,
            end_at: None,
            focus_count: 0,
            session_started_at: None,
            last_start_was_auto: false,
            pending: None,
        }
    }

    /// Rehydrate from a stored snapshot.
    ///
    /// A running snapshot stays running, with remaining time recomputed from
    /// its end time against `now`; it may come back already at zero, in which
    /// case the next `tick()` expires it. A snapshot caught mid-transition
    /// comes back `Transitioning`.
    pub fn restore(config: Config, snap: TimerSnapshot, now: DateTime<Utc>) -> Self {
        let mut engine = Self {
            phase: snap.phase,
            state: TimerState::Idle,
            total_secs: snap.total_seconds.max(1),
            remaining_secs: snap.remaining_seconds,
            end_at: None,
            focus_count: snap.focus_count,
            session_started_at: snap.session_started_at,
            last_start_was_auto: snap.last_start_was_auto,
            pending: None,
            config,
        };

        if let Some(pending) = snap.transition {
            engine.state = TimerState::Transitioning;
            engine.pending = Some(pending);
            engine.remaining_secs = 0;
            return engine;
        }

        match (snap.running, snap.end_at) {
            (true, Some(end_at)) => {
                engine.state = TimerState::Running;
                engine.end_at = Some(end_at);
                engine.remaining_secs = remaining_until(end_at, now, engine.total_secs);
            }
            _ => engine.remaining_secs = engine.remaining_secs.min(engine.total_secs),
        }
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        self.end_at
    }

    pub fn focus_count(&self) -> u32 {
        self.focus_count
    }

    pub fn last_start_was_auto(&self) -> bool {
        self.last_start_was_auto
    }

    pub fn pending_transition(&self) -> Option<PendingTransition> {
        self.pending
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            total_seconds: self.total_secs,
            remaining_seconds: self.remaining_secs,
            running: self.is_running(),
            end_at: self.end_at,
            focus_count: self.focus_count,
            last_start_was_auto: self.last_start_was_auto,
            session_started_at: self.session_started_at,
            transition: self.pending,
        }
    }

    /// Build a full state snapshot event.
    pub fn status(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            state: self.state,
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            focus_count: self.focus_count,
            end_at: self.end_at,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start counting down. Starting a running timer changes nothing.
    pub fn start(
        &mut self,
        now: DateTime<Utc>,
        opts: StartOptions,
    ) -> Result<Option<Event>, TimerError> {
        match self.state {
            TimerState::Running => Ok(None),
            TimerState::Transitioning => Err(TimerError::TransitionInProgress),
            TimerState::Idle => {
                if self.remaining_secs == 0 {
                    self.remaining_secs = self.total_secs;
                }
                self.end_at = Some(now + Duration::seconds(self.remaining_secs as i64));
                self.state = TimerState::Running;
                self.session_started_at = Some(now);
                self.last_start_was_auto = opts.auto;

                let signal = if opts.suppress_begin_signal {
                    None
                } else {
                    self.config.sound_mode.signal(SignalKind::begin(self.phase))
                };
                Ok(Some(Event::TimerStarted {
                    phase: self.phase,
                    remaining_secs: self.remaining_secs,
                    auto: opts.auto,
                    signal,
                    at: now,
                }))
            }
        }
    }

    /// Stop counting down, keeping the remaining time as of `now`. A pause
    /// in the final half second keeps one second so the phase can still
    /// complete.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Option<Event>, TimerError> {
        match self.state {
            TimerState::Running => {
                if let Some(end_at) = self.end_at {
                    self.remaining_secs = remaining_until(end_at, now, self.total_secs).max(1);
                }
                self.state = TimerState::Idle;
                self.end_at = None;
                Ok(Some(Event::TimerPaused {
                    phase: self.phase,
                    remaining_secs: self.remaining_secs,
                    at: now,
                }))
            }
            TimerState::Transitioning => Err(TimerError::TransitionInProgress),
            TimerState::Idle => Ok(None),
        }
    }

    /// Rewind the current phase and restart the focus cycle. An in-progress
    /// session is discarded without a record.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Result<Event, TimerError> {
        self.ensure_settled()?;
        self.stop();
        self.remaining_secs = self.total_secs;
        self.focus_count = 0;
        Ok(Event::TimerReset {
            phase: self.phase,
            total_secs: self.total_secs,
            at: now,
        })
    }

    /// Manually select a phase. Never signals, never auto-starts, and discards
    /// an in-progress session without a record.
    pub fn switch_phase(&mut self, target: Phase, now: DateTime<Utc>) -> Result<Event, TimerError> {
        self.ensure_settled()?;
        self.stop();
        self.load_phase(target);
        Ok(Event::PhaseSwitched {
            phase: self.phase,
            total_secs: self.total_secs,
            at: now,
        })
    }

    /// Display preference only; the cycle and the countdown are untouched.
    pub fn set_leading_zero(&mut self, leading_zero: bool) {
        self.config.leading_zero = leading_zero;
    }

    /// Replace the configuration. Restarts the focus cycle and reloads the
    /// active phase's duration; an idle timer is rewound to the new length.
    pub fn apply_config(&mut self, config: Config, now: DateTime<Utc>) -> Result<Event, TimerError> {
        self.ensure_settled()?;
        self.config = config;
        self.focus_count = 0;
        self.total_secs = self.config.duration_secs(self.phase);

        match self.state {
            TimerState::Running => {
                if self.remaining_secs > self.total_secs {
                    self.remaining_secs = self.total_secs;
                    self.end_at = Some(now + Duration::seconds(self.total_secs as i64));
                }
            }
            _ => self.remaining_secs = self.total_secs,
        }

        Ok(Event::ConfigApplied {
            phase: self.phase,
            total_secs: self.total_secs,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    /// Call periodically while running. Returns `Event::Tick` when the
    /// displayed second changes and `Event::PhaseExpired` once at zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        let Some(end_at) = self.end_at else {
            self.state = TimerState::Idle;
            return None;
        };

        let before = self.remaining_secs;
        self.remaining_secs = remaining_until(end_at, now, self.total_secs);
        if self.remaining_secs == 0 {
            return Some(self.expire(now));
        }
        (self.remaining_secs != before).then(|| Event::Tick {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            at: now,
        })
    }

    /// Complete the pending transition: load the next phase and, when the
    /// chain says so, start it without repeating the begin cue.
    pub fn finish_transition(&mut self, now: DateTime<Utc>) -> Result<Vec<Event>, TimerError> {
        let pending = self.pending.take().ok_or(TimerError::NoPendingTransition)?;
        self.state = TimerState::Idle;
        self.load_phase(pending.to);

        let mut events = vec![Event::PhaseAdvanced {
            phase: self.phase,
            total_secs: self.total_secs,
            focus_count: self.focus_count,
            at: now,
        }];
        if pending.auto_start {
            events.extend(self.start(now, StartOptions::AUTO_CHAIN)?);
        }
        Ok(events)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Expiry protocol: record, advance the cycle, pick the one cue.
    fn expire(&mut self, now: DateTime<Utc>) -> Event {
        let from = self.phase;
        let started_at = self.session_started_at.unwrap_or_else(|| {
            now - Duration::seconds(self.total_secs.saturating_sub(self.remaining_secs) as i64)
        });
        let record = SessionRecord::completed(from, started_at, now, self.last_start_was_auto);

        let step = next_phase(from, self.focus_count, self.config.sessions_before_long);
        self.focus_count = step.focus_count;

        let auto_start = self.config.auto_starts_after(from);
        let choice = SignalChoice::at_expiry(from, step.phase, auto_start);
        let signal = self.config.sound_mode.signal(choice.kind());

        self.state = TimerState::Transitioning;
        self.end_at = None;
        self.remaining_secs = 0;
        self.session_started_at = None;
        self.last_start_was_auto = false;
        self.pending = Some(PendingTransition {
            from,
            to: step.phase,
            auto_start,
        });

        Event::PhaseExpired {
            record,
            next_phase: step.phase,
            label: step.phase.transition_label().to_string(),
            signal,
            auto_start,
            at: now,
        }
    }

    fn ensure_settled(&self) -> Result<(), TimerError> {
        if self.state == TimerState::Transitioning {
            Err(TimerError::TransitionInProgress)
        } else {
            Ok(())
        }
    }

    fn stop(&mut self) {
        self.state = TimerState::Idle;
        self.end_at = None;
        self.session_started_at = None;
        self.last_start_was_auto = false;
    }

    fn load_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.total_secs = self.config.duration_secs(phase);
        self.remaining_secs = self.total_secs;
    }
}
