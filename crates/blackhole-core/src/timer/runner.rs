//! Async driver for the timer controller.
//!
//! One task owns the controller. It multiplexes user commands with a fixed
//! tick interval and awaits the dispatcher inline during a phase transition,
//! so commands sent meanwhile wait in the channel until the next phase is
//! loaded.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::controller::TimerController;
use super::phase::Phase;
use super::signal::Dispatcher;
use crate::error::TimerError;
use crate::events::Event;
use crate::storage::{Config, KvStore, SessionRecorder};

/// Tick period while running; short enough for a smooth display.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(180);

/// Time a dispatcher is expected to need for one transition. Overruns are
/// logged, never cut short.
pub const TRANSITION_SOFT_BUDGET: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    /// Pause when running, start otherwise.
    Toggle,
    Reset,
    Switch(Phase),
    ApplyConfig(Config),
    Shutdown,
}

pub struct TimerRunner<S, R, D> {
    controller: TimerController<S, R>,
    dispatcher: D,
    commands: mpsc::Receiver<Command>,
    events: Option<mpsc::UnboundedSender<Event>>,
    tick_interval: Duration,
}

impl<S, R, D> TimerRunner<S, R, D>
where
    S: KvStore,
    R: SessionRecorder,
    D: Dispatcher,
{
    pub fn new(
        controller: TimerController<S, R>,
        dispatcher: D,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            controller,
            dispatcher,
            commands,
            events: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Publish every event to `events` as well.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run until `Command::Shutdown` arrives or every command sender is
    /// dropped. Hands back the controller and dispatcher.
    pub async fn run(mut self) -> (TimerController<S, R>, D) {
        let startup = self.controller.resume();
        self.handle(startup).await;

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if command == Command::Shutdown {
                        break;
                    }
                    let events = self.execute(command);
                    self.handle(events).await;
                }
                _ = interval.tick(), if self.controller.engine().is_running() => {
                    if let Some(event) = self.controller.tick() {
                        self.handle(vec![event]).await;
                    }
                }
            }
        }

        tracing::debug!("timer runner stopped");
        (self.controller, self.dispatcher)
    }

    fn execute(&mut self, command: Command) -> Vec<Event> {
        tracing::debug!(?command, "command received");
        let result: Result<Vec<Event>, TimerError> = match command {
            Command::Start => self.controller.start().map(|e| e.into_iter().collect()),
            Command::Pause => self.controller.pause().map(|e| e.into_iter().collect()),
            Command::Toggle => self.controller.toggle().map(|e| e.into_iter().collect()),
            Command::Reset => self.controller.reset().map(|e| vec![e]),
            Command::Switch(phase) => self.controller.switch_phase(phase).map(|e| vec![e]),
            Command::ApplyConfig(config) => {
                return match self.controller.apply_config(config) {
                    Ok(event) => vec![event],
                    Err(e) => {
                        tracing::warn!(error = %e, "settings rejected");
                        Vec::new()
                    }
                };
            }
            Command::Shutdown => Ok(Vec::new()),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "command rejected");
            Vec::new()
        })
    }

    /// Publish events in order, routing cues to the dispatcher and playing
    /// the hand-off for an expired phase.
    async fn handle(&mut self, events: Vec<Event>) {
        let mut queue: VecDeque<Event> = events.into();
        while let Some(event) = queue.pop_front() {
            self.publish(&event);
            match event {
                Event::TimerStarted {
                    signal: Some(signal),
                    ..
                } => self.dispatcher.signal(signal),
                Event::PhaseExpired {
                    next_phase, signal, ..
                } => {
                    if let Some(signal) = signal {
                        self.dispatcher.signal(signal);
                    }
                    self.hand_off(next_phase).await;
                    match self.controller.finish_transition() {
                        Ok(advanced) => queue.extend(advanced),
                        Err(e) => tracing::warn!(error = %e, "failed to finish transition"),
                    }
                }
                _ => {}
            }
        }
    }

    async fn hand_off(&mut self, next_phase: Phase) {
        let started = Instant::now();
        if let Err(e) = self
            .dispatcher
            .transition(next_phase.transition_label())
            .await
        {
            tracing::warn!(error = %e, "transition failed, advancing anyway");
        }
        let took = started.elapsed();
        if took > TRANSITION_SOFT_BUDGET {
            tracing::warn!(?took, "transition exceeded its soft budget");
        }
    }

    fn publish(&self, event: &Event) {
        if let Some(events) = &self.events {
            let _ = events.send(event.clone());
        }
    }
}
