use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use blackhole_core::storage::{Database, DriverLock};
use blackhole_core::timer::{
    format_clock, Clock, Command, DispatchError, Dispatcher, Phase, Signal, SoundCue,
    SystemClock, TimerController, TimerEngine, TimerRunner, TimerSnapshot,
};
use blackhole_core::{Config, Event, StorageError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{open_controller, print_events, settle};

/// How long the transition banner stays up before the next phase loads.
const BANNER_HOLD: Duration = Duration::from_millis(900);

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current phase
    Start,
    /// Pause the running phase
    Pause,
    /// Pause when running, start otherwise
    Toggle,
    /// Rewind the current phase and restart the focus cycle
    Reset,
    /// Switch to another phase (work, short, long)
    Switch {
        phase: Phase,
    },
    /// Print current timer state as JSON
    Status,
    /// Run the timer in the foreground; reads commands from stdin
    Run,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let (lock, mut ctl, mut events) = match open_controller(&db) {
        Ok(opened) => opened,
        Err(StorageError::DriverBusy) if matches!(action, TimerAction::Status) => {
            let (engine, status) = peek(&db);
            return print_status(&engine, status, &[]);
        }
        Err(e) => return Err(e.into()),
    };

    match action {
        TimerAction::Start => events.extend(ctl.start()?),
        TimerAction::Pause => events.extend(ctl.pause()?),
        TimerAction::Toggle => events.extend(ctl.toggle()?),
        TimerAction::Reset => events.push(ctl.reset()?),
        TimerAction::Switch { phase } => events.push(ctl.switch_phase(phase)?),
        TimerAction::Status => {
            // Bring the countdown up to date; expiry is settled like on open.
            let ticked = ctl.tick().into_iter().collect();
            events.extend(settle(&mut ctl, ticked));
            return print_status(ctl.engine(), ctl.status(), &events);
        }
        TimerAction::Run => {
            drop(ctl);
            drop(lock);
            return run_foreground(&db);
        }
    }

    print_events(&events)?;
    Ok(())
}

/// Timer state as seen from outside while another process drives it.
/// Nothing is persisted.
fn peek(db: &Database) -> (TimerEngine, Event) {
    let now = SystemClock.now();
    let config = Config::load(db);
    let mut engine = match TimerSnapshot::load(db) {
        Some(snap) => TimerEngine::restore(config, snap, now),
        None => TimerEngine::new(config),
    };
    engine.tick(now);
    let status = engine.status(now);
    (engine, status)
}

fn print_status(
    engine: &TimerEngine,
    status: Event,
    events: &[Event],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut status = serde_json::to_value(status)?;
    status["display"] = serde_json::Value::String(format_clock(
        engine.remaining_secs(),
        engine.config().leading_zero,
    ));
    print_events(events)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn run_foreground(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(foreground(db));
    // stdin is read on a blocking thread that never returns by itself.
    runtime.shutdown_background();
    result
}

async fn foreground(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let _lock = DriverLock::acquire()?;
    let ctl = TimerController::open(db, db, std::sync::Arc::new(SystemClock));
    let leading_zero = ctl.config().leading_zero;

    let (tx, rx) = mpsc::channel(16);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let runner = TimerRunner::new(ctl, TerminalDispatcher, rx).with_events(events_tx);

    let render = async {
        while let Some(event) = events_rx.recv().await {
            render(&event, leading_zero);
        }
    };

    eprintln!("commands: start, pause, toggle, reset, switch <work|short|long>, quit");
    let (_, (), ()) = tokio::join!(runner.run(), read_commands(tx), render);
    println!();
    Ok(())
}

/// Forward stdin lines to the runner until quit, EOF or Ctrl-C.
async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        match parse_command(&line) {
            Some(Command::Shutdown) => break,
            Some(command) => {
                if tx.send(command).await.is_err() {
                    return;
                }
            }
            None if line.trim().is_empty() => {}
            None => eprintln!("unknown command: {}", line.trim()),
        }
    }
    let _ = tx.send(Command::Shutdown).await;
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match words.next()? {
        "start" | "s" => Command::Start,
        "pause" | "p" => Command::Pause,
        "toggle" | "t" => Command::Toggle,
        "reset" => Command::Reset,
        "switch" => Command::Switch(words.next()?.parse().ok()?),
        "quit" | "q" | "exit" => Command::Shutdown,
        _ => return None,
    };
    Some(command)
}

fn render(event: &Event, leading_zero: bool) {
    let mut out = std::io::stdout();
    match event {
        Event::Tick {
            phase,
            remaining_secs,
            ..
        }
        | Event::TimerStarted {
            phase,
            remaining_secs,
            ..
        }
        | Event::TimerResumed {
            phase,
            remaining_secs,
            ..
        } => {
            let _ = write!(out, "\r{:<11} {}  ", phase.as_str(), format_clock(*remaining_secs, leading_zero));
        }
        Event::TimerPaused {
            phase,
            remaining_secs,
            ..
        } => {
            let _ = write!(
                out,
                "\r{:<11} {} (paused)",
                phase.as_str(),
                format_clock(*remaining_secs, leading_zero)
            );
        }
        Event::TimerReset {
            phase, total_secs, ..
        }
        | Event::PhaseSwitched {
            phase, total_secs, ..
        }
        | Event::PhaseAdvanced {
            phase, total_secs, ..
        } => {
            let _ = write!(out, "\r{:<11} {}  ", phase.as_str(), format_clock(*total_secs, leading_zero));
        }
        Event::PhaseExpired { record, .. } => {
            let _ = writeln!(
                out,
                "\r{:<11} done ({})",
                record.phase.as_str(),
                format_clock(record.duration_secs, true)
            );
        }
        Event::ConfigApplied { .. } | Event::StateSnapshot { .. } => {}
    }
    let _ = out.flush();
}

/// Rings the terminal bell and shows a banner for each transition.
struct TerminalDispatcher;

impl Dispatcher for TerminalDispatcher {
    fn signal(&mut self, signal: Signal) {
        let mut out = std::io::stdout();
        let _ = match signal.cue {
            SoundCue::Chime => write!(out, "\x07"),
            SoundCue::Voice(kind) => write!(out, "\x07[{}] ", kind.as_str()),
        };
        let _ = out.flush();
    }

    async fn transition(&mut self, label: &'static str) -> Result<(), DispatchError> {
        println!("\n    >>> {label} <<<");
        tokio::time::sleep(BANNER_HOLD).await;
        Ok(())
    }
}
