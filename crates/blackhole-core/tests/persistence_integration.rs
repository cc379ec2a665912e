//! Integration tests for restarts: snapshot, settings and session history
//! survive reopening the database file, and broken storage never stops the
//! timer.

use std::sync::Arc;

use blackhole_core::storage::{
    KvStore, MemoryRecorder, SessionRecord, SessionRecorder, SETTINGS_KEY,
};
use blackhole_core::timer::{ManualClock, SNAPSHOT_KEY};
use blackhole_core::{
    Config, Database, Event, Phase, StorageError, TimerController, TimerState,
};
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap())
}

fn db_in(dir: &TempDir) -> Database {
    Database::open_at(dir.path().join("blackhole.db")).unwrap()
}

struct BrokenRecorder;

impl SessionRecorder for BrokenRecorder {
    fn record(&self, _record: &SessionRecord) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk full".into()))
    }
}

/// Store whose every read and write fails.
struct BrokenStore;

impl KvStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disk unplugged".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk unplugged".into()))
    }
}

#[test]
fn test_running_timer_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    {
        let db = db_in(&dir);
        let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));
        ctl.start().unwrap();
        clock.advance(Duration::minutes(5));
        ctl.tick();
    }

    clock.advance(Duration::minutes(2));
    let db = db_in(&dir);
    let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));
    assert_eq!(ctl.engine().state(), TimerState::Running);

    let events = ctl.resume();
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::TimerResumed {
            phase,
            remaining_secs,
            ..
        } => {
            assert_eq!(*phase, Phase::Work);
            assert_eq!(*remaining_secs, 18 * 60);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_phase_that_ended_while_closed_expires_on_resume() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    {
        let db = db_in(&dir);
        let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));
        ctl.start().unwrap();
    }

    clock.advance(Duration::hours(1));
    let db = db_in(&dir);
    let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));
    let events = ctl.resume();
    assert!(matches!(events.last(), Some(Event::PhaseExpired { .. })));

    let history = db.history(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].phase, Phase::Work);
    assert_eq!(history[0].duration_secs, 60 * 60);
}

#[test]
fn test_interrupted_transition_completes_on_resume() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    {
        let db = db_in(&dir);
        let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));
        ctl.start().unwrap();
        clock.advance(Duration::minutes(25));
        assert!(matches!(ctl.tick(), Some(Event::PhaseExpired { .. })));
    }

    let db = db_in(&dir);
    let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));
    assert_eq!(ctl.engine().state(), TimerState::Transitioning);

    let events = ctl.resume();
    assert!(matches!(
        events.first(),
        Some(Event::PhaseAdvanced {
            phase: Phase::ShortBreak,
            focus_count: 1,
            ..
        })
    ));
    assert_eq!(ctl.engine().state(), TimerState::Idle);
    assert_eq!(db.history(10).unwrap().len(), 1);
}

#[test]
fn test_settings_reload_after_restart() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let custom = Config {
        work_minutes: 50.0,
        short_break_minutes: 10.0,
        sessions_before_long: 2,
        ..Config::default()
    };
    {
        let db = db_in(&dir);
        let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));
        ctl.apply_config(custom.clone()).unwrap();
    }

    let db = db_in(&dir);
    let ctl = TimerController::open(&db, &db, Arc::new(clock));
    assert_eq!(ctl.config(), &custom);
    assert_eq!(ctl.engine().total_secs(), 50 * 60);
}

#[test]
fn test_corrupt_storage_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let db = db_in(&dir);
    db.kv_set(SETTINGS_KEY, "work_minutes = [").unwrap();
    db.kv_set(SNAPSHOT_KEY, "{\"phase\":").unwrap();

    let mut ctl = TimerController::open(&db, &db, Arc::new(clock()));
    assert_eq!(ctl.config(), &Config::default());
    assert_eq!(ctl.engine().phase(), Phase::Work);
    assert_eq!(ctl.engine().remaining_secs(), 25 * 60);
    assert!(ctl.resume().is_empty());
}

#[test]
fn test_recorder_failure_does_not_stop_the_timer() {
    let clock = clock();
    let db = Database::open_memory().unwrap();
    let mut ctl = TimerController::open(&db, BrokenRecorder, Arc::new(clock.clone()));

    ctl.start().unwrap();
    clock.advance(Duration::minutes(25));
    assert!(matches!(ctl.tick(), Some(Event::PhaseExpired { .. })));
    ctl.finish_transition().unwrap();
    assert_eq!(ctl.engine().phase(), Phase::ShortBreak);
}

#[test]
fn test_daily_stats_follow_completed_sessions() {
    let clock = clock();
    let db = Database::open_memory().unwrap();
    let mut ctl = TimerController::open(&db, &db, Arc::new(clock.clone()));

    for _ in 0..2 {
        ctl.start().unwrap();
        clock.advance(Duration::minutes(25));
        ctl.tick();
        ctl.finish_transition().unwrap();
        ctl.start().unwrap();
        clock.advance(Duration::minutes(5));
        ctl.tick();
        ctl.finish_transition().unwrap();
    }

    let stats = db.stats_for_date(clock_date()).unwrap();
    assert_eq!(stats.total_sessions, 4);
    assert_eq!(stats.work.sessions, 2);
    assert_eq!(stats.work.seconds, 50 * 60);
    assert_eq!(stats.short_break.seconds, 10 * 60);
    assert_eq!(stats.auto_started, 0);
}

#[test]
fn test_unavailable_store_keeps_the_timer_in_memory() {
    let clock = clock();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(BrokenStore, &recorder, Arc::new(clock.clone()));
    assert_eq!(ctl.config(), &Config::default());
    assert_eq!(ctl.engine().state(), TimerState::Idle);
    assert!(ctl.resume().is_empty());

    ctl.start().unwrap();
    clock.advance(Duration::minutes(25));
    assert!(matches!(ctl.tick(), Some(Event::PhaseExpired { .. })));
    ctl.finish_transition().unwrap();
    assert_eq!(ctl.engine().phase(), Phase::ShortBreak);
    assert_eq!(ctl.engine().focus_count(), 1);
    assert_eq!(recorder.records().len(), 1);

    let custom = Config {
        short_break_minutes: 7.0,
        ..Config::default()
    };
    ctl.apply_config(custom.clone()).unwrap();
    assert_eq!(ctl.config(), &custom);
    assert_eq!(ctl.engine().total_secs(), 7 * 60);
}

#[test]
fn test_out_of_range_snapshot_starts_fresh() {
    let db = Database::open_memory().unwrap();
    db.kv_set(
        SNAPSHOT_KEY,
        r#"{"phase":"work","total_seconds":10000000000000,"remaining_seconds":10000000000000,"running":false}"#,
    )
    .unwrap();

    let mut ctl = TimerController::open(&db, &db, Arc::new(clock()));
    assert_eq!(ctl.engine().total_secs(), 25 * 60);
    assert!(matches!(ctl.start(), Ok(Some(Event::TimerStarted { .. }))));
}

fn clock_date() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
}
