//! Integration tests for the phase cycle driven through the controller.
//!
//! Each test runs whole phases to expiry on a manual clock and checks the
//! cues, the recorded sessions and the auto-start chain.

use std::sync::Arc;

use blackhole_core::storage::{MemoryRecorder, MemoryStore};
use blackhole_core::timer::{ManualClock, SignalKind, TimerSnapshot};
use blackhole_core::{Config, Event, Phase, SoundMode, TimerController, TimerState};
use chrono::{Duration, TimeZone, Utc};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap())
}

/// Let the running phase run out and return the expiry event.
fn expire<S, R>(ctl: &mut TimerController<S, R>, clock: &ManualClock) -> Event
where
    S: blackhole_core::KvStore,
    R: blackhole_core::SessionRecorder,
{
    assert!(ctl.engine().is_running(), "phase is not running");
    clock.advance(Duration::seconds(ctl.engine().remaining_secs() as i64));
    let event = ctl.tick().expect("no event at expiry");
    assert!(matches!(event, Event::PhaseExpired { .. }), "got {event:?}");
    assert_eq!(ctl.engine().state(), TimerState::Transitioning);
    event
}

fn expiry_signal(event: &Event) -> Option<SignalKind> {
    match event {
        Event::PhaseExpired { signal, .. } => signal.map(|s| s.kind),
        _ => None,
    }
}

#[test]
fn test_four_focus_sessions_earn_a_long_break() {
    let clock = clock();
    let store = MemoryStore::new();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(&store, &recorder, Arc::new(clock.clone()));

    let mut breaks = Vec::new();
    for round in 1..=4 {
        assert_eq!(ctl.engine().phase(), Phase::Work);
        ctl.start().unwrap();
        expire(&mut ctl, &clock);
        ctl.finish_transition().unwrap();
        breaks.push(ctl.engine().phase());

        if round < 4 {
            assert_eq!(ctl.engine().focus_count(), round);
        }
        ctl.start().unwrap();
        expire(&mut ctl, &clock);
        ctl.finish_transition().unwrap();
    }

    assert_eq!(
        breaks,
        vec![
            Phase::ShortBreak,
            Phase::ShortBreak,
            Phase::ShortBreak,
            Phase::LongBreak
        ]
    );
    assert_eq!(ctl.engine().focus_count(), 0);
    assert_eq!(ctl.engine().phase(), Phase::Work);

    let records = recorder.records();
    assert_eq!(records.len(), 8);
    let work_secs: u64 = records
        .iter()
        .filter(|r| r.phase == Phase::Work)
        .map(|r| r.duration_secs)
        .sum();
    assert_eq!(work_secs, 4 * 25 * 60);
    assert_eq!(records[7].phase, Phase::LongBreak);
    assert_eq!(records[7].duration_secs, 15 * 60);
}

#[test]
fn test_auto_start_next_chains_without_a_second_cue() {
    let clock = clock();
    let store = MemoryStore::new();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(&store, &recorder, Arc::new(clock.clone()));
    ctl.apply_config(Config {
        auto_start_next: true,
        ..Config::default()
    })
    .unwrap();

    ctl.start().unwrap();
    let expired = expire(&mut ctl, &clock);
    assert_eq!(expiry_signal(&expired), Some(SignalKind::ShortBegin));

    let events = ctl.finish_transition().unwrap();
    assert_eq!(events.len(), 2);
    match &events[1] {
        Event::TimerStarted {
            phase,
            auto,
            signal,
            ..
        } => {
            assert_eq!(*phase, Phase::ShortBreak);
            assert!(*auto);
            assert!(signal.is_none());
        }
        other => panic!("expected auto start, got {other:?}"),
    }
    assert!(ctl.engine().is_running());

    expire(&mut ctl, &clock);
    ctl.finish_transition().unwrap();
    let records = recorder.records();
    assert!(!records[0].auto_started);
    assert!(records[1].auto_started);
}

#[test]
fn test_auto_continue_only_after_breaks() {
    let clock = clock();
    let store = MemoryStore::new();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(&store, &recorder, Arc::new(clock.clone()));
    ctl.apply_config(Config {
        auto_continue_after_break: true,
        ..Config::default()
    })
    .unwrap();

    ctl.start().unwrap();
    let expired = expire(&mut ctl, &clock);
    assert_eq!(expiry_signal(&expired), Some(SignalKind::FocusEnded));
    ctl.finish_transition().unwrap();
    assert_eq!(ctl.engine().phase(), Phase::ShortBreak);
    assert!(!ctl.engine().is_running());

    ctl.start().unwrap();
    let expired = expire(&mut ctl, &clock);
    assert_eq!(expiry_signal(&expired), Some(SignalKind::FocusBegin));
    ctl.finish_transition().unwrap();
    assert_eq!(ctl.engine().phase(), Phase::Work);
    assert!(ctl.engine().is_running());
    assert!(ctl.engine().last_start_was_auto());
}

#[test]
fn test_half_minute_work_phase() {
    let clock = clock();
    let store = MemoryStore::new();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(&store, &recorder, Arc::new(clock.clone()));

    let event = ctl
        .apply_config(Config {
            work_minutes: 0.5,
            ..Config::default()
        })
        .unwrap();
    match event {
        Event::ConfigApplied {
            total_secs,
            remaining_secs,
            ..
        } => {
            assert_eq!(total_secs, 30);
            assert_eq!(remaining_secs, 30);
        }
        other => panic!("unexpected {other:?}"),
    }

    ctl.start().unwrap();
    clock.advance(Duration::seconds(29));
    assert!(matches!(
        ctl.tick(),
        Some(Event::Tick {
            remaining_secs: 1,
            ..
        })
    ));
    clock.advance(Duration::seconds(1));
    assert!(matches!(ctl.tick(), Some(Event::PhaseExpired { .. })));
    assert_eq!(recorder.records()[0].duration_secs, 30);
}

#[test]
fn test_aborted_phases_are_not_recorded() {
    let clock = clock();
    let store = MemoryStore::new();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(&store, &recorder, Arc::new(clock.clone()));

    ctl.start().unwrap();
    clock.advance(Duration::minutes(10));
    ctl.tick();
    ctl.reset().unwrap();

    ctl.start().unwrap();
    clock.advance(Duration::minutes(10));
    ctl.switch_phase(Phase::ShortBreak).unwrap();

    assert!(recorder.records().is_empty());
    assert_eq!(ctl.engine().remaining_secs(), 5 * 60);
    assert_eq!(ctl.engine().state(), TimerState::Idle);
}

#[test]
fn test_mute_skips_cues_but_not_transitions() {
    let clock = clock();
    let store = MemoryStore::new();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(&store, &recorder, Arc::new(clock.clone()));
    ctl.apply_config(Config {
        sound_mode: SoundMode::Mute,
        ..Config::default()
    })
    .unwrap();

    match ctl.start().unwrap() {
        Some(Event::TimerStarted { signal, .. }) => assert!(signal.is_none()),
        other => panic!("unexpected {other:?}"),
    }
    match expire(&mut ctl, &clock) {
        Event::PhaseExpired {
            signal,
            label,
            next_phase,
            ..
        } => {
            assert!(signal.is_none());
            assert_eq!(label, "BREAK");
            assert_eq!(next_phase, Phase::ShortBreak);
        }
        other => panic!("unexpected {other:?}"),
    }
    let snap = TimerSnapshot::load(&store).unwrap();
    assert!(snap.transition.is_some());
}

#[test]
fn test_long_sleep_expires_once() {
    let clock = clock();
    let store = MemoryStore::new();
    let recorder = MemoryRecorder::new();
    let mut ctl = TimerController::open(&store, &recorder, Arc::new(clock.clone()));

    ctl.start().unwrap();
    clock.advance(Duration::hours(3));
    assert!(matches!(ctl.tick(), Some(Event::PhaseExpired { .. })));
    assert!(ctl.tick().is_none());
    assert_eq!(recorder.records().len(), 1);
    assert_eq!(recorder.records()[0].duration_secs, 3 * 60 * 60);
}
