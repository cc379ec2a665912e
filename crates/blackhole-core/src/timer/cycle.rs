//! Phase cycle: which phase follows an expired one.

use super::phase::Phase;

/// Result of advancing the cycle by one completed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStep {
    pub phase: Phase,
    /// Focus counter after the completed phase has been accounted for.
    pub focus_count: u32,
}

/// Decide the phase that follows `prev`.
///
/// `focus_count` is the number of Work phases completed since the last long
/// break. A completed Work phase increments it and lands on a long break
/// every `sessions_before_long` completions; a completed long break resets
/// it. A zero `sessions_before_long` is treated as 1.
pub fn next_phase(prev: Phase, focus_count: u32, sessions_before_long: u32) -> PhaseStep {
    match prev {
        Phase::Work => {
            let focus_count = focus_count.saturating_add(1);
            let phase = if focus_count % sessions_before_long.max(1) == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            PhaseStep { phase, focus_count }
        }
        Phase::ShortBreak => PhaseStep {
            phase: Phase::Work,
            focus_count,
        },
        Phase::LongBreak => PhaseStep {
            phase: Phase::Work,
            focus_count: 0,
        },
    }
}
