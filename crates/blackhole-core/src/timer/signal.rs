//! Audio/visual cues at phase boundaries and the dispatcher seam that plays them.

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use super::phase::Phase;

/// Which sounds the dispatcher should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundMode {
    /// No audio; transitions are still animated.
    #[serde(rename = "none")]
    Mute,
    /// One chime for every boundary event.
    #[default]
    Default,
    /// A spoken cue per event kind.
    Voice,
}

/// Boundary event kinds understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    FocusBegin,
    FocusEnded,
    ShortBegin,
    ShortEnded,
    LongBegin,
    LongEnded,
}

impl SignalKind {
    pub fn begin(phase: Phase) -> Self {
        match phase {
            Phase::Work => SignalKind::FocusBegin,
            Phase::ShortBreak => SignalKind::ShortBegin,
            Phase::LongBreak => SignalKind::LongBegin,
        }
    }

    pub fn ended(phase: Phase) -> Self {
        match phase {
            Phase::Work => SignalKind::FocusEnded,
            Phase::ShortBreak => SignalKind::ShortEnded,
            Phase::LongBreak => SignalKind::LongEnded,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::FocusBegin => "focus-begin",
            SignalKind::FocusEnded => "focus-ended",
            SignalKind::ShortBegin => "short-begin",
            SignalKind::ShortEnded => "short-ended",
            SignalKind::LongBegin => "long-begin",
            SignalKind::LongEnded => "long-ended",
        }
    }
}

/// Sound asset class the dispatcher should play for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "kind", rename_all = "lowercase")]
pub enum SoundCue {
    Chime,
    Voice(SignalKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub cue: SoundCue,
}

impl SoundMode {
    /// The signal to emit for `kind`, or `None` when muted.
    pub fn signal(self, kind: SignalKind) -> Option<Signal> {
        let cue = match self {
            SoundMode::Mute => return None,
            SoundMode::Default => SoundCue::Chime,
            SoundMode::Voice => SoundCue::Voice(kind),
        };
        Some(Signal { kind, cue })
    }
}

/// The one cue fired when a phase expires.
///
/// When the next phase will start on its own, its begin cue plays before the
/// transition animation; otherwise the expired phase's ended cue plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalChoice {
    Begin(Phase),
    Ended(Phase),
}

impl SignalChoice {
    pub fn at_expiry(prev: Phase, next: Phase, next_will_auto_start: bool) -> Self {
        if next_will_auto_start {
            SignalChoice::Begin(next)
        } else {
            SignalChoice::Ended(prev)
        }
    }

    pub fn kind(self) -> SignalKind {
        match self {
            SignalChoice::Begin(phase) => SignalKind::begin(phase),
            SignalChoice::Ended(phase) => SignalKind::ended(phase),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dispatcher failed: {0}")]
pub struct DispatchError(pub String);

/// Plays cues and phase-transition animations.
///
/// `transition` resolves once the animation is done; the runner does not
/// assume a duration and always advances the phase afterwards, even when the
/// future resolves to an error.
pub trait Dispatcher {
    fn signal(&mut self, signal: Signal);

    fn transition(&mut self, label: &'static str) -> impl Future<Output = Result<(), DispatchError>>;
}
