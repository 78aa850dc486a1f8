//! Core library for the Interval Metronome.
//!
//! A workout is a [`Timeline`] of rhythm segments, each with a duration and a
//! tempo. The [`RunController`] walks that timeline through time: it counts
//! elapsed seconds, plays alternating tick/tock cues on every beat through an
//! injected [`AudioOutput`], switches tempo at segment boundaries and
//! finishes once the whole timeline has elapsed.
//!
//! Nothing in this crate reads a wall clock. The host feeds monotonic
//! milliseconds into [`RunController::advance`] from whatever event loop it
//! runs, which keeps the scheduling logic deterministic and testable.

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod status;
pub mod timeline;
pub mod timer;

pub use audio::{AudioOutput, BeatSound, SilentOutput, SoundBank, SoundBuffer};
pub use config::{AppConfig, RunConfig, SoundConfig};
pub use controller::{ControllerEvent, Listener, RunController, RunState};
pub use error::{MetronomeError, Result};
pub use status::{format_display_time, StatusSnapshot};
pub use timeline::{
    RhythmSegment, SegmentField, Timeline, DEFAULT_NEW_SEGMENT, MAX_BPM, MAX_DURATION_MINUTES,
};
pub use timer::{Firing, TimerId, TimerKind, TimerSet, CLOCK_PERIOD_MS, MIN_PERIOD_MS};
