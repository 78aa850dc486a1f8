use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    format_display_time, timeline::beat_interval_ms, AppConfig, BeatSound, MetronomeError, Result,
    RhythmSegment, SegmentField, SoundBank, StatusSnapshot, Timeline, TimerKind, TimerSet,
    CLOCK_PERIOD_MS, DEFAULT_NEW_SEGMENT,
};

/// Lifecycle of a workout run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Stopped,
    Started,
    Paused,
    /// The whole timeline elapsed. Kept apart from `Stopped` so interfaces
    /// can show that the workout was completed.
    Finished,
}

impl RunState {
    pub fn can_edit_segments(self) -> bool {
        matches!(self, Self::Stopped | Self::Finished)
    }

    pub fn is_running(self) -> bool {
        self == Self::Started
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Started => f.write_str("started"),
            Self::Paused => f.write_str("paused"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    StateChanged { from: RunState, to: RunState },
    ElapsedChanged(u64),
    Beat {
        sound: BeatSound,
        bpm: f64,
        /// Scheduled host time of the beat in milliseconds.
        at_ms: f64,
        /// `false` when the cue was not loaded and nothing was played.
        played: bool,
    },
    TempoChanged { from: f64, to: f64, segment: usize },
    TimelineChanged,
}

pub type Listener = Box<dyn FnMut(&ControllerEvent)>;

#[derive(Debug, Clone, Copy)]
struct BeatCursor {
    bpm: f64,
    count: u64,
}

/// Drives a [`Timeline`] through time: owns the clock and beat timers, the
/// elapsed second counter and the run state.
///
/// The controller is passive. The host feeds its monotonic clock in through
/// [`RunController::advance`] and every due timer firing is processed
/// synchronously in time order.
pub struct RunController {
    timeline: Timeline,
    new_segment: RhythmSegment,
    state: RunState,
    elapsed_seconds: u64,
    timers: TimerSet,
    sounds: SoundBank,
    beat: Option<BeatCursor>,
    now_ms: f64,
    listeners: Vec<Listener>,
}

impl RunController {
    pub fn new(timeline: Timeline, sounds: SoundBank) -> Self {
        Self {
            timeline,
            new_segment: DEFAULT_NEW_SEGMENT,
            state: RunState::Stopped,
            elapsed_seconds: 0,
            timers: TimerSet::new(),
            sounds,
            beat: None,
            now_ms: 0.0,
            listeners: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig, sounds: SoundBank) -> Self {
        Self::new(config.segments.clone(), sounds).with_new_segment(config.new_segment)
    }

    /// Template appended by [`RunController::add_segment`].
    pub fn with_new_segment(mut self, segment: RhythmSegment) -> Self {
        self.new_segment = segment;
        self
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ControllerEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn display_time(&self) -> String {
        format_display_time(self.elapsed_seconds)
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn active_segment_index(&self) -> usize {
        self.timeline.active_segment_index(self.elapsed_seconds)
    }

    pub fn current_bpm(&self) -> f64 {
        self.timeline.current_bpm(self.elapsed_seconds)
    }

    /// Tempo the beat timer is currently armed at, if it is armed.
    pub fn beat_bpm(&self) -> Option<f64> {
        self.beat.map(|b| b.bpm)
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.timeline.total_duration_minutes()
    }

    pub fn can_edit_segments(&self) -> bool {
        self.state.can_edit_segments()
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            elapsed_seconds: self.elapsed_seconds,
            display_time: self.display_time(),
            current_bpm: self.current_bpm(),
            active_segment: self.active_segment_index(),
            total_duration_minutes: self.total_duration_minutes(),
            can_edit_segments: self.can_edit_segments(),
            segments: self.timeline.segments().to_vec(),
        }
    }

    /// Starts from zero when stopped or finished, resumes when paused.
    /// Returns `false` if already started.
    pub fn start(&mut self, now_ms: u64) -> bool {
        match self.state {
            RunState::Started => {
                tracing::debug!("start ignored: already started");
                return false;
            }
            RunState::Paused => {}
            RunState::Stopped | RunState::Finished => self.set_elapsed(0),
        }

        self.now_ms = now_ms as f64;
        self.timers.arm(TimerKind::Clock, CLOCK_PERIOD_MS, self.now_ms);
        self.arm_beat(self.current_bpm(), self.now_ms);
        self.transition(RunState::Started);
        true
    }

    /// Halts both timers and keeps the elapsed time.
    pub fn pause(&mut self) -> bool {
        if self.state != RunState::Started {
            tracing::debug!(state = %self.state, "pause ignored: not started");
            return false;
        }
        self.halt();
        self.transition(RunState::Paused);
        true
    }

    /// Halts both timers and resets the elapsed time from any state.
    pub fn stop(&mut self) -> bool {
        self.halt();
        self.set_elapsed(0);
        if self.state == RunState::Stopped {
            return false;
        }
        self.transition(RunState::Stopped);
        true
    }

    /// Processes every timer firing due at or before `now_ms`.
    pub fn advance(&mut self, now_ms: u64) {
        let now = now_ms as f64;
        if now < self.now_ms {
            tracing::debug!(now_ms, last_ms = self.now_ms, "ignoring host time going backwards");
            return;
        }
        self.now_ms = now;

        while let Some(firing) = self.timers.pop_due(now) {
            match firing.kind {
                TimerKind::Clock => self.on_clock_tick(),
                TimerKind::Beat => self.on_beat_tick(firing.due_ms),
            }
        }
    }

    pub fn add_segment(&mut self) -> Result<()> {
        self.add_segment_with(self.new_segment)
    }

    pub fn add_segment_with(&mut self, segment: RhythmSegment) -> Result<()> {
        self.ensure_editable()?;
        let timeline = self.timeline.with_segment_added(segment)?;
        self.replace(timeline);
        Ok(())
    }

    pub fn remove_segment(&mut self, index: usize) -> Result<()> {
        self.ensure_editable()?;
        let timeline = self.timeline.with_segment_removed(index)?;
        self.replace(timeline);
        Ok(())
    }

    pub fn update_segment(&mut self, index: usize, field: SegmentField, value: f64) -> Result<()> {
        self.ensure_editable()?;
        let timeline = self.timeline.with_segment_updated(index, field, value)?;
        self.replace(timeline);
        Ok(())
    }

    pub fn replace_timeline(&mut self, timeline: Timeline) -> Result<()> {
        self.ensure_editable()?;
        self.replace(timeline);
        Ok(())
    }

    fn on_clock_tick(&mut self) {
        self.set_elapsed(self.elapsed_seconds + 1);
        tracing::trace!(elapsed = self.elapsed_seconds, "clock tick");

        if self.elapsed_seconds as f64 >= self.timeline.total_duration_seconds() {
            self.finish();
        }
    }

    fn on_beat_tick(&mut self, due_ms: f64) {
        let Some(cursor) = self.beat.as_mut() else {
            return;
        };
        let sound = BeatSound::for_beat(cursor.count);
        cursor.count += 1;
        let armed_bpm = cursor.bpm;

        let played = self.sounds.play(sound);
        tracing::trace!(%sound, bpm = armed_bpm, at_ms = due_ms, "beat tick");
        self.emit(ControllerEvent::Beat {
            sound,
            bpm: armed_bpm,
            at_ms: due_ms,
            played,
        });

        let bpm = self.current_bpm();
        if bpm != armed_bpm {
            let segment = self.active_segment_index();
            tracing::debug!(
                from = armed_bpm,
                to = bpm,
                segment,
                "tempo change, re-arming beat timer"
            );
            self.arm_beat(bpm, due_ms);
            self.emit(ControllerEvent::TempoChanged {
                from: armed_bpm,
                to: bpm,
                segment,
            });
        }
    }

    fn finish(&mut self) {
        self.halt();
        self.transition(RunState::Finished);
        self.set_elapsed(0);
    }

    fn halt(&mut self) {
        self.timers.cancel_all();
        self.beat = None;
    }

    fn arm_beat(&mut self, bpm: f64, from_ms: f64) {
        self.timers.arm(TimerKind::Beat, beat_interval_ms(bpm), from_ms);
        self.beat = Some(BeatCursor { bpm, count: 0 });
    }

    fn transition(&mut self, to: RunState) {
        let from = self.state;
        self.state = to;
        tracing::info!(%from, %to, elapsed = self.elapsed_seconds, "run state changed");
        self.emit(ControllerEvent::StateChanged { from, to });
    }

    fn set_elapsed(&mut self, seconds: u64) {
        if self.elapsed_seconds != seconds {
            self.elapsed_seconds = seconds;
            self.emit(ControllerEvent::ElapsedChanged(seconds));
        }
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.can_edit_segments() {
            Ok(())
        } else {
            Err(MetronomeError::EditLocked { state: self.state })
        }
    }

    fn replace(&mut self, timeline: Timeline) {
        if timeline == self.timeline {
            return;
        }
        self.timeline = timeline;
        tracing::debug!(
            segments = self.timeline.len(),
            total_minutes = self.timeline.total_duration_minutes(),
            "timeline replaced"
        );
        self.emit(ControllerEvent::TimelineChanged);
    }

    fn emit(&mut self, event: ControllerEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl fmt::Debug for RunController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunController")
            .field("state", &self.state)
            .field("elapsed_seconds", &self.elapsed_seconds)
            .field("timeline", &self.timeline)
            .field("timers", &self.timers)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
