use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{MetronomeError, Result};

/// Highest accepted tempo. Keeps the beat period well above timer resolution.
pub const MAX_BPM: f64 = 1_000.0;

/// Longest accepted segment, one week.
pub const MAX_DURATION_MINUTES: f64 = 7.0 * 24.0 * 60.0;

/// Segment appended when a new one is added without explicit values.
pub const DEFAULT_NEW_SEGMENT: RhythmSegment = RhythmSegment::new(10.0, 150.0);

/// A contiguous portion of the workout with a fixed duration and tempo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RhythmSegment {
    pub duration_minutes: f64,
    pub bpm: f64,
}

impl RhythmSegment {
    pub const fn new(duration_minutes: f64, bpm: f64) -> Self {
        Self {
            duration_minutes,
            bpm,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_minutes * 60.0
    }

    /// Milliseconds between two beats at this segment's tempo.
    pub fn beat_interval_ms(&self) -> f64 {
        beat_interval_ms(self.bpm)
    }

    /// Checks that both fields are positive and within their upper bounds.
    pub fn validate(&self) -> Result<()> {
        check_value(SegmentField::DurationMinutes, self.duration_minutes)?;
        check_value(SegmentField::Bpm, self.bpm)
    }

    fn with_field(mut self, field: SegmentField, value: f64) -> Self {
        match field {
            SegmentField::DurationMinutes => self.duration_minutes = value,
            SegmentField::Bpm => self.bpm = value,
        }
        self
    }
}

impl fmt::Display for RhythmSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min @ {} bpm", self.duration_minutes, self.bpm)
    }
}

/// Parses the compact `<minutes>x<bpm>` notation, e.g. `10x160`.
impl FromStr for RhythmSegment {
    type Err = MetronomeError;

    fn from_str(s: &str) -> Result<Self> {
        let (minutes, bpm) = s
            .trim()
            .split_once(['x', 'X', '@'])
            .ok_or_else(|| MetronomeError::parse(s, "expected <minutes>x<bpm>"))?;
        let minutes: f64 = minutes
            .trim()
            .parse()
            .map_err(|_| MetronomeError::parse(s, "duration is not a number"))?;
        let bpm: f64 = bpm
            .trim()
            .parse()
            .map_err(|_| MetronomeError::parse(s, "bpm is not a number"))?;

        let segment = Self::new(minutes, bpm);
        segment.validate()?;
        Ok(segment)
    }
}

/// Editable field of a [`RhythmSegment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentField {
    DurationMinutes,
    Bpm,
}

impl SegmentField {
    /// Largest value the field accepts.
    pub fn max_value(self) -> f64 {
        match self {
            Self::DurationMinutes => MAX_DURATION_MINUTES,
            Self::Bpm => MAX_BPM,
        }
    }
}

impl fmt::Display for SegmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DurationMinutes => f.write_str("durationMinutes"),
            Self::Bpm => f.write_str("bpm"),
        }
    }
}

impl FromStr for SegmentField {
    type Err = MetronomeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duration" | "durationminutes" | "minutes" | "min" => Ok(Self::DurationMinutes),
            "bpm" | "tempo" => Ok(Self::Bpm),
            _ => Err(MetronomeError::parse(s, "expected `duration` or `bpm`")),
        }
    }
}

/// Ordered, non-empty sequence of segments that makes up a workout.
///
/// A timeline is never mutated in place: every edit returns a new value that
/// replaces the previous one wholesale, so derived values such as the total
/// duration always agree with the segment list they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    segments: Vec<RhythmSegment>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            segments: vec![
                RhythmSegment::new(10.0, 160.0),
                RhythmSegment::new(30.0, 180.0),
            ],
        }
    }
}

impl Timeline {
    pub fn new(segments: Vec<RhythmSegment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(MetronomeError::EmptyTimeline);
        }
        for segment in &segments {
            segment.validate()?;
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[RhythmSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; kept for API symmetry with [`Timeline::len`].
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RhythmSegment> {
        self.segments.get(index)
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_minutes).sum()
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.segments.iter().map(RhythmSegment::duration_seconds).sum()
    }

    /// Index of the first segment whose cumulative end lies beyond `elapsed`,
    /// clamped to the last segment once the whole timeline has elapsed.
    pub fn active_segment_index(&self, elapsed_seconds: u64) -> usize {
        let mut remaining = elapsed_seconds as f64;
        for (index, segment) in self.segments.iter().enumerate() {
            let duration = segment.duration_seconds();
            if remaining < duration {
                return index;
            }
            remaining -= duration;
        }
        self.segments.len() - 1
    }

    pub fn active_segment(&self, elapsed_seconds: u64) -> &RhythmSegment {
        &self.segments[self.active_segment_index(elapsed_seconds)]
    }

    pub fn current_bpm(&self, elapsed_seconds: u64) -> f64 {
        self.active_segment(elapsed_seconds).bpm
    }

    /// Offset in seconds at which the segment at `index` begins.
    pub fn segment_start_seconds(&self, index: usize) -> Option<f64> {
        (index < self.segments.len()).then(|| {
            self.segments[..index]
                .iter()
                .map(RhythmSegment::duration_seconds)
                .sum()
        })
    }

    pub fn with_segment_added(&self, segment: RhythmSegment) -> Result<Self> {
        segment.validate()?;
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    pub fn with_segment_removed(&self, index: usize) -> Result<Self> {
        if index >= self.segments.len() {
            tracing::debug!(
                index,
                len = self.segments.len(),
                "remove ignored: index out of range"
            );
            return Ok(self.clone());
        }
        if self.segments.len() == 1 {
            return Err(MetronomeError::EmptyTimeline);
        }
        let mut segments = self.segments.clone();
        segments.remove(index);
        Ok(Self { segments })
    }

    pub fn with_segment_updated(
        &self,
        index: usize,
        field: SegmentField,
        value: f64,
    ) -> Result<Self> {
        check_value(field, value)?;
        let Some(current) = self.segments.get(index) else {
            tracing::debug!(
                index,
                len = self.segments.len(),
                "update ignored: index out of range"
            );
            return Ok(self.clone());
        };
        let mut segments = self.segments.clone();
        segments[index] = current.with_field(field, value);
        Ok(Self { segments })
    }
}

impl<'de> Deserialize<'de> for Timeline {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let segments = Vec::<RhythmSegment>::deserialize(deserializer)?;
        Timeline::new(segments).map_err(serde::de::Error::custom)
    }
}

/// Milliseconds between beats for the given tempo.
pub fn beat_interval_ms(bpm: f64) -> f64 {
    60_000.0 / bpm
}

fn check_value(field: SegmentField, value: f64) -> Result<()> {
    if value > 0.0 && value <= field.max_value() {
        Ok(())
    } else {
        Err(MetronomeError::InvalidSegment { field, value })
    }
}
