use serde::Serialize;

use crate::{RhythmSegment, RunState};

/// Formats a second count as `HH:MM:SS`. Hours are not wrapped.
pub fn format_display_time(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Read model handed to user interfaces after a change notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub state: RunState,
    pub elapsed_seconds: u64,
    pub display_time: String,
    pub current_bpm: f64,
    pub active_segment: usize,
    pub total_duration_minutes: f64,
    pub can_edit_segments: bool,
    pub segments: Vec<RhythmSegment>,
}

impl StatusSnapshot {
    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} / {} min | segment {}/{} @ {} bpm",
            self.state,
            self.display_time,
            self.total_duration_minutes,
            self.active_segment + 1,
            self.segments.len(),
            self.current_bpm,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_every_component() {
        assert_eq!(format_display_time(0), "00:00:00");
        assert_eq!(format_display_time(59), "00:00:59");
        assert_eq!(format_display_time(61), "00:01:01");
        assert_eq!(format_display_time(2400), "00:40:00");
        assert_eq!(format_display_time(3 * 3600 + 25 * 60 + 7), "03:25:07");
    }

    #[test]
    fn hours_are_not_wrapped() {
        assert_eq!(format_display_time(100 * 3600), "100:00:00");
    }

    #[test]
    fn snapshot_serialises_in_camel_case() {
        let snapshot = StatusSnapshot {
            state: RunState::Paused,
            elapsed_seconds: 75,
            display_time: format_display_time(75),
            current_bpm: 160.0,
            active_segment: 0,
            total_duration_minutes: 40.0,
            can_edit_segments: false,
            segments: vec![RhythmSegment::new(40.0, 160.0)],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "paused");
        assert_eq!(json["displayTime"], "00:01:15");
        assert_eq!(json["canEditSegments"], false);
        assert_eq!(json["segments"][0]["durationMinutes"], 40.0);
        assert_eq!(
            snapshot.summary(),
            "[paused] 00:01:15 / 40 min | segment 1/1 @ 160 bpm"
        );
    }
}
