use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, RhythmSegment, Timeline, DEFAULT_NEW_SEGMENT};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Timeline loaded on startup.
    pub segments: Timeline,
    /// Segment appended by the `add` command when no values are given.
    pub new_segment: RhythmSegment,
    pub sounds: SoundConfig,
    pub run: RunConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            segments: Timeline::default(),
            new_segment: DEFAULT_NEW_SEGMENT,
            sounds: SoundConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing keys fall back to defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.new_segment.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::from_path(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Configuration of the tick and tock cues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoundConfig {
    pub tick: PathBuf,
    pub tock: PathBuf,
    /// Linear gain applied by outputs that support it.
    pub volume: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            tick: PathBuf::from("tick.wav"),
            tock: PathBuf::from("tock.wav"),
            volume: 1.0,
        }
    }
}

/// Settings for the host event loop that drives the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    /// How often the host feeds the current time into the controller.
    pub poll_interval_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "segments": [{ "durationMinutes": 2, "bpm": 170 }],
            "run": { "pollIntervalMs": 4 }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.segments.segments(), &[RhythmSegment::new(2.0, 170.0)]);
        assert_eq!(config.run.poll_interval_ms, 4);
        assert_eq!(config.new_segment, DEFAULT_NEW_SEGMENT);
        assert_eq!(config.sounds.tick, PathBuf::from("tick.wav"));
    }

    #[test]
    fn rejects_empty_segment_list() {
        assert!(serde_json::from_str::<AppConfig>(r#"{ "segments": [] }"#).is_err());
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = AppConfig::default().to_json_pretty().unwrap();
        assert!(json.contains("\"newSegment\""));
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.segments, Timeline::default());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load(Some(Path::new("/no/such/config.json"))).unwrap_err();
        assert!(matches!(err, crate::MetronomeError::Io(_)));
    }
}
