use std::{fmt, fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{config::SoundConfig, Result};

/// The two alternating beat cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BeatSound {
    Tick,
    Tock,
}

impl BeatSound {
    /// Cue for the `count`-th beat since the beat timer was armed.
    pub fn for_beat(count: u64) -> Self {
        if count % 2 == 0 {
            Self::Tick
        } else {
            Self::Tock
        }
    }
}

impl fmt::Display for BeatSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tick => f.write_str("tick"),
            Self::Tock => f.write_str("tock"),
        }
    }
}

/// Encoded audio held in memory. Cloning shares the underlying bytes.
#[derive(Clone)]
pub struct SoundBuffer {
    name: String,
    bytes: Arc<[u8]>,
}

impl SoundBuffer {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads the whole file into a buffer named after its path.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::new(path.display().to_string(), bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }
}

impl fmt::Debug for SoundBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundBuffer")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Host audio capability: decode a sound once, play it many times.
///
/// `play` is fire-and-forget. Implementations log playback problems instead
/// of reporting them, the caller keeps its timing regardless.
pub trait AudioOutput {
    fn load(&self, path: &Path) -> Result<SoundBuffer>;
    fn play(&self, buffer: &SoundBuffer);
}

/// Output that loads sound files but never makes a noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn load(&self, path: &Path) -> Result<SoundBuffer> {
        SoundBuffer::read(path)
    }

    fn play(&self, buffer: &SoundBuffer) {
        tracing::trace!(sound = buffer.name(), "silent playback");
    }
}

/// Tick and tock buffers bound to the output that plays them.
pub struct SoundBank {
    output: Box<dyn AudioOutput>,
    tick: Option<SoundBuffer>,
    tock: Option<SoundBuffer>,
}

impl SoundBank {
    /// Loads both cues through `output`. A cue that fails to load is logged
    /// and stays unavailable; playing it later is a silent no-op.
    pub fn load(output: Box<dyn AudioOutput>, config: &SoundConfig) -> Self {
        let tick = load_cue(output.as_ref(), BeatSound::Tick, &config.tick);
        let tock = load_cue(output.as_ref(), BeatSound::Tock, &config.tock);
        Self { output, tick, tock }
    }

    /// Bank with no cues loaded. Beats still fire, nothing is played.
    pub fn unavailable(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            tick: None,
            tock: None,
        }
    }

    pub fn is_available(&self, sound: BeatSound) -> bool {
        self.buffer(sound).is_some()
    }

    /// Plays `sound` if its buffer is loaded. Returns whether playback was
    /// handed to the output.
    pub fn play(&self, sound: BeatSound) -> bool {
        match self.buffer(sound) {
            Some(buffer) => {
                self.output.play(buffer);
                true
            }
            None => {
                tracing::trace!(%sound, "sound not loaded, skipping playback");
                false
            }
        }
    }

    fn buffer(&self, sound: BeatSound) -> Option<&SoundBuffer> {
        match sound {
            BeatSound::Tick => self.tick.as_ref(),
            BeatSound::Tock => self.tock.as_ref(),
        }
    }
}

impl fmt::Debug for SoundBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundBank")
            .field("tick", &self.tick)
            .field("tock", &self.tock)
            .finish()
    }
}

fn load_cue(output: &dyn AudioOutput, sound: BeatSound, path: &Path) -> Option<SoundBuffer> {
    match output.load(path) {
        Ok(buffer) => {
            tracing::debug!(%sound, path = %path.display(), "loaded sound");
            Some(buffer)
        }
        Err(err) => {
            tracing::warn!(
                %sound,
                path = %path.display(),
                error = %err,
                "failed to load sound, beats will be silent"
            );
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{cell::RefCell, path::Path, rc::Rc};

    use super::{AudioOutput, SoundBuffer};
    use crate::{MetronomeError, Result};

    /// Output double that records the name of every buffer it plays.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingOutput {
        pub played: Rc<RefCell<Vec<String>>>,
    }

    impl AudioOutput for RecordingOutput {
        fn load(&self, path: &Path) -> Result<SoundBuffer> {
            match path.to_str() {
                Some(name) if !name.starts_with("missing") => {
                    Ok(SoundBuffer::new(name, vec![0u8; 4]))
                }
                _ => Err(MetronomeError::msg(format!(
                    "no such sound: {}",
                    path.display()
                ))),
            }
        }

        fn play(&self, buffer: &SoundBuffer) {
            self.played.borrow_mut().push(buffer.name().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::testing::RecordingOutput;
    use super::*;

    fn config(tick: &str, tock: &str) -> SoundConfig {
        SoundConfig {
            tick: PathBuf::from(tick),
            tock: PathBuf::from(tock),
            ..SoundConfig::default()
        }
    }

    #[test]
    fn alternates_starting_with_tick() {
        let cues: Vec<_> = (0..4).map(BeatSound::for_beat).collect();
        assert_eq!(
            cues,
            vec![BeatSound::Tick, BeatSound::Tock, BeatSound::Tick, BeatSound::Tock]
        );
    }

    #[test]
    fn plays_loaded_cues_through_the_output() {
        let output = RecordingOutput::default();
        let bank = SoundBank::load(Box::new(output.clone()), &config("tick.wav", "tock.wav"));

        assert!(bank.play(BeatSound::Tick));
        assert!(bank.play(BeatSound::Tock));
        assert_eq!(*output.played.borrow(), vec!["tick.wav", "tock.wav"]);
    }

    #[test]
    fn missing_cue_is_skipped_silently() {
        let output = RecordingOutput::default();
        let bank = SoundBank::load(
            Box::new(output.clone()),
            &config("tick.wav", "missing-tock.wav"),
        );

        assert!(bank.is_available(BeatSound::Tick));
        assert!(!bank.is_available(BeatSound::Tock));
        assert!(!bank.play(BeatSound::Tock));
        assert!(bank.play(BeatSound::Tick));
        assert_eq!(output.played.borrow().len(), 1);
    }

    #[test]
    fn silent_output_reports_unreadable_files() {
        let result = SilentOutput.load(Path::new("/definitely/not/here.wav"));
        assert!(result.is_err());
    }
}
