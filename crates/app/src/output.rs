use std::{
    io::{self, Write},
    path::Path,
};

use clap::ValueEnum;
use interval_metronome_core::{AudioOutput, Result, SilentOutput, SoundBuffer};

/// Audio backends selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// Keep time without making a sound.
    Silent,
    /// Ring the terminal bell on every beat.
    Bell,
    /// Play the configured sound files on the default audio device.
    Rodio,
}

/// Opens the requested backend. A device that cannot be opened falls back to
/// silent output; the metronome keeps time either way.
pub fn open(kind: OutputKind, volume: f32) -> Box<dyn AudioOutput> {
    match kind {
        OutputKind::Silent => Box::new(SilentOutput),
        OutputKind::Bell => Box::new(BellOutput),
        OutputKind::Rodio => open_rodio(volume),
    }
}

#[cfg(feature = "rodio")]
fn open_rodio(volume: f32) -> Box<dyn AudioOutput> {
    match rodio_output::RodioOutput::try_default(volume) {
        Ok(output) => Box::new(output),
        Err(err) => {
            tracing::warn!(error = %err, "no audio device available, running silent");
            Box::new(SilentOutput)
        }
    }
}

#[cfg(not(feature = "rodio"))]
fn open_rodio(_volume: f32) -> Box<dyn AudioOutput> {
    tracing::warn!("built without the `rodio` feature, running silent");
    Box::new(SilentOutput)
}

/// Terminal bell. Sound files are not needed, only their names are kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellOutput;

impl AudioOutput for BellOutput {
    fn load(&self, path: &Path) -> Result<SoundBuffer> {
        Ok(SoundBuffer::new(path.display().to_string(), Vec::new()))
    }

    fn play(&self, _buffer: &SoundBuffer) {
        let mut stderr = io::stderr().lock();
        if let Err(err) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
            tracing::debug!(error = %err, "terminal bell failed");
        }
    }
}

#[cfg(feature = "rodio")]
mod rodio_output {
    use std::{io::Cursor, path::Path};

    use interval_metronome_core::{AudioOutput, MetronomeError, Result, SoundBuffer};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Source};

    /// Plays decoded cues on the default output device. Every `play` starts
    /// an independent voice so overlapping beats never cut each other off.
    pub struct RodioOutput {
        _stream: OutputStream,
        stream_handle: OutputStreamHandle,
        volume: f32,
    }

    impl RodioOutput {
        pub fn try_default(volume: f32) -> Result<Self> {
            let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
                MetronomeError::msg(format!("failed to open audio output stream: {e}"))
            })?;
            Ok(Self {
                _stream: stream,
                stream_handle,
                volume,
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn load(&self, path: &Path) -> Result<SoundBuffer> {
            let buffer = SoundBuffer::read(path)?;
            Decoder::new(Cursor::new(buffer.bytes().clone())).map_err(|e| {
                MetronomeError::msg(format!("failed to decode {}: {e}", path.display()))
            })?;
            Ok(buffer)
        }

        fn play(&self, buffer: &SoundBuffer) {
            let source = match Decoder::new(Cursor::new(buffer.bytes().clone())) {
                Ok(source) => source.convert_samples::<f32>().amplify(self.volume),
                Err(err) => {
                    tracing::warn!(sound = buffer.name(), error = %err, "failed to decode sound");
                    return;
                }
            };
            if let Err(err) = self.stream_handle.play_raw(source) {
                tracing::warn!(sound = buffer.name(), error = %err, "failed to play sound");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bell_output_needs_no_files() {
        let buffer = BellOutput.load(Path::new("does-not-exist.wav")).unwrap();
        assert_eq!(buffer.name(), "does-not-exist.wav");
    }

    #[test]
    fn silent_backend_is_selectable() {
        let output = open(OutputKind::Silent, 1.0);
        assert!(output.load(Path::new("/no/such/tick.wav")).is_err());
    }
}
