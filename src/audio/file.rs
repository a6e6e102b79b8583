use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use tracing::debug;

/// Decoded WAV artifact: raw interleaved samples plus the header facts the
/// pipeline needs (rate, channel count, duration).
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
        let spec = reader.spec();

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Corrupt WAV data in {}", path.display()))?;

        let frames = samples.len() / spec.channels.max(1) as usize;
        let duration_seconds = frames as f64 / spec.sample_rate as f64;

        debug!(
            "Decoded {}: {:.1}s at {}Hz, {} channel(s)",
            path.display(),
            duration_seconds,
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Interleaved samples mixed down to mono, normalized to [-1.0, 1.0].
    /// This is the shape the resampler and the transcription model consume.
    pub fn mono_f32(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.iter().map(|&s| s as f32 / 32768.0).collect();
        }

        let ch = self.channels as usize;
        self.samples
            .chunks_exact(ch)
            .map(|frame| {
                let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
                sum / ch as f32
            })
            .collect()
    }
}
