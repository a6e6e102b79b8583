use anyhow::{anyhow, Context, Result};
use rubato::{FftFixedIn, Resampler};
use std::path::Path;

/// Sample rate the transcription model expects.
pub const MODEL_SAMPLE_RATE: u32 = 16_000;

// Fixed input chunk size for the FFT resampler.
const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// High-quality resampling of a mono signal.
///
/// Processes in fixed-size chunks; the final partial chunk is zero-padded
/// and the output trimmed back to the expected length so the tail is not
/// inflated with silence.
pub fn resample_mono(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == 0 {
        return Err(anyhow!("Source sample rate is zero"));
    }
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLER_CHUNK_SIZE,
        1,
        1,
    )
    .map_err(|e| anyhow!("Failed to create resampler: {}", e))?;

    let mut output = Vec::new();
    let mut input_pos = 0;

    while input_pos + RESAMPLER_CHUNK_SIZE <= samples.len() {
        let chunk = &samples[input_pos..input_pos + RESAMPLER_CHUNK_SIZE];
        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| anyhow!("Resampler failed: {}", e))?;
        output.extend_from_slice(&resampled[0]);
        input_pos += RESAMPLER_CHUNK_SIZE;
    }

    if input_pos < samples.len() {
        let remaining = samples.len() - input_pos;
        let mut last_chunk = vec![0.0; RESAMPLER_CHUNK_SIZE];
        last_chunk[..remaining].copy_from_slice(&samples[input_pos..]);
        let resampled = resampler
            .process(&[&last_chunk], None)
            .map_err(|e| anyhow!("Resampler failed: {}", e))?;
        let out_len = (remaining as f64 * target_rate as f64 / source_rate as f64) as usize;
        output.extend_from_slice(&resampled[0][..out_len.min(resampled[0].len())]);
    }

    Ok(output)
}

/// Write a mono float signal as a 16-bit PCM WAV file.
pub fn write_wav_mono16(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let path = path.as_ref();
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer
            .write_sample(v)
            .context("Failed to write sample to WAV")?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}
