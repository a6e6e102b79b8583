use crate::audio::MODEL_SAMPLE_RATE;
use anyhow::{anyhow, bail, Result};
use std::path::Path;
use std::sync::Mutex;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

/// One time-coded segment from the model. `t0`/`t1` are seconds from the
/// start of the audio.
#[derive(Debug, Clone)]
pub struct SegmentSpan {
    pub text: String,
    pub t0: f64,
    pub t1: f64,
}

/// Uncleaned model output: full text plus time-coded segments.
#[derive(Debug, Clone)]
pub struct RawTranscription {
    pub text: String,
    pub segments: Vec<SegmentSpan>,
}

/// On-device speech-to-text engine.
///
/// Loads the bundled GGML model once; inference runs batch over a whole
/// recording (there is no streaming mode in this design).
pub struct WhisperEngine {
    state: Mutex<WhisperState>,
    language: String,
}

impl WhisperEngine {
    /// Load the model into memory. This is the expensive part of pipeline
    /// initialization and the reason initialization can fail while the rest
    /// of the application keeps working.
    pub fn load(model_path: impl AsRef<Path>, language: &str) -> Result<Self> {
        let path = model_path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Invalid model path: {}", path.display()))?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| anyhow!("Failed to load model {}: {}", path.display(), e))?;
        let state = ctx
            .create_state()
            .map_err(|e| anyhow!("Failed to create model state: {}", e))?;

        Ok(Self {
            state: Mutex::new(state),
            language: language.to_string(),
        })
    }

    /// Transcribe mono 16kHz samples.
    pub fn transcribe(&self, samples: &[f32]) -> Result<RawTranscription> {
        if samples.is_empty() {
            return Ok(RawTranscription {
                text: String::new(),
                segments: Vec::new(),
            });
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(2);
        params.set_translate(false);
        params.set_language(Some(self.language.as_str()));
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_temperature(0.0);
        params.set_no_speech_thold(0.6);

        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("Model state poisoned"))?;
        state
            .full(params, samples)
            .map_err(|e| anyhow!("Inference failed: {}", e))?;

        let n = state
            .full_n_segments()
            .map_err(|e| anyhow!("Failed to read segments: {}", e))?;

        let mut segments = Vec::with_capacity(n as usize);
        let mut text = String::new();

        for i in 0..n {
            let seg_text = state
                .full_get_segment_text(i)
                .map_err(|e| anyhow!("Failed to read segment {}: {}", i, e))?;
            // Segment timestamps come back in centiseconds.
            let t0 = state
                .full_get_segment_t0(i)
                .map_err(|e| anyhow!("Failed to read segment {} start: {}", i, e))?
                as f64
                / 100.0;
            let t1 = state
                .full_get_segment_t1(i)
                .map_err(|e| anyhow!("Failed to read segment {} end: {}", i, e))?
                as f64
                / 100.0;

            let trimmed = seg_text.trim();
            if !text.is_empty() && !trimmed.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);

            segments.push(SegmentSpan {
                text: trimmed.to_string(),
                t0,
                t1,
            });
        }

        Ok(RawTranscription { text, segments })
    }

    /// Transcribe samples at an arbitrary rate by linearly interpolating to
    /// the model rate first. Degraded-accuracy fallback for when the proper
    /// resampler failed; a lesser result beats no result.
    pub fn transcribe_with_rate(&self, samples: &[f32], sample_rate: u32) -> Result<RawTranscription> {
        if sample_rate == 0 {
            bail!("Sample rate is zero");
        }
        if sample_rate == MODEL_SAMPLE_RATE {
            return self.transcribe(samples);
        }

        let ratio = sample_rate as f32 / MODEL_SAMPLE_RATE as f32;
        let out_len = (samples.len() as f32 / ratio).max(1.0) as usize;
        let mut resampled = Vec::with_capacity(out_len);
        for i in 0..out_len {
            let pos = i as f32 * ratio;
            let i0 = pos.floor() as usize;
            let i1 = (i0 + 1).min(samples.len().saturating_sub(1));
            let t = pos - i0 as f32;
            let s0 = *samples.get(i0).unwrap_or(&0.0);
            let s1 = *samples.get(i1).unwrap_or(&0.0);
            resampled.push(s0 * (1.0 - t) + s1 * t);
        }

        self.transcribe(&resampled)
    }
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("language", &self.language)
            .finish()
    }
}
