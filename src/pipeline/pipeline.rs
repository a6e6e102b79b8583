use super::engine::{RawTranscription, SegmentSpan, WhisperEngine};
use super::hallucination::clean_transcript;
use crate::audio::{resample_mono, write_wav_mono16, AudioFile, AudioRecorder, MODEL_SAMPLE_RATE};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Outcome of pipeline initialization. On failure the pipeline is degraded:
/// recording is unavailable but reviewing past sessions still works.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    pub success: bool,
    pub has_vad: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cleaned transcription result: full text plus the segments that survived
/// hallucination filtering.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<SegmentSpan>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub recordings_dir: PathBuf,
    pub model_path: PathBuf,
    /// BCP-47-ish language hint passed to the model ("ja", "en", ...).
    pub language: String,
}

/// Audio capture and transcription pipeline.
///
/// Owns the process-wide capture device and the loaded model. Transcription
/// is strictly batch, after recording ends; each stage (resample, inference,
/// re-encode) has an explicit fallback so a partial result is preferred over
/// no result.
pub struct RecordingPipeline {
    config: PipelineConfig,
    recorder: Arc<AudioRecorder>,
    engine: Mutex<Option<Arc<WhisperEngine>>>,
    current_artifact: Mutex<Option<PathBuf>>,
}

impl RecordingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let recorder = Arc::new(AudioRecorder::new(&config.recordings_dir)?);

        Ok(Self {
            config,
            recorder,
            engine: Mutex::new(None),
            current_artifact: Mutex::new(None),
        })
    }

    /// Probe the capture device and load the speech-to-text model.
    ///
    /// Never returns `Err`: a failed initialization is a structured outcome
    /// the caller uses to disable the recording affordance, not a fault.
    pub async fn initialize(&self) -> InitOutcome {
        if !AudioRecorder::probe_device() {
            warn!("No capture device available; pipeline degraded");
            return InitOutcome {
                success: false,
                has_vad: false,
                error: Some("No capture device available".to_string()),
            };
        }

        let model_path = self.config.model_path.clone();
        let language = self.config.language.clone();

        let loaded = tokio::task::spawn_blocking(move || WhisperEngine::load(model_path, &language))
            .await
            .map_err(|e| anyhow::anyhow!("Model load task failed: {}", e))
            .and_then(|r| r);

        match loaded {
            Ok(engine) => {
                if let Ok(mut slot) = self.engine.lock() {
                    *slot = Some(Arc::new(engine));
                }
                info!("Pipeline initialized (model: {})", self.config.model_path.display());
                InitOutcome {
                    success: true,
                    // VAD is reserved in the current design.
                    has_vad: false,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Pipeline initialization failed: {:#}", e);
                InitOutcome {
                    success: false,
                    has_vad: false,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.lock().map(|e| e.is_some()).unwrap_or(false)
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Open the capture device at 48kHz mono 16-bit and start writing a
    /// timestamped artifact. Errors on device-open failure; a second start
    /// while one is open fails fast.
    ///
    /// Device open blocks until the stream is confirmed, so it runs off the
    /// async executor like model load and inference do.
    pub async fn start_recording(&self) -> Result<PathBuf> {
        if !self.is_initialized() {
            bail!("Pipeline is not initialized; recording unavailable");
        }

        let recorder = Arc::clone(&self.recorder);
        let path = tokio::task::spawn_blocking(move || recorder.start())
            .await
            .context("Recorder task failed")??;

        if let Ok(mut artifact) = self.current_artifact.lock() {
            *artifact = Some(path.clone());
        }

        Ok(path)
    }

    /// Close the device and return the artifact path. No-op returning `None`
    /// when not recording. Teardown joins the capture thread, so it also
    /// runs off the async executor.
    pub async fn stop_recording(&self) -> Result<Option<PathBuf>> {
        let recorder = Arc::clone(&self.recorder);
        tokio::task::spawn_blocking(move || recorder.stop())
            .await
            .context("Recorder task failed")?
    }

    /// Batch transcription of an artifact.
    ///
    /// Resamples to the model rate into a transient file (deleted after
    /// inference; the 48kHz original is preserved for later export), runs
    /// the model, then applies hallucination cleaning per segment and to the
    /// whole text. Returns `None` when no model is loaded.
    pub async fn transcribe(&self, path: Option<&Path>) -> Result<Option<Transcription>> {
        let engine = match self.engine.lock().ok().and_then(|e| e.clone()) {
            Some(e) => e,
            None => return Ok(None),
        };

        let path = match path.map(Path::to_path_buf).or_else(|| {
            self.current_artifact
                .lock()
                .ok()
                .and_then(|a| a.clone())
        }) {
            Some(p) => p,
            None => return Ok(None),
        };

        let raw = tokio::task::spawn_blocking(move || run_inference(&engine, &path))
            .await
            .context("Transcription task failed")??;

        let text = clean_transcript(&raw.text);
        let segments: Vec<SegmentSpan> = raw
            .segments
            .into_iter()
            .filter_map(|seg| {
                let cleaned = clean_transcript(&seg.text);
                if cleaned.is_empty() {
                    None
                } else {
                    Some(SegmentSpan {
                        text: cleaned,
                        t0: seg.t0,
                        t1: seg.t1,
                    })
                }
            })
            .collect();

        info!(
            "Transcription complete: {} segments kept, {} chars",
            segments.len(),
            text.len()
        );

        Ok(Some(Transcription { text, segments }))
    }

    /// Export the current artifact for sharing, re-encoded compactly
    /// (16kHz mono) with a fallback to the uncompressed original when
    /// encoding fails. The temporary encoded file is deleted after the
    /// handoff. Returns `false` when there is no artifact.
    pub async fn share_audio_file(&self, export_dir: &Path) -> Result<bool> {
        let Some(source) = self.current_artifact.lock().ok().and_then(|a| a.clone()) else {
            return Ok(false);
        };

        tokio::fs::create_dir_all(export_dir)
            .await
            .context("Failed to create export directory")?;

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording.wav".to_string());
        let dest = export_dir.join(&file_name);

        let encode_source = source.clone();
        let encoded = tokio::task::spawn_blocking(move || encode_compact(&encode_source))
            .await
            .context("Encode task failed")?;

        match encoded {
            Ok(tmp) => {
                let copy = tokio::fs::copy(&tmp, &dest).await;
                if let Err(e) = tokio::fs::remove_file(&tmp).await {
                    warn!("Failed to remove temporary encoded file: {}", e);
                }
                copy.context("Failed to export encoded audio")?;
                info!("Shared compact audio: {}", dest.display());
            }
            Err(e) => {
                // Encoding is best-effort; share the original instead.
                warn!("Compact encode failed, sharing original: {:#}", e);
                tokio::fs::copy(&source, &dest)
                    .await
                    .context("Failed to export original audio")?;
                info!("Shared original audio: {}", dest.display());
            }
        }

        Ok(true)
    }

    /// Best-effort removal of the current artifact. Failures are logged,
    /// never raised.
    pub async fn delete_audio_file(&self) {
        let taken = self
            .current_artifact
            .lock()
            .ok()
            .and_then(|mut a| a.take());

        if let Some(path) = taken {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to delete audio artifact {}: {}", path.display(), e);
            } else {
                info!("Deleted audio artifact: {}", path.display());
            }
        }
    }

    /// Stop any in-flight recording. Safe to call in any state, including
    /// from teardown paths.
    pub async fn cleanup(&self) {
        let recorder = Arc::clone(&self.recorder);
        match tokio::task::spawn_blocking(move || recorder.stop()).await {
            Ok(Ok(Some(path))) => {
                info!("Cleanup stopped in-flight recording: {}", path.display())
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => warn!("Cleanup failed to stop recording: {:#}", e),
            Err(e) => warn!("Cleanup recorder task failed: {}", e),
        }
    }
}

/// Resample to the model rate via a transient file, falling back to feeding
/// the original samples directly when resampling fails.
fn run_inference(engine: &WhisperEngine, path: &Path) -> Result<RawTranscription> {
    let audio = AudioFile::open(path)?;
    let mono = audio.mono_f32();

    match resample_to_transient(path, &mono, audio.sample_rate) {
        Ok((samples, transient)) => {
            let result = engine.transcribe(&samples);
            // The transient file exists only so the resample step is
            // independently observable; the 48kHz original is kept.
            if let Err(e) = std::fs::remove_file(&transient) {
                warn!("Failed to remove transient file {}: {}", transient.display(), e);
            }
            result
        }
        Err(e) => {
            warn!(
                "Resample failed ({:#}), feeding original {}Hz audio",
                e, audio.sample_rate
            );
            engine.transcribe_with_rate(&mono, audio.sample_rate)
        }
    }
}

fn resample_to_transient(
    path: &Path,
    mono: &[f32],
    source_rate: u32,
) -> Result<(Vec<f32>, PathBuf)> {
    let samples = resample_mono(mono, source_rate, MODEL_SAMPLE_RATE)?;

    let transient = transient_path(path);
    write_wav_mono16(&transient, &samples, MODEL_SAMPLE_RATE)?;

    Ok((samples, transient))
}

fn transient_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    path.with_file_name(format!("{}-16k.wav", stem))
}

/// Compact re-encode for sharing: 16kHz mono, roughly a third of the bytes
/// of the 48kHz capture.
fn encode_compact(source: &Path) -> Result<PathBuf> {
    let audio = AudioFile::open(source)?;
    let mono = audio.mono_f32();
    let samples = resample_mono(&mono, audio.sample_rate, MODEL_SAMPLE_RATE)?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    let tmp = source.with_file_name(format!("{}-share.wav", stem));
    write_wav_mono16(&tmp, &samples, MODEL_SAMPLE_RATE)?;

    Ok(tmp)
}
