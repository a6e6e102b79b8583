use super::pipeline::RecordingPipeline;
use crate::model::NewLogEntry;
use crate::store::{LocalStore, TranscriptionJob};
use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Background transcription work, keyed by session id.
///
/// `end_session` enqueues a job before any transcription starts, and the job
/// is only removed after its logs are durably written. A crash or suspension
/// mid-transcription therefore leaves a resumable unit of work instead of a
/// silently-lost in-flight future. Re-delivery is idempotent: the transcript
/// is written as one atomic batch, so the first completed run wins and a
/// re-run against a session that already has logs is dropped without
/// appending.
pub struct TranscriptionQueue {
    store: Arc<LocalStore>,
    pipeline: Arc<RecordingPipeline>,
}

impl TranscriptionQueue {
    pub fn new(store: Arc<LocalStore>, pipeline: Arc<RecordingPipeline>) -> Self {
        Self { store, pipeline }
    }

    /// Persist a job for a just-ended session. Call before kicking off
    /// `run_pending` so the work survives a crash in between.
    pub async fn enqueue(&self, session_id: &str, audio_path: &Path) -> Result<()> {
        self.store
            .push_transcription_job(TranscriptionJob {
                session_id: session_id.to_string(),
                audio_path: audio_path.display().to_string(),
                created_at: Utc::now(),
            })
            .await?;

        info!("Enqueued transcription for session {}", session_id);
        Ok(())
    }

    /// Run every persisted job to completion. Returns the number of jobs
    /// that finished (including ones dropped as already-done or orphaned).
    ///
    /// Jobs whose transcription fails stay queued; the next invocation is
    /// the retry mechanism.
    pub async fn run_pending(&self) -> Result<usize> {
        let jobs = self.store.pending_transcriptions().await?;
        if jobs.is_empty() {
            return Ok(0);
        }

        info!("Running {} pending transcription job(s)", jobs.len());

        let mut finished = 0;
        for job in jobs {
            if self.run_job(&job).await? {
                finished += 1;
            }
        }

        Ok(finished)
    }

    async fn run_job(&self, job: &TranscriptionJob) -> Result<bool> {
        // The session is completed by the time a job runs; a missing session
        // means it was discarded, so the job is dropped with it.
        let session = self
            .store
            .get_all_sessions()
            .await?
            .into_iter()
            .find(|s| s.id == job.session_id);

        let Some(session) = session else {
            warn!(
                "Dropping transcription job for unknown session {}",
                job.session_id
            );
            self.store.remove_transcription_job(&job.session_id).await?;
            return Ok(true);
        };

        if !session.logs.is_empty() {
            // Logs are written as one atomic batch, so any logs at all mean
            // a previous run finished its transcript and crashed before
            // removing the job; appending again would duplicate it.
            self.store.remove_transcription_job(&job.session_id).await?;
            return Ok(true);
        }

        let result = self
            .pipeline
            .transcribe(Some(Path::new(&job.audio_path)))
            .await;

        match result {
            Ok(Some(transcription)) => {
                let logs: Vec<NewLogEntry> = transcription
                    .segments
                    .iter()
                    .map(|segment| NewLogEntry {
                        timestamp_sec: segment.t0,
                        text: segment.text.clone(),
                        confidence: None,
                    })
                    .collect();

                // Single batch write: a crash can only leave the whole
                // transcript or none of it, never a truncated prefix.
                if !logs.is_empty() {
                    self.store.add_logs(&job.session_id, logs).await?;
                }
                self.store.remove_transcription_job(&job.session_id).await?;
                info!(
                    "Transcribed session {}: {} log(s)",
                    job.session_id,
                    transcription.segments.len()
                );
                Ok(true)
            }
            Ok(None) => {
                // Engine not initialized; keep the job for a later run.
                warn!(
                    "Transcription unavailable for session {}, job kept",
                    job.session_id
                );
                Ok(false)
            }
            Err(e) => {
                warn!(
                    "Transcription failed for session {}: {:#}; job kept",
                    job.session_id, e
                );
                Ok(false)
            }
        }
    }
}
