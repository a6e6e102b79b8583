// Integration tests for the persisted transcription queue: job
// survival, orphan cleanup, and idempotent re-delivery. The pipeline is
// left uninitialized here, which exercises the keep-for-retry path
// without needing a model file.

use anyhow::Result;
use hoonote::model::{NewLogEntry, SessionMode};
use hoonote::pipeline::{PipelineConfig, RecordingPipeline, TranscriptionQueue};
use hoonote::store::LocalStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup(dir: &TempDir) -> Result<(Arc<LocalStore>, TranscriptionQueue)> {
    let store = Arc::new(LocalStore::open(dir.path().join("store")).await?);
    let pipeline = Arc::new(RecordingPipeline::new(PipelineConfig {
        recordings_dir: dir.path().join("recordings"),
        model_path: dir.path().join("missing-model.bin"),
        language: "ja".to_string(),
    })?);
    let queue = TranscriptionQueue::new(store.clone(), pipeline);
    Ok((store, queue))
}

#[tokio::test]
async fn test_enqueue_persists_job() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, queue) = setup(&dir).await?;

    let session = store.create_session(600, SessionMode::Standard).await?;
    store.end_session(&session.id, None, None).await?;

    queue.enqueue(&session.id, Path::new("/audio/rec.wav")).await?;

    let jobs = store.pending_transcriptions().await?;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].session_id, session.id);
    assert_eq!(jobs[0].audio_path, "/audio/rec.wav");

    Ok(())
}

#[tokio::test]
async fn test_job_kept_when_engine_unavailable() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, queue) = setup(&dir).await?;

    let session = store.create_session(600, SessionMode::Standard).await?;
    store.end_session(&session.id, None, None).await?;
    queue.enqueue(&session.id, Path::new("/audio/rec.wav")).await?;

    let finished = queue.run_pending().await?;
    assert_eq!(finished, 0, "No model loaded, so the job is retried later");
    assert_eq!(store.pending_transcriptions().await?.len(), 1);
    assert!(store.get_all_sessions().await?[0].logs.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_orphan_job_is_dropped() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, queue) = setup(&dir).await?;

    // A job whose session was discarded.
    queue.enqueue("gone-session", Path::new("/audio/x.wav")).await?;

    let finished = queue.run_pending().await?;
    assert_eq!(finished, 1);
    assert!(store.pending_transcriptions().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_redelivery_against_transcribed_session_is_dropped() -> Result<()> {
    // Simulates a crash after the transcript was written but before the job
    // was removed. The transcript lands as a single atomic batch, so any
    // logs at all mean the previous run finished; the re-run must drop the
    // job without appending a second copy.
    let dir = TempDir::new()?;
    let (store, queue) = setup(&dir).await?;

    let session = store.create_session(600, SessionMode::Standard).await?;
    store.end_session(&session.id, None, None).await?;
    store
        .add_logs(
            &session.id,
            vec![
                NewLogEntry {
                    timestamp_sec: 1.0,
                    text: "first segment".to_string(),
                    confidence: None,
                },
                NewLogEntry {
                    timestamp_sec: 6.5,
                    text: "second segment".to_string(),
                    confidence: None,
                },
            ],
        )
        .await?;
    queue.enqueue(&session.id, Path::new("/audio/rec.wav")).await?;

    let finished = queue.run_pending().await?;
    assert_eq!(finished, 1);
    assert!(store.pending_transcriptions().await?.is_empty());

    let sessions = store.get_all_sessions().await?;
    assert_eq!(sessions[0].logs.len(), 2, "No duplicate append");
    assert_eq!(sessions[0].logs[0].text, "first segment");

    Ok(())
}

#[tokio::test]
async fn test_run_pending_with_empty_queue() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, queue) = setup(&dir).await?;

    assert_eq!(queue.run_pending().await?, 0);

    Ok(())
}
