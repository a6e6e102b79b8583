use crate::api::{CreateSessionRequest, LogPayload, SessionApi};
use crate::model::{Session, SyncReport, SyncResult};
use crate::store::LocalStore;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Uploads completed-but-unsynced sessions to the remote service.
///
/// Reentrancy-guarded: overlapping invocations (connectivity listener plus a
/// manual "sync now") short-circuit to an empty report instead of
/// double-uploading. There is no internal retry scheduling; re-invocation is
/// the retry mechanism, which is safe because only still-`completed`
/// sessions are ever pending.
pub struct SyncEngine {
    store: Arc<LocalStore>,
    api: Arc<dyn SessionApi>,
    syncing: AtomicBool,
}

impl SyncEngine {
    pub fn new(store: Arc<LocalStore>, api: Arc<dyn SessionApi>) -> Self {
        Self {
            store,
            api,
            syncing: AtomicBool::new(false),
        }
    }

    /// Upload one session and its logs; mark it synced only on full
    /// success. Any failure leaves the session pending and is captured in
    /// the result rather than raised.
    pub async fn sync_session(&self, session: &Session) -> SyncResult {
        match self.upload(session).await {
            Ok(saved_logs) => SyncResult {
                session_id: session.id.clone(),
                success: true,
                saved_logs,
                error: None,
            },
            Err(e) => {
                warn!("Sync failed for session {}: {:#}", session.id, e);
                SyncResult {
                    session_id: session.id.clone(),
                    success: false,
                    saved_logs: 0,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }

    /// Upload every pending session, strictly sequentially to bound
    /// server-side load from a single device. Each session's outcome is
    /// independent: one failure never aborts the batch.
    pub async fn sync_all_pending(&self) -> Result<SyncReport> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Sync already in progress, skipping");
            return Ok(SyncReport::empty());
        }

        let report = self.run_batch().await;
        self.syncing.store(false, Ordering::SeqCst);
        report
    }

    async fn run_batch(&self) -> Result<SyncReport> {
        let pending = self.store.get_pending_sessions().await?;
        if pending.is_empty() {
            return Ok(SyncReport::empty());
        }

        info!("Syncing {} pending session(s)", pending.len());

        let mut results = Vec::with_capacity(pending.len());
        for session in &pending {
            results.push(self.sync_session(session).await);
        }

        let success = results.iter().filter(|r| r.success).count();
        let failed = results.len() - success;

        info!("Sync finished: {} ok, {} failed", success, failed);

        Ok(SyncReport {
            total: results.len(),
            success,
            failed,
            results,
        })
    }

    async fn upload(&self, session: &Session) -> Result<usize> {
        let ended_at = session
            .ended_at
            .context("Session has no end time; only completed sessions can sync")?;

        // Actual duration, not the planned one.
        let duration_sec = (ended_at - session.started_at).num_seconds().max(0) as u64;

        let request = CreateSessionRequest {
            duration_sec,
            started_at: session.started_at.to_rfc3339(),
            ended_at: ended_at.to_rfc3339(),
            session_memo: session.memo.clone(),
        };

        let logs: Vec<LogPayload> = session
            .logs
            .iter()
            .map(|l| LogPayload {
                timestamp_sec: l.timestamp_sec,
                text: l.text.clone(),
                confidence: l.confidence,
            })
            .collect();

        let outcome = self.api.create_session_with_logs(&request, &logs).await?;

        // Marking synced is the last step: a failure anywhere above leaves
        // the session eligible for retry.
        self.store.mark_session_synced(&session.id).await?;

        info!(
            "Session {} synced (remote {}, {} log(s))",
            session.id, outcome.remote_id, outcome.saved_logs
        );

        Ok(outcome.saved_logs)
    }
}
