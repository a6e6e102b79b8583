use crate::model::{
    DailyTotal, HooSettings, LogEntry, NewLogEntry, Session, SessionMode, SessionStatus,
    UserSettings,
};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Soft daily recording limit: 4 hours.
pub const DAILY_LIMIT_SECONDS: u64 = 4 * 60 * 60;

const KEY_CURRENT_SESSION: &str = "current_session.json";
const KEY_SESSIONS: &str = "sessions.json";
const KEY_SETTINGS: &str = "settings.json";
const KEY_HOO_SETTINGS: &str = "hoo_settings.json";
const KEY_DAILY_TOTAL: &str = "daily_total.json";
const KEY_ONBOARDING: &str = "onboarding.json";
const KEY_TRANSCRIBE_JOBS: &str = "transcribe_jobs.json";

const ALL_KEYS: &[&str] = &[
    KEY_CURRENT_SESSION,
    KEY_SESSIONS,
    KEY_SETTINGS,
    KEY_HOO_SETTINGS,
    KEY_DAILY_TOTAL,
    KEY_ONBOARDING,
    KEY_TRANSCRIBE_JOBS,
];

/// A unit of after-recording transcription work that survives a restart.
///
/// Jobs are removed only after their logs have been written, so a crash
/// mid-transcription leaves the job behind for the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionJob {
    pub session_id: String,
    pub audio_path: String,
    pub created_at: DateTime<Utc>,
}

/// Durable key-value-backed repository for sessions, logs, settings and the
/// daily aggregate total.
///
/// One JSON file per conceptual key under a data directory. Writes go to a
/// temp file and are renamed into place, so a crash never leaves a partial
/// record. Schema evolution happens at decode time: missing fields take
/// serde defaults (e.g. a session stored before `mode` existed reads as
/// `standard`), and the stored bytes are never rewritten just to migrate.
///
/// The single-active-session invariant is owned by the session manager;
/// `create_session` keeps a refuse-to-overwrite backstop. Lookups that miss
/// return `None` or no-op, never an error: a stale id is an expected outcome
/// after restarts.
pub struct LocalStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles within the process.
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;

        info!("Local store opened at {}", dir.display());

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ------------------------------------------------------------------
    // Active session
    // ------------------------------------------------------------------

    /// Create a new active session. The caller (session manager) is
    /// responsible for ensuring no other session is active; as a backstop
    /// the store refuses to overwrite an existing active record.
    pub async fn create_session(&self, duration_sec: u32, mode: SessionMode) -> Result<Session> {
        let _guard = self.write_lock.lock().await;

        if self.read_key::<Session>(KEY_CURRENT_SESSION).await?.is_some() {
            bail!("A session is already active");
        }

        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            duration_sec,
            mode,
            started_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::Active,
            logs: Vec::new(),
            memo: None,
            audio_file: None,
        };

        self.write_key(KEY_CURRENT_SESSION, &session).await?;
        info!("Created session {} ({}s, {:?})", session.id, duration_sec, mode);

        Ok(session)
    }

    /// The active session, if any. Records written before the `mode` field
    /// existed decode with `mode = standard`; the file itself is untouched.
    pub async fn get_current_session(&self) -> Result<Option<Session>> {
        self.read_key(KEY_CURRENT_SESSION).await
    }

    /// Full overwrite of the active session record. Used for incremental
    /// log/memo/audio-path mutations while recording.
    pub async fn update_session(&self, session: &Session) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_key(KEY_CURRENT_SESSION, session).await
    }

    /// The sole active -> completed transition point.
    ///
    /// Returns `None` without touching anything if `id` does not match the
    /// current active session (stale references across restarts are normal).
    /// On success the session is prepended to the completed list and the
    /// active slot is cleared.
    pub async fn end_session(
        &self,
        id: &str,
        memo: Option<String>,
        audio_path: Option<String>,
    ) -> Result<Option<Session>> {
        let _guard = self.write_lock.lock().await;

        let mut session = match self.read_key::<Session>(KEY_CURRENT_SESSION).await? {
            Some(s) if s.id == id => s,
            _ => return Ok(None),
        };

        session.status = SessionStatus::Completed;
        session.ended_at = Some(Utc::now());
        if memo.is_some() {
            session.memo = memo;
        }
        if audio_path.is_some() {
            session.audio_file = audio_path;
        }

        let mut sessions = self.read_sessions().await?;
        sessions.insert(0, session.clone());
        self.write_key(KEY_SESSIONS, &sessions).await?;
        self.remove_key(KEY_CURRENT_SESSION).await?;

        info!("Session {} completed", session.id);

        Ok(Some(session))
    }

    /// Remove the active session if its id matches (the cancel/discard
    /// path). No-op otherwise.
    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        match self.read_key::<Session>(KEY_CURRENT_SESSION).await? {
            Some(s) if s.id == id => {
                self.remove_key(KEY_CURRENT_SESSION).await?;
                info!("Session {} discarded", id);
            }
            _ => {}
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Completed sessions
    // ------------------------------------------------------------------

    /// All completed and synced sessions, most recent first.
    pub async fn get_all_sessions(&self) -> Result<Vec<Session>> {
        self.read_sessions().await
    }

    /// Sessions completed locally but not yet confirmed on the remote.
    pub async fn get_pending_sessions(&self) -> Result<Vec<Session>> {
        let sessions = self.read_sessions().await?;
        Ok(sessions
            .into_iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .collect())
    }

    /// Completed -> synced. No-op if the id is absent.
    pub async fn mark_session_synced(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut sessions = self.read_sessions().await?;
        if let Some(s) = sessions.iter_mut().find(|s| s.id == id) {
            s.status = SessionStatus::Synced;
            self.write_key(KEY_SESSIONS, &sessions).await?;
            info!("Session {} marked synced", id);
        }

        Ok(())
    }

    /// Update the memo of a completed/synced session. No-op if absent.
    pub async fn update_session_memo(&self, id: &str, memo: Option<String>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut sessions = self.read_sessions().await?;
        if let Some(s) = sessions.iter_mut().find(|s| s.id == id) {
            s.memo = memo;
            self.write_key(KEY_SESSIONS, &sessions).await?;
        }

        Ok(())
    }

    /// Update the audio artifact path of a completed/synced session.
    pub async fn update_session_audio_path(&self, id: &str, path: Option<String>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut sessions = self.read_sessions().await?;
        if let Some(s) = sessions.iter_mut().find(|s| s.id == id) {
            s.audio_file = path;
            self.write_key(KEY_SESSIONS, &sessions).await?;
        }

        Ok(())
    }

    /// Hard delete from the completed list. No-op if absent.
    pub async fn remove_session(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut sessions = self.read_sessions().await?;
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() != before {
            self.write_key(KEY_SESSIONS, &sessions).await?;
            info!("Session {} removed", id);
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------

    /// Assign an id and creation timestamp, then append.
    ///
    /// Checks the active session first and falls back to the completed
    /// list: transcription runs after `end_session`, so logs legitimately
    /// land on already-completed sessions. Errors only when the id matches
    /// neither.
    pub async fn add_log(&self, session_id: &str, log: NewLogEntry) -> Result<LogEntry> {
        self.add_logs(session_id, vec![log])
            .await?
            .pop()
            .context("Batch append returned no entry")
    }

    /// Append a whole batch of entries in one write. A transcript lands
    /// atomically: either every segment is stored or none is, so a session
    /// with any logs is known to carry a complete transcript.
    pub async fn add_logs(
        &self,
        session_id: &str,
        logs: Vec<NewLogEntry>,
    ) -> Result<Vec<LogEntry>> {
        let _guard = self.write_lock.lock().await;

        let entries: Vec<LogEntry> = logs
            .into_iter()
            .map(|log| LogEntry {
                id: uuid::Uuid::new_v4().to_string(),
                timestamp_sec: log.timestamp_sec,
                text: log.text,
                confidence: log.confidence,
                created_at: Utc::now(),
            })
            .collect();

        if let Some(mut current) = self.read_key::<Session>(KEY_CURRENT_SESSION).await? {
            if current.id == session_id {
                current.logs.extend(entries.iter().cloned());
                self.write_key(KEY_CURRENT_SESSION, &current).await?;
                return Ok(entries);
            }
        }

        let mut sessions = self.read_sessions().await?;
        if let Some(s) = sessions.iter_mut().find(|s| s.id == session_id) {
            s.logs.extend(entries.iter().cloned());
            self.write_key(KEY_SESSIONS, &sessions).await?;
            return Ok(entries);
        }

        bail!("Session not found: {}", session_id)
    }

    /// Remove a log entry if present, searching active then completed.
    /// No-op when the session or the log is absent.
    pub async fn delete_log(&self, session_id: &str, log_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(mut current) = self.read_key::<Session>(KEY_CURRENT_SESSION).await? {
            if current.id == session_id {
                let before = current.logs.len();
                current.logs.retain(|l| l.id != log_id);
                if current.logs.len() != before {
                    self.write_key(KEY_CURRENT_SESSION, &current).await?;
                }
                return Ok(());
            }
        }

        let mut sessions = self.read_sessions().await?;
        if let Some(s) = sessions.iter_mut().find(|s| s.id == session_id) {
            let before = s.logs.len();
            s.logs.retain(|l| l.id != log_id);
            if s.logs.len() != before {
                self.write_key(KEY_SESSIONS, &sessions).await?;
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// User settings, merged over defaults (missing fields take defaults
    /// at decode time).
    pub async fn get_settings(&self) -> Result<UserSettings> {
        Ok(self
            .read_key(KEY_SETTINGS)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_key(KEY_SETTINGS, settings).await
    }

    pub async fn get_hoo_settings(&self) -> Result<HooSettings> {
        Ok(self
            .read_key(KEY_HOO_SETTINGS)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_hoo_settings(&self, settings: &HooSettings) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_key(KEY_HOO_SETTINGS, settings).await
    }

    pub async fn reset_hoo_settings(&self) -> Result<HooSettings> {
        let _guard = self.write_lock.lock().await;
        let defaults = HooSettings::default();
        self.write_key(KEY_HOO_SETTINGS, &defaults).await?;
        Ok(defaults)
    }

    // ------------------------------------------------------------------
    // Onboarding flag
    // ------------------------------------------------------------------

    pub async fn is_onboarding_complete(&self) -> Result<bool> {
        Ok(self.read_key(KEY_ONBOARDING).await?.unwrap_or(false))
    }

    pub async fn set_onboarding_complete(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_key(KEY_ONBOARDING, &true).await
    }

    // ------------------------------------------------------------------
    // Daily total
    // ------------------------------------------------------------------

    /// Today's total, lazily reset to zero when the stored record is from
    /// an earlier calendar day.
    pub async fn get_daily_total(&self) -> Result<DailyTotal> {
        self.daily_total_on(Local::now().date_naive()).await
    }

    /// Fold a completed session's duration into today's total.
    pub async fn add_to_daily_total(&self, duration_seconds: u64) -> Result<DailyTotal> {
        self.add_to_daily_total_on(Local::now().date_naive(), duration_seconds)
            .await
    }

    /// Whether today's total has reached the 4-hour soft limit.
    pub async fn is_over_daily_limit(&self) -> Result<bool> {
        self.over_daily_limit_on(Local::now().date_naive()).await
    }

    /// Date-injected variant of [`get_daily_total`](Self::get_daily_total);
    /// the wall-clock entry point delegates here so rollover is testable.
    pub async fn daily_total_on(&self, today: NaiveDate) -> Result<DailyTotal> {
        let _guard = self.write_lock.lock().await;
        self.daily_total_on_locked(today).await
    }

    pub async fn add_to_daily_total_on(
        &self,
        today: NaiveDate,
        duration_seconds: u64,
    ) -> Result<DailyTotal> {
        let _guard = self.write_lock.lock().await;

        // Roll over first so a stale day is never incremented.
        let mut total = self.daily_total_on_locked(today).await?;
        total.total_seconds += duration_seconds;
        total.session_count += 1;
        self.write_key(KEY_DAILY_TOTAL, &total).await?;

        Ok(total)
    }

    pub async fn over_daily_limit_on(&self, today: NaiveDate) -> Result<bool> {
        let total = self.daily_total_on(today).await?;
        Ok(total.total_seconds >= DAILY_LIMIT_SECONDS)
    }

    async fn daily_total_on_locked(&self, today: NaiveDate) -> Result<DailyTotal> {
        match self.read_key::<DailyTotal>(KEY_DAILY_TOTAL).await? {
            Some(total) if total.date == today => Ok(total),
            stale => {
                if let Some(old) = stale {
                    info!("Daily total rolled over from {} to {}", old.date, today);
                }
                let fresh = DailyTotal::zero(today);
                self.write_key(KEY_DAILY_TOTAL, &fresh).await?;
                Ok(fresh)
            }
        }
    }

    // ------------------------------------------------------------------
    // Transcription jobs
    // ------------------------------------------------------------------

    /// Jobs enqueued after `end_session` whose logs have not been written yet.
    pub async fn pending_transcriptions(&self) -> Result<Vec<TranscriptionJob>> {
        Ok(self
            .read_key(KEY_TRANSCRIBE_JOBS)
            .await?
            .unwrap_or_default())
    }

    pub async fn push_transcription_job(&self, job: TranscriptionJob) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut jobs: Vec<TranscriptionJob> = self
            .read_key(KEY_TRANSCRIBE_JOBS)
            .await?
            .unwrap_or_default();
        jobs.retain(|j| j.session_id != job.session_id);
        jobs.push(job);
        self.write_key(KEY_TRANSCRIBE_JOBS, &jobs).await
    }

    pub async fn remove_transcription_job(&self, session_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut jobs: Vec<TranscriptionJob> = self
            .read_key(KEY_TRANSCRIBE_JOBS)
            .await?
            .unwrap_or_default();
        let before = jobs.len();
        jobs.retain(|j| j.session_id != session_id);
        if jobs.len() != before {
            self.write_key(KEY_TRANSCRIBE_JOBS, &jobs).await?;
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Wipe every key. Debug/reset flows only.
    pub async fn clear_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        for key in ALL_KEYS {
            self.remove_key(key).await?;
        }
        warn!("Local store cleared");

        Ok(())
    }

    // ------------------------------------------------------------------
    // Key-value plumbing
    // ------------------------------------------------------------------

    async fn read_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.read_key(KEY_SESSIONS).await?.unwrap_or_default())
    }

    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.dir.join(key);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let value = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        Ok(Some(value))
    }

    async fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.dir.join(key);
        let tmp = self.dir.join(format!("{}.tmp", key));

        let bytes = serde_json::to_vec_pretty(value).context("Failed to encode record")?;
        fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<()> {
        let path = self.dir.join(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}
