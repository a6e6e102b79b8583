use crate::model::{DailyTotal, Session, SessionMode, UserSettings};
use crate::store::LocalStore;
use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// UI-facing lifecycle state: idle -> recording -> reviewing -> idle.
/// Cancelling goes recording -> idle directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Recording,
    Reviewing,
}

/// In-memory lifecycle handle layered over the store.
///
/// Holds a transient mirror of at most the one active session plus the
/// elapsed-seconds counter, and is the single writer for active-session
/// mutations. The single-active-session invariant is enforced here with an
/// explicit guard, not by caller convention: a concurrent `start_session`
/// fails loudly.
///
/// Exactly one repeating timer source may drive [`tick`](Self::tick) per
/// active session; a remount without teardown would double-increment.
pub struct SessionManager {
    store: Arc<LocalStore>,
    state: ManagerState,
    current: Option<Session>,
    elapsed_seconds: u64,
    settings: UserSettings,
    daily_total: DailyTotal,
}

impl SessionManager {
    /// Load settings and the daily total, and recover an active session
    /// left behind by a previous process.
    ///
    /// The elapsed counter does not survive a restart, so it is recomputed
    /// from `now - started_at` rather than resumed.
    pub async fn initialize(store: Arc<LocalStore>) -> Result<Self> {
        let settings = store.get_settings().await?;
        let daily_total = store.get_daily_total().await?;

        let (state, current, elapsed_seconds) = match store.get_current_session().await? {
            Some(session) => {
                let elapsed = (Utc::now() - session.started_at).num_seconds().max(0) as u64;
                info!(
                    "Recovered active session {} ({}s elapsed)",
                    session.id, elapsed
                );
                (ManagerState::Recording, Some(session), elapsed)
            }
            None => (ManagerState::Idle, None, 0),
        };

        Ok(Self {
            store,
            state,
            current,
            elapsed_seconds,
            settings,
            daily_total,
        })
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn daily_total(&self) -> &DailyTotal {
        &self.daily_total
    }

    /// Start a new session. Fails when one is already active.
    pub async fn start_session(&mut self, duration_sec: u32, mode: SessionMode) -> Result<Session> {
        if self.current.is_some() || self.state == ManagerState::Recording {
            bail!("A session is already active");
        }

        let session = self.store.create_session(duration_sec, mode).await?;
        self.current = Some(session.clone());
        self.elapsed_seconds = 0;
        self.state = ManagerState::Recording;

        Ok(session)
    }

    /// Advance the elapsed counter by one second. A no-op outside the
    /// recording state, which defends against stray timer callbacks firing
    /// after a transition.
    pub fn tick(&mut self) {
        if self.state == ManagerState::Recording {
            self.elapsed_seconds += 1;
        }
    }

    /// End the active session, fold the elapsed time into the daily total,
    /// and move to the reviewing state. Returns `None` when no session was
    /// active (stale call after a restart race).
    pub async fn end_session(
        &mut self,
        memo: Option<String>,
        audio_path: Option<String>,
    ) -> Result<Option<Session>> {
        let Some(id) = self.current.as_ref().map(|s| s.id.clone()) else {
            return Ok(None);
        };

        let Some(completed) = self.store.end_session(&id, memo, audio_path).await? else {
            // The store no longer knows this id; drop the stale mirror.
            warn!("Active session {} vanished from the store", id);
            self.current = None;
            self.state = ManagerState::Idle;
            self.elapsed_seconds = 0;
            return Ok(None);
        };

        self.daily_total = self.store.add_to_daily_total(self.elapsed_seconds).await?;
        self.current = None;
        self.state = ManagerState::Reviewing;

        info!(
            "Session {} ended after {}s (daily total {}s)",
            completed.id, self.elapsed_seconds, self.daily_total.total_seconds
        );

        Ok(Some(completed))
    }

    /// Discard the active session. Cancelled time does not count toward the
    /// daily total.
    pub async fn cancel_session(&mut self) -> Result<()> {
        if let Some(session) = self.current.take() {
            self.store.delete_session(&session.id).await?;
            info!("Session {} cancelled", session.id);
        }

        self.state = ManagerState::Idle;
        self.elapsed_seconds = 0;

        Ok(())
    }

    /// Force-return to idle without persistence side effects. UI escape
    /// hatch only.
    pub fn reset(&mut self) {
        self.state = ManagerState::Idle;
        self.current = None;
        self.elapsed_seconds = 0;
    }

    /// Persist and cache new user settings.
    pub async fn update_settings(&mut self, settings: UserSettings) -> Result<()> {
        self.store.save_settings(&settings).await?;
        self.settings = settings;
        Ok(())
    }

    /// Refresh the cached daily total (e.g. when the UI crosses midnight).
    pub async fn refresh_daily_total(&mut self) -> Result<&DailyTotal> {
        self.daily_total = self.store.get_daily_total().await?;
        Ok(&self.daily_total)
    }
}
