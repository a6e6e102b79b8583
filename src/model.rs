use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Recording mode selected when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Pomodoro,
    Standard,
    Deepwork,
    Custom,
}

impl Default for SessionMode {
    // Records written before the mode field existed decode as Standard.
    fn default() -> Self {
        SessionMode::Standard
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Recording in progress (at most one session is ever active).
    Active,
    /// Ended locally, not yet confirmed on the remote service.
    Completed,
    /// Uploaded and confirmed remotely.
    Synced,
}

/// One timed recording/focus interval and its transcribed notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,

    /// Planned length in seconds (not the actual elapsed time).
    pub duration_sec: u32,

    /// Missing in records written by older builds; decodes as `standard`.
    #[serde(default)]
    pub mode: SessionMode,

    pub started_at: DateTime<Utc>,

    /// Absent while the session is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub status: SessionStatus,

    /// Insertion order is chronological arrival, not time order; sort by
    /// `timestamp_sec` when rendering.
    #[serde(default)]
    pub logs: Vec<LogEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    /// Path to the 48kHz capture artifact, if one was kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
}

/// One transcribed utterance attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,

    /// Offset in seconds from session start, not wall clock.
    pub timestamp_sec: f64,

    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    pub created_at: DateTime<Utc>,
}

/// Log data as produced by the pipeline, before the store assigns an
/// id and creation timestamp.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub timestamp_sec: f64,
    pub text: String,
    pub confidence: Option<f32>,
}

/// Rolling per-calendar-day sum of completed recording time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total_seconds: u64,
    pub session_count: u32,
}

impl DailyTotal {
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            total_seconds: 0,
            session_count: 0,
        }
    }
}

/// User-facing preferences. Persist indefinitely once written; missing
/// fields merge over these defaults on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// Default planned session length in seconds.
    pub default_duration: u32,
    /// Planned length used by the custom mode, in seconds.
    pub custom_duration: u32,
    /// Reserved; voice activity detection is not active in the current design.
    pub enable_vad: bool,
    /// Sync pending sessions automatically on connectivity.
    pub auto_sync: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_duration: 1500,
            custom_duration: 3600,
            enable_vad: false,
            auto_sync: true,
        }
    }
}

/// Ancillary UI-tuning parameters for the mascot animation. Only the
/// persistence contract matters here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HooSettings {
    pub blink_interval_ms: u32,
    pub sway_amplitude: f32,
    pub sway_period_ms: u32,
}

impl Default for HooSettings {
    fn default() -> Self {
        Self {
            blink_interval_ms: 4000,
            sway_amplitude: 6.0,
            sway_period_ms: 2400,
        }
    }
}

/// Outcome of one sync attempt for one session. Transient, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub session_id: String,
    pub success: bool,
    pub saved_logs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of one batch sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<SyncResult>,
}

impl SyncReport {
    /// Report for a run that did no work (e.g. a sync was already in flight).
    pub fn empty() -> Self {
        Self {
            total: 0,
            success: 0,
            failed: 0,
            results: Vec::new(),
        }
    }
}
