use serde::{Deserialize, Serialize};

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub duration_sec: u64,
    /// ISO-8601.
    pub started_at: String,
    /// ISO-8601.
    pub ended_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    pub session: RemoteSession,
}

/// Remote session record. Only the id matters to the sync path; everything
/// else the server sends is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSession {
    pub id: String,
}

/// One log in the remote schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPayload {
    pub timestamp_sec: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Body of `POST /logs`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveLogsRequest {
    pub session_id: String,
    pub logs: Vec<LogPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveLogsResponse {
    pub saved_count: usize,
}

/// Response of `GET /sessions?limit=&offset=` (history browsing).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<serde_json::Value>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLog {
    pub timestamp_sec: f64,
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Response of `GET /sessions/{id}/logs`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<RemoteLog>,
}

/// What the combined create-session-and-upload-logs call produced.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Server-side id of the created session.
    pub remote_id: String,
    /// How many logs the server confirmed saving.
    pub saved_logs: usize,
}
