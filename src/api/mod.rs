mod client;
mod types;

pub use client::{ApiClient, DevTokenProvider, SessionApi, TokenProvider};
pub use types::{
    CreateSessionRequest, CreateSessionResponse, LogPayload, LogsResponse, RemoteLog,
    RemoteSession, SaveLogsRequest, SaveLogsResponse, SessionListResponse, UploadOutcome,
};
