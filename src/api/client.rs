use super::types::{
    CreateSessionRequest, CreateSessionResponse, LogsResponse, SaveLogsRequest, SaveLogsResponse,
    SessionListResponse, UploadOutcome,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Supplies the bearer token for every request. Injected at runtime by the
/// surrounding application's identity layer.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed-token provider for development builds. Release builds refuse to
/// construct a client without a real provider.
pub struct DevTokenProvider;

#[async_trait]
impl TokenProvider for DevTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok("dev-token".to_string())
    }
}

/// Domain-level surface the sync engine talks to. A trait seam so sync
/// behavior is testable without a server.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Create the remote session, then upload its logs. Both requests must
    /// succeed for the call to succeed.
    async fn create_session_with_logs(
        &self,
        request: &CreateSessionRequest,
        logs: &[super::types::LogPayload],
    ) -> Result<UploadOutcome>;

    /// Paged history listing. Used by history browsing, not by sync.
    async fn list_sessions(&self, limit: u32, offset: u32) -> Result<SessionListResponse>;

    /// Logs of one remote session.
    async fn session_logs(&self, session_id: &str) -> Result<LogsResponse>;
}

/// Thin transport layer translating domain calls into authenticated HTTP
/// requests against the remote service.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Build a client against `base_url`.
    ///
    /// When no token provider is injected, development builds fall back to
    /// a fixed token; release builds refuse to start unauthenticated.
    pub fn new(base_url: impl Into<String>, token: Option<Arc<dyn TokenProvider>>) -> Result<Self> {
        let token = match token {
            Some(t) => t,
            None if cfg!(debug_assertions) => Arc::new(DevTokenProvider) as Arc<dyn TokenProvider>,
            None => bail!("No token provider configured"),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let token = self.token.access_token().await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request failed: POST {}", url))?;

        Self::decode(response, &url).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let token = self.token.access_token().await?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Request failed: GET {}", url))?;

        Self::decode(response, &url).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{} returned {}: {}", url, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))
    }
}

#[async_trait]
impl SessionApi for ApiClient {
    async fn create_session_with_logs(
        &self,
        request: &CreateSessionRequest,
        logs: &[super::types::LogPayload],
    ) -> Result<UploadOutcome> {
        let created: CreateSessionResponse = self.post("/sessions", request).await?;
        let remote_id = created.session.id;

        let saved_logs = if logs.is_empty() {
            0
        } else {
            let saved: SaveLogsResponse = self
                .post(
                    "/logs",
                    &SaveLogsRequest {
                        session_id: remote_id.clone(),
                        logs: logs.to_vec(),
                    },
                )
                .await?;
            saved.saved_count
        };

        Ok(UploadOutcome {
            remote_id,
            saved_logs,
        })
    }

    async fn list_sessions(&self, limit: u32, offset: u32) -> Result<SessionListResponse> {
        self.get(&format!("/sessions?limit={}&offset={}", limit, offset))
            .await
    }

    async fn session_logs(&self, session_id: &str) -> Result<LogsResponse> {
        self.get(&format!("/sessions/{}/logs", session_id)).await
    }
}
