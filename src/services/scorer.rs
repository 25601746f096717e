use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::models::{FeedbackScoreRequest, MatchScoreRequest, MatchScoreResponse, WeightMap};

/// Errors that can occur when calling the scorer service
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("scorer did not answer within {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    RequestError(#[source] reqwest::Error),

    #[error("scorer returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Compatibility scorer. Both calls are synchronous from the caller's point of view.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score_matches(&self, request: &MatchScoreRequest) -> Result<MatchScoreResponse, ScorerError>;

    /// Returns the complete replacement weight map for the user
    async fn submit_feedback(&self, request: &FeedbackScoreRequest) -> Result<WeightMap, ScorerError>;
}

/// HTTP client for the scorer service
pub struct ScorerClient {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl ScorerClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ScorerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ScorerError::RequestError)?;

        Ok(Self {
            base_url,
            timeout,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ScorerError {
        if err.is_timeout() {
            ScorerError::Timeout(self.timeout)
        } else {
            ScorerError::RequestError(err)
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ScorerError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("ngrok-skip-browser-warning", "true")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Scorer {} failed: {} - {}", path, status, body);
            return Err(ScorerError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ScorerError::InvalidResponse(format!("{} response: {}", path, e)))
    }
}

#[async_trait]
impl Scorer for ScorerClient {
    async fn score_matches(&self, request: &MatchScoreRequest) -> Result<MatchScoreResponse, ScorerError> {
        self.post("/api/v1/match", request).await
    }

    async fn submit_feedback(&self, request: &FeedbackScoreRequest) -> Result<WeightMap, ScorerError> {
        self.post("/api/v1/feedback", request).await
    }
}
