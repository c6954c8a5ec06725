//! Ranking client for communicating with the remote ML ranking service.
//!
//! The ranking service is a small HTTP/JSON application exposing three
//! endpoints:
//! - `POST /train`: refit the model on the current users and catalog
//! - `GET /recommend`: ranked video ids for a user, honoring an exclude list
//! - `GET /status`: what the model was last trained on
//!
//! `RankingService` is the seam the engine depends on; `RankingClient` is the
//! reqwest-backed implementation. Callers decide what a failure means; this
//! crate only reports it precisely.

use std::time::Duration;

use async_trait::async_trait;
use data_loader::{CatalogItem, UserProfile, VideoId, WatchEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

/// Status string the ranking service uses for a successful call
pub const STATUS_SUCCESS: &str = "success";

/// Errors that can occur when interacting with the ranking service
#[derive(Error, Debug)]
pub enum MLClientError {
    #[error("Failed to connect to ranking service: {0}")]
    ConnectionError(String),

    #[error("Ranking service request timed out")]
    Timeout,

    #[error("Ranking service returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Invalid response from ranking service: {0}")]
    InvalidResponse(String),

    #[error("Ranking service request failed: {0}")]
    RequestError(String),
}

impl From<reqwest::Error> for MLClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MLClientError::Timeout
        } else if e.is_connect() {
            MLClientError::ConnectionError(e.to_string())
        } else if e.is_decode() {
            MLClientError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            MLClientError::HttpStatus(status.as_u16())
        } else {
            MLClientError::RequestError(e.to_string())
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// A user as sent to `/train`: only valid watch events survive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingUser {
    pub username: String,
    pub watch_history: Vec<WatchEvent>,
    pub liked_videos: Vec<VideoId>,
}

impl TrainingUser {
    /// `None` for users without a single valid watch event
    pub fn from_profile(profile: &UserProfile) -> Option<Self> {
        let watch_history: Vec<WatchEvent> = profile.valid_watch_history().cloned().collect();
        if watch_history.is_empty() {
            return None;
        }
        Some(Self {
            username: profile.username.clone(),
            watch_history,
            liked_videos: profile.liked_videos.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainRequest {
    pub users: Vec<TrainingUser>,
    pub videos: Vec<CatalogItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl TrainResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecommendResponse {
    pub status: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<VideoId>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RecommendResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Snapshot of the ranking model, as reported by `/status`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelStatus {
    pub trained: bool,
    #[serde(default)]
    pub last_trained: Option<String>,
    #[serde(default)]
    pub users_count: usize,
    #[serde(default)]
    pub videos_count: usize,
    #[serde(default)]
    pub users: Vec<String>,
}

// =============================================================================
// Service trait and HTTP client
// =============================================================================

/// Operations of the remote ranking service.
///
/// Implementations perform a single attempt per call; no retries.
#[async_trait]
pub trait RankingService: Send + Sync {
    async fn train(&self, request: &TrainRequest) -> Result<TrainResponse, MLClientError>;

    async fn recommend(
        &self,
        username: &str,
        count: usize,
        exclude: &[VideoId],
    ) -> Result<RecommendResponse, MLClientError>;

    async fn status(&self) -> Result<ModelStatus, MLClientError>;
}

/// HTTP client for the ranking service.
#[derive(Debug, Clone)]
pub struct RankingClient {
    client: reqwest::Client,
    base_url: String,
}

impl RankingClient {
    /// Build a client for the service at `base_url` (e.g. "http://127.0.0.1:5001").
    ///
    /// `timeout` bounds every request end to end; callers may apply tighter
    /// per-operation deadlines on top.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MLClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Using ranking service at {}", base_url);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MLClientError::RequestError(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Get the address of the ranking service this client talks to.
    pub fn service_address(&self) -> &str {
        &self.base_url
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MLClientError> {
        let status = response.status();
        if !status.is_success() {
            error!("Ranking service responded with HTTP {}", status);
            return Err(MLClientError::HttpStatus(status.as_u16()));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| MLClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RankingService for RankingClient {
    async fn train(&self, request: &TrainRequest) -> Result<TrainResponse, MLClientError> {
        debug!(
            "Training ranking model with {} users and {} videos",
            request.users.len(),
            request.videos.len()
        );
        let response = self
            .client
            .post(format!("{}/train", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn recommend(
        &self,
        username: &str,
        count: usize,
        exclude: &[VideoId],
    ) -> Result<RecommendResponse, MLClientError> {
        debug!(
            "Requesting {} ranked videos for {} ({} excluded)",
            count,
            username,
            exclude.len()
        );
        let response = self
            .client
            .get(format!("{}/recommend", self.base_url))
            .query(&[
                ("username", username.to_string()),
                ("count", count.to_string()),
                ("exclude", exclude.join(",")),
            ])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn status(&self) -> Result<ModelStatus, MLClientError> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }
}
