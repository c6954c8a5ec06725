//! Ranking Source - remote model candidates
//!
//! Wraps the ranking service for the warm-start path:
//! 1. Kick off a best-effort model refit in the background
//! 2. Ask for `count` ranked ids, passing the exclusion set
//! 3. Report either ranked candidates or why the service was unavailable
//!
//! Nothing here returns an error to the request path. Every failure mode
//! (timeout, transport error, non-success status, empty list) becomes
//! `RankingOutcome::Unavailable` and the caller falls back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use data_loader::{CatalogStore, ProfileStore};
use ml_client::{MLClientError, ModelStatus, RankingService, TrainRequest, TrainingUser};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::exclusion::ExclusionSet;
use crate::types::Candidate;

/// Why the ranking service produced nothing usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    Timeout,
    ServiceError(String),
    Rejected { status: String, message: Option<String> },
    Empty,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::Timeout => write!(f, "timed out"),
            Unavailable::ServiceError(e) => write!(f, "service error: {}", e),
            Unavailable::Rejected { status, message } => write!(
                f,
                "status '{}'{}",
                status,
                message.as_deref().map(|m| format!(" ({})", m)).unwrap_or_default()
            ),
            Unavailable::Empty => write!(f, "no recommendations returned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RankingOutcome {
    /// Ranked candidates, best first, not yet hydrated
    Ranked(Vec<Candidate>),
    Unavailable(Unavailable),
}

/// Result of a training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    Trained {
        users: usize,
        videos: usize,
        message: Option<String>,
    },
    /// No user had a valid watch history; the service was not called
    Skipped,
}

/// Ranking source backed by the remote ranking service
#[derive(Clone)]
pub struct RankingSource {
    service: Arc<dyn RankingService>,
    profiles: Arc<dyn ProfileStore>,
    catalog: Arc<dyn CatalogStore>,
    recommend_timeout: Duration,
    training_timeout: Duration,
}

impl RankingSource {
    /// Create a new ranking source
    ///
    /// The stores provide the training corpus (all users, all videos).
    pub fn new(
        service: Arc<dyn RankingService>,
        profiles: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            service,
            profiles,
            catalog,
            recommend_timeout: Duration::from_secs(3),
            training_timeout: Duration::from_secs(30),
        }
    }

    /// Configure the deadline for a recommend call (default: 3s)
    pub fn with_recommend_timeout(mut self, timeout: Duration) -> Self {
        self.recommend_timeout = timeout;
        self
    }

    /// Configure the deadline for a training run (default: 30s)
    pub fn with_training_timeout(mut self, timeout: Duration) -> Self {
        self.training_timeout = timeout;
        self
    }

    /// Ask the ranking service for up to `count` ids not in `exclusions`
    #[instrument(skip(self, exclusions), fields(excluded = exclusions.len()))]
    pub async fn get_candidates(
        &self,
        username: &str,
        count: usize,
        exclusions: &ExclusionSet,
    ) -> RankingOutcome {
        let exclude = exclusions.to_sorted_vec();
        let call = self.service.recommend(username, count, &exclude);

        let response = match tokio::time::timeout(self.recommend_timeout, call).await {
            Err(_) | Ok(Err(MLClientError::Timeout)) => {
                warn!(
                    "Ranking service timed out after {:?} for {}",
                    self.recommend_timeout, username
                );
                return RankingOutcome::Unavailable(Unavailable::Timeout);
            }
            Ok(Err(e)) => {
                warn!("Ranking service error for {}: {}", username, e);
                return RankingOutcome::Unavailable(Unavailable::ServiceError(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            warn!(
                "Ranking service returned status '{}' for {}",
                response.status, username
            );
            return RankingOutcome::Unavailable(Unavailable::Rejected {
                status: response.status,
                message: response.message,
            });
        }

        let candidates: Vec<Candidate> = response
            .recommendations
            .into_iter()
            .filter(|id| !id.is_empty())
            .map(Candidate::ranked)
            .collect();

        if candidates.is_empty() {
            info!("Ranking service had no recommendations for {}", username);
            return RankingOutcome::Unavailable(Unavailable::Empty);
        }

        debug!("Ranking service returned {} candidates", candidates.len());
        RankingOutcome::Ranked(candidates)
    }

    /// Refit the model in the background. The returned handle may be dropped.
    pub fn spawn_training(&self) -> JoinHandle<()> {
        let source = self.clone();
        tokio::spawn(async move {
            match source.train().await {
                Ok(TrainOutcome::Trained { users, videos, .. }) => {
                    debug!("Ranking model refit on {} users, {} videos", users, videos)
                }
                Ok(TrainOutcome::Skipped) => {
                    debug!("Ranking model refit skipped: no valid watch history")
                }
                Err(e) => warn!("Ranking model training failed: {:#}", e),
            }
        })
    }

    /// Refit the model now, bounded by the training timeout
    pub async fn train(&self) -> Result<TrainOutcome> {
        tokio::time::timeout(self.training_timeout, self.train_once())
            .await
            .map_err(|_| anyhow!("Training timed out after {:?}", self.training_timeout))?
    }

    async fn train_once(&self) -> Result<TrainOutcome> {
        let (users, videos) = tokio::join!(self.profiles.all_users(), self.catalog.all_items());
        let users = users.context("Loading user profiles for training")?;
        let videos = videos.context("Loading catalog for training")?;

        let corpus: Vec<TrainingUser> = users.iter().filter_map(TrainingUser::from_profile).collect();
        info!(
            "Training ranking model: {} of {} users have valid watch history, {} videos",
            corpus.len(),
            users.len(),
            videos.len()
        );
        if corpus.is_empty() {
            info!("No users with valid watch history, skipping training");
            return Ok(TrainOutcome::Skipped);
        }

        let request = TrainRequest {
            users: corpus,
            videos,
        };
        let response = self
            .service
            .train(&request)
            .await
            .context("Calling ranking service /train")?;
        if !response.is_success() {
            bail!(
                "Ranking service declined to train: {}",
                response.message.unwrap_or_else(|| response.status.clone())
            );
        }

        Ok(TrainOutcome::Trained {
            users: request.users.len(),
            videos: request.videos.len(),
            message: response.message,
        })
    }

    /// What the ranking model was last trained on
    pub async fn model_status(&self) -> Result<ModelStatus> {
        tokio::time::timeout(self.recommend_timeout, self.service.status())
            .await
            .map_err(|_| anyhow!("Status request timed out after {:?}", self.recommend_timeout))?
            .context("Fetching ranking model status")
    }
}
