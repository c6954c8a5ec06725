//! # Recommendation Orchestrator
//!
//! This module coordinates one recommendation request:
//! 1. Look up the user (the only step that can fail the request)
//! 2. Serialize with other requests for the same user
//! 3. Cache check: a non-refresh request with a live session entry is
//!    answered from the cache
//! 4. Build the exclusion set and select a strategy
//! 5. Warm start: background model refit, ranking service, hydration with
//!    content backfill; content fallback if ranking is unavailable
//! 6. Cold start: content fallback only
//! 7. Write the served result through the session cache
//!
//! Upstream failures past step 1 are logged and degrade the result; they
//! never reach the caller.

use std::sync::Arc;
use std::time::Instant;

use data_loader::{CatalogStore, ProfileStore};
use ml_client::{ModelStatus, RankingService};
use pipeline::ResultHydrator;
use serde::Serialize;
use sources::{
    ContentFallback, ExclusionSet, RankingOutcome, RankingSource, Recommendation, Strategy,
    TrainOutcome, UserContext, build_exclusion_set, build_user_context,
};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::RecommendError;
use crate::session_cache::{InMemorySessionCache, SessionCache, SessionCacheEntry, UserLocks};

/// Which path produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    CacheHit,
    Ranking,
    /// Warm start, ranking service unavailable
    RankingFallback,
    ColdStartFallback,
    /// `count` was zero
    NothingRequested,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub username: String,
    pub items: Vec<Recommendation>,
    pub served_from: ServedFrom,
}

/// Main orchestrator that coordinates the recommendation request
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    profiles: Arc<dyn ProfileStore>,
    ranking: RankingSource,
    fallback: ContentFallback,
    hydrator: Arc<ResultHydrator>,
    session_cache: Arc<dyn SessionCache>,
    user_locks: Arc<UserLocks>,
    train_before_recommend: bool,
    default_count: usize,
}

impl RecommendationOrchestrator {
    /// Wire every component from the stores, the ranking service and the config.
    ///
    /// Uses an `InMemorySessionCache` with the configured TTL; see
    /// [`with_session_cache`](Self::with_session_cache) for another backing store.
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogStore>,
        ranking_service: Arc<dyn RankingService>,
        config: &EngineConfig,
    ) -> Self {
        let ranking = RankingSource::new(ranking_service, profiles.clone(), catalog.clone())
            .with_recommend_timeout(config.ranking.recommend_timeout())
            .with_training_timeout(config.ranking.training_timeout());
        let fallback = ContentFallback::new(catalog.clone())
            .with_oversample_factor(config.fallback.oversample_factor)
            .with_recent_similarity(config.fallback.recent_similarity, config.fallback.recent_window);
        let hydrator = Arc::new(ResultHydrator::new(catalog, fallback.clone()));

        Self {
            profiles,
            ranking,
            fallback,
            hydrator,
            session_cache: Arc::new(InMemorySessionCache::new(config.session.ttl())),
            user_locks: Arc::new(UserLocks::new()),
            train_before_recommend: config.ranking.train_before_recommend,
            default_count: config.default_count,
        }
    }

    pub fn with_session_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.session_cache = cache;
        self
    }

    /// Count used when the caller does not ask for one
    pub fn default_count(&self) -> usize {
        self.default_count
    }

    /// Up to `count` recommendations for `username`.
    ///
    /// Fails only when the user does not exist or the profile lookup itself
    /// fails. An empty or short list is a valid answer.
    pub async fn get_recommendations(
        &self,
        username: &str,
        count: usize,
        refresh: bool,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        Ok(self.recommend(username, count, refresh).await?.items)
    }

    /// Like `get_recommendations`, also reporting which path served the request
    #[instrument(skip(self))]
    pub async fn recommend(
        &self,
        username: &str,
        count: usize,
        refresh: bool,
    ) -> Result<RecommendationResponse, RecommendError> {
        let start_time = Instant::now();

        let profile = self
            .profiles
            .get_user(username)
            .await?
            .ok_or_else(|| RecommendError::UserNotFound(username.to_string()))?;

        if count == 0 {
            return Ok(RecommendationResponse {
                username: profile.username,
                items: Vec::new(),
                served_from: ServedFrom::NothingRequested,
            });
        }

        let _guard = self.user_locks.acquire(username).await;
        let context = build_user_context(&profile);
        let cached = self.session_cache.get(username).await;

        if !refresh
            && let Some(entry) = &cached
            && cache_entry_usable(entry, &context, count)
        {
            let items: Vec<Recommendation> = entry.last_served.iter().take(count).cloned().collect();
            info!("Cache hit for {}: {} recommendations", username, items.len());
            // Rewrite the full entry: a narrower hit must not shrink what later hits can serve.
            self.session_cache
                .record_served(username, &entry.last_served, entry.requested)
                .await;
            return Ok(RecommendationResponse {
                username: profile.username,
                items,
                served_from: ServedFrom::CacheHit,
            });
        }

        let exclusions = build_exclusion_set(
            &context,
            refresh,
            cached.as_ref().map(|entry| &entry.previously_served),
        );
        let strategy = Strategy::for_context(&context);
        info!(
            "{:?} for {} ({} qualified watches, {} excluded ids)",
            strategy,
            username,
            context.qualified_history_count,
            exclusions.len()
        );

        let (items, served_from) = match strategy {
            Strategy::WarmStart => self.warm_start(&context, count, &exclusions).await,
            Strategy::ColdStart => (
                self.content_fallback(&context, count, &exclusions).await,
                ServedFrom::ColdStartFallback,
            ),
        };

        self.session_cache.record_served(username, &items, count).await;
        info!(
            "Served {} of {} recommendations to {} via {:?} in {:.2?}",
            items.len(),
            count,
            username,
            served_from,
            start_time.elapsed()
        );

        Ok(RecommendationResponse {
            username: profile.username,
            items,
            served_from,
        })
    }

    async fn warm_start(
        &self,
        context: &UserContext,
        count: usize,
        exclusions: &ExclusionSet,
    ) -> (Vec<Recommendation>, ServedFrom) {
        if self.train_before_recommend {
            // Detached; the request never waits on training.
            drop(self.ranking.spawn_training());
        }

        match self
            .ranking
            .get_candidates(&context.username, count, exclusions)
            .await
        {
            RankingOutcome::Ranked(candidates) => {
                debug!("Hydrating {} ranked candidates", candidates.len());
                let items = self
                    .hydrator
                    .hydrate(context, candidates, count, exclusions)
                    .await;
                (items, ServedFrom::Ranking)
            }
            RankingOutcome::Unavailable(reason) => {
                warn!(
                    "Ranking unavailable for {} ({}), using content fallback",
                    context.username, reason
                );
                (
                    self.content_fallback(context, count, exclusions).await,
                    ServedFrom::RankingFallback,
                )
            }
        }
    }

    async fn content_fallback(
        &self,
        context: &UserContext,
        count: usize,
        exclusions: &ExclusionSet,
    ) -> Vec<Recommendation> {
        let candidates = self.fallback.get_candidates(context, count, exclusions).await;
        self.hydrator
            .hydrate(context, candidates, count, exclusions)
            .await
    }

    /// Refit the ranking model now and wait for the answer
    pub async fn train_ranking_model(&self) -> anyhow::Result<TrainOutcome> {
        self.ranking.train().await
    }

    pub async fn ranking_status(&self) -> anyhow::Result<ModelStatus> {
        self.ranking.model_status().await
    }

    /// Forget a user's session; the next request computes from scratch
    pub async fn end_session(&self, username: &str) -> bool {
        self.session_cache.evict(username).await
    }
}

/// A cached result is reused only if it was computed for at least `count`
/// items and none of them has since been watched.
fn cache_entry_usable(entry: &SessionCacheEntry, context: &UserContext, count: usize) -> bool {
    if entry.requested < count {
        debug!(
            "Cached result was for {} items, {} requested",
            entry.requested, count
        );
        return false;
    }
    let stale = entry
        .last_served
        .iter()
        .any(|item| context.watched_videos.contains(item.video_id()));
    if stale {
        debug!("Cached result contains watched items, recomputing");
    }
    !stale
}
