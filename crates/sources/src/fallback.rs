//! Content Fallback - catalog-driven candidates
//!
//! Serves cold-start users and fills whatever the ranking service could not.
//!
//! ## Algorithm
//!
//! 1. Build match patterns from the user's interests (and, when enabled, the
//!    tags and category of their most recent watches)
//! 2. With patterns: fetch up to `count * oversample_factor` catalog items
//!    whose tags, title or description contain any pattern; if fewer than
//!    `count` match, backfill the shortfall with a random sample that also
//!    skips the matches
//! 3. Without patterns: random sample of `count * oversample_factor`
//! 4. Shuffle, truncate to `count`
//!
//! Store failures never surface: they are logged and yield fewer candidates.

use std::collections::HashSet;
use std::sync::Arc;

use data_loader::CatalogStore;
use rand::seq::SliceRandom;
use tracing::{debug, instrument, warn};

use crate::exclusion::ExclusionSet;
use crate::types::{Candidate, CandidateSource, UserContext};

/// Content fallback over a catalog store
#[derive(Clone)]
pub struct ContentFallback {
    catalog: Arc<dyn CatalogStore>,
    oversample_factor: usize,
    recent_similarity: bool,
    recent_window: usize,
}

impl ContentFallback {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog,
            oversample_factor: 2,
            recent_similarity: false,
            recent_window: 3,
        }
    }

    /// Configure how many candidates to draw per slot (default: 2, minimum 1)
    pub fn with_oversample_factor(mut self, factor: usize) -> Self {
        self.oversample_factor = factor.max(1);
        self
    }

    /// Also match on the tags and category of the `window` most recent watches
    pub fn with_recent_similarity(mut self, enabled: bool, window: usize) -> Self {
        self.recent_similarity = enabled;
        self.recent_window = window;
        self
    }

    /// Up to `count` distinct candidates, none in `exclusions`
    #[instrument(skip(self, context, exclusions), fields(username = %context.username))]
    pub async fn get_candidates(
        &self,
        context: &UserContext,
        count: usize,
        exclusions: &ExclusionSet,
    ) -> Vec<Candidate> {
        if count == 0 {
            return Vec::new();
        }

        let patterns = self.match_patterns(context).await;
        let candidates = if patterns.is_empty() {
            self.random_candidates(count, exclusions).await
        } else {
            self.interest_candidates(&patterns, count, exclusions).await
        };

        debug!(
            "Content fallback produced {} of {} requested candidates",
            candidates.len(),
            count
        );
        candidates
    }

    async fn match_patterns(&self, context: &UserContext) -> Vec<String> {
        let mut patterns = context.interests.clone();

        if self.recent_similarity && !context.recent_watches.is_empty() {
            let recent_ids = context.recent_video_ids(self.recent_window);
            match self.catalog.find_by_ids(&recent_ids).await {
                Ok(items) => {
                    for item in items {
                        patterns.extend(item.tags);
                        patterns.extend(item.category);
                    }
                }
                Err(e) => warn!("Could not load recent watches for similarity: {}", e),
            }
        }

        let mut seen = HashSet::new();
        patterns.retain(|p| {
            let key = p.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        });
        patterns
    }

    async fn interest_candidates(
        &self,
        patterns: &[String],
        count: usize,
        exclusions: &ExclusionSet,
    ) -> Vec<Candidate> {
        let limit = count.saturating_mul(self.oversample_factor);
        let matched = self
            .catalog
            .find_by_tags_or_title(patterns, exclusions.as_set(), limit)
            .await
            .unwrap_or_else(|e| {
                warn!("Interest search failed: {}", e);
                Vec::new()
            });

        let mut candidates: Vec<Candidate> = matched
            .into_iter()
            .map(|item| Candidate::materialized(item, CandidateSource::Interest))
            .collect();

        if candidates.len() < count {
            let shortfall = count - candidates.len();
            let widened = exclusions.with_ids(candidates.iter().map(|c| c.video_id.clone()));
            debug!(
                "{} interest matches, backfilling {} at random",
                candidates.len(),
                shortfall
            );
            candidates.extend(self.sample(&widened, shortfall).await);
        }

        shuffle(&mut candidates);
        candidates.truncate(count);
        candidates
    }

    async fn random_candidates(&self, count: usize, exclusions: &ExclusionSet) -> Vec<Candidate> {
        let mut candidates = self
            .sample(exclusions, count.saturating_mul(self.oversample_factor))
            .await;
        shuffle(&mut candidates);
        candidates.truncate(count);
        candidates
    }

    async fn sample(&self, exclusions: &ExclusionSet, n: usize) -> Vec<Candidate> {
        if n == 0 {
            return Vec::new();
        }
        match self.catalog.random_sample(exclusions.as_set(), n).await {
            Ok(items) => items
                .into_iter()
                .map(|item| Candidate::materialized(item, CandidateSource::Random))
                .collect(),
            Err(e) => {
                warn!("Random sample failed: {}", e);
                Vec::new()
            }
        }
    }
}

// Kept sync so the thread-local rng never lives across an await.
fn shuffle(candidates: &mut [Candidate]) {
    candidates.shuffle(&mut rand::rng());
}
