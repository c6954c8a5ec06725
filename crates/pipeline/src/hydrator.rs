//! Result Hydrator - candidates to served recommendations
//!
//! ## Algorithm
//!
//! 1. Run the filter pipeline (exclusions, duplicates), preserving order
//! 2. Resolve bare ranked ids against the catalog in one batch lookup
//! 3. Walk the candidates in order; ids the catalog no longer has are stale
//!    and dropped
//! 4. If ranked ids were proposed (even if all were filtered out) and the
//!    result is short of `count`, ask the
//!    content fallback for the shortfall, excluding everything already chosen
//! 5. Cap at `count`
//!
//! Fallback-only input is already materialized and passes straight through.

use std::collections::HashMap;
use std::sync::Arc;

use data_loader::{CatalogItem, CatalogStore, VideoId};
use sources::{Candidate, ContentFallback, ExclusionSet, Recommendation, UserContext};
use tracing::{debug, instrument, warn};

use crate::filter_pipeline::FilterPipeline;

pub struct ResultHydrator {
    catalog: Arc<dyn CatalogStore>,
    fallback: ContentFallback,
    filters: FilterPipeline,
}

impl ResultHydrator {
    /// Create a hydrator with the standard filter pipeline
    pub fn new(catalog: Arc<dyn CatalogStore>, fallback: ContentFallback) -> Self {
        Self {
            catalog,
            fallback,
            filters: FilterPipeline::standard(),
        }
    }

    /// Replace the filter pipeline
    pub fn with_filters(mut self, filters: FilterPipeline) -> Self {
        self.filters = filters;
        self
    }

    #[instrument(skip_all, fields(username = %context.username, candidates = candidates.len(), count = count))]
    pub async fn hydrate(
        &self,
        context: &UserContext,
        candidates: Vec<Candidate>,
        count: usize,
        exclusions: &ExclusionSet,
    ) -> Vec<Recommendation> {
        if count == 0 {
            return Vec::new();
        }

        // Taken before filtering: a ranker proposing only excluded ids still gets backfilled.
        let had_ranked = candidates.iter().any(|c| c.item.is_none());
        let candidates = self.filters.apply(candidates, exclusions);
        let pending: Vec<VideoId> = candidates
            .iter()
            .filter(|c| c.item.is_none())
            .map(|c| c.video_id.clone())
            .collect();
        let mut resolved = self.resolve(&pending).await;

        let mut results = Vec::with_capacity(count);
        let mut stale = 0;
        for candidate in candidates {
            if results.len() == count {
                break;
            }
            let item = match candidate.item {
                Some(item) => item,
                None => match resolved.remove(&candidate.video_id) {
                    Some(item) => item,
                    None => {
                        stale += 1;
                        continue;
                    }
                },
            };
            results.push(Recommendation {
                item,
                source: candidate.source,
            });
        }
        if stale > 0 {
            debug!("Dropped {} ranked ids missing from the catalog", stale);
        }

        if had_ranked && results.len() < count {
            let shortfall = count - results.len();
            let widened =
                exclusions.with_ids(results.iter().map(|r: &Recommendation| r.item.video_id.clone()));
            let backfill = self.fallback.get_candidates(context, shortfall, &widened).await;
            debug!("Backfilled {} of {} missing slots", backfill.len(), shortfall);
            results.extend(backfill.into_iter().filter_map(|c| {
                c.item.map(|item| Recommendation {
                    item,
                    source: c.source,
                })
            }));
        }

        results.truncate(count);
        results
    }

    async fn resolve(&self, ids: &[VideoId]) -> HashMap<VideoId, CatalogItem> {
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.catalog.find_by_ids(ids).await {
            Ok(items) => items
                .into_iter()
                .map(|item| (item.video_id.clone(), item))
                .collect(),
            Err(e) => {
                warn!("Catalog lookup for {} ranked ids failed: {}", ids.len(), e);
                HashMap::new()
            }
        }
    }
}
