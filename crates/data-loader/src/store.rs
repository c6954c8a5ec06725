//! Collaborator contracts for the profile and catalog stores.
//!
//! The engine only ever talks to these traits. `DataIndex` implements both
//! for single-process deployments and tests; a document-database backed
//! implementation plugs in behind the same seam.

use crate::error::StoreResult;
use crate::types::{CatalogItem, DataIndex, UserProfile, VideoId};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::collections::HashSet;

/// Read access to user profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when the user does not exist
    async fn get_user(&self, username: &str) -> StoreResult<Option<UserProfile>>;

    async fn all_users(&self) -> StoreResult<Vec<UserProfile>>;
}

/// Read access to the video catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Items for the ids that exist, in no guaranteed order
    async fn find_by_ids(&self, ids: &[VideoId]) -> StoreResult<Vec<CatalogItem>>;

    /// Items whose tags, title or description contain any pattern
    /// (case-insensitive), skipping `exclude`, at most `limit` of them
    async fn find_by_tags_or_title(
        &self,
        patterns: &[String],
        exclude: &HashSet<VideoId>,
        limit: usize,
    ) -> StoreResult<Vec<CatalogItem>>;

    /// Up to `n` distinct random items not in `exclude`
    async fn random_sample(
        &self,
        exclude: &HashSet<VideoId>,
        n: usize,
    ) -> StoreResult<Vec<CatalogItem>>;

    async fn all_items(&self) -> StoreResult<Vec<CatalogItem>>;
}

#[async_trait]
impl ProfileStore for DataIndex {
    async fn get_user(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        Ok(DataIndex::get_user(self, username).cloned())
    }

    async fn all_users(&self) -> StoreResult<Vec<UserProfile>> {
        Ok(self.users().cloned().collect())
    }
}

#[async_trait]
impl CatalogStore for DataIndex {
    async fn find_by_ids(&self, ids: &[VideoId]) -> StoreResult<Vec<CatalogItem>> {
        let unique: HashSet<&VideoId> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| self.get_video(id).cloned())
            .collect())
    }

    async fn find_by_tags_or_title(
        &self,
        patterns: &[String],
        exclude: &HashSet<VideoId>,
        limit: usize,
    ) -> StoreResult<Vec<CatalogItem>> {
        let lowered: Vec<String> = patterns
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        if lowered.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut matches: Vec<CatalogItem> = self
            .video_order
            .par_iter()
            .filter(|id| !exclude.contains(*id))
            .filter_map(|id| self.videos.get(id))
            .filter(|video| video.matches_any(&lowered))
            .cloned()
            .collect();
        matches.truncate(limit);
        Ok(matches)
    }

    async fn random_sample(
        &self,
        exclude: &HashSet<VideoId>,
        n: usize,
    ) -> StoreResult<Vec<CatalogItem>> {
        let mut eligible: Vec<&CatalogItem> =
            self.videos().filter(|v| !exclude.contains(&v.video_id)).collect();
        shuffle(&mut eligible);
        eligible.truncate(n);
        Ok(eligible.into_iter().cloned().collect())
    }

    async fn all_items(&self) -> StoreResult<Vec<CatalogItem>> {
        Ok(self.videos().cloned().collect())
    }
}

fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut rand::rng());
}
