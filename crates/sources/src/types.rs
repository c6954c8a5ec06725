//! Shared types for candidate generation.
//!
//! Every producer (ranking service, content fallback) returns `Candidate`s;
//! hydration turns them into `Recommendation`s.

use data_loader::{CatalogItem, VideoId, WatchEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    /// Ranked by the remote ranking service
    Ranking,
    /// Matched the user's interests or recent watches
    Interest,
    /// Random backfill
    Random,
}

/// A candidate video.
///
/// Ranking candidates arrive as bare ids (`item == None`) and are resolved
/// during hydration; fallback candidates are already materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub video_id: VideoId,
    pub source: CandidateSource,
    pub item: Option<CatalogItem>,
}

impl Candidate {
    /// A ranked id awaiting hydration
    pub fn ranked(video_id: impl Into<VideoId>) -> Self {
        Self {
            video_id: video_id.into(),
            source: CandidateSource::Ranking,
            item: None,
        }
    }

    /// A candidate whose catalog record is already known
    pub fn materialized(item: CatalogItem, source: CandidateSource) -> Self {
        Self {
            video_id: item.video_id.clone(),
            source,
            item: Some(item),
        }
    }
}

/// A served recommendation: the catalog record plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub item: CatalogItem,
    pub source: CandidateSource,
}

impl Recommendation {
    pub fn video_id(&self) -> &str {
        &self.item.video_id
    }
}

/// Everything candidate generation needs to know about a user.
///
/// Built once per request from the profile so that producers never look at
/// raw (possibly corrupt) watch history.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub username: String,
    /// Interest tags, trimmed and de-duplicated, original order
    pub interests: Vec<String>,
    /// Ids of every validly watched video
    pub watched_videos: HashSet<VideoId>,
    /// Valid watch events, most recent first
    pub recent_watches: Vec<WatchEvent>,
    /// Watch events with both an id and a title
    pub qualified_history_count: usize,
}

impl UserContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn has_interests(&self) -> bool {
        !self.interests.is_empty()
    }

    /// Ids of the `n` most recent valid watches
    pub fn recent_video_ids(&self, n: usize) -> Vec<VideoId> {
        self.recent_watches
            .iter()
            .filter_map(|event| event.valid_video_id())
            .take(n)
            .map(str::to_string)
            .collect()
    }
}
