//! Core domain types for the video catalog and user profiles.
//!
//! Field names follow the camelCase documents of the profile and catalog
//! stores (`videoId`, `watchHistory`, ...), so fixtures exported from those
//! stores deserialize without translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a catalog item (a YouTube-style video id)
pub type VideoId = String;

// =============================================================================
// User-related Types
// =============================================================================

/// A single entry of a user's watch history.
///
/// Entries written by older clients may lack `videoId` or `title`; those are
/// kept in the profile but ignored by every derived computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEvent {
    #[serde(default)]
    pub video_id: Option<VideoId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub watched_at: Option<DateTime<Utc>>,
    /// Seconds watched
    #[serde(default)]
    pub watch_duration: Option<u32>,
    #[serde(default)]
    pub completed: bool,
}

impl WatchEvent {
    /// The video id, if present and non-empty
    pub fn valid_video_id(&self) -> Option<&str> {
        self.video_id.as_deref().filter(|id| !id.is_empty())
    }

    /// A valid event has a non-empty video id
    pub fn is_valid(&self) -> bool {
        self.valid_video_id().is_some()
    }

    /// Valid and titled; only these count towards warm start
    pub fn is_qualified(&self) -> bool {
        self.is_valid() && self.title.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A user profile as held by the profile store. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub watch_history: Vec<WatchEvent>,
    #[serde(default)]
    pub liked_videos: Vec<VideoId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            age: None,
            interests: Vec::new(),
            watch_history: Vec::new(),
            liked_videos: Vec::new(),
            created_at: None,
        }
    }

    /// Watch events with a non-empty video id, in stored order
    pub fn valid_watch_history(&self) -> impl Iterator<Item = &WatchEvent> {
        self.watch_history.iter().filter(|event| event.is_valid())
    }

    /// Ids of every validly watched video
    pub fn watched_ids(&self) -> HashSet<VideoId> {
        self.valid_watch_history()
            .filter_map(|event| event.valid_video_id())
            .map(str::to_string)
            .collect()
    }

    /// Number of entries with a missing or empty video id
    pub fn corrupt_history_count(&self) -> usize {
        self.watch_history.len() - self.valid_watch_history().count()
    }
}

// =============================================================================
// Catalog Types
// =============================================================================

/// Channel metadata carried flat on catalog documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_title: Option<String>,
}

/// A video in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub video_id: VideoId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub channel: ChannelInfo,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: Option<u64>,
}

impl CatalogItem {
    pub fn new(video_id: impl Into<VideoId>, title: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            category: None,
            channel: ChannelInfo::default(),
            thumbnail_url: None,
            published_at: None,
            view_count: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Case-insensitive substring match of any pattern against tags, title
    /// or description. Patterns must already be lowercase.
    pub fn matches_any(&self, lowered_patterns: &[String]) -> bool {
        let title = self.title.to_lowercase();
        let description = self.description.to_lowercase();
        let tags: Vec<String> = self.tags.iter().map(|t| t.to_lowercase()).collect();

        lowered_patterns.iter().any(|pattern| {
            title.contains(pattern.as_str())
                || description.contains(pattern.as_str())
                || tags.iter().any(|tag| tag.contains(pattern.as_str()))
        })
    }
}

// =============================================================================
// DataIndex - The In-Memory Store
// =============================================================================

/// In-memory profile and catalog store.
///
/// Backs the CLI and the tests; implements both `ProfileStore` and
/// `CatalogStore`. Catalog insertion order is kept so that pattern queries
/// return a stable order.
#[derive(Debug, Default)]
pub struct DataIndex {
    pub(crate) users: HashMap<String, UserProfile>,
    pub(crate) videos: HashMap<VideoId, CatalogItem>,
    pub(crate) video_order: Vec<VideoId>,
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a user by username
    pub fn get_user(&self, username: &str) -> Option<&UserProfile> {
        self.users.get(username)
    }

    /// Get a catalog item by id
    pub fn get_video(&self, video_id: &str) -> Option<&CatalogItem> {
        self.videos.get(video_id)
    }

    /// All catalog items in insertion order
    pub fn videos(&self) -> impl Iterator<Item = &CatalogItem> {
        self.video_order.iter().filter_map(|id| self.videos.get(id))
    }

    /// All users, in no particular order
    pub fn users(&self) -> impl Iterator<Item = &UserProfile> {
        self.users.values()
    }

    /// Insert or replace a user profile
    pub fn insert_user(&mut self, user: UserProfile) {
        self.users.insert(user.username.clone(), user);
    }

    /// Insert or replace a catalog item, keeping its original position
    pub fn upsert_video(&mut self, video: CatalogItem) {
        if !self.videos.contains_key(&video.video_id) {
            self.video_order.push(video.video_id.clone());
        }
        self.videos.insert(video.video_id.clone(), video);
    }

    /// (users, videos) counts for logging
    pub fn counts(&self) -> (usize, usize) {
        (self.users.len(), self.videos.len())
    }
}
