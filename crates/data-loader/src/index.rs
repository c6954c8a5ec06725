//! DataIndex building and validation.
//!
//! Loads the exported users and videos documents and checks the identity
//! invariants the engine relies on (unique, non-empty usernames and ids).

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

impl DataIndex {
    /// Load users.json and videos.json from a directory
    ///
    /// Steps:
    /// 1. Parse both files in parallel
    /// 2. Validate identities
    /// 3. Build the index
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading profiles and catalog from {:?}", data_dir);

        let users_path = data_dir.join("users.json");
        let videos_path = data_dir.join("videos.json");

        let (users, videos) = rayon::join(
            || parser::parse_users(&users_path),
            || parser::parse_videos(&videos_path),
        );
        let users = users?;
        let videos = videos?;

        info!("Loaded {} users, {} videos", users.len(), videos.len());

        Self::from_documents(users, videos)
    }

    /// Build an index from already-decoded documents
    pub fn from_documents(users: Vec<UserProfile>, videos: Vec<CatalogItem>) -> Result<Self> {
        validate_users(&users)?;
        validate_videos(&videos)?;

        let mut index = DataIndex::new();
        for user in users {
            let corrupt = user.corrupt_history_count();
            if corrupt > 0 {
                warn!(
                    "User {} has {} invalid watch history entries",
                    user.username, corrupt
                );
            }
            index.insert_user(user);
        }
        for video in videos {
            index.upsert_video(video);
        }

        Ok(index)
    }
}

fn validate_users(users: &[UserProfile]) -> Result<()> {
    let mut seen = HashSet::new();
    for user in users {
        if user.username.trim().is_empty() {
            return Err(DataLoadError::ValidationError(
                "user with empty username".to_string(),
            ));
        }
        if !seen.insert(user.username.as_str()) {
            return Err(DataLoadError::DuplicateId {
                entity: "User".to_string(),
                id: user.username.clone(),
            });
        }
    }
    Ok(())
}

fn validate_videos(videos: &[CatalogItem]) -> Result<()> {
    let mut seen = HashSet::new();
    for video in videos {
        if video.video_id.is_empty() {
            return Err(DataLoadError::ValidationError(format!(
                "video '{}' has an empty videoId",
                video.title
            )));
        }
        if !seen.insert(video.video_id.as_str()) {
            return Err(DataLoadError::DuplicateId {
                entity: "Video".to_string(),
                id: video.video_id.clone(),
            });
        }
    }
    Ok(())
}
