//! # Data Loader Crate
//!
//! Data model and store access for the video recommendation engine.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (UserProfile, WatchEvent, CatalogItem, DataIndex)
//! - **parser**: Decode the exported JSON documents
//! - **index**: Build and validate a DataIndex from those documents
//! - **store**: `ProfileStore` / `CatalogStore` traits, implemented by DataIndex
//! - **error**: Error types for loading and store access
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{CatalogStore, DataIndex};
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(Path::new("data"))?;
//! let user = index.get_user("alice").unwrap();
//! let science = index
//!     .find_by_tags_or_title(&["science".into()], &user.watched_ids(), 10)
//!     .await?;
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod store;
pub mod types;

pub use error::{DataLoadError, Result, StoreError, StoreResult};
pub use store::{CatalogStore, ProfileStore};
pub use types::{CatalogItem, ChannelInfo, DataIndex, UserProfile, VideoId, WatchEvent};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_index_creation() {
        let index = DataIndex::new();
        assert_eq!(index.counts(), (0, 0));
    }

    #[test]
    fn test_upsert_video_replaces_in_place() {
        let mut index = DataIndex::new();
        index.upsert_video(CatalogItem::new("v1", "Old title"));
        index.upsert_video(CatalogItem::new("v2", "Other"));
        index.upsert_video(CatalogItem::new("v1", "New title"));

        assert_eq!(index.counts(), (0, 2));
        assert_eq!(index.get_video("v1").unwrap().title, "New title");
        let first = index.videos().next().unwrap();
        assert_eq!(first.video_id, "v1");
    }

    #[test]
    fn test_watch_event_validity() {
        let mut event = WatchEvent {
            video_id: Some("v1".to_string()),
            title: None,
            watched_at: None,
            watch_duration: None,
            completed: false,
        };
        assert!(event.is_valid());
        assert!(!event.is_qualified());

        event.title = Some("Trains".to_string());
        assert!(event.is_qualified());

        event.video_id = Some(String::new());
        assert!(!event.is_valid());
        assert!(!event.is_qualified());
    }

    #[test]
    fn test_matches_any_checks_tags_title_description() {
        let item = CatalogItem::new("v1", "Fun With Magnets")
            .with_tags(["Physics"])
            .with_description("An EXPERIMENT at home");

        assert!(item.matches_any(&["magnet".to_string()]));
        assert!(item.matches_any(&["phys".to_string()]));
        assert!(item.matches_any(&["experiment".to_string()]));
        assert!(!item.matches_any(&["dinosaur".to_string()]));
    }

    #[test]
    fn test_empty_queries() {
        let index = DataIndex::new();
        assert!(index.get_user("nobody").is_none());
        assert!(index.get_video("nothing").is_none());
        assert_eq!(index.videos().count(), 0);
    }
}
