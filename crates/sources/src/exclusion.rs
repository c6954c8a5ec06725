//! Exclusion set: ids that must not appear in a response.
//!
//! Built fresh per request from the user's valid watch history plus, on a
//! refresh, everything already served in this session.

use crate::types::UserContext;
use data_loader::VideoId;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<VideoId>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.ids.contains(video_id)
    }

    pub fn insert(&mut self, video_id: impl Into<VideoId>) -> bool {
        self.ids.insert(video_id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_set(&self) -> &HashSet<VideoId> {
        &self.ids
    }

    /// A copy widened by `extra`; used when backfilling around already-chosen items
    pub fn with_ids<I>(&self, extra: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VideoId>,
    {
        let mut widened = self.clone();
        widened.extend(extra);
        widened
    }

    /// Sorted ids, for the ranking service's exclude parameter
    pub fn to_sorted_vec(&self) -> Vec<VideoId> {
        let mut ids: Vec<VideoId> = self.ids.iter().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

impl<T: Into<VideoId>> Extend<T> for ExclusionSet {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.ids.extend(iter.into_iter().map(Into::into));
    }
}

impl<T: Into<VideoId>> FromIterator<T> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = ExclusionSet::new();
        set.extend(iter);
        set
    }
}

/// Build the exclusion set for one request.
///
/// - Valid watched ids are always excluded.
/// - Previously served ids are excluded only when `refresh` is set; a plain
///   fetch may legitimately show them again.
pub fn build_exclusion_set(
    context: &UserContext,
    refresh: bool,
    previously_served: Option<&HashSet<VideoId>>,
) -> ExclusionSet {
    let mut exclusions: ExclusionSet = context.watched_videos.iter().cloned().collect();
    if refresh && let Some(served) = previously_served {
        exclusions.extend(served.iter().cloned());
    }
    exclusions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_history(ids: &[&str]) -> UserContext {
        let mut context = UserContext::new("bob");
        context.watched_videos = ids.iter().map(|id| id.to_string()).collect();
        context
    }

    fn served(ids: &[&str]) -> HashSet<VideoId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_watched_always_excluded() {
        let context = context_with_history(&["v1", "v2"]);
        let exclusions = build_exclusion_set(&context, false, None);
        assert_eq!(exclusions.len(), 2);
        assert!(exclusions.contains("v1"));
        assert!(exclusions.contains("v2"));
    }

    #[test]
    fn test_previously_served_only_on_refresh() {
        let context = context_with_history(&["v1"]);
        let previous = served(&["v1", "v5", "v6"]);

        let plain = build_exclusion_set(&context, false, Some(&previous));
        assert_eq!(plain.len(), 1);
        assert!(!plain.contains("v5"));

        let refreshed = build_exclusion_set(&context, true, Some(&previous));
        assert_eq!(refreshed.len(), 3);
        assert!(refreshed.contains("v5"));
        assert!(refreshed.contains("v6"));
    }

    #[test]
    fn test_refresh_without_cache_entry() {
        let context = context_with_history(&[]);
        let exclusions = build_exclusion_set(&context, true, None);
        assert!(exclusions.is_empty());
    }

    #[test]
    fn test_with_ids_does_not_mutate_original() {
        let base: ExclusionSet = ["v1"].into_iter().collect();
        let widened = base.with_ids(["v2", "v3"]);
        assert_eq!(base.len(), 1);
        assert_eq!(widened.to_sorted_vec(), vec!["v1", "v2", "v3"]);
    }
}
