//! Helper functions to build a UserContext from a UserProfile
//!
//! Corrupt watch events (missing or empty video id) are dropped here, once,
//! so nothing downstream has to re-check them.

use crate::types::UserContext;
use data_loader::{UserProfile, WatchEvent};
use std::cmp::Reverse;
use std::collections::HashSet;

/// Build a UserContext for a profile
///
/// Gathers:
/// - Valid watched ids (exclusion input)
/// - Valid watches sorted newest first (recent-watch similarity)
/// - Count of watches with id and title (strategy selection)
/// - Normalized interests
pub fn build_user_context(profile: &UserProfile) -> UserContext {
    let mut context = UserContext::new(profile.username.clone());

    context.watched_videos = profile.watched_ids();
    context.qualified_history_count = profile
        .watch_history
        .iter()
        .filter(|event| event.is_qualified())
        .count();

    let mut recent: Vec<WatchEvent> = profile.valid_watch_history().cloned().collect();
    // Events without a timestamp sort last; stable sort keeps stored order among ties.
    recent.sort_by_key(|event| Reverse(event.watched_at));
    context.recent_watches = recent;

    context.interests = normalize_interests(&profile.interests);
    context
}

/// Trim, drop blanks, de-duplicate case-insensitively
fn normalize_interests(interests: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    interests
        .iter()
        .map(|interest| interest.trim())
        .filter(|interest| !interest.is_empty())
        .filter(|interest| seen.insert(interest.to_lowercase()))
        .map(str::to_string)
        .collect()
}
