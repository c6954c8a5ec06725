//! Strategy selection: cold start vs. warm start.
//!
//! Any single watch event with both a video id and a title makes the user
//! warm. The threshold is deliberately one: as soon as there is behavioral
//! signal, the ranking service gets the first shot.

use crate::types::UserContext;
use data_loader::UserProfile;

/// Minimum qualified watch events for the ranking path
pub const WARM_START_THRESHOLD: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No usable history: content fallback only
    ColdStart,
    /// Usable history: ranking service first, content fallback for shortfall
    WarmStart,
}

impl Strategy {
    fn from_qualified_count(count: usize) -> Self {
        if count >= WARM_START_THRESHOLD {
            Strategy::WarmStart
        } else {
            Strategy::ColdStart
        }
    }

    /// Classify a prepared context
    pub fn for_context(context: &UserContext) -> Self {
        Self::from_qualified_count(context.qualified_history_count)
    }
}

/// Classify a raw profile. Pure; no side effects.
pub fn select_strategy(profile: &UserProfile) -> Strategy {
    let qualified = profile
        .watch_history
        .iter()
        .filter(|event| event.is_qualified())
        .count();
    Strategy::from_qualified_count(qualified)
}
