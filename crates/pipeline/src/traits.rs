//! Core traits for the hydration pipeline.
//!
//! This module defines the Filter trait that allows composable,
//! extensible filters to be applied to candidate sets before hydration.

use sources::{Candidate, ExclusionSet};

/// Core trait for filtering candidates.
///
/// Filters take ownership of the candidates and return the survivors in
/// their original relative order; rank order from the ranking service must
/// survive every filter.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a set of candidates.
    ///
    /// # Arguments
    /// * `candidates` - The candidates to filter (takes ownership)
    /// * `exclusions` - Ids that must not be served for this request
    fn apply(&self, candidates: Vec<Candidate>, exclusions: &ExclusionSet) -> Vec<Candidate>;
}
