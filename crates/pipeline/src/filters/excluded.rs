//! Filter to remove candidates in the request's exclusion set.
//!
//! The ranking service is asked not to return excluded ids, but its answer
//! is not trusted; this filter is what actually keeps watched (and, on
//! refresh, previously served) videos out of a response.

use crate::traits::Filter;
use sources::{Candidate, ExclusionSet};

/// Removes candidates whose id is in the exclusion set.
pub struct ExcludedFilter;

impl Filter for ExcludedFilter {
    fn name(&self) -> &str {
        "ExcludedFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, exclusions: &ExclusionSet) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|candidate| !exclusions.contains(&candidate.video_id))
            .collect()
    }
}
