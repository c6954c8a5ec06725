//! Filter to drop repeated ids, keeping the first (highest ranked) one.

use crate::traits::Filter;
use sources::{Candidate, ExclusionSet};
use std::collections::HashSet;

pub struct DuplicateFilter;

impl Filter for DuplicateFilter {
    fn name(&self) -> &str {
        "DuplicateFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, _exclusions: &ExclusionSet) -> Vec<Candidate> {
        let mut seen = HashSet::with_capacity(candidates.len());
        candidates
            .into_iter()
            .filter(|candidate| seen.insert(candidate.video_id.clone()))
            .collect()
    }
}
