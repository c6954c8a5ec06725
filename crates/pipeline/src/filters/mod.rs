//! Filter implementations for the hydration pipeline.

pub mod duplicate;
pub mod excluded;

pub use duplicate::DuplicateFilter;
pub use excluded::ExcludedFilter;
