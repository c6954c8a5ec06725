//! Pipeline for filtering and hydrating recommendation candidates.
//!
//! This crate provides:
//! - Filter trait and implementations for candidate filtering
//! - FilterPipeline for composing filters
//! - ResultHydrator for turning candidates into served recommendations
//!
//! ## Architecture
//! Candidates from either producer flow through the same stages:
//! 1. Filters remove excluded and repeated ids, keeping rank order
//! 2. Ranked ids are resolved to catalog records; stale ids are dropped
//! 3. Any shortfall is backfilled by the content fallback
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::ResultHydrator;
//! use sources::ContentFallback;
//!
//! let hydrator = ResultHydrator::new(catalog.clone(), ContentFallback::new(catalog.clone()));
//! let results = hydrator.hydrate(&context, candidates, 16, &exclusions).await;
//! ```

pub mod filter_pipeline;
pub mod filters;
pub mod hydrator;
pub mod traits;

// Re-export main types
pub use filter_pipeline::FilterPipeline;
pub use hydrator::ResultHydrator;
pub use traits::Filter;
