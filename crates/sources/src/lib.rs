//! # Sources Crate
//!
//! Candidate generation for the video recommendation engine.
//!
//! ## Components
//!
//! ### Strategy
//! Cold start vs. warm start, decided from the user's qualified watch history.
//!
//! ### Ranking Source (warm start)
//! Ranked ids from the remote ranking service, behind a timeout. Also owns
//! the fire-and-forget model refit that precedes each warm-start request.
//!
//! ### Content Fallback (cold start and shortfall)
//! Catalog items matching the user's interests, backfilled at random, shuffled.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{build_exclusion_set, build_user_context, ContentFallback, Strategy};
//!
//! let context = build_user_context(&profile);
//! let exclusions = build_exclusion_set(&context, false, None);
//!
//! let fallback = ContentFallback::new(catalog.clone());
//! if Strategy::for_context(&context) == Strategy::ColdStart {
//!     let candidates = fallback.get_candidates(&context, 16, &exclusions).await;
//! }
//! ```

pub mod exclusion;
pub mod fallback;
pub mod ranking;
pub mod strategy;
pub mod types;
pub mod user_context;

pub use exclusion::{ExclusionSet, build_exclusion_set};
pub use fallback::ContentFallback;
pub use ranking::{RankingOutcome, RankingSource, TrainOutcome, Unavailable};
pub use strategy::{Strategy, WARM_START_THRESHOLD, select_strategy};
pub use types::{Candidate, CandidateSource, Recommendation, UserContext};
pub use user_context::build_user_context;
