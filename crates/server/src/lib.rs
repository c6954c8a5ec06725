//! Server crate for the video recommendation engine.
//!
//! This crate contains the orchestrator that coordinates all components of a
//! recommendation request, the per-user session cache it writes through, and
//! the engine configuration.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod session_cache;

pub use config::{EngineConfig, FallbackConfig, RankingConfig, SessionConfig};
pub use error::{ConfigError, RecommendError};
pub use orchestrator::{RecommendationOrchestrator, RecommendationResponse, ServedFrom};
pub use session_cache::{InMemorySessionCache, SessionCache, SessionCacheEntry, UserLocks};
