use data_loader::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// The only failures a recommendation request can surface.
///
/// Everything past the user lookup degrades to a smaller or randomized
/// result instead of an error.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Profile store error: {0}")]
    ProfileStore(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
