//! Parser for the exported store documents.
//!
//! - users.json: JSON array of user profiles
//! - videos.json: JSON array of catalog items

use crate::error::{DataLoadError, Result};
use crate::types::*;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;

/// Read a whole file, mapping a missing file to `FileNotFound`
fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

fn parse_documents<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = read_file(path)?;
    parse_str(&content, &file_name(path))
}

/// Decode a JSON array of documents; `file` is only used in error messages
pub fn parse_str<T: DeserializeOwned>(content: &str, file: &str) -> Result<Vec<T>> {
    serde_json::from_str(content).map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse the users.json file
pub fn parse_users(path: &Path) -> Result<Vec<UserProfile>> {
    parse_documents(path)
}

/// Parse the videos.json file
pub fn parse_videos(path: &Path) -> Result<Vec<CatalogItem>> {
    parse_documents(path)
}
