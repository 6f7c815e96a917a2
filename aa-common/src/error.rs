//! Common error types for the announcement dispatcher

use std::path::PathBuf;
use thiserror::Error;

/// Configuration document errors
///
/// `Unreadable` and `Corrupt` are recovered locally by [`crate::ConfigStore::load`]
/// (defaults are substituted). `Write` and `Replace` are surfaced to the caller
/// of [`crate::ConfigStore::save`]; the on-disk document stays at its last good state.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("Config file unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON (or not a JSON object)
    #[error("Config file corrupt: {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Temporary file could not be created or written
    #[error("Failed to write temp config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temporary file could not be renamed over the target
    #[error("Failed to replace config {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConfigError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Unreadable { .. } => "ConfigUnreadable",
            ConfigError::Corrupt { .. } => "ConfigCorrupt",
            ConfigError::Write { .. } => "WriteError",
            ConfigError::Replace { .. } => "ReplaceError",
            ConfigError::Serialize(_) => "WriteError",
        }
    }
}

/// Trigger request validation errors
///
/// Raised before any process is spawned or killed; dispatcher state is
/// unchanged when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Slot index outside 0..=5 (or missing)
    #[error("Invalid slot: {0}")]
    InvalidSlot(i64),

    /// Button has no file reference
    #[error("No audio file assigned to this button")]
    NoFileAssigned,

    /// Reference escapes the media root
    #[error("File reference escapes the media root: {0}")]
    PathTraversal(String),

    /// Extension is not a whitelisted audio format
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Reference is well-formed but nothing exists there
    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl ValidationError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidSlot(_) => "InvalidSlot",
            ValidationError::NoFileAssigned => "NoFileAssigned",
            ValidationError::PathTraversal(_) => "PathTraversal",
            ValidationError::UnsupportedFormat(_) => "UnsupportedFormat",
            ValidationError::FileNotFound(_) => "FileNotFound",
        }
    }
}
