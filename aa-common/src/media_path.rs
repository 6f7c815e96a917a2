//! Media path validation
//!
//! Turns a user-supplied file reference into an absolute path confined to the
//! media root. Structural checks (empty, traversal, extension) are purely
//! lexical and run before anything is looked up on disk, so a hostile
//! reference is classified without being stat'd.

use crate::error::ValidationError;
use std::path::{Component, Path, PathBuf};

/// Extensions accepted for announcement clips (compared case-insensitively)
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac", "m4a", "aac"];

/// Resolves file references against a fixed media root
#[derive(Debug, Clone)]
pub struct PathValidator {
    media_root: PathBuf,
}

impl PathValidator {
    /// Create a validator for the given media root
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
        }
    }

    /// Resolve a file reference to an absolute path inside the media root
    ///
    /// Checks, in order:
    /// 1. empty reference -> [`ValidationError::NoFileAssigned`]
    /// 2. `..` segment, or absolute path outside the root -> [`ValidationError::PathTraversal`]
    /// 3. extension not in [`AUDIO_EXTENSIONS`] -> [`ValidationError::UnsupportedFormat`]
    /// 4. no regular file at the resolved location -> [`ValidationError::FileNotFound`]
    ///
    /// A file that exists but whose canonical location lies outside the
    /// canonical media root (symlink escape) is reported as `PathTraversal`.
    pub fn resolve(&self, file_ref: &str) -> Result<PathBuf, ValidationError> {
        let candidate = self.classify(file_ref)?;

        if !candidate.is_file() {
            return Err(ValidationError::FileNotFound(file_ref.trim().to_string()));
        }

        let canonical = candidate
            .canonicalize()
            .map_err(|_| ValidationError::FileNotFound(file_ref.trim().to_string()))?;
        let canonical_root = self
            .media_root
            .canonicalize()
            .map_err(|_| ValidationError::FileNotFound(file_ref.trim().to_string()))?;

        if !canonical.starts_with(&canonical_root) {
            return Err(ValidationError::PathTraversal(file_ref.trim().to_string()));
        }

        Ok(canonical)
    }

    /// Lexical part of [`resolve`](Self::resolve): checks 1-3 without touching the filesystem
    pub fn classify(&self, file_ref: &str) -> Result<PathBuf, ValidationError> {
        let trimmed = file_ref.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::NoFileAssigned);
        }

        let path = Path::new(trimmed);
        let traversal = || ValidationError::PathTraversal(trimmed.to_string());

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(traversal());
        }

        let relative = if path.has_root() {
            path.strip_prefix(&self.media_root).map_err(|_| traversal())?
        } else {
            path
        };

        // Relative remainder may only contain plain names ("./" is harmless)
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(traversal());
        }

        let joined = self.media_root.join(relative);
        if !Self::is_audio_file(&joined) {
            return Err(ValidationError::UnsupportedFormat(trimmed.to_string()));
        }

        Ok(joined)
    }

    /// True if the path carries a whitelisted audio extension
    pub fn is_audio_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                AUDIO_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}
