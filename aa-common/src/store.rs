//! Announcement config persistence
//!
//! Reads are permissive (missing or corrupt file -> defaults). Writes go to a
//! temporary file in the target's directory which is then renamed over the
//! target, so readers only ever see the previous or the new document.

use crate::document::ConfigDocument;
use crate::error::ConfigError;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Loads and atomically saves the announcement configuration document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by the JSON file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and normalize the document; never fails
    ///
    /// Missing, unreadable, or corrupt files yield [`ConfigDocument::default`].
    pub fn load(&self) -> ConfigDocument {
        match self.try_load() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!("Config file {} not present, using defaults", self.path.display());
                ConfigDocument::default()
            }
            Err(e) => {
                warn!("{}; using defaults", e);
                ConfigDocument::default()
            }
        }
    }

    /// Load the document, reporting why it could not be read
    ///
    /// Returns `Ok(None)` if the file does not exist. An empty (or
    /// whitespace-only) file is treated as an empty document.
    pub fn try_load(&self) -> Result<Option<ConfigDocument>, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Ok(Some(ConfigDocument::default()));
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| ConfigError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if !value.is_object() {
            return Err(ConfigError::Corrupt {
                path: self.path.clone(),
                reason: "top-level value is not an object".to_string(),
            });
        }

        Ok(Some(ConfigDocument::from_value(&value)))
    }

    /// Normalize and atomically persist the document
    ///
    /// Returns the normalized document that was written. On failure the
    /// previous file content is untouched and no temp file is left behind.
    pub fn save(&self, doc: &ConfigDocument) -> Result<ConfigDocument, ConfigError> {
        let normalized = doc.normalized();
        let text = normalized.to_pretty_json()?;

        let tmp_path = self.temp_path();
        if let Err(source) = write_new_file(&tmp_path, text.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ConfigError::Write {
                path: tmp_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ConfigError::Replace {
                path: self.path.clone(),
                source,
            });
        }

        info!("Saved announcement config to {}", self.path.display());
        Ok(normalized)
    }

    /// Unique sibling of the target: `.{name}.{uuid}.tmp`
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.json".to_string());
        let tmp_name = format!(".{}.{}.tmp", name, Uuid::new_v4().simple());
        match self.path.parent() {
            Some(parent) => parent.join(tmp_name),
            None => PathBuf::from(tmp_name),
        }
    }
}

fn write_new_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let store = ConfigStore::new("/srv/config/announce.json");
        let tmp = store.temp_path();
        assert_eq!(tmp.parent(), Some(Path::new("/srv/config")));
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".announce.json."));
        assert!(name.ends_with(".tmp"));
        assert_ne!(store.temp_path(), tmp);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("absent.json"));
        assert!(store.try_load().unwrap().is_none());
        assert_eq!(store.load(), ConfigDocument::default());
    }

    #[test]
    fn test_write_failure_when_directory_missing() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("nope").join("config.json"));
        let err = store.save(&ConfigDocument::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }), "{:?}", err);
        assert_eq!(err.code(), "WriteError");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }
}
