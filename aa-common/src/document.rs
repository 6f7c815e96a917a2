//! Announcement configuration document
//!
//! The persisted document binds six buttons to clips and duck levels.
//! Decoding is permissive: anything that parses as JSON is turned into a
//! document that satisfies the invariants (exactly six buttons, duck levels in
//! `0..=100`, labels of 1-50 characters). Older documents written before the
//! `version` tag existed are migrated on the fly.

use crate::duck::{DuckLevelResolver, DuckPercent, SYSTEM_DEFAULT_DUCK};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Number of announcement buttons (slots 0..=5)
pub const BUTTON_COUNT: usize = 6;

/// Schema version written by this release
pub const CURRENT_VERSION: u32 = 2;

/// Schema version assumed for documents without a `version` key
pub const LEGACY_VERSION: u32 = 1;

/// Maximum label length in characters
pub const MAX_LABEL_CHARS: usize = 50;

/// Legacy per-button duck keys, in priority order
const LEGACY_BUTTON_DUCK_KEYS: [&str; 4] = ["duck", "duckPct", "duckPercent", "duck_percent"];

/// Prefix of version 1 `file` values, relative to the media root's parent
const LEGACY_MUSIC_PREFIX: &str = "music/";

/// One announcement button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonSpec {
    /// Display label
    pub label: String,
    /// Clip reference relative to the media root (empty = unassigned)
    #[serde(default)]
    pub file_ref: String,
    /// Per-button duck override; `None` uses the document default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duck: Option<DuckPercent>,
}

impl ButtonSpec {
    /// Unassigned button with the default label for `slot`
    pub fn unassigned(slot: usize) -> Self {
        Self {
            label: default_label(slot),
            file_ref: String::new(),
            duck: None,
        }
    }

    /// True if no clip is bound to this button
    pub fn is_unassigned(&self) -> bool {
        self.file_ref.trim().is_empty()
    }
}

/// The persisted announcement configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Schema version
    pub version: u32,
    /// Fallback duck level for buttons without an override
    pub default_duck: DuckPercent,
    /// Exactly [`BUTTON_COUNT`] buttons, index = slot
    pub buttons: [ButtonSpec; BUTTON_COUNT],
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            default_duck: SYSTEM_DEFAULT_DUCK,
            buttons: std::array::from_fn(ButtonSpec::unassigned),
        }
    }
}

impl ConfigDocument {
    /// Build a normalized document from arbitrary JSON
    ///
    /// Non-object input yields the default document. Missing slots are
    /// synthesized, excess slots dropped, unparseable duck values fall back to
    /// the document default.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            debug!("Config root is not an object, using defaults");
            return Self::default();
        };

        let version = obj
            .get("version")
            .and_then(Value::as_u64)
            .map(|v| v.min(u32::MAX as u64) as u32)
            .unwrap_or(LEGACY_VERSION);

        if version < CURRENT_VERSION {
            debug!("Migrating config document from version {}", version);
            Self::from_legacy(obj)
        } else {
            Self::from_current(obj)
        }
    }

    fn from_current(obj: &Map<String, Value>) -> Self {
        let default_duck =
            DuckLevelResolver::resolve_candidates([duck_field(obj, "defaultDuck")]);

        let buttons = std::array::from_fn(|slot| {
            let raw = raw_button(obj, slot);
            ButtonSpec {
                label: normalize_label(raw.and_then(|b| b.get("label")), slot),
                file_ref: string_field(raw, "fileRef"),
                duck: raw
                    .and_then(|b| duck_field(b, "duck"))
                    .map(DuckLevelResolver::clamp),
            }
        });

        Self {
            version: CURRENT_VERSION,
            default_duck,
            buttons,
        }
    }

    /// Version 1 documents: `duck`/`duckDefault` strings at the top level,
    /// `file` instead of `fileRef`, and several spellings of the button duck.
    fn from_legacy(obj: &Map<String, Value>) -> Self {
        let default_duck = DuckLevelResolver::resolve_candidates([
            duck_field(obj, "defaultDuck"),
            duck_field(obj, "duckDefault"),
            duck_field(obj, "duck"),
        ]);

        let buttons = std::array::from_fn(|slot| {
            let raw = raw_button(obj, slot);
            let duck = raw.and_then(|b| {
                LEGACY_BUTTON_DUCK_KEYS
                    .iter()
                    .find_map(|key| duck_field(b, key))
                    .map(DuckLevelResolver::clamp)
            });
            let mut file_ref = string_field(raw, "fileRef");
            if file_ref.is_empty() {
                file_ref = legacy_file_ref(string_field(raw, "file"));
            }
            ButtonSpec {
                label: normalize_label(raw.and_then(|b| b.get("label")), slot),
                file_ref,
                duck,
            }
        });

        Self {
            version: CURRENT_VERSION,
            default_duck,
            buttons,
        }
    }

    /// Re-apply the invariants to an in-memory document
    pub fn normalized(&self) -> Self {
        let buttons = std::array::from_fn(|slot| {
            let button = &self.buttons[slot];
            ButtonSpec {
                label: normalize_label_str(&button.label, slot),
                file_ref: button.file_ref.trim().to_string(),
                duck: button.duck.map(|d| DuckLevelResolver::clamp(d as i64)),
            }
        });

        Self {
            version: CURRENT_VERSION,
            default_duck: DuckLevelResolver::clamp(self.default_duck as i64),
            buttons,
        }
    }

    /// Button for a slot, `None` if the slot is out of range
    pub fn button(&self, slot: usize) -> Option<&ButtonSpec> {
        self.buttons.get(slot)
    }

    /// Effective duck level for a slot (override, then document default)
    pub fn effective_duck(&self, slot: usize) -> DuckPercent {
        let button_duck = self.button(slot).and_then(|b| b.duck).map(i64::from);
        DuckLevelResolver::resolve(button_duck, self.default_duck as i64)
    }

    /// Pretty-printed JSON with a trailing newline
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

/// Default label for a slot ("Announcement 1" for slot 0)
pub fn default_label(slot: usize) -> String {
    format!("Announcement {}", slot + 1)
}

fn raw_button(obj: &Map<String, Value>, slot: usize) -> Option<&Map<String, Value>> {
    obj.get("buttons")
        .and_then(Value::as_array)
        .and_then(|buttons| buttons.get(slot))
        .and_then(Value::as_object)
}

fn duck_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(DuckLevelResolver::parse_value)
}

fn string_field(obj: Option<&Map<String, Value>>, key: &str) -> String {
    obj.and_then(|b| b.get(key))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Version 1 `file` values named clips as `music/<name>`, meaning `<name>`
/// directly under the media root
fn legacy_file_ref(file: String) -> String {
    match file.strip_prefix(LEGACY_MUSIC_PREFIX) {
        Some(rest) => rest.trim_start_matches('/').to_string(),
        None => file,
    }
}

fn normalize_label(value: Option<&Value>, slot: usize) -> String {
    match value.and_then(Value::as_str) {
        Some(label) => normalize_label_str(label, slot),
        None => default_label(slot),
    }
}

fn normalize_label_str(label: &str, slot: usize) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return default_label(slot);
    }
    trimmed.chars().take(MAX_LABEL_CHARS).collect()
}
