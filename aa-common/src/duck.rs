//! Duck level parsing and resolution
//!
//! A duck level is the percentage of show volume retained while an
//! announcement plays (lower = more ducking). Values reach this module from
//! several permissive sources: legacy config strings (`"25%"`), form input
//! (`"25"`, `""`), JSON numbers. [`DuckLevelResolver::resolve`] is the single
//! clamp point; everything handed to the player process passes through it.

use serde_json::Value;

/// Duck level as an integer percentage in `0..=100`
pub type DuckPercent = u8;

/// Fallback when neither the button nor the document provides a level
pub const SYSTEM_DEFAULT_DUCK: DuckPercent = 25;

/// Resolves effective duck levels from a priority chain of candidates
pub struct DuckLevelResolver;

impl DuckLevelResolver {
    /// Resolve the duck level for a button
    ///
    /// Priority: button override, then the document default. The result is
    /// always clamped into `0..=100`.
    pub fn resolve(button_duck: Option<i64>, default_duck: i64) -> DuckPercent {
        Self::clamp(button_duck.unwrap_or(default_duck))
    }

    /// Resolve from an ordered candidate list; first present value wins,
    /// [`SYSTEM_DEFAULT_DUCK`] if none are present.
    pub fn resolve_candidates<I>(candidates: I) -> DuckPercent
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        candidates
            .into_iter()
            .flatten()
            .next()
            .map(Self::clamp)
            .unwrap_or(SYSTEM_DEFAULT_DUCK)
    }

    /// Clamp an arbitrary integer into `0..=100`
    pub fn clamp(value: i64) -> DuckPercent {
        value.clamp(0, 100) as DuckPercent
    }

    /// Parse free-form duck text
    ///
    /// Accepts `"25"`, `"25%"`, `" 25 % "`, `"-5"`. Returns `None` for empty
    /// or non-numeric input so the caller can fall back to a default.
    /// Values are not clamped here.
    pub fn parse(text: &str) -> Option<i64> {
        let trimmed = text.trim();
        let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
        if trimmed.is_empty() {
            return None;
        }

        let (negative, digits) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        // Oversized digit strings saturate; the clamp maps them to 0 or 100 anyway
        let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
        Some(if negative { -magnitude } else { magnitude })
    }

    /// Parse a JSON value (number or string) as a duck level
    pub fn parse_value(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// Format a duck level the way the player expects it (`"25%"`)
    pub fn format(duck: DuckPercent) -> String {
        format!("{}%", duck)
    }
}
