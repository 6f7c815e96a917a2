//! Shared API request/response types

use crate::duck::DuckPercent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ========================================
// Dispatcher State
// ========================================

/// Published dispatcher phase
///
/// `Starting` and `Stopping` are only observable while a transition is in
/// progress; a settled dispatcher is either `Idle` or `Playing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No active session
    #[default]
    Idle,
    /// Player process being launched
    Starting,
    /// Player process running
    Playing,
    /// Player process being terminated
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

// ========================================
// Command Responses
// ========================================

/// Tagged result returned by every trigger command
///
/// # Examples
///
/// ```
/// use aa_common::api::types::TriggerResponse;
///
/// let response = TriggerResponse::ok("Triggered: Lost child")
///     .with_slot(2)
///     .with_duck(10)
///     .with_process_id(4242);
/// let json = serde_json::to_value(&response).unwrap();
/// assert_eq!(json["ok"], true);
/// assert_eq!(json["processId"], 4242);
/// assert!(json.get("error").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duck: Option<DuckPercent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Machine-readable error code (`NoFileAssigned`, `SpawnFailed`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    /// Successful response
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            slot: None,
            label: None,
            file: None,
            duck: None,
            process_id: None,
            error: None,
        }
    }

    /// Failed response with an error code
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(code.into()),
            ..Self::ok(message)
        }
    }

    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_duck(mut self, duck: DuckPercent) -> Self {
        self.duck = Some(duck);
        self
    }

    pub fn with_process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }
}

/// Dispatcher status snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: SessionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duck: Option<DuckPercent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl StatusResponse {
    /// Status of a dispatcher with no session
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            slot: None,
            label: None,
            file: None,
            duck: None,
            process_id: None,
            started_at: None,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<String>,
}

// ========================================
// Command Requests
// ========================================

/// Trigger action for the single-endpoint form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    Play,
    Stop,
}

/// Query string of the single-endpoint form: `?action=play&slot=2`
///
/// Both fields are kept as raw strings and interpreted leniently: a missing
/// action means `play`, a missing or non-numeric slot is an invalid slot.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TriggerQuery {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub slot: Option<String>,
}

impl TriggerQuery {
    /// Requested action; `None` for unknown actions
    pub fn action(&self) -> Option<TriggerAction> {
        match self.action.as_deref().map(|a| a.trim().to_ascii_lowercase()) {
            None => Some(TriggerAction::Play),
            Some(a) if a.is_empty() || a == "play" => Some(TriggerAction::Play),
            Some(a) if a == "stop" => Some(TriggerAction::Stop),
            Some(_) => None,
        }
    }

    /// Requested slot; `-1` when missing or non-numeric
    pub fn slot(&self) -> i64 {
        self.slot
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(-1)
    }
}

/// Body of an ad-hoc play request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayFileRequest {
    /// Reference relative to the media root (or absolute inside it)
    pub file: String,
    /// Optional duck level (number or text such as `"25%"`)
    #[serde(default)]
    pub duck: Option<Value>,
}
