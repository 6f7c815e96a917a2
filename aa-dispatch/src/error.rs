//! Error types for aa-dispatch
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use aa_common::{ConfigError, ValidationError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Player process failures
///
/// Whenever one of these is returned the dispatcher has already settled in
/// `Idle`.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Player executable could not be launched
    #[error("Failed to launch player {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Player exited with a failure status during startup
    #[error("Player exited with status {}{}", code_text(.code), output_suffix(.output))]
    PlayerExited { code: Option<i32>, output: String },

    /// Stop invocation exited nonzero
    #[error("Stop command exited with status {}: {output}", code_text(.code))]
    StopFailed { code: Option<i32>, output: String },

    /// Stop invocation did not finish in time (it was killed)
    #[error("Stop command timed out after {0:?}")]
    StopTimedOut(Duration),

    /// Stop invocation could not be launched
    #[error("Failed to launch stop command: {0}")]
    StopSpawn(#[source] std::io::Error),

    /// Player process could not be killed or reaped
    #[error("Failed to terminate player process {pid}: {source}")]
    Terminate {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

fn code_text(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

fn output_suffix(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(": {}", output)
    }
}

impl DispatchError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Spawn { .. } => "SpawnFailed",
            DispatchError::PlayerExited { .. } => "PlayerExited",
            DispatchError::StopFailed { .. }
            | DispatchError::StopTimedOut(_)
            | DispatchError::StopSpawn(_) => "StopFailed",
            DispatchError::Terminate { .. } => "TerminateFailed",
        }
    }
}

/// Main error type for aa-dispatch
#[derive(Error, Debug)]
pub enum Error {
    /// Trigger request rejected before anything was spawned or killed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Player process failure
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Config document persistence failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Blocking config/filesystem task did not complete
    #[error("Background task failed: {0}")]
    Task(String),

    /// Bootstrap (TOML) configuration errors
    #[error("Bootstrap configuration error: {0}")]
    Bootstrap(String),
}

impl Error {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(e) => e.code(),
            Error::Dispatch(e) => e.code(),
            Error::Config(e) => e.code(),
            Error::Task(_) => "TaskFailed",
            Error::Bootstrap(_) => "BootstrapError",
        }
    }

    /// True for errors caused by the request rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Convenience Result type using aa-dispatch Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through_wrapped_errors() {
        let err: Error = ValidationError::NoFileAssigned.into();
        assert_eq!(err.code(), "NoFileAssigned");
        assert!(err.is_client_error());

        let err: Error = DispatchError::PlayerExited {
            code: Some(3),
            output: String::new(),
        }
        .into();
        assert_eq!(err.code(), "PlayerExited");
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Player exited with status 3");

        let err = DispatchError::PlayerExited {
            code: Some(1),
            output: "aplay: device busy".to_string(),
        };
        assert_eq!(err.to_string(), "Player exited with status 1: aplay: device busy");
    }

    #[test]
    fn test_stop_failures_share_a_code() {
        assert_eq!(
            DispatchError::StopTimedOut(Duration::from_secs(5)).code(),
            "StopFailed"
        );
        let err = DispatchError::StopFailed {
            code: None,
            output: "fppmm: not running".to_string(),
        };
        assert_eq!(err.code(), "StopFailed");
        assert!(err.to_string().contains("signal"));
        assert!(err.to_string().contains("fppmm: not running"));
    }
}
