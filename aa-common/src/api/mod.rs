//! Shared HTTP API types
//!
//! Pure request/response types with no framework dependencies; the
//! dispatcher binary wraps them with axum handlers.

pub mod types;

pub use types::{
    HealthResponse, PlayFileRequest, SessionState, StatusResponse, TriggerAction, TriggerQuery,
    TriggerResponse,
};
