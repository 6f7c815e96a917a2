//! # Announcement Assistant Common Library
//!
//! Shared code for the announcement dispatcher including:
//! - Announcement configuration document and its atomic store
//! - Media path validation (sandboxing under the media root)
//! - Duck level parsing and resolution
//! - Dispatch event types and the event bus
//! - API request/response types
//! - Bootstrap path resolution

pub mod api;
pub mod config;
pub mod document;
pub mod duck;
pub mod error;
pub mod events;
pub mod media_path;
pub mod store;

pub use document::{ButtonSpec, ConfigDocument, BUTTON_COUNT};
pub use duck::{DuckLevelResolver, DuckPercent};
pub use error::{ConfigError, ValidationError};
pub use media_path::PathValidator;
pub use store::ConfigStore;
