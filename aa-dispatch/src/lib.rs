//! # Announcement Dispatcher (aa-dispatch)
//!
//! Plays one of six configured announcement clips on demand while the show
//! audio is ducked, and stops it again.
//!
//! **Purpose:** Resolve a trigger into a sandboxed clip path and duck level,
//! keep at most one player process alive (a newer trigger preempts the
//! current one), and expose Play/Stop/status over HTTP.
//!
//! **Architecture:** Command-driven state machine behind a `tokio` mutex; the
//! audio itself is produced by an external player executable.

pub mod activity_log;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;

pub use dispatch::PlaybackDispatcher;
pub use error::{DispatchError, Error, Result};
