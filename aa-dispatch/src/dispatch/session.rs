//! The single active playback session

use super::process::ProcessHandle;
use aa_common::api::{SessionState, StatusResponse};
use aa_common::DuckPercent;
use std::path::PathBuf;
use uuid::Uuid;

/// A launched player process and what it is playing
///
/// Exclusively owned by the dispatcher state; at most one exists at a time.
#[derive(Debug)]
pub struct PlaybackSession {
    pub id: Uuid,
    /// Originating button, `None` for ad-hoc plays
    pub slot: Option<usize>,
    pub label: String,
    /// Canonical path handed to the player
    pub file: PathBuf,
    pub duck: DuckPercent,
    pub handle: ProcessHandle,
}

impl PlaybackSession {
    pub fn new(
        slot: Option<usize>,
        label: String,
        file: PathBuf,
        duck: DuckPercent,
        handle: ProcessHandle,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot,
            label,
            file,
            duck,
            handle,
        }
    }

    pub fn pid(&self) -> u32 {
        self.handle.pid()
    }

    /// Status snapshot reporting this session in `state`
    pub fn status(&self, state: SessionState) -> StatusResponse {
        StatusResponse {
            state,
            session_id: Some(self.id),
            slot: self.slot,
            label: Some(self.label.clone()),
            file: Some(self.file.display().to_string()),
            duck: Some(self.duck),
            process_id: Some(self.pid()),
            started_at: Some(self.handle.started_at()),
        }
    }
}
