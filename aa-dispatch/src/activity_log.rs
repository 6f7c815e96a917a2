//! Append-only activity log
//!
//! One JSON object per line for every dispatcher transition, interleaved with
//! whatever the player and stop invocations print. Writing is best effort: a
//! log that cannot be opened or written never affects a transition.

use aa_common::DuckPercent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, warn};

/// Lines of player output quoted in errors
const TAIL_LINES: usize = 5;

/// What happened
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    /// Player launched
    Play,
    /// Running player killed for a newer Play
    Preempt,
    /// Running player stopped on request
    Stop,
    /// Player exited on its own
    Finished,
    /// Command failed (validation or process error)
    Failed,
}

/// One transition record
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Utc>,
    pub action: ActivityAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duck: Option<DuckPercent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActivityRecord {
    pub fn new(action: ActivityAction) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            slot: None,
            file: None,
            duck: None,
            process_id: None,
            exit_code: None,
            error: None,
            message: None,
        }
    }

    pub fn slot(mut self, slot: Option<usize>) -> Self {
        self.slot = slot;
        self
    }

    pub fn file(mut self, file: &Path) -> Self {
        self.file = Some(file.display().to_string());
        self
    }

    pub fn duck(mut self, duck: DuckPercent) -> Self {
        self.duck = Some(duck);
        self
    }

    pub fn process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }

    pub fn exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn error(mut self, code: &str, message: impl Into<String>) -> Self {
        self.error = Some(code.to_string());
        self.message = Some(message.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Activity log sink
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: Option<PathBuf>,
}

impl ActivityLog {
    /// Log appending to `path` (created on first write)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Log that discards everything
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Append a record; failures are reported through tracing only
    pub fn record(&self, record: &ActivityRecord) {
        match record.action {
            ActivityAction::Failed => warn!(
                action = ?record.action,
                slot = ?record.slot,
                error = record.error.as_deref().unwrap_or(""),
                "{}",
                record.message.as_deref().unwrap_or("command failed")
            ),
            _ => info!(
                action = ?record.action,
                slot = ?record.slot,
                file = record.file.as_deref().unwrap_or(""),
                duck = ?record.duck,
                pid = ?record.process_id,
                "announcement activity"
            ),
        }

        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                debug!("Activity record not serializable: {}", e);
                return;
            }
        };
        self.append(line.as_bytes());
    }

    /// Append raw output (e.g. from the stop invocation)
    pub fn append_output(&self, output: &[u8]) {
        if output.is_empty() {
            return;
        }
        self.append(output);
    }

    /// Stdout/stderr handles for a child process, pointing at the log
    ///
    /// Falls back to discarding output when the log cannot be opened.
    pub fn child_stdio(&self) -> (Stdio, Stdio) {
        let Some(file) = self.open() else {
            return (Stdio::null(), Stdio::null());
        };
        match file.try_clone() {
            Ok(clone) => (Stdio::from(file), Stdio::from(clone)),
            Err(e) => {
                debug!("Could not duplicate activity log handle: {}", e);
                (Stdio::from(file), Stdio::null())
            }
        }
    }

    /// Current end of the log, for reading back output written after it
    pub fn mark(&self) -> u64 {
        self.path
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    /// Last few lines written since `mark`, trimmed; empty when the log is disabled
    pub fn tail_since(&self, mark: u64) -> String {
        let Some(path) = self.path.as_ref() else {
            return String::new();
        };
        let mut bytes = Vec::new();
        let read = File::open(path).and_then(|mut file| {
            file.seek(SeekFrom::Start(mark))?;
            file.read_to_end(&mut bytes)
        });
        if let Err(e) = read {
            debug!("Activity log {} not readable: {}", path.display(), e);
            return String::new();
        }

        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(TAIL_LINES);
        lines[start..].join("\n").trim().to_string()
    }

    fn append(&self, bytes: &[u8]) {
        let Some(mut file) = self.open() else {
            return;
        };
        let mut buf = bytes.to_vec();
        if !buf.ends_with(b"\n") {
            buf.push(b'\n');
        }
        if let Err(e) = file.write_all(&buf) {
            debug!("Activity log write failed: {}", e);
        }
    }

    fn open(&self) -> Option<File> {
        let path = self.path.as_ref()?;
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                debug!("Activity log {} unavailable: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_records_are_json_lines() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("aa.log"));

        log.record(
            &ActivityRecord::new(ActivityAction::Play)
                .slot(Some(2))
                .file(Path::new("/media/music/siren.wav"))
                .duck(10)
                .process_id(4242),
        );
        log.record(&ActivityRecord::new(ActivityAction::Failed).error("NoFileAssigned", "no file"));

        let lines = lines(&dir.path().join("aa.log"));
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["action"], "play");
        assert_eq!(first["slot"], 2);
        assert_eq!(first["duck"], 10);
        assert_eq!(first["process_id"], 4242);
        assert!(first["timestamp"].is_string());

        let second: Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["error"], "NoFileAssigned");
        assert!(second.get("slot").is_none());
    }

    #[test]
    fn test_unwritable_log_is_swallowed() {
        let log = ActivityLog::new("/nonexistent/dir/aa.log");
        log.record(&ActivityRecord::new(ActivityAction::Stop));
        log.append_output(b"ignored");
        let (_out, _err) = log.child_stdio();
    }

    #[test]
    fn test_tail_since_mark_returns_new_output_only() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("aa.log"));
        log.append_output(b"earlier player output");

        let mark = log.mark();
        log.append_output(b"line 1\nline 2\nline 3\nline 4\nline 5\nline 6\n");

        assert_eq!(log.tail_since(mark), "line 2\nline 3\nline 4\nline 5\nline 6");
        assert_eq!(log.tail_since(log.mark()), "");
        assert_eq!(ActivityLog::disabled().tail_since(0), "");
    }

    #[test]
    fn test_output_appended_with_newline() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("aa.log"));
        log.append_output(b"stopping fppmm");
        log.append_output(b"");
        log.append_output(b"done\n");
        assert_eq!(lines(&dir.path().join("aa.log")), vec!["stopping fppmm", "done"]);
    }
}
