//! Shared fixtures for dispatcher tests
//!
//! The player is a generated shell script run through `/bin/sh`, so tests
//! never exec a file that was just written. Every invocation is appended to
//! `calls.log` in the scratch directory.

#![allow(dead_code)]

use aa_common::events::EventBus;
use aa_dispatch::config::{DispatchTiming, DispatcherConfig};
use aa_dispatch::dispatch::PlayerCommand;
use aa_dispatch::PlaybackDispatcher;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Runs until killed
pub const LONG_PLAYER: &str = "exec sleep 30";
/// Fails straight away
pub const FAILING_PLAYER: &str = "echo 'device busy' >&2\nexit 3";
/// Short clip
pub const SHORT_PLAYER: &str = "sleep 0.3\nexit 0";

/// Stop branch that acknowledges and exits cleanly
pub const STOP_OK: &str = "echo 'stopping announcement'\nexit 0";
/// Stop branch that reports a failure
pub const STOP_FAILS: &str = "echo 'no announcement to stop' >&2\nexit 1";
/// Stop branch that never returns
pub const STOP_HANGS: &str = "exec sleep 30";

pub struct TestEnv {
    pub dir: TempDir,
    pub media_root: PathBuf,
    pub config_file: PathBuf,
    pub log_file: PathBuf,
    pub script: PathBuf,
    pub calls_file: PathBuf,
}

impl TestEnv {
    /// Scratch media root plus a fake player whose play branch runs `play_body`
    pub fn new(play_body: &str) -> Self {
        Self::with_stop(play_body, STOP_OK)
    }

    /// Like [`TestEnv::new`], with `stop_body` run for `--stop`
    pub fn with_stop(play_body: &str, stop_body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let media_root = dir.path().join("media");
        std::fs::create_dir_all(&media_root).unwrap();

        let calls_file = dir.path().join("calls.log");
        let script = dir.path().join("aa_play.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\n\
                 if [ \"$1\" = \"--stop\" ]; then\n\
                 echo stop >> \"{calls}\"\n\
                 {stop}\n\
                 fi\n\
                 echo \"play $1 $2\" >> \"{calls}\"\n\
                 {body}\n",
                calls = calls_file.display(),
                stop = stop_body,
                body = play_body,
            ),
        )
        .unwrap();

        Self {
            config_file: dir.path().join("announcementassistant.json"),
            log_file: dir.path().join("AnnouncementAssistant.log"),
            media_root,
            script,
            calls_file,
            dir,
        }
    }

    /// Create an (empty) clip under the media root
    pub fn add_clip(&self, relative: &str) -> PathBuf {
        let path = self.media_root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"RIFF").unwrap();
        path
    }

    pub fn write_config(&self, doc: &Value) {
        std::fs::write(&self.config_file, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    }

    pub fn timing() -> DispatchTiming {
        DispatchTiming {
            stop_grace: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(2),
            startup_probe: Duration::from_millis(200),
        }
    }

    pub fn dispatcher(&self) -> PlaybackDispatcher {
        self.dispatcher_with(Self::timing())
    }

    pub fn dispatcher_with(&self, timing: DispatchTiming) -> PlaybackDispatcher {
        self.dispatcher_for(
            PlayerCommand::new("/bin/sh").with_args(vec![self.script.display().to_string()]),
            timing,
        )
    }

    pub fn dispatcher_for(
        &self,
        player: PlayerCommand,
        timing: DispatchTiming,
    ) -> PlaybackDispatcher {
        PlaybackDispatcher::new(
            DispatcherConfig {
                media_root: self.media_root.clone(),
                config_file: self.config_file.clone(),
                activity_log: Some(self.log_file.clone()),
                player,
                timing,
            },
            EventBus::new(32),
        )
    }

    /// Lines the fake player wrote to `calls.log`
    pub fn calls(&self) -> Vec<String> {
        read_lines(&self.calls_file)
    }

    /// JSON records from the activity log (player output lines are skipped)
    pub fn activity_records(&self) -> Vec<Value> {
        read_lines(&self.log_file)
            .iter()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(Value::is_object)
            .collect()
    }

    /// Actions of the activity records, in order
    pub fn activity_actions(&self) -> Vec<String> {
        self.activity_records()
            .iter()
            .filter_map(|r| r["action"].as_str().map(str::to_string))
            .collect()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Config with button 2 bound to `music/siren.wav` at duck `"10"`
pub fn siren_config() -> Value {
    serde_json::json!({
        "version": 2,
        "defaultDuck": 25,
        "buttons": [
            {"label": "Doors open", "fileRef": ""},
            {"label": "Raffle", "fileRef": "music/raffle.mp3"},
            {"label": "Lost child", "fileRef": "music/siren.wav", "duck": "10"},
        ]
    })
}

/// True if a process with this pid exists (zombies included)
pub fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
