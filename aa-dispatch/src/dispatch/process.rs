//! Player process launching and termination
//!
//! The player is always started from an argument vector; nothing passes
//! through a shell, so file names need no escaping.

use aa_common::{DuckLevelResolver, DuckPercent};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

/// Default argument asking the player to stop the current announcement
pub const DEFAULT_STOP_ARG: &str = "--stop";

/// How the external player is invoked
///
/// Play: `program [args..] <absolute file> <duck>%`
/// Stop: `program [args..] <stop_arg>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    program: PathBuf,
    args: Vec<String>,
    stop_arg: String,
}

impl PlayerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stop_arg: DEFAULT_STOP_ARG.to_string(),
        }
    }

    /// Arguments placed before the play/stop arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_stop_arg(mut self, stop_arg: impl Into<String>) -> Self {
        self.stop_arg = stop_arg.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn stop_arg(&self) -> &str {
        &self.stop_arg
    }

    /// Command that plays `file` with the given duck level
    pub fn play_command(&self, file: &Path, duck: DuckPercent) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(file)
            .arg(DuckLevelResolver::format(duck))
            .stdin(Stdio::null());
        command
    }

    /// Command that asks the player to stop
    pub fn stop_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&self.stop_arg)
            .stdin(Stdio::null());
        command
    }
}

/// How a terminated process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own (possibly in response to the stop invocation)
    Exited(ExitStatus),
    /// Did not exit within the grace period and was killed
    Killed,
}

/// One running player process
///
/// The child is killed if the handle is dropped while it is still running.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    started_at: DateTime<Utc>,
}

impl ProcessHandle {
    /// Spawn the given command
    pub fn spawn(mut command: Command) -> std::io::Result<Self> {
        command.kill_on_drop(true);
        let child = command.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| std::io::Error::other("player exited before reporting a pid"))?;

        Ok(Self {
            child,
            pid,
            started_at: Utc::now(),
        })
    }

    /// Operating-system process id
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wall-clock launch time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Non-blocking exit check; reaps the process if it has exited
    pub fn try_exit(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait up to `within` for the process to exit
    pub async fn wait_for_exit(&mut self, within: Duration) -> std::io::Result<Option<ExitStatus>> {
        match tokio::time::timeout(within, self.child.wait()).await {
            Ok(status) => status.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Give the process `grace` to exit, then kill it
    ///
    /// Returns once the process has been reaped; never waits longer than
    /// `grace` plus the time the OS needs to deliver the kill.
    pub async fn terminate(&mut self, grace: Duration) -> std::io::Result<Termination> {
        if let Some(status) = self.try_exit()? {
            return Ok(Termination::Exited(status));
        }
        if let Some(status) = self.wait_for_exit(grace).await? {
            return Ok(Termination::Exited(status));
        }

        match self.child.kill().await {
            Ok(()) => Ok(Termination::Killed),
            // Exited between the grace timeout and the kill
            Err(_) => match self.try_exit()? {
                Some(status) => Ok(Termination::Exited(status)),
                None => Err(std::io::Error::other(format!(
                    "process {} survived kill",
                    self.pid
                ))),
            },
        }
    }
}
