//! Configuration management for aa-dispatch
//!
//! Two layers:
//! 1. **TOML Bootstrap**: port, paths, player invocation, timing, logging
//!    (optional file, read once at startup)
//! 2. **Announcement document**: buttons and duck levels, managed at runtime
//!    by [`aa_common::ConfigStore`]
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML bootstrap file
//! 4. Built-in defaults (code constants)

use crate::dispatch::PlayerCommand;
use crate::error::{Error, Result};
use aa_common::config::{
    resolve_path, DEFAULT_ACTIVITY_LOG, DEFAULT_CONFIG_FILE, DEFAULT_MEDIA_ROOT, DEFAULT_PLAYER,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5750;

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: Option<u16>,

    /// Directory holding the announcement clips
    pub media_root: Option<PathBuf>,

    /// Announcement document (JSON)
    pub config_file: Option<PathBuf>,

    /// Append-only activity log
    pub activity_log: Option<PathBuf>,

    /// Player invocation
    pub player: PlayerSection,

    /// Grace period between the stop invocation and a forced kill
    pub stop_grace_ms: Option<u64>,

    /// Upper bound for the stop invocation itself
    pub stop_timeout_ms: Option<u64>,

    /// How long a fresh player is watched for an immediate failure
    pub startup_probe_ms: Option<u64>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[player]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerSection {
    /// Player executable
    pub program: Option<PathBuf>,
    /// Arguments placed before the file/duck (or stop) arguments
    pub args: Vec<String>,
    /// Argument that asks the player to stop (default `--stop`)
    pub stop_arg: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a bootstrap file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Bootstrap(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&text)
            .map_err(|e| Error::Bootstrap(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Parse bootstrap TOML text
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a bootstrap file if one was found; problems are logged and defaults used
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            None => {
                info!("No bootstrap file found, using built-in defaults");
                Self::default()
            }
            Some(path) => match Self::load(path) {
                Ok(config) => {
                    info!("Loaded bootstrap configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("{}; using built-in defaults", e);
                    Self::default()
                }
            },
        }
    }
}

/// Timing limits for the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTiming {
    /// Wait after the stop invocation before force-killing the player
    pub stop_grace: Duration,
    /// Maximum runtime of the stop invocation
    pub stop_timeout: Duration,
    /// Startup window in which an immediate player failure is reported to the caller
    pub startup_probe: Duration,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        Self {
            stop_grace: Duration::from_millis(1500),
            stop_timeout: Duration::from_millis(5000),
            startup_probe: Duration::from_millis(150),
        }
    }
}

/// Everything the dispatcher needs, fully resolved
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub media_root: PathBuf,
    pub config_file: PathBuf,
    /// `None` disables the activity log (player output is discarded)
    pub activity_log: Option<PathBuf>,
    pub player: PlayerCommand,
    pub timing: DispatchTiming,
}

/// Overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub media_root: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub activity_log: Option<PathBuf>,
    pub player: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub dispatcher: DispatcherConfig,
}

impl Config {
    /// Merge CLI overrides, environment, TOML and defaults
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        let media_root = resolve_path(
            cli.media_root.as_deref(),
            "AA_MEDIA_ROOT",
            toml.media_root.as_deref(),
            DEFAULT_MEDIA_ROOT,
        );
        let config_file = resolve_path(
            cli.config_file.as_deref(),
            "AA_CONFIG_FILE",
            toml.config_file.as_deref(),
            DEFAULT_CONFIG_FILE,
        );
        let activity_log = resolve_path(
            cli.activity_log.as_deref(),
            "AA_ACTIVITY_LOG",
            toml.activity_log.as_deref(),
            DEFAULT_ACTIVITY_LOG,
        );
        let program = resolve_path(
            cli.player.as_deref(),
            "AA_PLAYER",
            toml.player.program.as_deref(),
            DEFAULT_PLAYER,
        );

        let defaults = DispatchTiming::default();
        let timing = DispatchTiming {
            stop_grace: toml
                .stop_grace_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.stop_grace),
            stop_timeout: toml
                .stop_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.stop_timeout),
            startup_probe: toml
                .startup_probe_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.startup_probe),
        };

        let mut player = PlayerCommand::new(program).with_args(toml.player.args.clone());
        if let Some(stop_arg) = toml.player.stop_arg.as_ref().filter(|s| !s.trim().is_empty()) {
            player = player.with_stop_arg(stop_arg.clone());
        }

        Self {
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            log_level: toml.logging.level.clone(),
            dispatcher: DispatcherConfig {
                media_root,
                config_file,
                activity_log: Some(activity_log),
                player,
                timing,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in ["AA_MEDIA_ROOT", "AA_CONFIG_FILE", "AA_ACTIVITY_LOG", "AA_PLAYER"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_parse_full_bootstrap_file() {
        let config = TomlConfig::parse(
            r#"
port = 6000
media_root = "/srv/clips"
config_file = "/srv/aa.json"
stop_grace_ms = 250

[player]
program = "/usr/local/bin/aa_play.sh"
args = ["--device", "hw:1"]
stop_arg = "--halt"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(config.port, Some(6000));
        assert_eq!(config.media_root, Some(PathBuf::from("/srv/clips")));
        assert_eq!(config.stop_grace_ms, Some(250));
        assert_eq!(config.player.args, vec!["--device", "hw:1"]);
        assert_eq!(config.player.stop_arg.as_deref(), Some("--halt"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_bootstrap_file_is_valid() {
        let config = TomlConfig::parse("").unwrap();
        assert!(config.port.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = TomlConfig::load_or_default(Some(Path::new("/nonexistent/aa.toml")));
        assert!(config.media_root.is_none());
    }

    #[test]
    #[serial]
    fn test_resolve_uses_compiled_defaults() {
        clear_env();
        let config = Config::resolve(&CliOverrides::default(), &TomlConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.dispatcher.media_root, PathBuf::from(DEFAULT_MEDIA_ROOT));
        assert_eq!(config.dispatcher.config_file, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(config.dispatcher.player.program(), Path::new(DEFAULT_PLAYER));
        assert_eq!(config.dispatcher.player.stop_arg(), "--stop");
        assert_eq!(config.dispatcher.timing, DispatchTiming::default());
    }

    #[test]
    #[serial]
    fn test_resolve_cli_over_toml() {
        clear_env();
        let toml = TomlConfig::parse(
            r#"
port = 6000
media_root = "/srv/clips"
stop_timeout_ms = 900
[player]
stop_arg = "--halt"
"#,
        )
        .unwrap();
        let cli = CliOverrides {
            port: Some(7000),
            media_root: Some(PathBuf::from("/mnt/clips")),
            ..Default::default()
        };

        let config = Config::resolve(&cli, &toml);
        assert_eq!(config.port, 7000);
        assert_eq!(config.dispatcher.media_root, PathBuf::from("/mnt/clips"));
        assert_eq!(config.dispatcher.timing.stop_timeout, Duration::from_millis(900));
        assert_eq!(config.dispatcher.player.stop_arg(), "--halt");
    }
}
