//! Bootstrap path resolution
//!
//! Paths the dispatcher needs at startup (media root, config document,
//! activity log, player executable) are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML bootstrap file
//! 4. Compiled default (the FPP plugin layout)

use std::path::{Path, PathBuf};

/// Directory holding the playable clips
pub const DEFAULT_MEDIA_ROOT: &str = "/home/fpp/media/music";

/// Announcement configuration document
pub const DEFAULT_CONFIG_FILE: &str = "/home/fpp/media/config/announcementassistant.json";

/// Append-only activity log
pub const DEFAULT_ACTIVITY_LOG: &str = "/home/fpp/media/logs/AnnouncementAssistant.log";

/// Player executable invoked with `(file, duck%)` or the stop argument
pub const DEFAULT_PLAYER: &str =
    "/home/fpp/media/plugins/fpp-AnnouncementAssistant/scripts/aa_play.sh";

/// Environment variable naming the TOML bootstrap file
pub const BOOTSTRAP_ENV_VAR: &str = "AA_BOOTSTRAP";

/// Directory name used under the platform config directory
const APP_DIR_NAME: &str = "announcement-assistant";

/// Resolve one bootstrap path using the CLI > env > TOML > default order
///
/// Empty values at any tier are ignored.
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: &str,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return PathBuf::from(value.trim());
        }
    }

    // Priority 3: TOML bootstrap file
    if let Some(path) = toml_value.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }

    // Priority 4: Compiled default
    PathBuf::from(default)
}

/// Locate the TOML bootstrap file
///
/// Explicit path (CLI) first, then `$AA_BOOTSTRAP`, then
/// `~/.config/announcement-assistant/config.toml`, then
/// `/etc/announcement-assistant/config.toml`. Returns `None` if nothing
/// exists; running without a bootstrap file is normal.
pub fn find_bootstrap_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(value) = std::env::var(BOOTSTRAP_ENV_VAR) {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value.trim()));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}
