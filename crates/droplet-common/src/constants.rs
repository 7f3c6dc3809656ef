//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Application name used in CLI output.
pub const APP_NAME: &str = "droplet";

/// File name looked up inside a build directory.
pub const DROPLETFILE_NAME: &str = "Dropletfile";

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Remote used when none is named explicitly.
pub const DEFAULT_REMOTE: &str = "origin";

/// Package manager used when the configuration names none.
pub const DEFAULT_PACKAGE_MANAGER: &str = "apk";

/// Shell prepended to shell-form command lines.
pub const DEFAULT_SHELL: &str = "/bin/sh -c";

/// Fallback configuration directory when no home directory is known.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/droplet";

/// Returns `$HOME/.config/droplet`, falling back to `/etc/droplet`.
fn resolve_config_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_or_else(
            |_| PathBuf::from(SYSTEM_CONFIG_DIR),
            |home| PathBuf::from(home).join(".config").join(APP_NAME),
        )
}

static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved configuration directory for this session.
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(resolve_config_dir)
}

