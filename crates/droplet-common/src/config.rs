//! Configuration model for Droplet.
//!
//! The `configs` table is a flat string map consumed by builders
//! (`builder.local.copy`, `package_manager`, `shell`, ...).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PACKAGE_MANAGER, DEFAULT_REMOTE, DEFAULT_SHELL};
use crate::error::{DropletError, Result};

/// Configuration key naming the package manager used by `package`.
pub const KEY_PACKAGE_MANAGER: &str = "package_manager";
/// Configuration key naming the script generator.
pub const KEY_GENERATOR: &str = "generator";
/// Configuration key naming the shell prepended to shell-form commands.
pub const KEY_SHELL: &str = "shell";

/// Connection details for a remote registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    /// Registry address.
    pub addr: String,
    /// Transport protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// Root configuration for Droplet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DropletConfig {
    /// Remote used when none is named explicitly.
    #[serde(default)]
    pub default_remote: String,
    /// Known remotes by name.
    #[serde(default)]
    pub remotes: BTreeMap<String, Remote>,
    /// Flat key/value settings consumed by builders.
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
}

impl DropletConfig {
    /// Returns a configuration seeded with the built-in defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        let configs = [
            (KEY_PACKAGE_MANAGER, DEFAULT_PACKAGE_MANAGER),
            ("package_manager_action_by_stage", "true"),
            (KEY_GENERATOR, "local"),
            (KEY_SHELL, DEFAULT_SHELL),
            ("builder.local.copy", "cp -r"),
            ("builder.local.chown", "chown -R"),
            ("builder.local.chmod", "chmod -R"),
            ("builder.local.delete", "rm -rf"),
            ("builder.local.env", "export"),
            ("builder.local.user", "su"),
            ("builder.local.workdir", "cd"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        Self {
            default_remote: DEFAULT_REMOTE.to_owned(),
            remotes: BTreeMap::new(),
            configs,
        }
    }

    /// Reads the configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|source| DropletError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Reads the configuration, falling back to defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::with_defaults())
        }
    }

    /// Writes the configuration as YAML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "saving configuration");
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| DropletError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data).map_err(|source| DropletError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the value for a configuration key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.configs.get(key).map(String::as_str)
    }

    /// Returns the value for a configuration key, or `default` when unset or empty.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).filter(|v| !v.is_empty()).unwrap_or(default)
    }

    /// Inserts a new configuration key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.configs.contains_key(&key) {
            return Err(DropletError::Config {
                message: format!("config {key} already exists"),
            });
        }
        let _ = self.configs.insert(key, value.into());
        Ok(())
    }

    /// Removes a configuration key, returning its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist.
    pub fn remove(&mut self, key: &str) -> Result<String> {
        self.configs.remove(key).ok_or_else(|| DropletError::NotFound {
            kind: "config",
            id: key.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_apk_and_local_generator() {
        let config = DropletConfig::with_defaults();
        assert_eq!(config.get(KEY_PACKAGE_MANAGER), Some("apk"));
        assert_eq!(config.get(KEY_GENERATOR), Some("local"));
        assert_eq!(config.default_remote, "origin");
    }

    #[test]
    fn get_or_falls_back_on_empty_value() {
        let mut config = DropletConfig::default();
        config.set("builder.local.expose", "").expect("set");
        assert_eq!(config.get_or("builder.local.expose", "none"), "none");
        assert_eq!(config.get_or("missing", "fallback"), "fallback");
    }

    #[test]
    fn set_rejects_existing_key() {
        let mut config = DropletConfig::with_defaults();
        let err = config.set("shell", "/bin/bash -c").unwrap_err();
        assert!(err.to_string().contains("already exists"), "got: {err}");
    }

    #[test]
    fn remove_returns_value_and_rejects_missing_key() {
        let mut config = DropletConfig::with_defaults();
        assert_eq!(config.remove(KEY_SHELL).expect("remove"), "/bin/sh -c");
        assert_eq!(config.get(KEY_SHELL), None);
        let err = config.remove(KEY_SHELL).unwrap_err();
        assert_eq!(err.to_string(), "config not found: shell");
    }

    #[test]
    fn save_then_load_preserves_configuration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.yml");
        let mut config = DropletConfig::with_defaults();
        let _ = config.remotes.insert(
            "origin".into(),
            Remote {
                addr: "https://registry.example".into(),
                protocol: Some("http".into()),
            },
        );
        config.save(&path).expect("save");
        let loaded = DropletConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_or_default_without_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config =
            DropletConfig::load_or_default(&dir.path().join("absent.yml")).expect("defaults");
        assert_eq!(config, DropletConfig::with_defaults());
    }

    #[test]
    fn load_reports_invalid_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "configs: [unterminated").expect("write");
        assert!(DropletConfig::load(&path).is_err());
    }
}
