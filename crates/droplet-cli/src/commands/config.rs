//! `droplet config` — Manage Droplet configuration.

use std::path::Path;

use clap::{Args, Subcommand, ValueEnum};
use droplet_common::config::DropletConfig;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration action.
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// List configuration keys.
    #[command(alias = "ls")]
    List {
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Print a configuration value.
    Get {
        /// Key to read.
        key: String,
    },
    /// Add configuration keys.
    Set {
        /// `key=value` pairs.
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Delete a configuration key.
    #[command(alias = "rm")]
    Del {
        /// Key to delete.
        key: String,
    },
}

/// Output format for `config list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Tab-separated key/value rows.
    Table,
    /// JSON object.
    Json,
    /// YAML mapping.
    Yaml,
}

/// Executes the `config` command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, changed, or saved.
pub fn execute(args: ConfigArgs, config_file: &Path) -> anyhow::Result<()> {
    let mut config = DropletConfig::load_or_default(config_file)?;
    if let Some(output) = apply(&mut config, args.action)? {
        println!("{output}");
    } else {
        config.save(config_file)?;
        tracing::info!(path = %config_file.display(), "configuration saved");
    }
    Ok(())
}

/// Applies `action`; returns text to print for read-only actions and
/// `None` when the configuration changed.
fn apply(config: &mut DropletConfig, action: ConfigAction) -> anyhow::Result<Option<String>> {
    match action {
        ConfigAction::List { format } => Ok(Some(list(config, format)?)),
        ConfigAction::Get { key } => config
            .get(&key)
            .map(|value| Some(value.to_owned()))
            .ok_or_else(|| anyhow::anyhow!("config {key} doesn't exist")),
        ConfigAction::Set { pairs } => {
            for pair in pairs {
                let Some((key, value)) = pair.split_once('=') else {
                    anyhow::bail!("invalid key=value configuration: {pair}");
                };
                config.set(key, value)?;
            }
            Ok(None)
        }
        ConfigAction::Del { key } => {
            let _ = config.remove(&key)?;
            Ok(None)
        }
    }
}

fn list(config: &DropletConfig, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Table => config
            .configs
            .iter()
            .map(|(key, value)| format!("{key}\t{value}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Format::Json => serde_json::to_string_pretty(&config.configs)?,
        Format::Yaml => serde_yaml::to_string(&config.configs)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_prints_value() {
        let mut config = DropletConfig::with_defaults();
        let out = apply(
            &mut config,
            ConfigAction::Get {
                key: "shell".into(),
            },
        )
        .expect("get");
        assert_eq!(out.as_deref(), Some("/bin/sh -c"));
    }

    #[test]
    fn get_missing_key_fails() {
        let mut config = DropletConfig::default();
        let err = apply(&mut config, ConfigAction::Get { key: "nope".into() }).unwrap_err();
        assert_eq!(err.to_string(), "config nope doesn't exist");
    }

    #[test]
    fn set_requires_key_value_pairs() {
        let mut config = DropletConfig::default();
        let err = apply(
            &mut config,
            ConfigAction::Set {
                pairs: vec!["novalue".into()],
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid key=value"));
    }

    #[test]
    fn set_and_delete_change_configuration() {
        let mut config = DropletConfig::default();
        let out = apply(
            &mut config,
            ConfigAction::Set {
                pairs: vec!["builder.local.label=echo".into(), "a=b=c".into()],
            },
        )
        .expect("set");
        assert!(out.is_none());
        assert_eq!(config.get("builder.local.label"), Some("echo"));
        assert_eq!(config.get("a"), Some("b=c"));

        let _ = apply(&mut config, ConfigAction::Del { key: "a".into() }).expect("del");
        assert_eq!(config.get("a"), None);
    }

    #[test]
    fn list_formats() {
        let mut config = DropletConfig::default();
        config.set("b", "2").expect("set");
        config.set("a", "1").expect("set");
        assert_eq!(list(&config, Format::Table).expect("table"), "a\t1\nb\t2");
        let json: serde_json::Value =
            serde_json::from_str(&list(&config, Format::Json).expect("json")).expect("valid json");
        assert_eq!(json["a"], "1");
        let yaml: std::collections::BTreeMap<String, String> =
            serde_yaml::from_str(&list(&config, Format::Yaml).expect("yaml")).expect("valid yaml");
        assert_eq!(yaml, config.configs);
    }

    #[test]
    fn execute_persists_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        execute(
            ConfigArgs {
                action: ConfigAction::Set {
                    pairs: vec!["custom=value".into()],
                },
            },
            &path,
        )
        .expect("set");
        let saved = DropletConfig::load(&path).expect("load");
        assert_eq!(saved.get("custom"), Some("value"));
        assert_eq!(saved.get("generator"), Some("local"));
    }
}
