//! CLI command definitions and dispatch.

pub mod build;
pub mod config;
pub mod dump;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use droplet_common::constants::{CONFIG_FILE_NAME, config_dir};

/// Droplet — bash script builder.
#[derive(Parser, Debug)]
#[command(name = "droplet", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration directory.
    #[arg(long, global = true, env = "DROPLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show all debug messages.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Show all information messages.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show errors.
    #[arg(short, long, global = true, conflicts_with_all = ["debug", "verbose"])]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset.
    pub const fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    /// Path of the YAML configuration file.
    pub fn config_file(&self) -> PathBuf {
        self.config
            .as_deref()
            .map_or_else(|| config_dir().join(CONFIG_FILE_NAME), |dir| dir.join(CONFIG_FILE_NAME))
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a script from a stage of a Dropletfile.
    Build(build::BuildArgs),
    /// Print parsed Dropletfiles as JSON.
    Dump(dump::DumpArgs),
    /// Manage Droplet configuration.
    Config(config::ConfigArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config_file = cli.config_file();
    match cli.command {
        Command::Build(args) => build::execute(args, &config_file),
        Command::Dump(args) => dump::execute(args),
        Command::Config(args) => config::execute(args, &config_file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_follows_flags() {
        let cli = Cli::parse_from(["droplet", "--debug", "dump", "Dropletfile"]);
        assert_eq!(cli.log_level(), "debug");
        let cli = Cli::parse_from(["droplet", "dump", "-q", "Dropletfile"]);
        assert_eq!(cli.log_level(), "error");
        let cli = Cli::parse_from(["droplet", "dump", "Dropletfile"]);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["droplet", "-q", "-v", "dump", "x"]).is_err());
    }

    #[test]
    fn config_file_defaults_to_config_dir() {
        let cli = Cli::parse_from(["droplet", "dump", "Dropletfile"]);
        assert_eq!(cli.config_file(), config_dir().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn config_flag_overrides_directory() {
        let cli = Cli::parse_from(["droplet", "--config", "/tmp/droplet", "config", "list"]);
        assert_eq!(cli.config_file(), PathBuf::from("/tmp/droplet/config.yml"));
    }
}
