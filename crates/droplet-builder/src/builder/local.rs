//! Generator for scripts run directly on the local host.
//!
//! Verbs come from `builder.local.<name>` configuration keys; a verb that
//! is unset or empty renders its instruction as an empty line.

use std::borrow::Cow;
use std::collections::BTreeMap;

use droplet_common::config::{DropletConfig, KEY_PACKAGE_MANAGER, KEY_SHELL};
use droplet_common::constants::{DEFAULT_PACKAGE_MANAGER, DEFAULT_SHELL};
use droplet_dropletfile::instructions::{
    ArgInstruction, ConfigInstruction, CopyInstruction, CronInstruction, DeleteInstruction,
    EnvInstruction, ExposeInstruction, LabelInstruction, PackageInstruction, RunInstruction,
    ShellDependentCmdLine, UserInstruction, WorkdirInstruction,
};

use super::Builder;
use crate::error::{BuildError, Result};
use crate::package_manager::{PackageAction, PackageManager};

const VERB_PREFIX: &str = "builder.local.";

/// Renders instructions as plain POSIX shell.
#[derive(Debug, Clone)]
pub struct LocalBuilder {
    verbs: BTreeMap<String, String>,
    shell: String,
    package_manager: &'static PackageManager,
}

impl LocalBuilder {
    /// Creates a builder from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured package manager is unknown.
    pub fn new(config: &DropletConfig) -> Result<Self> {
        let manager_name = config.get_or(KEY_PACKAGE_MANAGER, DEFAULT_PACKAGE_MANAGER);
        let package_manager =
            PackageManager::lookup(manager_name).ok_or_else(|| BuildError::UnknownPackageManager {
                name: manager_name.to_owned(),
            })?;

        let verbs = config
            .configs
            .iter()
            .filter_map(|(key, value)| {
                let verb = key.strip_prefix(VERB_PREFIX)?;
                (!value.is_empty()).then(|| (verb.to_owned(), value.clone()))
            })
            .collect();

        tracing::debug!(package_manager = manager_name, "created local builder");
        Ok(Self {
            verbs,
            shell: config.get_or(KEY_SHELL, DEFAULT_SHELL).to_owned(),
            package_manager,
        })
    }

    /// `verb word...`, or an empty line when the verb is not configured.
    fn line<'a>(&self, verb: &str, words: impl IntoIterator<Item = Cow<'a, str>>) -> String {
        let Some(verb) = self.verbs.get(verb) else {
            return String::new();
        };
        let mut line = verb.clone();
        for word in words {
            line.push(' ');
            line.push_str(&word);
        }
        line
    }

    fn command_line(&self, command: &ShellDependentCmdLine) -> String {
        if command.prepend_shell {
            format!("{} {}", self.shell, shell_quote(&command.cmd_line.join(" ")))
        } else {
            quote_all(&command.cmd_line)
        }
    }
}

impl<X> Builder<X> for LocalBuilder {
    fn arg(&self, _instruction: &ArgInstruction) -> Result<String> {
        Ok(String::new())
    }

    fn config(&self, _instruction: &ConfigInstruction) -> Result<String> {
        Ok(String::new())
    }

    fn copy(&self, instruction: &CopyInstruction) -> Result<String> {
        let paths = &instruction.paths;
        let mut line = self.line(
            "copy",
            paths
                .sources
                .iter()
                .chain(std::iter::once(&paths.dest))
                .map(|p| shell_quote(p)),
        );
        if line.is_empty() {
            return Ok(line);
        }

        let dest = shell_quote(&paths.dest);
        for (verb, value) in [("chown", &instruction.chown), ("chmod", &instruction.chmod)] {
            if let Some(value) = value {
                let extra = self.line(verb, [shell_quote(value), dest.clone()]);
                if !extra.is_empty() {
                    line.push_str(" && ");
                    line.push_str(&extra);
                }
            }
        }
        Ok(line)
    }

    fn cron(&self, instruction: &CronInstruction) -> Result<String> {
        let command = if instruction.command.cmd_line.is_empty() {
            String::new()
        } else {
            self.command_line(&instruction.command)
        };
        let entry = format!("{} {command}", instruction.schedule());
        Ok(format!(
            "(crontab -l 2>/dev/null; echo {}) | crontab -",
            shell_quote(entry.trim_end())
        ))
    }

    fn delete(&self, instruction: &DeleteInstruction) -> Result<String> {
        let paths = &instruction.paths;
        Ok(self.line(
            "delete",
            paths
                .sources
                .iter()
                .chain(std::iter::once(&paths.dest))
                .map(|p| shell_quote(p)),
        ))
    }

    fn env(&self, instruction: &EnvInstruction) -> Result<String> {
        Ok(self.line(
            "env",
            instruction
                .env
                .iter()
                .map(|kv| Cow::Owned(format!("{}={}", kv.key, shell_quote(&kv.value)))),
        ))
    }

    fn expose(&self, instruction: &ExposeInstruction) -> Result<String> {
        Ok(self.line("expose", instruction.ports.iter().map(|p| shell_quote(p))))
    }

    fn label(&self, instruction: &LabelInstruction) -> Result<String> {
        Ok(self.line(
            "label",
            instruction
                .labels
                .iter()
                .map(|kv| Cow::Owned(format!("{}={}", kv.key, shell_quote(&kv.value)))),
        ))
    }

    fn package(&self, instruction: &PackageInstruction) -> Result<String> {
        let action: PackageAction = instruction.action.parse()?;
        Ok(self
            .package_manager
            .command_for(action, &instruction.packages))
    }

    fn run(&self, instruction: &RunInstruction<X>) -> Result<String> {
        Ok(self.command_line(&instruction.command))
    }

    fn user(&self, instruction: &UserInstruction) -> Result<String> {
        Ok(self.line("user", [shell_quote(&instruction.user)]))
    }

    fn workdir(&self, instruction: &WorkdirInstruction) -> Result<String> {
        Ok(self.line("workdir", [shell_quote(&instruction.path)]))
    }
}

/// Quotes `word` for POSIX shells unless it only holds safe characters.
fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_@%+=:,./-".contains(&b));
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

fn quote_all(words: &[String]) -> String {
    words
        .iter()
        .map(|w| shell_quote(w))
        .collect::<Vec<_>>()
        .join(" ")
}
