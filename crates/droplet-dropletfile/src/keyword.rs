//! The set of Dropletfile keywords.

use std::fmt;

/// A recognized Dropletfile keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `arg name[=value]...`
    Arg,
    /// `config path...`
    Config,
    /// `copy [--chown=..] [--chmod=..] src... dest`
    Copy,
    /// `cron min hour dom month dow command...`
    Cron,
    /// `delete path...`
    Delete,
    /// `env key value [key value...]`
    Env,
    /// `expose port...`
    Expose,
    /// `label key value [key value...]`
    Label,
    /// `package [--action=..] name...`
    Package,
    /// `run command...`
    Run,
    /// `stage name`
    Stage,
    /// `user name`
    User,
    /// `workdir path`
    Workdir,
}

impl Keyword {
    /// Every keyword, in alphabetical order.
    pub const ALL: [Self; 13] = [
        Self::Arg,
        Self::Config,
        Self::Copy,
        Self::Cron,
        Self::Delete,
        Self::Env,
        Self::Expose,
        Self::Label,
        Self::Package,
        Self::Run,
        Self::Stage,
        Self::User,
        Self::Workdir,
    ];

    /// Looks up a keyword, ignoring ASCII case.
    #[must_use]
    pub fn lookup(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|keyword| keyword.as_str().eq_ignore_ascii_case(word))
    }

    /// Lower-case spelling of the keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arg => "arg",
            Self::Config => "config",
            Self::Copy => "copy",
            Self::Cron => "cron",
            Self::Delete => "delete",
            Self::Env => "env",
            Self::Expose => "expose",
            Self::Label => "label",
            Self::Package => "package",
            Self::Run => "run",
            Self::Stage => "stage",
            Self::User => "user",
            Self::Workdir => "workdir",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
