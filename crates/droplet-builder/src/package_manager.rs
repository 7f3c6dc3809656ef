//! Command tables for the supported package managers.

use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

/// What a `package` instruction asks the package manager to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PackageAction {
    /// Install the listed packages.
    #[default]
    Install,
    /// Upgrade every installed package.
    Update,
    /// Refresh the package index.
    Refresh,
    /// Remove the listed packages.
    Remove,
    /// Drop cached downloads.
    Clean,
}

impl PackageAction {
    /// Lower-case name as written in `--action=`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Refresh => "refresh",
            Self::Remove => "remove",
            Self::Clean => "clean",
        }
    }
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageAction {
    type Err = BuildError;

    /// An empty action means install.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "install" => Ok(Self::Install),
            "update" => Ok(Self::Update),
            "refresh" => Ok(Self::Refresh),
            "remove" => Ok(Self::Remove),
            "clean" => Ok(Self::Clean),
            _ => Err(BuildError::UnknownPackageAction {
                action: s.to_owned(),
            }),
        }
    }
}

/// A package manager's executable and per-action arguments.
///
/// An action with no arguments is unsupported and formats to an empty
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageManager {
    /// Name used in the `package_manager` configuration key.
    pub name: &'static str,
    /// Executable.
    pub command: &'static str,
    install: &'static [&'static str],
    update: &'static [&'static str],
    refresh: &'static [&'static str],
    remove: &'static [&'static str],
    clean: &'static [&'static str],
    global: &'static [&'static str],
}

/// Every supported package manager.
pub static MANAGERS: [PackageManager; 7] = [
    PackageManager {
        name: "apk",
        command: "apk",
        install: &["add"],
        update: &["upgrade"],
        refresh: &["update"],
        remove: &["del", "--rdepends"],
        clean: &[],
        global: &["--no-cache"],
    },
    PackageManager {
        name: "apt",
        command: "apt",
        install: &["install"],
        update: &["dist-upgrade"],
        refresh: &["update"],
        remove: &["remove", "--auto-remove"],
        clean: &["clean"],
        global: &["-y"],
    },
    PackageManager {
        name: "brew",
        command: "brew",
        install: &["install"],
        update: &["upgrade"],
        refresh: &["update"],
        remove: &["remove"],
        clean: &["cleanup"],
        global: &["-f"],
    },
    PackageManager {
        name: "dnf",
        command: "dnf",
        install: &["install"],
        update: &["upgrade"],
        refresh: &["makecache"],
        remove: &["remove"],
        clean: &["clean", "all"],
        global: &["-y"],
    },
    PackageManager {
        name: "pacman",
        command: "pacman",
        install: &["-S", "--needed"],
        update: &["-Su"],
        refresh: &["-Syy"],
        remove: &["-Rcs"],
        clean: &["-Sc"],
        global: &["--noconfirm"],
    },
    PackageManager {
        name: "yum",
        command: "yum",
        install: &["install"],
        update: &["update"],
        refresh: &["makecache"],
        remove: &["remove"],
        clean: &["clean", "all"],
        global: &["-y"],
    },
    PackageManager {
        name: "zypper",
        command: "zypper",
        install: &["install", "--allow-downgrade"],
        update: &["update"],
        refresh: &["refresh"],
        remove: &["remove"],
        clean: &["clean", "-a"],
        global: &["--non-interactive", "--gpg-auto-import-keys"],
    },
];

impl PackageManager {
    /// Finds a manager by name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static Self> {
        MANAGERS.iter().find(|manager| manager.name == name)
    }

    /// Installs `packages`; empty when there is nothing to install.
    #[must_use]
    pub fn install(&self, packages: &[String], flags: &[String]) -> String {
        if packages.is_empty() {
            return String::new();
        }
        self.format(self.install, flags, packages)
    }

    /// Upgrades every installed package.
    #[must_use]
    pub fn update(&self) -> String {
        self.format(self.update, &[], &[])
    }

    /// Refreshes the package index.
    #[must_use]
    pub fn refresh(&self) -> String {
        self.format(self.refresh, &[], &[])
    }

    /// Removes `packages`; empty when there is nothing to remove.
    #[must_use]
    pub fn remove(&self, packages: &[String], flags: &[String]) -> String {
        if packages.is_empty() {
            return String::new();
        }
        self.format(self.remove, flags, packages)
    }

    /// Drops cached downloads.
    #[must_use]
    pub fn clean(&self) -> String {
        self.format(self.clean, &[], &[])
    }

    /// Formats the command for `action`.
    #[must_use]
    pub fn command_for(&self, action: PackageAction, packages: &[String]) -> String {
        match action {
            PackageAction::Install => self.install(packages, &[]),
            PackageAction::Update => self.update(),
            PackageAction::Refresh => self.refresh(),
            PackageAction::Remove => self.remove(packages, &[]),
            PackageAction::Clean => self.clean(),
        }
    }

    fn format(&self, verb: &[&str], flags: &[String], packages: &[String]) -> String {
        if verb.is_empty() {
            return String::new();
        }
        std::iter::once(self.command)
            .chain(self.global.iter().copied())
            .chain(verb.iter().copied())
            .chain(flags.iter().map(String::as_str))
            .chain(packages.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(packages: &[&str]) -> Vec<String> {
        packages.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn lookup_finds_every_manager() {
        for name in ["apk", "apt", "brew", "dnf", "pacman", "yum", "zypper"] {
            let manager = PackageManager::lookup(name).expect("manager should exist");
            assert_eq!(manager.name, name);
        }
        assert!(PackageManager::lookup("npm").is_none());
    }

    #[test]
    fn apk_install_and_remove() {
        let apk = PackageManager::lookup("apk").expect("apk");
        assert_eq!(
            apk.install(&names(&["curl", "git"]), &[]),
            "apk --no-cache add curl git"
        );
        assert_eq!(
            apk.remove(&names(&["curl"]), &[]),
            "apk --no-cache del --rdepends curl"
        );
    }

    #[test]
    fn install_places_flags_before_packages() {
        let apt = PackageManager::lookup("apt").expect("apt");
        assert_eq!(
            apt.install(&names(&["nginx"]), &names(&["--no-install-recommends"])),
            "apt -y install --no-install-recommends nginx"
        );
    }

    #[test]
    fn empty_package_list_yields_nothing() {
        let dnf = PackageManager::lookup("dnf").expect("dnf");
        assert_eq!(dnf.install(&[], &[]), "");
        assert_eq!(dnf.remove(&[], &[]), "");
    }

    #[test]
    fn unsupported_action_yields_nothing() {
        let apk = PackageManager::lookup("apk").expect("apk");
        assert_eq!(apk.clean(), "");
        let pacman = PackageManager::lookup("pacman").expect("pacman");
        assert_eq!(pacman.clean(), "pacman --noconfirm -Sc");
    }

    #[test]
    fn command_for_dispatches_by_action() {
        let zypper = PackageManager::lookup("zypper").expect("zypper");
        assert_eq!(
            zypper.command_for(PackageAction::Refresh, &[]),
            "zypper --non-interactive --gpg-auto-import-keys refresh"
        );
        assert_eq!(
            zypper.command_for(PackageAction::Update, &names(&["ignored"])),
            "zypper --non-interactive --gpg-auto-import-keys update"
        );
    }

    #[test]
    fn action_parsing_defaults_to_install() {
        assert_eq!("".parse::<PackageAction>(), Ok(PackageAction::Install));
        assert_eq!("Remove".parse::<PackageAction>(), Ok(PackageAction::Remove));
        assert_eq!(
            "purge".parse::<PackageAction>(),
            Err(BuildError::UnknownPackageAction {
                action: "purge".into()
            })
        );
    }
}
