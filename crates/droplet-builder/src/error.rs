//! Error types for script generation.

use thiserror::Error;

/// An error raised while generating a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The configured generator is not known.
    #[error("unknown generator: {name}")]
    UnknownGenerator {
        /// Name from the configuration.
        name: String,
    },

    /// The configured package manager is not known.
    #[error("unknown package manager: {name}")]
    UnknownPackageManager {
        /// Name from the configuration.
        name: String,
    },

    /// A `package` instruction named an action no manager supports.
    #[error("unknown package action: {action}")]
    UnknownPackageAction {
        /// Action as written.
        action: String,
    },
}

/// Convenience alias for build results.
pub type Result<T> = std::result::Result<T, BuildError>;
