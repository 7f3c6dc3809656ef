//! Error types for Dropletfile parsing.
//!
//! [`SyntaxError`] covers lexical problems found while scanning,
//! [`InstructionError`] covers problems found while typing a single
//! statement, and [`ParseError`] is what callers receive. Lexical and
//! typing failures carry the source range of the offending statement.

use thiserror::Error;

use crate::parser::ast::SourceRange;

/// A lexical error found while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// The last line ends with a continuation marker.
    #[error("line {}: unterminated line continuation at end of input", .range.start.line)]
    UnterminatedContinuation {
        /// Statement left open.
        range: SourceRange,
    },

    /// A quoted section was never closed.
    #[error("line {}: unterminated {quote} quote", .range.start.line)]
    UnterminatedQuote {
        /// Offending statement.
        range: SourceRange,
        /// The opening quote character.
        quote: char,
    },

    /// An argument list starting with `[` is not a valid array literal.
    #[error("line {}: malformed array literal: {detail}", .range.start.line)]
    MalformedArray {
        /// Offending statement.
        range: SourceRange,
        /// What went wrong.
        detail: String,
    },
}

impl SyntaxError {
    /// Source range of the offending statement.
    #[must_use]
    pub const fn range(&self) -> SourceRange {
        match self {
            Self::UnterminatedContinuation { range }
            | Self::UnterminatedQuote { range, .. }
            | Self::MalformedArray { range, .. } => *range,
        }
    }
}

/// An error found while typing one statement.
///
/// `instruction` fields hold the lower-case keyword; messages print it
/// upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    /// The keyword is not a known instruction.
    #[error("unknown instruction: {}", .instruction.to_uppercase())]
    UnknownInstruction {
        /// Keyword as written.
        instruction: String,
        /// Line of the statement.
        line: usize,
    },

    /// No positional argument was given.
    #[error("{} requires at least one argument", .instruction.to_uppercase())]
    AtLeastOneArgument {
        /// Instruction keyword.
        instruction: &'static str,
    },

    /// Zero or several positional arguments were given.
    #[error("{} requires exactly one argument", .instruction.to_uppercase())]
    ExactlyOneArgument {
        /// Instruction keyword.
        instruction: &'static str,
    },

    /// Fewer than two paths were given.
    #[error(
        "{} requires at least two arguments, but only one was provided. Destination could not be determined",
        .instruction.to_uppercase()
    )]
    NoDestination {
        /// Instruction keyword.
        instruction: &'static str,
    },

    /// The cron schedule is incomplete.
    #[error(
        "{} requires at least five arguments (minute hour day-of-month month day-of-week)",
        .instruction.to_uppercase()
    )]
    IncompleteSchedule {
        /// Instruction keyword.
        instruction: &'static str,
    },

    /// A key in a key/value list is empty.
    #[error("{} names can not be blank", .instruction.to_uppercase())]
    BlankName {
        /// Instruction keyword.
        instruction: &'static str,
    },

    /// A key/value list has a key with no value.
    #[error("{} requires an even number of arguments, got {count}", .instruction.to_uppercase())]
    OddKeyValueCount {
        /// Instruction keyword.
        instruction: &'static str,
        /// Number of positional arguments.
        count: usize,
    },

    /// The stage name does not match `^[a-z][a-z0-9-_.]*$`.
    #[error(
        "invalid name for build stage: {name:?}, name can't start with a number or contain symbols"
    )]
    InvalidStageName {
        /// Name as written.
        name: String,
    },

    /// A flag was not declared by the instruction.
    #[error("unknown flag: {flag} for {}", .instruction.to_uppercase())]
    UnknownFlag {
        /// Flag name without leading dashes.
        flag: String,
        /// Instruction keyword.
        instruction: String,
    },

    /// A flag was given without a value.
    #[error("missing a value on flag: {flag} for {}", .instruction.to_uppercase())]
    MissingFlagValue {
        /// Flag name without leading dashes.
        flag: String,
        /// Instruction keyword.
        instruction: String,
    },

    /// A flag was given more than once.
    #[error("duplicate flag specified: {flag} for {}", .instruction.to_uppercase())]
    DuplicateFlag {
        /// Flag name without leading dashes.
        flag: String,
        /// Instruction keyword.
        instruction: String,
    },

    /// An instruction appeared before the first `stage`.
    #[error("no build stage in current context")]
    NoBuildStage,

    /// A `run` middleware refused the instruction.
    #[error("{reason}")]
    Rejected {
        /// Explanation supplied by the middleware.
        reason: String,
    },
}

/// Error returned by the parse entry points.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input could not be scanned.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A statement could not be typed or placed in a stage.
    #[error("dropletfile parse error line {}: {source}", .range.start.line)]
    Instruction {
        /// Range of the offending statement.
        range: SourceRange,
        /// Underlying cause.
        #[source]
        source: InstructionError,
    },

    /// A stage was requested by a name no stage carries.
    #[error("no build stage {name} in current Dropletfile")]
    StageNotFound {
        /// Name as requested.
        name: String,
    },

    /// The input could not be read.
    #[error("failed to read dropletfile: {0}")]
    Read(#[from] std::io::Error),
}

impl ParseError {
    /// Attaches a statement range to an instruction error.
    #[must_use]
    pub const fn at(range: SourceRange, source: InstructionError) -> Self {
        Self::Instruction { range, source }
    }

    /// Source range of the offending statement, when known.
    #[must_use]
    pub const fn range(&self) -> Option<SourceRange> {
        match self {
            Self::Syntax(err) => Some(err.range()),
            Self::Instruction { range, .. } => Some(*range),
            Self::StageNotFound { .. } | Self::Read(_) => None,
        }
    }

    /// Returns the instruction-level cause, if any.
    #[must_use]
    pub const fn instruction_error(&self) -> Option<&InstructionError> {
        match self {
            Self::Instruction { source, .. } => Some(source),
            Self::Syntax(_) | Self::StageNotFound { .. } | Self::Read(_) => None,
        }
    }
}

/// An error raised by a variable expander.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// `${` was never closed.
    #[error("missing '}}' in variable reference: {word:?}")]
    Unterminated {
        /// Word being expanded.
        word: String,
    },

    /// `${}` or an invalid name inside braces.
    #[error("bad substitution: {word:?}")]
    BadSubstitution {
        /// Word being expanded.
        word: String,
    },
}

/// Convenience alias for parse results.
pub type Result<T> = std::result::Result<T, ParseError>;
