//! Generic syntax tree for Dropletfile statements.
//!
//! Nodes are untyped: the keyword is kept as written and arguments are
//! plain strings or nested arrays. Typing happens in [`crate::instructions`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute set on nodes whose arguments were written as an array literal.
pub const ATTR_JSON: &str = "json";

/// A position in source text: 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: usize,
    /// Byte column, starting at 0.
    pub column: usize,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source range covered by a statement. The end column is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// First character of the range.
    pub start: Position,
    /// One past the last character of the range.
    pub end: Position,
}

impl SourceRange {
    /// Creates a range from its two ends.
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Line where the range starts.
    #[must_use]
    pub const fn start_line(&self) -> usize {
        self.start.line
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A single positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgNode {
    /// A plain word or array string element.
    Scalar(String),
    /// A nested array literal element.
    Array(Vec<ArgNode>),
}

/// Flattens arguments depth-first into the plain list instructions consume.
///
/// A sub-array contributes its elements in order, so
/// `["sh", ["-c", "echo"]]` flattens to `sh -c echo`. The shorthand is one
/// level of sub-array; the scanner does not reject deeper nesting, which
/// flattens the same way.
#[must_use]
pub fn flatten(args: &[ArgNode]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    flatten_into(args, &mut out);
    out
}

fn flatten_into(args: &[ArgNode], out: &mut Vec<String>) {
    for arg in args {
        match arg {
            ArgNode::Scalar(value) => out.push(value.clone()),
            ArgNode::Array(children) => flatten_into(children, out),
        }
    }
}

/// One statement of a Dropletfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxNode {
    /// Keyword as written (case is folded during typing).
    pub value: String,
    /// Positional arguments in source order.
    pub args: Vec<ArgNode>,
    /// Boolean attributes such as [`ATTR_JSON`].
    pub attributes: BTreeMap<String, bool>,
    /// Raw `--name=value` flag tokens.
    pub flags: Vec<String>,
    /// Statement text with continuations joined, untrimmed.
    pub original: String,
    /// Comment lines immediately preceding the statement.
    pub prev_comment: Vec<String>,
    /// Where the statement sits in the source.
    pub range: SourceRange,
}

impl SyntaxNode {
    /// Returns the positional arguments flattened to strings.
    #[must_use]
    pub fn flattened_args(&self) -> Vec<String> {
        flatten(&self.args)
    }

    /// Returns whether the arguments were written as an array literal.
    #[must_use]
    pub fn is_array_form(&self) -> bool {
        self.attributes.get(ATTR_JSON).copied().unwrap_or(false)
    }

    /// Line where the statement starts.
    #[must_use]
    pub const fn start_line(&self) -> usize {
        self.range.start_line()
    }
}

/// Root of a scanned Dropletfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Statements in source order.
    pub children: Vec<SyntaxNode>,
}
