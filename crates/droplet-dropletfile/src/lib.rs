//! # droplet-dropletfile
//!
//! Parser for the Dropletfile build language.
//!
//! Handles:
//! - **Parser**: scanning text into statements and a generic syntax tree.
//! - **Flags**: per-instruction `--name=value` flag parsing.
//! - **Instructions**: typing syntax nodes into the closed instruction set.
//! - **Stage**: folding typed instructions into named stages.
//! - **Expand**: variable substitution over a parsed file.

pub mod error;
pub mod expand;
pub mod flags;
pub mod instructions;
pub mod keyword;
pub mod parser;
pub mod stage;

use std::io::Read;

pub use crate::error::{ParseError, Result};
pub use crate::instructions::{Instruction, InstructionParser};
pub use crate::stage::{Dropletfile, Stage};

/// Parses Dropletfile text with no `run` middleware.
///
/// # Errors
///
/// Returns the first lexical, typing, or assembly error.
pub fn parse(input: &str) -> Result<Dropletfile> {
    parse_with(input, &InstructionParser::new())
}

/// Parses Dropletfile text, typing statements with `typer`.
///
/// # Errors
///
/// Returns the first lexical, typing, or assembly error.
pub fn parse_with<X: Default>(
    input: &str,
    typer: &InstructionParser<X>,
) -> Result<Dropletfile<X>> {
    tracing::info!(bytes = input.len(), "parsing dropletfile");
    let tree = parser::parse_syntax(input)?;
    let file = stage::assemble(typer, &tree)?;
    tracing::info!(
        stages = file.stages.len(),
        meta_args = file.meta_args.len(),
        "parsed dropletfile"
    );
    Ok(file)
}

/// Reads a whole Dropletfile from `reader` and parses it.
///
/// # Errors
///
/// Returns an error if reading fails or the content does not parse.
pub fn parse_reader(mut reader: impl Read) -> Result<Dropletfile> {
    let mut content = String::new();
    let _ = reader.read_to_string(&mut content)?;
    parse(&content)
}
