//! Dropletfile syntax parser.
//!
//! Turns raw text into a [`SyntaxTree`] of untyped statements through
//! the [`lexer`] and the node builder below.

pub mod ast;
pub mod lexer;

use std::collections::BTreeMap;
use std::io::Read;

use crate::error::{ParseError, SyntaxError};

use self::ast::{ATTR_JSON, ArgNode, SyntaxNode, SyntaxTree};
use self::lexer::{Statement, StatementArgs};

/// Scans source text into a syntax tree.
///
/// # Errors
///
/// Returns the first lexical error found; no partial tree is produced.
pub fn parse_syntax(input: &str) -> Result<SyntaxTree, SyntaxError> {
    let statements = lexer::scan(input)?;
    let children: Vec<SyntaxNode> = statements.into_iter().map(build_node).collect();
    tracing::debug!(statements = children.len(), "scanned dropletfile");
    Ok(SyntaxTree { children })
}

/// Reads a whole Dropletfile from `reader` and scans it.
///
/// # Errors
///
/// Returns an error if reading fails or the content does not scan.
pub fn parse_syntax_reader(mut reader: impl Read) -> Result<SyntaxTree, ParseError> {
    let mut content = String::new();
    let _ = reader.read_to_string(&mut content)?;
    Ok(parse_syntax(&content)?)
}

/// Builds the generic node for one statement.
#[must_use]
pub fn build_node(statement: Statement) -> SyntaxNode {
    let (args, array_form) = match statement.args {
        StatementArgs::Shell(words) => (words.into_iter().map(ArgNode::Scalar).collect(), false),
        StatementArgs::Array(items) => (items, true),
    };

    let mut attributes = BTreeMap::new();
    let _ = attributes.insert(ATTR_JSON.to_owned(), array_form);

    SyntaxNode {
        value: statement.keyword,
        args,
        attributes,
        flags: statement.flags,
        original: statement.original,
        prev_comment: statement.comments,
        range: statement.range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_syntax_builds_one_node_per_statement() {
        let tree = parse_syntax("stage build\nrun make\n").expect("should parse");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].value, "stage");
        assert_eq!(tree.children[1].flattened_args(), vec!["make"]);
    }

    #[test]
    fn shell_form_is_not_array_form() {
        let tree = parse_syntax("run echo hi").expect("should parse");
        assert!(!tree.children[0].is_array_form());
        assert_eq!(tree.children[0].attributes.get(ATTR_JSON), Some(&false));
    }

    #[test]
    fn array_form_sets_json_attribute() {
        let tree = parse_syntax(r#"run ["echo", "hi"]"#).expect("should parse");
        let node = &tree.children[0];
        assert!(node.is_array_form());
        assert_eq!(node.flattened_args(), vec!["echo", "hi"]);
    }

    #[test]
    fn node_keeps_flags_comments_and_original() {
        let tree = parse_syntax("# dest owner\ncopy --chown=me a b  ").expect("should parse");
        let node = &tree.children[0];
        assert_eq!(node.flags, vec!["--chown=me"]);
        assert_eq!(node.prev_comment, vec!["dest owner"]);
        assert_eq!(node.original, "copy --chown=me a b  ");
        assert_eq!(node.start_line(), 2);
    }

    #[test]
    fn reader_entry_point_matches_str_entry_point() {
        let input = "stage build\nenv A 1\n";
        let from_reader = parse_syntax_reader(input.as_bytes()).expect("should parse");
        let from_str = parse_syntax(input).expect("should parse");
        assert_eq!(from_reader, from_str);
    }

    #[test]
    fn lexical_error_aborts_whole_tree() {
        let err = parse_syntax("stage ok\nrun [\"a\"\nuser root").unwrap_err();
        assert_eq!(err.range().start.line, 2);
    }
}
