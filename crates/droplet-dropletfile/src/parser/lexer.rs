//! Line-oriented scanner for Dropletfile source text.
//!
//! Joins `\`-continued lines, buffers `#` comments for the next statement,
//! and splits each logical statement into a keyword, leading `--flag`
//! tokens, and either shell-form words or an array literal (parsed with
//! `nom`).

use nom::{
    IResult, Parser,
    branch::alt,
    character::complete::{char, multispace0},
    combinator::map,
    multi::separated_list0,
    sequence::{delimited, pair},
};

use crate::error::SyntaxError;
use crate::parser::ast::{ArgNode, Position, SourceRange};

/// Positional arguments of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementArgs {
    /// Whitespace-separated words.
    Shell(Vec<String>),
    /// A single bracketed array literal.
    Array(Vec<ArgNode>),
}

/// A logical statement after continuation joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// First word of the statement, as written.
    pub keyword: String,
    /// Leading flags normalized to `--name=value` (or `--name` when no value followed).
    pub flags: Vec<String>,
    /// Positional arguments.
    pub args: StatementArgs,
    /// Joined statement text.
    pub original: String,
    /// Comments buffered before the statement.
    pub comments: Vec<String>,
    /// Where the statement sits in the source.
    pub range: SourceRange,
}

struct OpenStatement {
    text: String,
    start: Position,
    comments: Vec<String>,
}

/// Scans source text into logical statements.
///
/// # Errors
///
/// Returns an error on an unterminated continuation, an unterminated
/// quote, or a malformed array literal.
pub fn scan(input: &str) -> Result<Vec<Statement>, SyntaxError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut statements = Vec::new();
    let mut comments: Vec<String> = Vec::new();
    let mut open: Option<OpenStatement> = None;
    let mut last_line = 0;

    for (idx, raw) in input.lines().enumerate() {
        let line = idx + 1;
        last_line = line;
        let trimmed = raw.trim();

        if open.is_none() {
            if trimmed.is_empty() {
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('#') {
                let comment = comment.trim();
                if comment.is_empty() {
                    comments.clear();
                } else {
                    comments.push(comment.to_owned());
                }
                continue;
            }
        } else if trimmed.is_empty() || trimmed.starts_with('#') {
            // blank and comment lines inside a continuation are dropped
            continue;
        }

        let (content, continues) = trim_continuation(raw);
        let statement = open.get_or_insert_with(|| OpenStatement {
            text: String::new(),
            start: Position::new(line, raw.len() - raw.trim_start().len()),
            comments: std::mem::take(&mut comments),
        });
        statement.text.push_str(content);
        if continues {
            continue;
        }

        if let Some(done) = open.take() {
            let end = Position::new(line, raw.trim_end().len());
            let range = SourceRange::new(done.start, end);
            statements.push(split_statement(done.text, done.comments, range)?);
        }
    }

    if let Some(unfinished) = open {
        return Err(SyntaxError::UnterminatedContinuation {
            range: SourceRange::new(unfinished.start, Position::new(last_line, 0)),
        });
    }

    Ok(statements)
}

/// Strips a trailing `\` (and the whitespace after it).
fn trim_continuation(raw: &str) -> (&str, bool) {
    raw.trim_end()
        .strip_suffix('\\')
        .map_or((raw, false), |content| (content, true))
}

fn split_statement(
    text: String,
    comments: Vec<String>,
    range: SourceRange,
) -> Result<Statement, SyntaxError> {
    let body = text.trim();
    let (keyword, rest) = body
        .split_once(char::is_whitespace)
        .map_or((body, ""), |(keyword, rest)| (keyword, rest.trim_start()));

    let (flags, rest) = extract_flags(rest, range)?;
    let rest = rest.trim();
    let args = if rest.starts_with('[') {
        StatementArgs::Array(parse_array(rest, range)?)
    } else {
        StatementArgs::Shell(split_words(rest, range)?)
    };

    Ok(Statement {
        keyword: keyword.to_owned(),
        flags,
        args,
        original: text.clone(),
        comments,
        range,
    })
}

/// Peels leading `--name=value` / `--name value` tokens off `input`.
fn extract_flags(input: &str, range: SourceRange) -> Result<(Vec<String>, &str), SyntaxError> {
    let mut flags = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        if !rest.starts_with("--") {
            break;
        }
        let Some((word, after)) = next_word(rest, range)? else {
            break;
        };
        if word == "--" {
            rest = after;
            break;
        }
        if word.contains('=') {
            flags.push(word);
            rest = after;
            continue;
        }
        if after.trim_start().starts_with('[') {
            flags.push(word);
            rest = after;
            continue;
        }
        match next_word(after, range)? {
            Some((value, after_value)) => {
                flags.push(format!("{word}={value}"));
                rest = after_value;
            }
            None => {
                flags.push(word);
                rest = after;
            }
        }
    }

    Ok((flags, rest))
}

/// Splits shell-form text into words, keeping quotes and escapes verbatim.
fn split_words(input: &str, range: SourceRange) -> Result<Vec<String>, SyntaxError> {
    let mut words = Vec::new();
    let mut rest = input;
    while let Some((word, after)) = next_word(rest, range)? {
        words.push(word);
        rest = after;
    }
    Ok(words)
}

/// Reads one whitespace-delimited word. Quoted sections may contain
/// whitespace; a backslash outside single quotes escapes the next character.
fn next_word(input: &str, range: SourceRange) -> Result<Option<(String, &str)>, SyntaxError> {
    let input = input.trim_start();
    if input.is_empty() {
        return Ok(None);
    }

    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.char_indices();

    while let Some((idx, c)) = chars.next() {
        match (quote, c) {
            (None, c) if c.is_whitespace() => return Ok(Some((word, &input[idx..]))),
            (None, '\'' | '"') => {
                quote = Some(c);
                word.push(c);
            }
            (Some(q), c) if c == q => {
                quote = None;
                word.push(c);
            }
            (Some('\''), c) => word.push(c),
            (_, '\\') => {
                word.push(c);
                if let Some((_, escaped)) = chars.next() {
                    word.push(escaped);
                }
            }
            (_, c) => word.push(c),
        }
    }

    if let Some(quote) = quote {
        return Err(SyntaxError::UnterminatedQuote { range, quote });
    }
    Ok(Some((word, "")))
}

fn parse_array(input: &str, range: SourceRange) -> Result<Vec<ArgNode>, SyntaxError> {
    match array_literal(input) {
        Ok((remaining, items)) if remaining.trim().is_empty() => Ok(items),
        Ok((remaining, _)) => Err(SyntaxError::MalformedArray {
            range,
            detail: format!(
                "unexpected text after closing bracket: {:?}",
                remaining.trim().chars().take(20).collect::<String>()
            ),
        }),
        Err(_) => Err(SyntaxError::MalformedArray {
            range,
            detail: "expected a bracketed, comma-separated list of double-quoted strings".into(),
        }),
    }
}

/// `[ element (, element)* ]` where an element is a string or a nested array.
fn array_literal(input: &str) -> IResult<&str, Vec<ArgNode>> {
    delimited(
        pair(char('['), multispace0),
        separated_list0(delimited(multispace0, char(','), multispace0), array_element),
        pair(multispace0, char(']')),
    )
    .parse(input)
}

fn array_element(input: &str) -> IResult<&str, ArgNode> {
    alt((
        map(quoted_string, ArgNode::Scalar),
        map(array_literal, ArgNode::Array),
    ))
    .parse(input)
}

/// Parses a double-quoted string with JSON-style escapes.
fn quoted_string(input: &str) -> IResult<&str, String> {
    let Some(body) = input.strip_prefix('"') else {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    };

    let mut result = String::new();
    let mut chars = body.char_indices();
    loop {
        match chars.next() {
            Some((idx, '"')) => return Ok((&body[idx + 1..], result)),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, 'r')) => result.push('\r'),
                Some((_, c @ ('\\' | '"' | '/'))) => result.push(c),
                Some((_, c)) => {
                    result.push('\\');
                    result.push(c);
                }
                None => return Err(unterminated(body)),
            },
            Some((_, c)) => result.push(c),
            None => return Err(unterminated(body)),
        }
    }
}

fn unterminated(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char))
}
