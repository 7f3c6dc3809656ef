//! Variable substitution for the post-parse expansion pass.
//!
//! [`VariableExpander`] resolves `$NAME`, `${NAME}` and
//! `${NAME:-default}` against an ordered table. A backslash before `$`
//! yields a literal `$`. Unset variables expand to the empty string.

use crate::error::ExpandError;
use crate::instructions::ArgInstruction;

/// Ordered variable table used to expand single words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableExpander {
    vars: Vec<(String, String)>,
}

impl VariableExpander {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table from meta arguments that carry a value.
    #[must_use]
    pub fn from_meta_args(meta_args: &[ArgInstruction]) -> Self {
        let mut expander = Self::new();
        for pair in meta_args.iter().flat_map(|arg| &arg.args) {
            if let Some(value) = &pair.value {
                expander.set(pair.key.clone(), value.clone());
            }
        }
        expander
    }

    /// Sets a variable, replacing any previous value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.vars.push((name, value)),
        }
    }

    /// Builder-style [`VariableExpander::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Current value of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expands every variable reference in `word`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unclosed `${` or an invalid name in braces.
    pub fn expand_word(&self, word: &str) -> Result<String, ExpandError> {
        let mut out = String::with_capacity(word.len());
        let mut rest = word;

        while let Some(idx) = rest.find(['$', '\\']) {
            out.push_str(&rest[..idx]);
            let tail = &rest[idx..];

            if let Some(escaped) = tail.strip_prefix('\\') {
                let mut chars = escaped.chars();
                match chars.next() {
                    Some('$') => out.push('$'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
                rest = chars.as_str();
                continue;
            }

            let after = &tail[1..];
            if let Some(body) = after.strip_prefix('{') {
                let Some(end) = body.find('}') else {
                    return Err(ExpandError::Unterminated {
                        word: word.to_owned(),
                    });
                };
                out.push_str(&self.substitute(&body[..end], word)?);
                rest = &body[end + 1..];
            } else {
                let len = after
                    .find(|c: char| !is_name_char(c))
                    .unwrap_or(after.len());
                if len == 0 {
                    out.push('$');
                } else {
                    out.push_str(self.lookup(&after[..len]));
                }
                rest = &after[len..];
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    fn substitute(&self, body: &str, word: &str) -> Result<String, ExpandError> {
        let (name, default) = match body.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(ExpandError::BadSubstitution {
                word: word.to_owned(),
            });
        }

        let value = match default {
            Some(default) => self
                .get(name)
                .filter(|value| !value.is_empty())
                .unwrap_or(default),
            None => self.lookup(name),
        };
        Ok(value.to_owned())
    }

    fn lookup(&self, name: &str) -> &str {
        self.get(name).unwrap_or_else(|| {
            tracing::trace!(name, "unset variable expands to empty string");
            ""
        })
    }
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
