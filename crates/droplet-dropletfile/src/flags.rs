//! Per-instruction flag parsing.
//!
//! Each instruction declares the string flags it accepts on a fresh
//! [`FlagSet`], then calls [`FlagSet::parse`] once. Parsing consumes the
//! set, so values can only be read from the resulting [`ParsedFlags`].

use crate::error::InstructionError;

/// Handle to a declared flag, used to read its value after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagHandle(usize);

#[derive(Debug, Clone)]
struct Declared {
    name: String,
    default: String,
}

/// Flags declared by one instruction, seeded with the node's raw flag tokens.
#[derive(Debug, Clone)]
pub struct FlagSet {
    instruction: String,
    raw: Vec<String>,
    declared: Vec<Declared>,
}

impl FlagSet {
    /// Creates a set for `instruction` over raw `--name=value` tokens.
    #[must_use]
    pub fn new(instruction: impl Into<String>, raw: Vec<String>) -> Self {
        Self {
            instruction: instruction.into(),
            raw,
            declared: Vec::new(),
        }
    }

    /// Declares a string flag with a default value.
    pub fn declare(&mut self, name: impl Into<String>, default: impl Into<String>) -> FlagHandle {
        self.declared.push(Declared {
            name: name.into(),
            default: default.into(),
        });
        FlagHandle(self.declared.len() - 1)
    }

    /// Matches every raw token against the declared flags.
    ///
    /// # Errors
    ///
    /// Returns an error for an undeclared flag, a flag without a value, or
    /// a flag given twice.
    pub fn parse(self) -> Result<ParsedFlags, InstructionError> {
        let mut values: Vec<Option<String>> = vec![None; self.declared.len()];

        for token in &self.raw {
            let body = token.trim_start_matches('-');
            let (name, value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };

            let Some(idx) = self.declared.iter().position(|d| d.name == name) else {
                return Err(InstructionError::UnknownFlag {
                    flag: name.to_owned(),
                    instruction: self.instruction.clone(),
                });
            };
            let Some(value) = value else {
                return Err(InstructionError::MissingFlagValue {
                    flag: name.to_owned(),
                    instruction: self.instruction.clone(),
                });
            };
            if values[idx].is_some() {
                return Err(InstructionError::DuplicateFlag {
                    flag: name.to_owned(),
                    instruction: self.instruction.clone(),
                });
            }
            values[idx] = Some(value.to_owned());
        }

        let values = self
            .declared
            .into_iter()
            .zip(values)
            .map(|(declared, value)| ParsedFlag {
                explicit: value.is_some(),
                value: value.unwrap_or(declared.default),
            })
            .collect();

        Ok(ParsedFlags { values })
    }
}

#[derive(Debug, Clone)]
struct ParsedFlag {
    value: String,
    explicit: bool,
}

/// Flag values after a successful [`FlagSet::parse`].
#[derive(Debug, Clone)]
pub struct ParsedFlags {
    values: Vec<ParsedFlag>,
}

impl ParsedFlags {
    /// Value of a flag, or its default when it was not given.
    #[must_use]
    pub fn value(&self, handle: FlagHandle) -> &str {
        self.values.get(handle.0).map_or("", |flag| flag.value.as_str())
    }

    /// Whether the flag was given explicitly.
    #[must_use]
    pub fn is_set(&self, handle: FlagHandle) -> bool {
        self.values.get(handle.0).is_some_and(|flag| flag.explicit)
    }

    /// Value of a flag when given with a non-empty value.
    #[must_use]
    pub fn non_empty(&self, handle: FlagHandle) -> Option<String> {
        Some(self.value(handle))
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }
}
