//! Typed Dropletfile instructions.
//!
//! [`Instruction`] is a closed sum over every instruction kind. Every
//! variant carries an [`InstructionBase`] (source text, keyword, range).
//! Instructions holding free text support variable expansion through
//! [`SingleWordExpansion`].

mod parse;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keyword::Keyword;
use crate::parser::ast::SourceRange;

pub use self::parse::{InstructionParser, ParseRequest, Parsed, RunMiddleware};

/// An ordered key/value entry (ordering is significant, so lists of these
/// are used instead of maps).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// Entry key.
    pub key: String,
    /// Entry value.
    pub value: String,
}

impl KeyValuePair {
    /// Creates an entry.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for KeyValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A key with an optional value and an optional description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePairOptional {
    /// Entry key.
    pub key: String,
    /// Entry value, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Description taken from a preceding `# key text` comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl KeyValuePairOptional {
    /// The value, or an empty string.
    #[must_use]
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Fields shared by every instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionBase {
    /// Trimmed source text of the statement.
    pub source_code: String,
    /// Lower-case keyword.
    pub name: String,
    /// Where the statement sits in the source.
    pub location: SourceRange,
}

/// A list of source paths followed by a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesAndDest {
    /// Every path but the last.
    pub sources: Vec<String>,
    /// The last path.
    pub dest: String,
}

impl SourcesAndDest {
    /// Splits `paths` into sources and a destination; `None` when empty.
    #[must_use]
    pub fn from_paths(mut paths: Vec<String>) -> Option<Self> {
        let dest = paths.pop()?;
        Some(Self {
            sources: paths,
            dest,
        })
    }

    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        expand_slice(&mut self.sources, expander)?;
        self.dest = expander(&self.dest)?;
        Ok(())
    }
}

/// A command line, optionally run through the configured shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellDependentCmdLine {
    /// Command words or argument vector.
    pub cmd_line: Vec<String>,
    /// `true` for shell form, `false` for array form.
    pub prepend_shell: bool,
}

/// `arg name[=value]...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Declared arguments in order.
    pub args: Vec<KeyValuePairOptional>,
}

/// `config path...` (paths stored sorted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Configuration paths, sorted.
    pub configs: Vec<String>,
}

/// `copy [--chown=..] [--chmod=..] src... dest`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Source paths and destination.
    #[serde(flatten)]
    pub paths: SourcesAndDest,
    /// Owner from `--chown`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chown: Option<String>,
    /// Mode from `--chmod`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chmod: Option<String>,
}

/// `cron minute hour day-of-month month day-of-week command...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Minute field.
    pub minute: String,
    /// Hour field.
    pub hour: String,
    /// Day-of-month field.
    pub day_of_month: String,
    /// Month field.
    pub month: String,
    /// Day-of-week field.
    pub day_of_week: String,
    /// Scheduled command.
    #[serde(flatten)]
    pub command: ShellDependentCmdLine,
}

impl CronInstruction {
    /// The five schedule fields joined as in a crontab line.
    #[must_use]
    pub fn schedule(&self) -> String {
        [
            self.minute.as_str(),
            self.hour.as_str(),
            self.day_of_month.as_str(),
            self.month.as_str(),
            self.day_of_week.as_str(),
        ]
        .join(" ")
    }
}

/// `delete path...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Paths to delete.
    #[serde(flatten)]
    pub paths: SourcesAndDest,
}

/// `env key value [key value...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Variables in declaration order.
    pub env: Vec<KeyValuePair>,
}

/// `expose port...` (ports stored sorted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposeInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Ports, sorted.
    pub ports: Vec<String>,
}

/// `label key value [key value...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Labels in declaration order.
    pub labels: Vec<KeyValuePair>,
    #[serde(skip)]
    no_expand: bool,
}

impl LabelInstruction {
    /// Turns variable expansion off for these labels.
    pub const fn suppress_expansion(&mut self) {
        self.no_expand = true;
    }

    /// Whether expansion was turned off.
    #[must_use]
    pub const fn expansion_suppressed(&self) -> bool {
        self.no_expand
    }
}

/// `package [--action=..] name...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Package manager action; empty means install.
    pub action: String,
    /// Package names.
    pub packages: Vec<String>,
}

/// `run command...`
///
/// `extension` is caller-defined out-of-band data filled in by
/// [`RunMiddleware`]; it is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = "X: Default"))]
pub struct RunInstruction<X = ()> {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// The command.
    #[serde(flatten)]
    pub command: ShellDependentCmdLine,
    /// Caller-defined extension data.
    #[serde(skip)]
    pub extension: X,
}

/// `user name`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// User name or id.
    pub user: String,
}

/// `workdir path`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkdirInstruction {
    /// Common fields.
    #[serde(flatten)]
    pub base: InstructionBase,
    /// Working directory.
    pub path: String,
}

/// One typed instruction. Serialized with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(bound(serialize = "", deserialize = "X: Default"))]
pub enum Instruction<X = ()> {
    /// `arg`
    Arg(ArgInstruction),
    /// `config`
    Config(ConfigInstruction),
    /// `copy`
    Copy(CopyInstruction),
    /// `cron`
    Cron(CronInstruction),
    /// `delete`
    Delete(DeleteInstruction),
    /// `env`
    Env(EnvInstruction),
    /// `expose`
    Expose(ExposeInstruction),
    /// `label`
    Label(LabelInstruction),
    /// `package`
    Package(PackageInstruction),
    /// `run`
    Run(RunInstruction<X>),
    /// `user`
    User(UserInstruction),
    /// `workdir`
    Workdir(WorkdirInstruction),
}

impl<X> Instruction<X> {
    /// Fields shared by every instruction.
    #[must_use]
    pub const fn base(&self) -> &InstructionBase {
        match self {
            Self::Arg(i) => &i.base,
            Self::Config(i) => &i.base,
            Self::Copy(i) => &i.base,
            Self::Cron(i) => &i.base,
            Self::Delete(i) => &i.base,
            Self::Env(i) => &i.base,
            Self::Expose(i) => &i.base,
            Self::Label(i) => &i.base,
            Self::Package(i) => &i.base,
            Self::Run(i) => &i.base,
            Self::User(i) => &i.base,
            Self::Workdir(i) => &i.base,
        }
    }

    /// Keyword of the instruction.
    #[must_use]
    pub fn keyword(&self) -> Keyword {
        match self {
            Self::Arg(_) => Keyword::Arg,
            Self::Config(_) => Keyword::Config,
            Self::Copy(_) => Keyword::Copy,
            Self::Cron(_) => Keyword::Cron,
            Self::Delete(_) => Keyword::Delete,
            Self::Env(_) => Keyword::Env,
            Self::Expose(_) => Keyword::Expose,
            Self::Label(_) => Keyword::Label,
            Self::Package(_) => Keyword::Package,
            Self::Run(_) => Keyword::Run,
            Self::User(_) => Keyword::User,
            Self::Workdir(_) => Keyword::Workdir,
        }
    }

    /// Lower-case keyword as recorded at parse time.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Trimmed source text.
    #[must_use]
    pub fn source_code(&self) -> &str {
        &self.base().source_code
    }

    /// Source range.
    #[must_use]
    pub const fn location(&self) -> SourceRange {
        self.base().location
    }

    /// Whether [`Instruction::expand`] rewrites anything for this variant.
    #[must_use]
    pub const fn supports_expansion(&self) -> bool {
        matches!(
            self,
            Self::Arg(_)
                | Self::Copy(_)
                | Self::Env(_)
                | Self::Label(_)
                | Self::Package(_)
                | Self::User(_)
                | Self::Workdir(_)
        )
    }

    /// Expands variables in every free-text field; a no-op for variants
    /// without free text.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `expander`.
    pub fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        match self {
            Self::Arg(i) => i.expand(expander),
            Self::Copy(i) => i.expand(expander),
            Self::Env(i) => i.expand(expander),
            Self::Label(i) => i.expand(expander),
            Self::Package(i) => i.expand(expander),
            Self::User(i) => i.expand(expander),
            Self::Workdir(i) => i.expand(expander),
            Self::Config(_)
            | Self::Cron(_)
            | Self::Delete(_)
            | Self::Expose(_)
            | Self::Run(_) => Ok(()),
        }
    }
}

impl<X> fmt::Display for Instruction<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_code())
    }
}

/// Implemented by instructions whose text can go through a one-word-in,
/// one-word-out substitution after parsing.
pub trait SingleWordExpansion {
    /// Rewrites every held string in place.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `expander`.
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>;
}

fn expand_slice<E, F>(values: &mut [String], expander: &mut F) -> Result<(), E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    for value in values {
        *value = expander(value)?;
    }
    Ok(())
}

fn expand_pairs<E, F>(pairs: &mut [KeyValuePair], expander: &mut F) -> Result<(), E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    for pair in pairs {
        pair.key = expander(&pair.key)?;
        pair.value = expander(&pair.value)?;
    }
    Ok(())
}

impl SingleWordExpansion for ArgInstruction {
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        for arg in &mut self.args {
            arg.key = expander(&arg.key)?;
            if let Some(value) = arg.value.as_mut() {
                *value = expander(value)?;
            }
        }
        Ok(())
    }
}

impl SingleWordExpansion for CopyInstruction {
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        if let Some(chown) = self.chown.as_mut() {
            *chown = expander(chown)?;
        }
        self.paths.expand(expander)
    }
}

impl SingleWordExpansion for EnvInstruction {
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        expand_pairs(&mut self.env, expander)
    }
}

impl SingleWordExpansion for LabelInstruction {
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        if self.no_expand {
            return Ok(());
        }
        expand_pairs(&mut self.labels, expander)
    }
}

impl SingleWordExpansion for PackageInstruction {
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        self.action = expander(&self.action)?;
        expand_slice(&mut self.packages, expander)
    }
}

impl SingleWordExpansion for UserInstruction {
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        self.user = expander(&self.user)?;
        Ok(())
    }
}

impl SingleWordExpansion for WorkdirInstruction {
    fn expand<E, F>(&mut self, expander: &mut F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        self.path = expander(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(word: &str) -> Result<String, std::convert::Infallible> {
        Ok(word.to_uppercase())
    }

    #[test]
    fn sources_and_dest_splits_last_path() {
        let paths = SourcesAndDest::from_paths(vec!["a".into(), "b".into(), "c".into()])
            .expect("non-empty");
        assert_eq!(paths.sources, vec!["a", "b"]);
        assert_eq!(paths.dest, "c");
        assert!(SourcesAndDest::from_paths(Vec::new()).is_none());
    }

    #[test]
    fn env_expansion_rewrites_keys_and_values_in_order() {
        let mut env = EnvInstruction {
            env: vec![KeyValuePair::new("a", "x"), KeyValuePair::new("b", "y")],
            ..EnvInstruction::default()
        };
        env.expand(&mut upper).expect("infallible");
        assert_eq!(
            env.env,
            vec![KeyValuePair::new("A", "X"), KeyValuePair::new("B", "Y")]
        );
    }

    #[test]
    fn arg_expansion_leaves_missing_values_missing() {
        let mut arg = ArgInstruction {
            args: vec![KeyValuePairOptional {
                key: "name".into(),
                value: None,
                comment: Some("keep me".into()),
            }],
            ..ArgInstruction::default()
        };
        arg.expand(&mut upper).expect("infallible");
        assert_eq!(arg.args[0].key, "NAME");
        assert_eq!(arg.args[0].value, None);
        assert_eq!(arg.args[0].comment.as_deref(), Some("keep me"));
    }

    #[test]
    fn suppressed_label_is_not_expanded() {
        let mut label = LabelInstruction {
            labels: vec![KeyValuePair::new("k", "v")],
            ..LabelInstruction::default()
        };
        label.suppress_expansion();
        label.expand(&mut upper).expect("infallible");
        assert_eq!(label.labels, vec![KeyValuePair::new("k", "v")]);
        assert!(label.expansion_suppressed());
    }

    #[test]
    fn run_is_untouched_by_expansion() {
        let run = RunInstruction::<()> {
            command: ShellDependentCmdLine {
                cmd_line: vec!["echo".into(), "$HOME".into()],
                prepend_shell: true,
            },
            ..RunInstruction::default()
        };
        let mut instruction = Instruction::Run(run.clone());
        assert!(!instruction.supports_expansion());
        instruction.expand(&mut upper).expect("infallible");
        assert_eq!(instruction, Instruction::Run(run));
    }

    #[test]
    fn expander_error_propagates() {
        let mut user = Instruction::<()>::User(UserInstruction {
            user: "$NOPE".into(),
            ..UserInstruction::default()
        });
        let result = user.expand(&mut |_: &str| Err::<String, _>("unresolvable"));
        assert_eq!(result, Err("unresolvable"));
    }

    #[test]
    fn cron_schedule_joins_fields() {
        let cron = CronInstruction {
            minute: "0".into(),
            hour: "*/2".into(),
            day_of_month: "*".into(),
            month: "*".into(),
            day_of_week: "1-5".into(),
            ..CronInstruction::default()
        };
        assert_eq!(cron.schedule(), "0 */2 * * 1-5");
    }
}
