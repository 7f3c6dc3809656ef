//! Typing of syntax nodes into instructions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{InstructionError, ParseError};
use crate::flags::{FlagSet, ParsedFlags};
use crate::keyword::Keyword;
use crate::parser::ast::{SourceRange, SyntaxNode};
use crate::stage::Stage;

use super::{
    ArgInstruction, ConfigInstruction, CopyInstruction, CronInstruction, DeleteInstruction,
    EnvInstruction, ExposeInstruction, Instruction, InstructionBase, KeyValuePair,
    KeyValuePairOptional, LabelInstruction, PackageInstruction, RunInstruction,
    ShellDependentCmdLine, SourcesAndDest, UserInstruction, WorkdirInstruction,
};

#[allow(clippy::expect_used)]
static STAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_.-]*$").expect("stage name pattern compiles"));

/// Per-statement view handed to the typing functions and to middleware.
#[derive(Debug, Clone)]
pub struct ParseRequest<'a> {
    /// Lower-case keyword.
    pub command: String,
    /// Flattened positional arguments.
    pub args: Vec<String>,
    /// Node attributes.
    pub attributes: &'a BTreeMap<String, bool>,
    /// Untrimmed statement text.
    pub original: &'a str,
    /// Source range of the statement.
    pub location: SourceRange,
    /// Comments preceding the statement.
    pub comments: &'a [String],
    raw_flags: &'a [String],
}

impl<'a> ParseRequest<'a> {
    /// Derives a request from a node.
    #[must_use]
    pub fn from_node(node: &'a SyntaxNode) -> Self {
        Self {
            command: node.value.to_lowercase(),
            args: node.flattened_args(),
            attributes: &node.attributes,
            original: &node.original,
            location: node.range,
            comments: &node.prev_comment,
            raw_flags: &node.flags,
        }
    }

    /// A fresh flag parser seeded with the node's raw flags.
    #[must_use]
    pub fn flags(&self) -> FlagSet {
        FlagSet::new(self.command.clone(), self.raw_flags.to_vec())
    }

    /// Whether the arguments were written as an array literal.
    #[must_use]
    pub fn is_array_form(&self) -> bool {
        self.attributes
            .get(crate::parser::ast::ATTR_JSON)
            .copied()
            .unwrap_or(false)
    }

    fn base(&self) -> InstructionBase {
        InstructionBase {
            source_code: self.original.trim().to_owned(),
            name: self.command.clone(),
            location: self.location,
        }
    }

    fn shell_dependent(&self, cmd_line: Vec<String>) -> ShellDependentCmdLine {
        ShellDependentCmdLine {
            cmd_line,
            prepend_shell: !self.is_array_form(),
        }
    }
}

/// Result of typing one node: either an instruction or the start of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<X = ()> {
    /// A `stage` statement.
    Stage(Stage<X>),
    /// Any other statement.
    Instruction(Instruction<X>),
}

/// Caller-supplied behavior attached to `run` typing.
///
/// `before` runs on a default instruction before flags are parsed and may
/// declare extra flags; `after` runs once the command line and common
/// fields are set.
pub trait RunMiddleware<X>: Send + Sync {
    /// Called before flag parsing.
    ///
    /// # Errors
    ///
    /// Returning an error aborts typing of the statement.
    fn before(
        &self,
        _run: &mut RunInstruction<X>,
        _request: &ParseRequest<'_>,
        _flags: &mut FlagSet,
    ) -> Result<(), InstructionError> {
        Ok(())
    }

    /// Called after the instruction is fully typed.
    ///
    /// # Errors
    ///
    /// Returning an error aborts typing of the statement.
    fn after(
        &self,
        _run: &mut RunInstruction<X>,
        _request: &ParseRequest<'_>,
        _flags: &ParsedFlags,
    ) -> Result<(), InstructionError> {
        Ok(())
    }
}

/// Types syntax nodes into instructions.
pub struct InstructionParser<X = ()> {
    run_middleware: Vec<Box<dyn RunMiddleware<X>>>,
}

impl<X> Default for InstructionParser<X> {
    fn default() -> Self {
        Self {
            run_middleware: Vec::new(),
        }
    }
}

impl<X> fmt::Debug for InstructionParser<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstructionParser")
            .field("run_middleware", &self.run_middleware.len())
            .finish()
    }
}

impl<X: Default> InstructionParser<X> {
    /// Creates a parser with no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `run` middleware; middleware runs in insertion order.
    #[must_use]
    pub fn with_run_middleware(mut self, middleware: impl RunMiddleware<X> + 'static) -> Self {
        self.run_middleware.push(Box::new(middleware));
        self
    }

    /// Types one node, attaching the node's range to any error.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword is unknown or the statement is invalid.
    pub fn parse_node(&self, node: &SyntaxNode) -> Result<Parsed<X>, ParseError> {
        self.type_node(node)
            .map_err(|source| ParseError::at(node.range, source))
    }

    /// Types one node.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword is unknown or the statement is invalid.
    pub fn type_node(&self, node: &SyntaxNode) -> Result<Parsed<X>, InstructionError> {
        let Some(keyword) = Keyword::lookup(&node.value) else {
            return Err(InstructionError::UnknownInstruction {
                instruction: node.value.clone(),
                line: node.start_line(),
            });
        };
        tracing::debug!(instruction = %keyword, line = node.start_line(), "typing instruction");

        let req = ParseRequest::from_node(node);
        let instruction = match keyword {
            Keyword::Arg => Instruction::Arg(parse_arg(&req)?),
            Keyword::Config => Instruction::Config(parse_config(&req)?),
            Keyword::Copy => Instruction::Copy(parse_copy(&req)?),
            Keyword::Cron => Instruction::Cron(parse_cron(&req)?),
            Keyword::Delete => Instruction::Delete(parse_delete(&req)?),
            Keyword::Env => Instruction::Env(parse_env(&req)?),
            Keyword::Expose => Instruction::Expose(parse_expose(&req)?),
            Keyword::Label => Instruction::Label(parse_label(&req)?),
            Keyword::Package => Instruction::Package(parse_package(&req)?),
            Keyword::Run => Instruction::Run(self.parse_run(&req)?),
            Keyword::Stage => return parse_stage(&req).map(Parsed::Stage),
            Keyword::User => Instruction::User(parse_user(&req)?),
            Keyword::Workdir => Instruction::Workdir(parse_workdir(&req)?),
        };
        Ok(Parsed::Instruction(instruction))
    }

    fn parse_run(&self, req: &ParseRequest<'_>) -> Result<RunInstruction<X>, InstructionError> {
        if req.args.is_empty() {
            return Err(at_least_one(Keyword::Run));
        }

        let mut run = RunInstruction::default();
        let mut flags = req.flags();
        for middleware in &self.run_middleware {
            middleware.before(&mut run, req, &mut flags)?;
        }
        let parsed = flags.parse()?;

        run.command = req.shell_dependent(req.args.clone());
        run.base = req.base();

        for middleware in &self.run_middleware {
            middleware.after(&mut run, req, &parsed)?;
        }
        Ok(run)
    }
}

const fn at_least_one(keyword: Keyword) -> InstructionError {
    InstructionError::AtLeastOneArgument {
        instruction: keyword.as_str(),
    }
}

const fn exactly_one(keyword: Keyword) -> InstructionError {
    InstructionError::ExactlyOneArgument {
        instruction: keyword.as_str(),
    }
}

/// Rejects any flag on instructions that declare none.
fn no_flags(req: &ParseRequest<'_>) -> Result<(), InstructionError> {
    req.flags().parse().map(|_| ())
}

/// Finds a `name <text>` comment line and returns `<text>`.
fn comment_for(comments: &[String], name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let prefix = format!("{name} ");
    comments
        .iter()
        .find_map(|line| line.strip_prefix(&prefix))
        .map(str::to_owned)
}

/// Reads key/value entries either pairwise (`k v k v`) or, when every
/// token contains `=`, one `k=v` per token.
fn parse_key_values(
    args: &[String],
    keyword: Keyword,
) -> Result<Vec<KeyValuePair>, InstructionError> {
    let instruction = keyword.as_str();
    if args.is_empty() {
        return Err(at_least_one(keyword));
    }

    let pairs: Vec<(&str, &str)> = if args.iter().all(|arg| arg.contains('=')) {
        args.iter()
            .filter_map(|arg| arg.split_once('='))
            .collect()
    } else {
        if args.len() % 2 != 0 {
            return Err(InstructionError::OddKeyValueCount {
                instruction,
                count: args.len(),
            });
        }
        args.chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect()
    };

    pairs
        .into_iter()
        .map(|(key, value)| {
            if key.is_empty() {
                Err(InstructionError::BlankName { instruction })
            } else {
                Ok(KeyValuePair::new(key, value))
            }
        })
        .collect()
}

fn parse_arg(req: &ParseRequest<'_>) -> Result<ArgInstruction, InstructionError> {
    if req.args.is_empty() {
        return Err(at_least_one(Keyword::Arg));
    }
    no_flags(req)?;

    // unlike env, an arg may be declared without a value
    let args = req
        .args
        .iter()
        .map(|arg| {
            let (key, value) = match arg.split_once('=') {
                Some((key, value)) => (key, Some(value.to_owned())),
                None => (arg.as_str(), None),
            };
            if key.is_empty() {
                return Err(InstructionError::BlankName {
                    instruction: Keyword::Arg.as_str(),
                });
            }
            Ok(KeyValuePairOptional {
                key: key.to_owned(),
                value,
                comment: comment_for(req.comments, key),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ArgInstruction {
        base: req.base(),
        args,
    })
}

fn sorted_args(req: &ParseRequest<'_>, keyword: Keyword) -> Result<Vec<String>, InstructionError> {
    if req.args.is_empty() {
        return Err(at_least_one(keyword));
    }
    no_flags(req)?;
    let mut values = req.args.clone();
    values.sort();
    Ok(values)
}

fn parse_config(req: &ParseRequest<'_>) -> Result<ConfigInstruction, InstructionError> {
    Ok(ConfigInstruction {
        configs: sorted_args(req, Keyword::Config)?,
        base: req.base(),
    })
}

fn parse_copy(req: &ParseRequest<'_>) -> Result<CopyInstruction, InstructionError> {
    let no_destination = || InstructionError::NoDestination {
        instruction: Keyword::Copy.as_str(),
    };
    if req.args.len() < 2 {
        return Err(no_destination());
    }

    let mut flags = req.flags();
    let chown = flags.declare("chown", "");
    let chmod = flags.declare("chmod", "");
    let parsed = flags.parse()?;

    Ok(CopyInstruction {
        base: req.base(),
        paths: SourcesAndDest::from_paths(req.args.clone()).ok_or_else(no_destination)?,
        chown: parsed.non_empty(chown),
        chmod: parsed.non_empty(chmod),
    })
}

fn parse_cron(req: &ParseRequest<'_>) -> Result<CronInstruction, InstructionError> {
    let [minute, hour, day_of_month, month, day_of_week, command @ ..] = req.args.as_slice()
    else {
        return Err(InstructionError::IncompleteSchedule {
            instruction: Keyword::Cron.as_str(),
        });
    };
    no_flags(req)?;

    Ok(CronInstruction {
        base: req.base(),
        minute: minute.clone(),
        hour: hour.clone(),
        day_of_month: day_of_month.clone(),
        month: month.clone(),
        day_of_week: day_of_week.clone(),
        command: req.shell_dependent(command.to_vec()),
    })
}

fn parse_delete(req: &ParseRequest<'_>) -> Result<DeleteInstruction, InstructionError> {
    no_flags(req)?;
    let paths =
        SourcesAndDest::from_paths(req.args.clone()).ok_or_else(|| at_least_one(Keyword::Delete))?;
    Ok(DeleteInstruction {
        base: req.base(),
        paths,
    })
}

fn parse_env(req: &ParseRequest<'_>) -> Result<EnvInstruction, InstructionError> {
    let env = parse_key_values(&req.args, Keyword::Env)?;
    no_flags(req)?;
    Ok(EnvInstruction {
        base: req.base(),
        env,
    })
}

fn parse_expose(req: &ParseRequest<'_>) -> Result<ExposeInstruction, InstructionError> {
    Ok(ExposeInstruction {
        ports: sorted_args(req, Keyword::Expose)?,
        base: req.base(),
    })
}

fn parse_label(req: &ParseRequest<'_>) -> Result<LabelInstruction, InstructionError> {
    let labels = parse_key_values(&req.args, Keyword::Label)?;
    no_flags(req)?;
    Ok(LabelInstruction {
        base: req.base(),
        labels,
        no_expand: false,
    })
}

fn parse_package(req: &ParseRequest<'_>) -> Result<PackageInstruction, InstructionError> {
    let mut flags = req.flags();
    let action = flags.declare("action", "");
    let parsed = flags.parse()?;

    Ok(PackageInstruction {
        base: req.base(),
        action: parsed.value(action).to_owned(),
        packages: req.args.clone(),
    })
}

fn parse_stage<X>(req: &ParseRequest<'_>) -> Result<Stage<X>, InstructionError> {
    let [name] = req.args.as_slice() else {
        return Err(exactly_one(Keyword::Stage));
    };
    no_flags(req)?;

    let folded = name.to_lowercase();
    if !STAGE_NAME.is_match(&folded) {
        return Err(InstructionError::InvalidStageName { name: name.clone() });
    }

    let comment = comment_for(req.comments, &folded);
    Ok(Stage::new(
        folded,
        req.original.trim(),
        req.location,
        comment,
    ))
}

fn single_arg(req: &ParseRequest<'_>, keyword: Keyword) -> Result<String, InstructionError> {
    let [value] = req.args.as_slice() else {
        return Err(exactly_one(keyword));
    };
    no_flags(req)?;
    Ok(value.clone())
}

fn parse_user(req: &ParseRequest<'_>) -> Result<UserInstruction, InstructionError> {
    Ok(UserInstruction {
        user: single_arg(req, Keyword::User)?,
        base: req.base(),
    })
}

fn parse_workdir(req: &ParseRequest<'_>) -> Result<WorkdirInstruction, InstructionError> {
    Ok(WorkdirInstruction {
        path: single_arg(req, Keyword::Workdir)?,
        base: req.base(),
    })
}
