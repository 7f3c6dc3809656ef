//! Stages and the assembler that folds typed statements into them.

use serde::{Deserialize, Serialize};

use crate::error::{InstructionError, ParseError};
use crate::instructions::{ArgInstruction, Instruction, InstructionParser, Parsed};
use crate::parser::ast::{SourceRange, SyntaxTree};

/// A named, ordered group of instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = "X: Default"))]
pub struct Stage<X = ()> {
    /// Lower-cased stage name.
    pub name: String,
    instructions: Vec<Instruction<X>>,
    /// Trimmed text of the `stage` statement.
    pub source_code: String,
    /// Range of the `stage` statement.
    pub location: SourceRange,
    /// Text of a preceding `# <name> <text>` comment.
    pub comment: Option<String>,
}

impl<X> Stage<X> {
    /// Creates an empty stage.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source_code: impl Into<String>,
        location: SourceRange,
        comment: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
            source_code: source_code.into(),
            location,
            comment,
        }
    }

    /// Appends an instruction.
    pub fn add_instruction(&mut self, instruction: Instruction<X>) {
        self.instructions.push(instruction);
    }

    /// Instructions in source order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction<X>] {
        &self.instructions
    }

    /// Whether the stage's name matches `name`, ignoring case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A parsed Dropletfile: its stages and the `arg` declarations that
/// precede the first stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = "X: Default"))]
pub struct Dropletfile<X = ()> {
    /// Stages in declaration order.
    pub stages: Vec<Stage<X>>,
    /// `arg` instructions declared before any stage.
    pub meta_args: Vec<ArgInstruction>,
}

impl<X> Default for Dropletfile<X> {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            meta_args: Vec::new(),
        }
    }
}

impl<X> Dropletfile<X> {
    /// First stage named `name`, ignoring case.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Stage<X>> {
        self.stages.iter().find(|stage| stage.is_named(name))
    }

    /// Index of the first stage named `name`, ignoring case.
    #[must_use]
    pub fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|stage| stage.is_named(name))
    }

    /// Like [`Dropletfile::stage`], failing when no stage matches.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::StageNotFound`] when no stage carries `name`.
    pub fn require_stage(&self, name: &str) -> Result<&Stage<X>, ParseError> {
        self.stage(name).ok_or_else(|| ParseError::StageNotFound {
            name: name.to_owned(),
        })
    }

    /// The most recently declared stage.
    #[must_use]
    pub fn current_stage(&self) -> Option<&Stage<X>> {
        self.stages.last()
    }

    /// Runs a one-word substitution over every expandable instruction,
    /// meta arguments first, then stages in order.
    ///
    /// Stops at the first error; instructions already visited keep their
    /// rewritten values.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `expander`.
    pub fn expand<E, F>(&mut self, mut expander: F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        use crate::instructions::SingleWordExpansion;

        for arg in &mut self.meta_args {
            arg.expand(&mut expander)?;
        }
        for stage in &mut self.stages {
            for instruction in &mut stage.instructions {
                instruction.expand(&mut expander)?;
            }
        }
        Ok(())
    }
}

/// Types every node of `tree` and folds the results into stages.
///
/// # Errors
///
/// Returns the first typing error, or [`InstructionError::NoBuildStage`]
/// when a non-`arg` instruction precedes every `stage`.
pub fn assemble<X: Default>(
    parser: &InstructionParser<X>,
    tree: &SyntaxTree,
) -> Result<Dropletfile<X>, ParseError> {
    let mut file = Dropletfile::default();

    for node in &tree.children {
        match parser.parse_node(node)? {
            Parsed::Stage(stage) => {
                if file.stage(&stage.name).is_some() {
                    tracing::warn!(
                        stage = %stage.name,
                        line = node.start_line(),
                        "duplicate stage name, lookups resolve to the first declaration"
                    );
                }
                tracing::debug!(stage = %stage.name, line = node.start_line(), "opened stage");
                file.stages.push(stage);
            }
            Parsed::Instruction(instruction) => match file.stages.last_mut() {
                Some(stage) => stage.add_instruction(instruction),
                None => match instruction {
                    Instruction::Arg(arg) => file.meta_args.push(arg),
                    _ => return Err(ParseError::at(node.range, InstructionError::NoBuildStage)),
                },
            },
        }
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_syntax;

    fn assemble_str(input: &str) -> Result<Dropletfile, ParseError> {
        let tree = parse_syntax(input).expect("should scan");
        assemble(&InstructionParser::new(), &tree)
    }

    #[test]
    fn instructions_attach_to_latest_stage() {
        let file = assemble_str("stage one\nuser a\nstage two\nuser b\nworkdir /x")
            .expect("should assemble");
        assert_eq!(file.stages.len(), 2);
        assert_eq!(file.stages[0].instructions().len(), 1);
        assert_eq!(file.stages[1].instructions().len(), 2);
        assert_eq!(file.current_stage().map(|s| s.name.as_str()), Some("two"));
    }

    #[test]
    fn pre_stage_args_become_meta_args() {
        let file = assemble_str("arg FOO=bar\nstage build\nenv X 1").expect("should assemble");
        assert_eq!(file.meta_args.len(), 1);
        assert_eq!(file.meta_args[0].args[0].key, "FOO");
        assert_eq!(file.stages[0].name, "build");
        assert!(matches!(
            file.stages[0].instructions(),
            [Instruction::Env(env)] if env.env[0].key == "X" && env.env[0].value == "1"
        ));
    }

    #[test]
    fn args_after_first_stage_stay_in_stage() {
        let file = assemble_str("stage build\narg A=1").expect("should assemble");
        assert!(file.meta_args.is_empty());
        assert!(matches!(file.stages[0].instructions(), [Instruction::Arg(_)]));
    }

    #[test]
    fn instruction_before_stage_fails() {
        let err = assemble_str("env X 1\nstage build").unwrap_err();
        assert_eq!(err.instruction_error(), Some(&InstructionError::NoBuildStage));
        assert!(err.to_string().contains("no build stage in current context"));
        assert_eq!(err.range().map(|r| r.start.line), Some(1));
    }

    #[test]
    fn empty_input_has_no_stages() {
        let file = assemble_str("# nothing here\n\n").expect("should assemble");
        assert!(file.stages.is_empty());
        assert!(file.current_stage().is_none());
    }

    #[test]
    fn lookup_ignores_case_and_prefers_first_duplicate() {
        let file = assemble_str("STAGE Build\nuser a\nstage build\nuser b").expect("should assemble");
        assert_eq!(file.stages[0].name, "build");
        assert_eq!(file.stages[1].name, "build");
        assert_eq!(file.stage_index("BUILD"), Some(0));
        let stage = file.stage("bUiLd").expect("stage should exist");
        assert_eq!(stage.instructions()[0].source_code(), "user a");
    }

    #[test]
    fn require_stage_reports_missing_name() {
        let file = assemble_str("stage build").expect("should assemble");
        assert!(file.require_stage("build").is_ok());
        let err = file.require_stage("deploy").unwrap_err();
        assert_eq!(err.to_string(), "no build stage deploy in current Dropletfile");
    }

    #[test]
    fn expand_visits_meta_args_and_stages() {
        let mut file = assemble_str("arg V=$X\nstage s\nuser $X\nrun echo $X").expect("should assemble");
        file.expand(|word| Ok::<_, ()>(word.replace("$X", "7")))
            .expect("should expand");
        assert_eq!(file.meta_args[0].args[0].value_str(), "7");
        let [Instruction::User(user), Instruction::Run(run)] = file.stages[0].instructions() else {
            panic!("unexpected instructions");
        };
        assert_eq!(user.user, "7");
        assert_eq!(run.command.cmd_line, vec!["echo", "$X"]);
    }
}
