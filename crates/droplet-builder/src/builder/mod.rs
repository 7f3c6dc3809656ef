//! Script generator abstraction.

pub mod local;

use droplet_common::config::{DropletConfig, KEY_GENERATOR};
use droplet_dropletfile::Stage;
use droplet_dropletfile::instructions::{
    ArgInstruction, ConfigInstruction, CopyInstruction, CronInstruction, DeleteInstruction,
    EnvInstruction, ExposeInstruction, Instruction, LabelInstruction, PackageInstruction,
    RunInstruction, UserInstruction, WorkdirInstruction,
};

use crate::error::{BuildError, Result};

/// Renders each instruction kind as one line of shell script.
///
/// An empty line means the instruction has no effect for this generator.
pub trait Builder<X = ()>: Send + Sync {
    /// Renders `arg`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn arg(&self, instruction: &ArgInstruction) -> Result<String>;

    /// Renders `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn config(&self, instruction: &ConfigInstruction) -> Result<String>;

    /// Renders `copy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn copy(&self, instruction: &CopyInstruction) -> Result<String>;

    /// Renders `cron`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn cron(&self, instruction: &CronInstruction) -> Result<String>;

    /// Renders `delete`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn delete(&self, instruction: &DeleteInstruction) -> Result<String>;

    /// Renders `env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn env(&self, instruction: &EnvInstruction) -> Result<String>;

    /// Renders `expose`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn expose(&self, instruction: &ExposeInstruction) -> Result<String>;

    /// Renders `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn label(&self, instruction: &LabelInstruction) -> Result<String>;

    /// Renders `package`.
    ///
    /// # Errors
    ///
    /// Returns an error if the action is unknown.
    fn package(&self, instruction: &PackageInstruction) -> Result<String>;

    /// Renders `run`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn run(&self, instruction: &RunInstruction<X>) -> Result<String>;

    /// Renders `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn user(&self, instruction: &UserInstruction) -> Result<String>;

    /// Renders `workdir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction cannot be rendered.
    fn workdir(&self, instruction: &WorkdirInstruction) -> Result<String>;
}

/// Renders one instruction with `builder`.
///
/// # Errors
///
/// Returns the builder's error for the instruction.
pub fn build_instruction<X, B>(builder: &B, instruction: &Instruction<X>) -> Result<String>
where
    B: Builder<X> + ?Sized,
{
    match instruction {
        Instruction::Arg(i) => builder.arg(i),
        Instruction::Config(i) => builder.config(i),
        Instruction::Copy(i) => builder.copy(i),
        Instruction::Cron(i) => builder.cron(i),
        Instruction::Delete(i) => builder.delete(i),
        Instruction::Env(i) => builder.env(i),
        Instruction::Expose(i) => builder.expose(i),
        Instruction::Label(i) => builder.label(i),
        Instruction::Package(i) => builder.package(i),
        Instruction::Run(i) => builder.run(i),
        Instruction::User(i) => builder.user(i),
        Instruction::Workdir(i) => builder.workdir(i),
    }
}

/// Renders every instruction of `stage`, dropping empty lines.
///
/// # Errors
///
/// Returns the first error raised by the builder.
pub fn build_stage<X, B>(builder: &B, stage: &Stage<X>) -> Result<Vec<String>>
where
    B: Builder<X> + ?Sized,
{
    tracing::info!(
        stage = %stage.name,
        instructions = stage.instructions().len(),
        "building stage"
    );

    let mut lines = Vec::new();
    for instruction in stage.instructions() {
        let line = build_instruction(builder, instruction)?;
        tracing::debug!(instruction = instruction.name(), line = %line, "built instruction");
        if !line.is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Creates the generator named by the `generator` configuration key.
///
/// # Errors
///
/// Returns an error if the generator or its package manager is unknown.
pub fn from_config<X: 'static>(config: &DropletConfig) -> Result<Box<dyn Builder<X>>> {
    match config.get_or(KEY_GENERATOR, "local") {
        "local" => Ok(Box::new(local::LocalBuilder::new(config)?)),
        other => Err(BuildError::UnknownGenerator {
            name: other.to_owned(),
        }),
    }
}
