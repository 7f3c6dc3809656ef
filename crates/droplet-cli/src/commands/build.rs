//! `droplet build` — Build a script from one stage of a Dropletfile.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use droplet_common::config::DropletConfig;
use droplet_common::constants::DROPLETFILE_NAME;
use droplet_dropletfile::Dropletfile;
use droplet_dropletfile::expand::VariableExpander;

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory containing the Dropletfile.
    pub dir: PathBuf,

    /// Stage to build.
    pub stage: String,

    /// Print the expanded stage as JSON instead of a script.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `build` command.
///
/// # Errors
///
/// Returns an error if the Dropletfile cannot be read, parsed, or built.
pub fn execute(args: BuildArgs, config_file: &Path) -> anyhow::Result<()> {
    let config = DropletConfig::load_or_default(config_file)?;
    let file = load(&args.dir)?;

    if args.json {
        let stage = file.require_stage(&args.stage)?;
        println!("{}", serde_json::to_string_pretty(stage)?);
    } else {
        print!("{}", generate(&file, &args.stage, &config)?);
    }
    Ok(())
}

/// Reads, parses, and expands `<dir>/Dropletfile`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or expanded.
pub fn load(dir: &Path) -> anyhow::Result<Dropletfile> {
    let path = dir.join(DROPLETFILE_NAME);
    tracing::info!(path = %path.display(), "building from dropletfile");

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut file = droplet_dropletfile::parse(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let vars = VariableExpander::from_meta_args(&file.meta_args);
    file.expand(|word| vars.expand_word(word))?;
    Ok(file)
}

/// Renders `stage` of `file` as a shell script.
///
/// # Errors
///
/// Returns an error if the stage does not exist or cannot be built.
pub fn generate(file: &Dropletfile, stage: &str, config: &DropletConfig) -> anyhow::Result<String> {
    let stage = file.require_stage(stage)?;
    let builder = droplet_builder::builder::from_config::<()>(config)?;
    let lines = droplet_builder::build_stage(builder.as_ref(), stage)?;
    Ok(render_script(&lines))
}

fn render_script(lines: &[String]) -> String {
    let mut script = String::from("#!/bin/sh\nset -e\n");
    for line in lines {
        script.push_str(line);
        script.push('\n');
    }
    script
}
