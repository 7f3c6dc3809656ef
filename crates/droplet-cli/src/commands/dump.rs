//! `droplet dump` — Print parsed Dropletfiles as JSON.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use droplet_dropletfile::Dropletfile;
use serde::Serialize;

/// Arguments for the `dump` command.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Dropletfiles to parse.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DumpEntry<'a> {
    path: &'a Path,
    #[serde(flatten)]
    file: Dropletfile,
}

/// Executes the `dump` command.
///
/// # Errors
///
/// Returns an error if any file cannot be read or parsed.
pub fn execute(args: DumpArgs) -> anyhow::Result<()> {
    println!("{}", dump(&args.files)?);
    Ok(())
}

/// Parses every file and renders the results as a JSON array.
fn dump(paths: &[PathBuf]) -> anyhow::Result<String> {
    let entries = paths
        .iter()
        .map(|path| {
            tracing::info!(path = %path.display(), "dumping dropletfile");
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file = droplet_dropletfile::parse(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(DumpEntry { path, file })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(serde_json::to_string_pretty(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_each_file_with_instruction_types() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::write(&first, "stage a\nrun true\n").expect("write");
        std::fs::write(&second, "arg X=1\nstage b\nenv K v\n").expect("write");

        let out = dump(&[first.clone(), second]).expect("should dump");
        let json: serde_json::Value = serde_json::from_str(&out).expect("valid json");

        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["path"], first.display().to_string());
        assert_eq!(json[0]["stages"][0]["instructions"][0]["type"], "run");
        assert_eq!(json[1]["meta_args"][0]["args"][0]["key"], "X");
        assert_eq!(json[1]["stages"][0]["instructions"][0]["type"], "env");
    }

    #[test]
    fn first_failure_aborts_dump() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bad = dir.path().join("bad");
        std::fs::write(&bad, "run true\n").expect("write");
        let err = dump(&[bad]).unwrap_err();
        assert!(format!("{err:#}").contains("no build stage in current context"));
    }
}
