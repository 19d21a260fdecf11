//! Subprocess calls to `git` for diffs and blame traces.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use blamecov_core::{build_line_range_filter, DiffConfig, DiffRange};
use miette::{Context, IntoDiagnostic, Result};

fn run_git<I, S>(dir: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args
        .into_iter()
        .map(|a| a.as_ref().to_os_string())
        .collect();
    let shown = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!(dir = %dir.display(), "git {shown}");

    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(&args)
        .output()
        .into_diagnostic()
        .wrap_err(format!("Failed to run git {shown}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        miette::bail!("git {} failed: {}", shown, stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Version arguments: `a..b` stays one argument, `a b` becomes two.
fn version_args(versions: &str) -> Vec<&str> {
    versions.split_whitespace().collect()
}

/// Files changed between `versions`, skipping dot-files.
pub fn changed_files(repo_dir: &Path, versions: &str) -> Result<Vec<String>> {
    let mut args = vec!["diff", "--name-only"];
    args.extend(version_args(versions));
    let out = run_git(repo_dir, args)?;
    Ok(out
        .lines()
        .filter(|name| !name.is_empty())
        .filter(|name| {
            Path::new(name)
                .file_name()
                .is_some_and(|base| !base.to_string_lossy().starts_with('.'))
        })
        .map(str::to_string)
        .collect())
}

/// Unified diff of one file between `versions`.
pub fn file_diff(repo_dir: &Path, versions: &str, filename: &str, config: &DiffConfig) -> Result<String> {
    let mut args = vec!["diff".to_string(), format!("-U{}", config.context_lines)];
    if config.ignore_whitespace {
        args.push("-w".to_string());
    }
    args.extend(version_args(versions).into_iter().map(str::to_string));
    args.push("--".to_string());
    args.push(filename.to_string());
    run_git(repo_dir, args)
}

/// Porcelain blame of `path`, restricted to `ranges` when any are given.
///
/// Runs in the file's own directory so nested repositories resolve.
pub fn blame(path: &Path, ranges: &[DiffRange]) -> Result<String> {
    let area = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| miette::miette!("{} is not a file", path.display()))?;

    let mut args: Vec<&OsStr> = vec![OsStr::new("blame"), OsStr::new("--line-porcelain")];
    let filter = build_line_range_filter(ranges);
    args.extend(filter.iter().map(OsStr::new));
    args.push(OsStr::new("--"));
    args.push(name);
    run_git(area, args)
}
