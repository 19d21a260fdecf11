//! Discovery of source modules with incomplete coverage.

use std::path::{Path, PathBuf};

use blamecov_core::{BlamecovError, DiffRange};
use serde::Serialize;

use crate::scanner::{scan_report, uncovered_ranges, ScanMode};

/// A source file whose report lists missed or partial lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredModule {
    /// Absolute path of the source file.
    pub source: PathBuf,
    /// Line ranges lacking full coverage.
    pub ranges: Vec<DiffRange>,
    /// Coverage percentage from the report title.
    pub coverage_percent: Option<String>,
}

/// Outcome of examining one report: the module, or why it was unusable.
pub type ModuleOutcome = Result<UncoveredModule, BlamecovError>;

/// Walk `report_dir` for HTML reports and collect the modules needing
/// attention.
///
/// Report titles name sources relative to the directory containing
/// `report_dir`. Fully covered reports, reports without a title, reports
/// with no uncovered line, and `index.html` are skipped. Results are
/// ordered by report path.
///
/// A report that cannot be read, or whose source file is gone, yields an
/// `Err` entry in place of its module; the walk goes on with the rest.
///
/// # Errors
///
/// Returns [`BlamecovError::InvalidInput`] if `report_dir` cannot form a
/// glob pattern, and [`BlamecovError::Io`] if it cannot be made absolute.
/// Per-report entries carry [`BlamecovError::SourceFileNotFound`] for a
/// missing source and [`BlamecovError::Io`] for an unreadable report.
pub fn find_partial_coverage_modules(
    report_dir: &Path,
) -> Result<Vec<ModuleOutcome>, BlamecovError> {
    let root = std::path::absolute(report_dir)?;
    let project_root = root.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone());

    let pattern = root.join("**").join("*.html");
    let pattern = pattern.to_str().ok_or_else(|| {
        BlamecovError::InvalidInput(format!("non UTF-8 report directory: {}", root.display()))
    })?;
    let entries = glob::glob(pattern)
        .map_err(|e| BlamecovError::InvalidInput(format!("invalid report pattern: {e}")))?;

    let mut modules = Vec::new();
    for entry in entries {
        let report = match entry {
            Ok(report) => report,
            Err(e) => {
                modules.push(Err(BlamecovError::Io(e.into())));
                continue;
            }
        };
        if report.file_name().is_some_and(|name| name == "index.html") {
            continue;
        }
        if let Some(outcome) = examine_report(&report, &project_root).transpose() {
            modules.push(outcome);
        }
    }

    Ok(modules)
}

/// Scan one report; `Ok(None)` when it has nothing uncovered to offer.
fn examine_report(
    report: &Path,
    project_root: &Path,
) -> Result<Option<UncoveredModule>, BlamecovError> {
    let content = std::fs::read_to_string(report)?;
    let scan = scan_report(content.lines(), ScanMode::Uncovered);
    if scan.fully_covered || scan.filename.is_empty() {
        return Ok(None);
    }
    let ranges = uncovered_ranges(&scan)?;
    if ranges.is_empty() {
        tracing::debug!(report = %report.display(), "no uncovered lines");
        return Ok(None);
    }

    let source = project_root.join(&scan.filename);
    if !source.is_file() {
        return Err(BlamecovError::SourceFileNotFound {
            file: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| scan.filename.clone()),
            area: source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| project_root.to_path_buf()),
        });
    }

    tracing::debug!(source = %source.display(), ranges = ranges.len(), "uncovered module");
    Ok(Some(UncoveredModule {
        source,
        ranges,
        coverage_percent: scan.coverage_percent,
    }))
}
