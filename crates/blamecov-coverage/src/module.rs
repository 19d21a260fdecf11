//! Correlation of changed lines with a coverage report.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use blamecov_core::{BlamecovError, LineStatus};
use blamecov_difflens::parser::{FileDiff, SourceLine};
use serde::Serialize;

use crate::scanner::{scan_line_statuses, CoverageScan};

/// File extension of coverage HTML reports.
pub const REPORT_EXTENSION: &str = ".html";

/// Derive the report file name for a repository-relative source path.
///
/// Every path separator and every dot becomes an underscore, then the
/// report extension is appended.
///
/// # Examples
///
/// ```
/// use blamecov_coverage::module::report_name_for;
///
/// assert_eq!(report_name_for("pkg/sub/mod.py"), "pkg_sub_mod_py.html");
/// ```
pub fn report_name_for(filename: &str) -> String {
    let mut name = filename.replace(['/', '\\', '.'], "_");
    name.push_str(REPORT_EXTENSION);
    name
}

/// Per-status counts over the added lines of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub run: usize,
    pub mis: usize,
    pub par: usize,
    pub ign: usize,
}

/// The changed lines of one source file and their coverage.
///
/// # Examples
///
/// ```
/// use blamecov_coverage::module::CoverageModule;
/// use blamecov_difflens::parser::SourceLine;
/// use blamecov_core::LineStatus;
///
/// let mut module = CoverageModule::new("foo.py", vec![SourceLine::added(10, "x = 1")]);
/// assert_eq!(module.report_name(), "foo_py.html");
/// module.update_line_status(10, LineStatus::Missed);
/// assert_eq!(module.lines[0].status, LineStatus::Missed);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageModule {
    /// Repository-relative source path.
    pub filename: String,
    /// Diff lines in hunk order.
    pub lines: Vec<SourceLine>,
    /// Percentage from the report title, once a report was applied.
    pub coverage_percent: Option<String>,
    /// Whether a matching report was found.
    pub has_report: bool,
    #[serde(skip)]
    line_index: HashMap<u32, usize>,
}

impl CoverageModule {
    /// Create a module without coverage data.
    pub fn new(filename: impl Into<String>, lines: Vec<SourceLine>) -> Self {
        let line_index = lines
            .iter()
            .enumerate()
            .map(|(idx, line)| (line.line_number, idx))
            .collect();
        Self {
            filename: filename.into(),
            lines,
            coverage_percent: None,
            has_report: false,
            line_index,
        }
    }

    /// Name of the report file this module is looked up under.
    pub fn report_name(&self) -> String {
        report_name_for(&self.filename)
    }

    /// Set the status of `line_number`; lines outside the diff are ignored.
    pub fn update_line_status(&mut self, line_number: u32, status: LineStatus) {
        if let Some(&idx) = self.line_index.get(&line_number) {
            self.lines[idx].status = status;
        }
    }

    /// Copy the statuses and percentage of a per-line scan onto this module.
    pub fn apply_scan(&mut self, scan: &CoverageScan) {
        for &(line_number, status) in &scan.statuses {
            self.update_line_status(line_number, status);
        }
        self.coverage_percent = scan.coverage_percent.clone();
        self.has_report = true;
    }

    /// Look up this module's report in `report_dir` and apply it.
    ///
    /// Returns `Ok(false)` when no report exists; that is a normal outcome,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BlamecovError::Io`] if the report exists but cannot be read.
    pub fn load_report(&mut self, report_dir: &Path) -> Result<bool, BlamecovError> {
        let path: PathBuf = report_dir.join(self.report_name());
        if !path.is_file() {
            tracing::debug!(report = %path.display(), "no coverage report");
            return Ok(false);
        }
        let content = std::fs::read_to_string(&path)?;
        let scan = scan_line_statuses(content.lines());
        self.apply_scan(&scan);
        Ok(true)
    }

    /// Whether the diff added at least one line to this file.
    pub fn has_added_lines(&self) -> bool {
        self.lines.iter().any(|l| !l.is_context)
    }

    /// Count statuses of added lines.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for line in self.lines.iter().filter(|l| !l.is_context) {
            match line.status {
                LineStatus::Run => counts.run += 1,
                LineStatus::Missed => counts.mis += 1,
                LineStatus::Partial => counts.par += 1,
                LineStatus::Ignored => counts.ign += 1,
                LineStatus::Unknown => {}
            }
        }
        counts
    }

    /// Plain-text report: a summary header followed by every diff line.
    ///
    /// A blank line separates lines that are not adjacent in the file.
    pub fn report(&self) -> String {
        if !self.has_report {
            return format!("{} (No coverage data)\n", self.filename);
        }
        if !self.has_added_lines() {
            return format!("{} (No added/changed lines)\n", self.filename);
        }

        let counts = self.counts();
        let mut output = format!(
            "{} (run={}, mis={}, par={}, ign={})\n",
            self.filename, counts.run, counts.mis, counts.par, counts.ign
        );
        let mut last_line: Option<u32> = None;
        for line in &self.lines {
            if last_line.is_some_and(|last| line.line_number != last + 1) {
                output.push('\n');
            }
            let marker = if line.is_context { ' ' } else { '+' };
            let _ = writeln!(
                output,
                "{:5} {} {}{}",
                line.line_number, line.status, marker, line.code
            );
            last_line = Some(line.line_number);
        }
        output
    }

    /// Markdown rendering of [`CoverageModule::report`].
    pub fn to_markdown(&self) -> String {
        let mut md = format!("### `{}`\n\n", self.filename);
        if !self.has_report {
            md.push_str("No coverage data.\n");
            return md;
        }
        if !self.has_added_lines() {
            md.push_str("No added or changed lines.\n");
            return md;
        }

        let counts = self.counts();
        let _ = write!(
            md,
            "| run | mis | par | ign |\n|---|---|---|---|\n| {} | {} | {} | {} |\n\n",
            counts.run, counts.mis, counts.par, counts.ign
        );
        if let Some(percent) = &self.coverage_percent {
            let _ = writeln!(md, "File coverage: {percent}%\n");
        }
        md.push_str("```text\n");
        for line in self.report().lines().skip(1) {
            md.push_str(line);
            md.push('\n');
        }
        md.push_str("```\n");
        md
    }
}

impl From<FileDiff> for CoverageModule {
    fn from(diff: FileDiff) -> Self {
        Self::new(diff.path, diff.lines)
    }
}
