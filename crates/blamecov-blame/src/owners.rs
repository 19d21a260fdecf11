//! Ownership reports: who last touched a file, or its uncovered lines.
//!
//! The three report orders are [`OwnersStrategy`] implementations. Each one
//! decides which files are blamed, whether blame lines are kept individually,
//! how records are ordered and how the author summary is built.

use std::path::{Path, PathBuf};

use blamecov_core::{BlamecovError, DiffRange, SortOrder};
use blamecov_coverage::discovery::find_partial_coverage_modules;
use git2::Repository;
use serde::Serialize;

use crate::aggregate::{group_contiguous, sort_by_date, sort_by_name, sort_by_size, unique_authors};
use crate::parser::parse_blame_records;
use crate::record::CommitRecord;

/// A file to blame and the line ranges to restrict blame to.
///
/// Empty `ranges` means the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleTarget {
    /// Source file to run blame on.
    pub path: PathBuf,
    /// Line ranges to restrict blame to.
    pub ranges: Vec<DiffRange>,
}

impl ModuleTarget {
    /// Target a whole file.
    pub fn whole_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ranges: Vec::new(),
        }
    }
}

/// One way of ordering and summarizing blame records.
pub trait OwnersStrategy {
    /// The order this strategy implements.
    fn order(&self) -> SortOrder;

    /// Whether every blamed line is kept as its own record.
    fn unique_commits(&self) -> bool {
        false
    }

    /// Files (and ranges) to blame under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be walked.
    fn collect_modules(&self, root: &Path) -> Result<Vec<ModuleTarget>, BlamecovError>;

    /// Order one file's records.
    fn sort_records(&self, records: Vec<CommitRecord>) -> Vec<CommitRecord>;

    /// Detail line for one record.
    fn show_line(&self, record: &CommitRecord, verbose: bool) -> String {
        record.show(&record.line_count.to_string(), verbose)
    }

    /// Author summary for the records shown.
    fn summarize(&self, records: &[CommitRecord]) -> Vec<String> {
        unique_authors(records)
    }
}

/// Most recent commit first; whole tracked files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByDate;

/// Authors with the most lines first; whole tracked files.
#[derive(Debug, Clone, Copy, Default)]
pub struct BySize;

/// Uncovered line spans of files named by a coverage report directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByCoverage;

impl OwnersStrategy for ByDate {
    fn order(&self) -> SortOrder {
        SortOrder::Date
    }

    fn collect_modules(&self, root: &Path) -> Result<Vec<ModuleTarget>, BlamecovError> {
        tracked_modules(root)
    }

    fn sort_records(&self, records: Vec<CommitRecord>) -> Vec<CommitRecord> {
        sort_by_date(records)
    }
}

impl OwnersStrategy for BySize {
    fn order(&self) -> SortOrder {
        SortOrder::Size
    }

    fn collect_modules(&self, root: &Path) -> Result<Vec<ModuleTarget>, BlamecovError> {
        tracked_modules(root)
    }

    fn sort_records(&self, records: Vec<CommitRecord>) -> Vec<CommitRecord> {
        sort_by_size(records)
    }
}

impl OwnersStrategy for ByCoverage {
    fn order(&self) -> SortOrder {
        SortOrder::Cover
    }

    fn unique_commits(&self) -> bool {
        true
    }

    fn collect_modules(&self, root: &Path) -> Result<Vec<ModuleTarget>, BlamecovError> {
        if !root.is_dir() {
            return Err(BlamecovError::InvalidInput(format!(
                "sorting by coverage needs a report directory, got {}",
                root.display()
            )));
        }
        let mut targets = Vec::new();
        for outcome in find_partial_coverage_modules(root)? {
            match outcome {
                Ok(module) => targets.push(ModuleTarget {
                    path: module.source,
                    ranges: module.ranges,
                }),
                Err(e) => tracing::warn!("skipping module: {e}"),
            }
        }
        Ok(targets)
    }

    fn sort_records(&self, records: Vec<CommitRecord>) -> Vec<CommitRecord> {
        group_contiguous(records)
    }

    fn show_line(&self, record: &CommitRecord, verbose: bool) -> String {
        let count = record
            .lines
            .clone()
            .unwrap_or_else(|| record.line_number.to_string());
        record.show(&count, verbose)
    }

    fn summarize(&self, records: &[CommitRecord]) -> Vec<String> {
        sort_by_name(records.iter().map(|r| r.author.clone()))
    }
}

/// The strategy implementing `order`.
///
/// # Examples
///
/// ```
/// use blamecov_blame::owners::strategy_for;
/// use blamecov_core::SortOrder;
///
/// let strategy = strategy_for(SortOrder::Cover);
/// assert!(strategy.unique_commits());
/// ```
pub fn strategy_for(order: SortOrder) -> Box<dyn OwnersStrategy> {
    match order {
        SortOrder::Date => Box::new(ByDate),
        SortOrder::Size => Box::new(BySize),
        SortOrder::Cover => Box::new(ByCoverage),
    }
}

/// A single file, or every git-tracked file below a directory.
fn tracked_modules(root: &Path) -> Result<Vec<ModuleTarget>, BlamecovError> {
    if root.is_file() {
        return Ok(vec![ModuleTarget::whole_file(root)]);
    }
    if !root.is_dir() {
        return Err(BlamecovError::InvalidInput(format!(
            "{} is neither a file nor a directory",
            root.display()
        )));
    }
    Ok(tracked_files(root)?
        .into_iter()
        .map(ModuleTarget::whole_file)
        .collect())
}

/// Every file in the git index located under `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`BlamecovError::Git`] if `dir` is not inside a non-bare
/// repository or the index cannot be read.
pub fn tracked_files(dir: &Path) -> Result<Vec<PathBuf>, BlamecovError> {
    let repo = Repository::discover(dir)
        .map_err(|e| BlamecovError::Git(format!("failed to open repository: {e}")))?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| BlamecovError::Git("repository has no working directory".into()))?;
    let workdir = workdir.canonicalize()?;
    let dir = dir.canonicalize()?;
    let prefix = dir.strip_prefix(&workdir).map_err(|_| {
        BlamecovError::Git(format!(
            "{} is outside the repository at {}",
            dir.display(),
            workdir.display()
        ))
    })?;

    let index = repo
        .index()
        .map_err(|e| BlamecovError::Git(format!("failed to read index: {e}")))?;

    let mut files: Vec<PathBuf> = index
        .iter()
        .map(|entry| PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned()))
        .filter(|relative| relative.starts_with(prefix))
        .map(|relative| workdir.join(relative))
        .collect();
    files.sort();
    files.dedup();

    tracing::debug!(dir = %dir.display(), files = files.len(), "tracked files");
    Ok(files)
}

/// Owners of one file, as shown in a report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOwners {
    pub path: PathBuf,
    pub order: SortOrder,
    /// Summary of the authors among `records`.
    pub authors: Vec<String>,
    /// Records after ordering and the `max` limit.
    pub records: Vec<CommitRecord>,
    /// One rendered detail line per record.
    #[serde(skip)]
    pub details: Vec<String>,
}

impl FileOwners {
    /// Plain-text report: `path (author,author)` and optionally the details.
    pub fn report(&self, details: bool) -> String {
        let mut output = format!("{} ({})\n", self.path.display(), self.authors.join(","));
        if details {
            for line in &self.details {
                output.push_str(line);
                output.push('\n');
            }
        }
        output
    }

    /// Markdown rendering: a heading, the author list and optionally the
    /// detail lines in a fenced block.
    pub fn to_markdown(&self, details: bool) -> String {
        let mut md = format!("### `{}`\n\n", self.path.display());
        if self.authors.is_empty() {
            md.push_str("No blame information.\n");
            return md;
        }
        md.push_str("Owners: ");
        md.push_str(&self.authors.join(", "));
        md.push('\n');
        if details && !self.details.is_empty() {
            md.push_str("\n```text\n");
            for line in &self.details {
                md.push_str(line.trim_start());
                md.push('\n');
            }
            md.push_str("```\n");
        }
        md
    }
}

/// Build the owners of `target` from its porcelain blame output.
///
/// `max` limits the records shown; zero shows all.
///
/// # Errors
///
/// Returns the parser's error if the blame output is incomplete.
pub fn analyze_blame(
    strategy: &dyn OwnersStrategy,
    target: &ModuleTarget,
    blame: &str,
    max: usize,
    verbose: bool,
) -> Result<FileOwners, BlamecovError> {
    let records = parse_blame_records(blame, strategy.unique_commits())?;
    let mut records = strategy.sort_records(records);
    if max > 0 {
        records.truncate(max);
    }

    let authors = strategy.summarize(&records);
    let details = records
        .iter()
        .map(|record| strategy.show_line(record, verbose))
        .collect();

    Ok(FileOwners {
        path: target.path.clone(),
        order: strategy.order(),
        authors,
        records,
        details,
    })
}
