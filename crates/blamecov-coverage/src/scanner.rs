//! Line-level scanning of HTML coverage reports.
//!
//! Only the summary section of a report is inspected: the `<title>` carries
//! the file name and percentage, and one `<p id="nN" class="...">` element
//! per source line carries its status classes. Everything after the
//! `<td class="text">` sentinel is source text and is never read.

use std::sync::LazyLock;

use blamecov_core::{make_ranges, BlamecovError, DiffRange, LineStatus};
use regex::Regex;
use serde::Serialize;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*<title>Coverage for ([^:]+):\s+(\d+)%</title>").expect("title regex")
});

static SOURCE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<p id="n(\d+)" class="([^"]+)""#).expect("source line regex")
});

static SUMMARY_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*<td class="text">"#).expect("summary end regex"));

/// What a scan collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Every line marker, for annotating diff lines.
    PerLine,
    /// Only missed or partial lines; a 100% report stops the scan at once.
    Uncovered,
}

/// Result of scanning one coverage report.
///
/// # Examples
///
/// ```
/// use blamecov_coverage::scanner::{scan_report, ScanMode};
/// use blamecov_core::LineStatus;
///
/// let report = [
///     "<title>Coverage for pkg/mod.py: 50%</title>",
///     r##"<p id="n1" class="stm run hide_run"><a href="#n1">1</a></p>"##,
///     r##"<p id="n2" class="stm mis"><a href="#n2">2</a></p>"##,
/// ];
/// let scan = scan_report(report, ScanMode::PerLine);
/// assert_eq!(scan.filename, "pkg/mod.py");
/// assert_eq!(scan.coverage_percent.as_deref(), Some("50"));
/// assert_eq!(scan.statuses, vec![(1, LineStatus::Run), (2, LineStatus::Missed)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageScan {
    /// Source path from the report title; empty when no title was seen.
    pub filename: String,
    /// Coverage percentage from the title, without the `%` sign.
    pub coverage_percent: Option<String>,
    /// Line statuses in report order.
    pub statuses: Vec<(u32, LineStatus)>,
    /// Set when an uncovered-mode scan stopped at a 100% title.
    pub fully_covered: bool,
}

/// Scan report lines in the given mode.
///
/// Malformed line numbers are skipped rather than failing the scan; the
/// report comes from a trusted generator and one bad marker should not hide
/// the rest.
pub fn scan_report<I, S>(lines: I, mode: ScanMode) -> CoverageScan
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scan = CoverageScan::default();

    for line in lines {
        let line = line.as_ref();

        if let Some(caps) = TITLE_RE.captures(line) {
            if mode == ScanMode::Uncovered && &caps[2] == "100" {
                return CoverageScan {
                    fully_covered: true,
                    ..CoverageScan::default()
                };
            }
            scan.filename = caps[1].to_string();
            scan.coverage_percent = Some(caps[2].to_string());
            continue;
        }

        if let Some(caps) = SOURCE_LINE_RE.captures(line) {
            let Ok(line_number) = caps[1].parse::<u32>() else {
                tracing::warn!(marker = &caps[1], "skipping unparseable line marker");
                continue;
            };
            let status = LineStatus::from_classes(&caps[2]);
            if mode == ScanMode::PerLine || status.lacks_coverage() {
                scan.statuses.push((line_number, status));
            }
            continue;
        }

        if SUMMARY_END_RE.is_match(line) {
            break;
        }
    }

    scan
}

/// Scan a report for every line status (per-line mode).
pub fn scan_line_statuses<I, S>(lines: I) -> CoverageScan
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    scan_report(lines, ScanMode::PerLine)
}

/// Find the ranges of lines that are missed or only partially covered.
///
/// A fully covered report returns `("", [])` without inspecting any line.
///
/// # Errors
///
/// Returns [`BlamecovError::InvalidInput`] only if range building fails,
/// which cannot happen for the sorted, deduplicated numbers passed in.
///
/// # Examples
///
/// ```
/// use blamecov_coverage::scanner::scan_uncovered_ranges;
/// use blamecov_core::DiffRange;
///
/// let report = [
///     "<title>Coverage for foo.py: 82%</title>",
///     r##"<p id="n161" class="stm mis"><a href="#n161">161</a></p>"##,
///     r##"<p id="n162" class="stm mis"><a href="#n162">162</a></p>"##,
///     r##"<p id="n163" class="stm mis"><a href="#n163">163</a></p>"##,
/// ];
/// let (file, ranges) = scan_uncovered_ranges(report).unwrap();
/// assert_eq!(file, "foo.py");
/// assert_eq!(ranges, vec![DiffRange::new(161, 163)]);
/// ```
pub fn scan_uncovered_ranges<I, S>(lines: I) -> Result<(String, Vec<DiffRange>), BlamecovError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let scan = scan_report(lines, ScanMode::Uncovered);
    let ranges = uncovered_ranges(&scan)?;
    Ok((scan.filename, ranges))
}

/// Build ranges from the statuses of an uncovered-mode scan.
pub(crate) fn uncovered_ranges(scan: &CoverageScan) -> Result<Vec<DiffRange>, BlamecovError> {
    let mut numbers: Vec<u32> = scan
        .statuses
        .iter()
        .filter(|(_, status)| status.lacks_coverage())
        .map(|(n, _)| *n)
        .collect();
    if numbers.is_empty() {
        return Ok(Vec::new());
    }
    numbers.sort_unstable();
    numbers.dedup();
    make_ranges(&numbers)
}
