use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An inclusive, 1-indexed span of source lines.
///
/// # Examples
///
/// ```
/// use blamecov_core::DiffRange;
///
/// let range = DiffRange::new(161, 163);
/// assert_eq!(range.len(), 3);
/// assert_eq!(range.to_string(), "161,163");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiffRange {
    /// First line of the span.
    pub start: u32,
    /// Last line of the span (inclusive).
    pub end: u32,
}

impl DiffRange {
    /// Create a range covering `start..=end`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "range start {start} after end {end}");
        Self { start, end }
    }

    /// Number of lines in the span.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always `false`; a range spans at least one line.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over every line number in the span.
    pub fn lines(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl fmt::Display for DiffRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}

impl From<(u32, u32)> for DiffRange {
    fn from((start, end): (u32, u32)) -> Self {
        Self::new(start, end)
    }
}

/// Coverage classification of a single source line.
///
/// Ordered by precedence when a report's class list carries several
/// markers: `Partial` > `Missed` > `Run` > `Ignored`.
///
/// # Examples
///
/// ```
/// use blamecov_core::LineStatus;
///
/// assert_eq!(LineStatus::from_classes("stm par run hide_run"), LineStatus::Partial);
/// assert_eq!(LineStatus::from_classes("stm mis"), LineStatus::Missed);
/// assert_eq!(LineStatus::from_classes("pln"), LineStatus::Ignored);
/// assert_eq!(LineStatus::Missed.to_string(), "mis");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    /// No report entry has been applied yet.
    #[default]
    Unknown,
    /// Executed by the test run.
    Run,
    /// Executable but never executed.
    Missed,
    /// Executed, but not every branch was taken.
    Partial,
    /// Not executable (blank, comment, excluded).
    Ignored,
}

impl LineStatus {
    /// Classify a space-separated coverage class list.
    ///
    /// A list that starts with `pln`, or has no `stm` token at all, marks a
    /// non-executable line.
    pub fn from_classes(classes: &str) -> Self {
        let tokens: Vec<&str> = classes.split_whitespace().collect();
        if tokens.first() == Some(&"pln") || !tokens.contains(&"stm") {
            return LineStatus::Ignored;
        }
        if tokens.contains(&"par") {
            LineStatus::Partial
        } else if tokens.contains(&"mis") {
            LineStatus::Missed
        } else if tokens.contains(&"run") {
            LineStatus::Run
        } else {
            LineStatus::Ignored
        }
    }

    /// Whether the line is executable but not fully covered.
    pub fn lacks_coverage(&self) -> bool {
        matches!(self, LineStatus::Missed | LineStatus::Partial)
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineStatus::Unknown => write!(f, "???"),
            LineStatus::Run => write!(f, "run"),
            LineStatus::Missed => write!(f, "mis"),
            LineStatus::Partial => write!(f, "par"),
            LineStatus::Ignored => write!(f, "   "),
        }
    }
}

/// Ordering used by the ownership report.
///
/// # Examples
///
/// ```
/// use blamecov_core::SortOrder;
///
/// let order: SortOrder = "size".parse().unwrap();
/// assert_eq!(order, SortOrder::Size);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recent commit first.
    #[default]
    Date,
    /// Author with the most lines first.
    Size,
    /// Owners of lines lacking coverage, in line order.
    Cover,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Date => write!(f, "date"),
            SortOrder::Size => write!(f, "size"),
            SortOrder::Cover => write!(f, "cover"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortOrder::Date),
            "size" => Ok(SortOrder::Size),
            "cover" | "coverage" => Ok(SortOrder::Cover),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use blamecov_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text reports.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn sort_order_round_trips_display() {
        for order in [SortOrder::Date, SortOrder::Size, SortOrder::Cover] {
            assert_eq!(order.to_string().parse::<SortOrder>().unwrap(), order);
        }
        assert!("owner".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default(), SortOrder::Date);
    }

    #[test]
    fn status_precedence_partial_over_missed_over_run() {
        assert_eq!(LineStatus::from_classes("stm run hide_run"), LineStatus::Run);
        assert_eq!(LineStatus::from_classes("stm mis"), LineStatus::Missed);
        assert_eq!(LineStatus::from_classes("stm par run hide_run"), LineStatus::Partial);
        assert_eq!(LineStatus::from_classes("stm mis par"), LineStatus::Partial);
        assert_eq!(LineStatus::from_classes("stm run mis"), LineStatus::Missed);
    }

    #[test]
    fn status_non_executable_lines_are_ignored() {
        assert_eq!(LineStatus::from_classes("pln"), LineStatus::Ignored);
        assert_eq!(LineStatus::from_classes("pln run"), LineStatus::Ignored);
        assert_eq!(LineStatus::from_classes("run"), LineStatus::Ignored);
        assert_eq!(LineStatus::from_classes(""), LineStatus::Ignored);
        assert_eq!(LineStatus::from_classes("stm exc"), LineStatus::Ignored);
    }

    #[test]
    fn status_display_is_three_columns_wide() {
        for status in [
            LineStatus::Unknown,
            LineStatus::Run,
            LineStatus::Missed,
            LineStatus::Partial,
            LineStatus::Ignored,
        ] {
            assert_eq!(status.to_string().len(), 3);
        }
    }

    #[test]
    fn diff_range_iterates_inclusively() {
        let range = DiffRange::from((4, 6));
        assert_eq!(range.lines().collect::<Vec<_>>(), vec![4, 5, 6]);
        assert_eq!(DiffRange::new(9, 9).len(), 1);
    }

    #[test]
    fn diff_range_serializes_as_struct() {
        let json = serde_json::to_value(DiffRange::new(1, 3)).unwrap();
        assert_eq!(json["start"], 1);
        assert_eq!(json["end"], 3);
    }
}
