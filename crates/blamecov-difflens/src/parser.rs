use std::fmt;
use std::str::Lines;
use std::sync::LazyLock;

use blamecov_core::{BlamecovError, LineStatus};
use regex::Regex;
use serde::{Deserialize, Serialize};

static FILE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(\S+)").expect("file header regex"));

static HUNK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@\s+-(\d+)(?:,(\d+))?\s+\+(\d+)(?:,(\d+))?\s+@@").expect("hunk header regex")
});

/// One post-image line inside a diff hunk.
///
/// Identity is the line number plus whether it was context; `code` and
/// `status` are observations and do not take part in equality.
///
/// # Examples
///
/// ```
/// use blamecov_difflens::parser::SourceLine;
///
/// let added = SourceLine::added(62, "    return None");
/// let other = SourceLine::added(62, "something else");
/// assert_eq!(added, other);
/// assert_ne!(added, SourceLine::context(62, "    return None"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLine {
    /// Line number in the post-image (new revision).
    pub line_number: u32,
    /// `true` for unchanged context, `false` for an added line.
    pub is_context: bool,
    /// Line text without the diff marker.
    pub code: String,
    /// Coverage status, filled in by correlation with a report.
    pub status: LineStatus,
}

impl SourceLine {
    /// A context line.
    pub fn context(line_number: u32, code: impl Into<String>) -> Self {
        Self {
            line_number,
            is_context: true,
            code: code.into(),
            status: LineStatus::Unknown,
        }
    }

    /// An added line.
    pub fn added(line_number: u32, code: impl Into<String>) -> Self {
        Self {
            line_number,
            is_context: false,
            code: code.into(),
            status: LineStatus::Unknown,
        }
    }
}

impl PartialEq for SourceLine {
    fn eq(&self, other: &Self) -> bool {
        self.line_number == other.line_number && self.is_context == other.is_context
    }
}

impl Eq for SourceLine {}

/// The post-image lines of every hunk for a single file.
///
/// # Examples
///
/// ```
/// use blamecov_difflens::parser::parse_diff;
///
/// let diff = "diff --git a/hello.py b/hello.py
/// --- a/hello.py
/// +++ b/hello.py
/// @@ -1,2 +1,3 @@
///  def main():
/// +    print('hello')
///      pass
/// ";
/// let file = parse_diff(diff).unwrap();
/// assert_eq!(file.path, "hello.py");
/// assert_eq!(file.lines.len(), 3);
/// assert!(!file.lines[1].is_context);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// Repository-relative path taken from the `diff --git` header.
    pub path: String,
    /// Lines of all hunks, in hunk order.
    pub lines: Vec<SourceLine>,
}

impl FileDiff {
    /// Number of added (non-context) lines.
    pub fn added_count(&self) -> usize {
        self.lines.iter().filter(|l| !l.is_context).count()
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} lines, {} added)",
            self.path,
            self.lines.len(),
            self.added_count()
        )
    }
}

/// Post-image span announced by a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    new_start: u32,
    new_lines: u32,
}

impl HunkHeader {
    fn parse(line: &str) -> Result<Self, BlamecovError> {
        let caps = HUNK_HEADER_RE
            .captures(line)
            .ok_or_else(|| BlamecovError::MalformedDiff(format!("invalid hunk header: {line}")))?;

        let number = |idx: usize| -> Result<Option<u32>, BlamecovError> {
            caps.get(idx)
                .map(|m| {
                    m.as_str().parse::<u32>().map_err(|_| {
                        BlamecovError::MalformedDiff(format!("invalid range number in: {line}"))
                    })
                })
                .transpose()
        };

        let new_start = number(3)?.unwrap_or_default();
        let new_lines = number(4)?.unwrap_or(1);
        Ok(Self {
            new_start,
            new_lines,
        })
    }
}

/// Parse the unified diff of one file into its post-image lines.
///
/// A `diff --git` header resets everything collected so far, so for a
/// multi-file diff only the last file survives; use [`split_file_diffs`]
/// first when the input covers several files.
///
/// # Errors
///
/// Returns [`BlamecovError::MalformedDiff`] if a hunk header cannot be parsed
/// or a hunk body ends before its announced length.
///
/// # Examples
///
/// ```
/// use blamecov_difflens::parser::parse_diff;
///
/// let file = parse_diff("").unwrap();
/// assert!(file.lines.is_empty());
/// ```
pub fn parse_diff(input: &str) -> Result<FileDiff, BlamecovError> {
    let mut diff = FileDiff::default();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        if let Some(caps) = FILE_HEADER_RE.captures(line) {
            diff = FileDiff {
                path: caps[1].to_string(),
                lines: Vec::new(),
            };
            continue;
        }

        if line.starts_with("@@") {
            let header = HunkHeader::parse(line)?;
            collect_hunk_lines(&mut lines, header, &mut diff.lines)?;
        }
    }

    tracing::debug!(file = %diff.path, lines = diff.lines.len(), "parsed diff");
    Ok(diff)
}

/// Consume hunk body lines until the post-image budget is used up.
///
/// Deleted lines never consume a number, so the loop cannot rely on a
/// trailing context line being present.
fn collect_hunk_lines(
    body: &mut Lines<'_>,
    header: HunkHeader,
    out: &mut Vec<SourceLine>,
) -> Result<(), BlamecovError> {
    let end = header.new_start.saturating_add(header.new_lines);
    let mut line_number = header.new_start;

    while line_number < end {
        let line = body.next().ok_or_else(|| {
            BlamecovError::MalformedDiff(format!(
                "hunk at +{},{} ended at line {line_number}",
                header.new_start, header.new_lines
            ))
        })?;

        match line.chars().next() {
            Some('-') | Some('\\') => continue,
            Some(' ') => out.push(SourceLine::context(line_number, &line[1..])),
            Some('+') => out.push(SourceLine::added(line_number, &line[1..])),
            None => out.push(SourceLine::context(line_number, "")),
            Some(_) => {
                return Err(BlamecovError::MalformedDiff(format!(
                    "unexpected line inside hunk: {line}"
                )))
            }
        }
        line_number += 1;
    }

    Ok(())
}

/// Split a multi-file diff into one section per `diff --git` header.
///
/// Text before the first header is dropped.
///
/// # Examples
///
/// ```
/// use blamecov_difflens::parser::split_file_diffs;
///
/// let diff = "diff --git a/a.py b/a.py\n@@ -1 +1 @@\n-x\n+y\n\
///             diff --git a/b.py b/b.py\n@@ -1 +1 @@\n-x\n+y\n";
/// let sections = split_file_diffs(diff);
/// assert_eq!(sections.len(), 2);
/// assert!(sections[1].starts_with("diff --git a/b.py"));
/// ```
pub fn split_file_diffs(input: &str) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    for line in input.split_inclusive('\n') {
        if line.starts_with("diff --git ") {
            sections.push(String::new());
        }
        if let Some(current) = sections.last_mut() {
            current.push_str(line);
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(lines: &[SourceLine]) -> Vec<u32> {
        lines.iter().map(|l| l.line_number).collect()
    }

    #[test]
    fn empty_diff_has_no_lines() {
        let file = parse_diff("").unwrap();
        assert!(file.path.is_empty());
        assert!(file.lines.is_empty());
    }

    #[test]
    fn single_added_line_between_context() {
        let diff = "\
diff --git a/networking/tests/unit/test_nexus.py b/networking/tests/unit/test_nexus.py
index 0f3e2d1..8c0a7b2 100644
--- a/networking/tests/unit/test_nexus.py
+++ b/networking/tests/unit/test_nexus.py
@@ -59,6 +59,7 @@ NEXUS_IP_ADDRESS = '1.1.1.1'
 INSTANCE_PC = 'testpcvm'
 INSTANCE_DUAL = 'testdualvm'

+NEXUS_BAREMETAL_PORT_1 = 'Ethernet 1/10'
 NEXUS_PORT_1 = 'ethernet:1/10'
 NEXUS_PORT_2 = 'ethernet:1/20'
 NEXUS_DUAL1 = 'ethernet:1/3'
";
        let file = parse_diff(diff).unwrap();
        assert_eq!(file.path, "networking/tests/unit/test_nexus.py");
        assert_eq!(numbers(&file.lines), (59..=65).collect::<Vec<_>>());
        let added: Vec<u32> = file
            .lines
            .iter()
            .filter(|l| !l.is_context)
            .map(|l| l.line_number)
            .collect();
        assert_eq!(added, vec![62]);
        assert_eq!(file.lines[0].code, "INSTANCE_PC = 'testpcvm'");
        assert_eq!(file.lines[2].code, "");
        assert_eq!(file.lines[3].code, "NEXUS_BAREMETAL_PORT_1 = 'Ethernet 1/10'");
        assert_eq!(file.lines[6].code, "NEXUS_DUAL1 = 'ethernet:1/3'");
    }

    #[test]
    fn deleted_lines_do_not_consume_numbers() {
        let diff = "\
diff --git a/mod.py b/mod.py
--- a/mod.py
+++ b/mod.py
@@ -10,5 +10,4 @@
 first
-gone one
-gone two
+replacement
 second
-gone three
 third
";
        let file = parse_diff(diff).unwrap();
        assert_eq!(file.lines.len(), 4);
        assert_eq!(
            file.lines,
            vec![
                SourceLine::context(10, ""),
                SourceLine::added(11, ""),
                SourceLine::context(12, ""),
                SourceLine::context(13, ""),
            ]
        );
        assert_eq!(file.lines[1].code, "replacement");
    }

    #[test]
    fn hunk_at_start_of_file_without_leading_context() {
        let diff = "\
diff --git a/one.py b/one.py
--- a/one.py
+++ b/one.py
@@ -1 +1 @@
-import os
+import sys
";
        let file = parse_diff(diff).unwrap();
        assert_eq!(file.lines, vec![SourceLine::added(1, "import sys")]);
    }

    #[test]
    fn hunk_at_end_of_file_without_trailing_context() {
        let diff = "\
diff --git a/tail.py b/tail.py
--- a/tail.py
+++ b/tail.py
@@ -40,3 +40,4 @@
 a = 1
 b = 2
 c = 3
+d = 4
";
        let file = parse_diff(diff).unwrap();
        assert_eq!(numbers(&file.lines), vec![40, 41, 42, 43]);
        assert!(!file.lines[3].is_context);
    }

    #[test]
    fn no_newline_marker_is_skipped() {
        let diff = "\
diff --git a/f.py b/f.py
--- a/f.py
+++ b/f.py
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let file = parse_diff(diff).unwrap();
        assert_eq!(file.lines.len(), 1);
        assert_eq!(file.lines[0].code, "new");
    }

    #[test]
    fn multiple_hunks_keep_gaps() {
        let diff = "\
diff --git a/lib.py b/lib.py
--- a/lib.py
+++ b/lib.py
@@ -1,2 +1,3 @@
 def foo():
+    bar()
     pass
@@ -20,2 +21,2 @@
-def baz():
+def qux():
     pass
";
        let file = parse_diff(diff).unwrap();
        assert_eq!(numbers(&file.lines), vec![1, 2, 3, 21, 22]);
        assert_eq!(file.added_count(), 2);
    }

    #[test]
    fn hunk_emits_exactly_new_count_lines() {
        for (header, body, expected) in [
            ("@@ -5,3 +5,2 @@", "-a\n-b\n c\n+d\n", 2usize),
            ("@@ -5 +5 @@", "-a\n+b\n", 1),
            ("@@ -5,2 +4,0 @@", "-a\n-b\n", 0),
            ("@@ -1,4 +1,6 @@", " a\n+b\n-c\n+d\n e\n+f\n g\n", 6),
        ] {
            let diff = format!("diff --git a/x.py b/x.py\n{header}\n{body}");
            let file = parse_diff(&diff).unwrap();
            assert_eq!(file.lines.len(), expected, "header {header}");
        }
    }

    #[test]
    fn later_file_header_resets_state() {
        let diff = "\
diff --git a/a.py b/a.py
@@ -1 +1,2 @@
 one
+two
diff --git a/b.py b/b.py
@@ -3 +3 @@
-x
+y
";
        let file = parse_diff(diff).unwrap();
        assert_eq!(file.path, "b.py");
        assert_eq!(file.lines, vec![SourceLine::added(3, "y")]);
    }

    #[test]
    fn malformed_hunk_header_is_rejected() {
        let diff = "diff --git a/x.py b/x.py\n@@ -a,b +c,d @@\n+x\n";
        let err = parse_diff(diff).unwrap_err();
        assert!(matches!(err, BlamecovError::MalformedDiff(_)));
    }

    #[test]
    fn truncated_hunk_is_rejected() {
        let diff = "diff --git a/x.py b/x.py\n@@ -1,3 +1,3 @@\n one\n two\n";
        let err = parse_diff(diff).unwrap_err();
        assert!(err.to_string().contains("ended"));
    }

    #[test]
    fn split_keeps_each_file_section() {
        let diff = "\
diff --git a/a.py b/a.py
@@ -1 +1,2 @@
 one
+two
diff --git a/b.py b/b.py
@@ -3 +3 @@
-x
+y
";
        let sections = split_file_diffs(diff);
        assert_eq!(sections.len(), 2);
        let first = parse_diff(&sections[0]).unwrap();
        assert_eq!(first.path, "a.py");
        assert_eq!(first.lines.len(), 2);
        let second = parse_diff(&sections[1]).unwrap();
        assert_eq!(second.path, "b.py");
    }

    #[test]
    fn file_diff_display_summarises_counts() {
        let file = FileDiff {
            path: "pkg/mod.py".into(),
            lines: vec![SourceLine::context(1, "a"), SourceLine::added(2, "b")],
        };
        assert_eq!(file.to_string(), "pkg/mod.py (2 lines, 1 added)");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let file = FileDiff {
            path: "pkg/mod.py".into(),
            lines: vec![SourceLine::added(7, "x = 1")],
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["lines"][0]["lineNumber"], 7);
        assert_eq!(json["lines"][0]["isContext"], false);
        assert_eq!(json["lines"][0]["status"], "unknown");
    }
}
