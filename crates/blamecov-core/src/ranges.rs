//! Contiguous line-range building.
//!
//! Shared by the coverage scanner (summarizing uncovered lines) and by the
//! blame collaborator (restricting `git blame` to the lines of interest).

use crate::error::BlamecovError;
use crate::types::DiffRange;

/// Collapse strictly increasing line numbers into minimal inclusive ranges.
///
/// Adjacent numbers always merge, so no two returned ranges touch or overlap.
///
/// # Errors
///
/// Returns [`BlamecovError::InvalidInput`] if `lines` is empty or not
/// strictly increasing.
///
/// # Examples
///
/// ```
/// use blamecov_core::{make_ranges, DiffRange};
///
/// let ranges = make_ranges(&[1, 2, 4, 5, 7]).unwrap();
/// assert_eq!(
///     ranges,
///     vec![DiffRange::new(1, 2), DiffRange::new(4, 5), DiffRange::new(7, 7)]
/// );
/// ```
pub fn make_ranges(lines: &[u32]) -> Result<Vec<DiffRange>, BlamecovError> {
    let (&first, rest) = lines
        .split_first()
        .ok_or_else(|| BlamecovError::InvalidInput("no line numbers to build ranges from".into()))?;

    let mut ranges = Vec::new();
    let mut start = first;
    let mut last = first;
    for &line in rest {
        if line <= last {
            return Err(BlamecovError::InvalidInput(format!(
                "line numbers must be strictly increasing: {line} follows {last}"
            )));
        }
        if line != last + 1 {
            ranges.push(DiffRange::new(start, last));
            start = line;
        }
        last = line;
    }
    ranges.push(DiffRange::new(start, last));

    Ok(ranges)
}

/// Build the `git blame` arguments restricting output to `ranges`.
///
/// An empty slice produces no arguments, which blames the whole file.
///
/// # Examples
///
/// ```
/// use blamecov_core::{build_line_range_filter, DiffRange};
///
/// let filter = build_line_range_filter(&[DiffRange::new(1, 3), DiffRange::new(9, 9)]);
/// assert_eq!(filter, vec!["-L1,3", "-L9,9"]);
/// ```
pub fn build_line_range_filter(ranges: &[DiffRange]) -> Vec<String> {
    ranges.iter().map(|r| format!("-L{r}")).collect()
}
