//! Parser for `git blame --line-porcelain` output.
//!
//! Each blamed line is a block: a header `<sha> <orig> <final> [<group>]`,
//! a run of `key value` attribute lines, and the source text prefixed with a
//! tab. The parser is a two-state machine; it is idle between blocks and
//! collects attributes into a [`PendingRecord`] inside one.

use std::collections::HashMap;
use std::sync::LazyLock;

use blamecov_core::BlamecovError;
use regex::Regex;

use crate::record::{CommitRecord, PendingRecord};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-f0-9]{40})\s+\d+\s+(\d+)").expect("header regex"));

static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s(.+)").expect("attribute regex"));

/// Parse a porcelain blame stream into validated records, in stream order.
///
/// With `unique_commits` false, a header for an already-seen commit bumps
/// that record's `line_count` and its attribute block is skipped, so each
/// commit appears once. With `unique_commits` true, every blamed line yields
/// its own record.
///
/// A block that ends without source text (a new header, or end of input)
/// is closed and validated as if the text had been seen.
///
/// # Errors
///
/// Returns [`BlamecovError::IncompleteBlameRecord`] if a block lacks a
/// mandatory attribute and [`BlamecovError::InvalidInput`] if a line number
/// or `*-time` value is not an integer.
///
/// # Examples
///
/// ```
/// use blamecov_blame::parser::parse_blame_records;
///
/// let blame = "\
/// 6e3b3aec8a73da4129e83554ad5ac2f43d4ec775 1 1 1
/// author Joe Dirt
/// author-mail <joe@dirt.com>
/// author-time 1453922613
/// author-tz -0500
/// committer Joe Dirt
/// committer-mail <joe@dirt.com>
/// committer-time 1454335722
/// committer-tz -0500
/// summary Add a line
/// filename foo.py
/// \timport os
/// ";
/// let records = parse_blame_records(blame, false).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].author, "Joe Dirt");
/// assert_eq!(records[0].line_number, 1);
/// ```
pub fn parse_blame_records(
    input: &str,
    unique_commits: bool,
) -> Result<Vec<CommitRecord>, BlamecovError> {
    let mut records: Vec<CommitRecord> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut pending: Option<PendingRecord> = None;

    for line in input.lines() {
        if let Some(caps) = HEADER_RE.captures(line) {
            if let Some(open) = pending.take() {
                close_record(open, &mut records, &mut seen)?;
            }

            let uuid = &caps[1];
            if !unique_commits {
                if let Some(&idx) = seen.get(uuid) {
                    records[idx].line_count += 1;
                    continue;
                }
            }
            let line_number = caps[2].parse::<u32>().map_err(|_| {
                BlamecovError::InvalidInput(format!("invalid blame line number: {}", &caps[2]))
            })?;
            pending = Some(PendingRecord::new(uuid, line_number));
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let Some(open) = pending.take() {
                close_record(open, &mut records, &mut seen)?;
            }
        } else if let (Some(open), Some(caps)) = (pending.as_mut(), ATTRIBUTE_RE.captures(line)) {
            open.store_attribute(&caps[1], &caps[2])?;
        }
    }

    if let Some(open) = pending.take() {
        close_record(open, &mut records, &mut seen)?;
    }

    tracing::debug!(records = records.len(), unique_commits, "parsed blame");
    Ok(records)
}

fn close_record(
    pending: PendingRecord,
    records: &mut Vec<CommitRecord>,
    seen: &mut HashMap<String, usize>,
) -> Result<(), BlamecovError> {
    let record = pending.validate()?;
    seen.entry(record.uuid.clone()).or_insert(records.len());
    records.push(record);
    Ok(())
}
