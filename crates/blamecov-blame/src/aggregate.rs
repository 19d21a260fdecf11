//! Ordering and merging of one file's blame records.

use std::collections::{BTreeSet, HashSet};

use crate::record::CommitRecord;

/// Newest commit first. Stable, so equal dates keep stream order.
pub fn sort_by_date(mut records: Vec<CommitRecord>) -> Vec<CommitRecord> {
    records.sort_by(|a, b| b.committer_time.cmp(&a.committer_time));
    records
}

/// Merge the commits of one author into a single record.
///
/// The newest commit represents the author (the earliest of equally new
/// ones), carrying the sum of all line counts. Returns `None` for an empty
/// group.
///
/// # Examples
///
/// ```
/// use blamecov_blame::aggregate::merge_user_commits;
/// # use blamecov_blame::record::PendingRecord;
/// # fn record(time: &str, count: u32) -> blamecov_blame::record::CommitRecord {
/// #     let mut p = PendingRecord::new("6e3b3aec8a73da4129e83554ad5ac2f43d4ec775", 1);
/// #     for (k, v) in [("author", "Joe"), ("author-mail", "joe@dirt.com"),
/// #         ("author-time", "0"), ("author-tz", "+0000"), ("committer", "Joe"),
/// #         ("committer-mail", "joe@dirt.com"), ("committer-time", time),
/// #         ("committer-tz", "+0000")] { p.store_attribute(k, v).unwrap(); }
/// #     let mut r = p.validate().unwrap();
/// #     r.line_count = count;
/// #     r
/// # }
///
/// let merged = merge_user_commits([record("100", 50), record("200", 60)]).unwrap();
/// assert_eq!(merged.committer_time, 200);
/// assert_eq!(merged.line_count, 110);
/// ```
pub fn merge_user_commits<I>(commits: I) -> Option<CommitRecord>
where
    I: IntoIterator<Item = CommitRecord>,
{
    commits.into_iter().reduce(|mut current, mut commit| {
        if commit.committer_time > current.committer_time {
            commit.line_count += current.line_count;
            commit
        } else {
            current.line_count += commit.line_count;
            current
        }
    })
}

/// One record per author (keyed by mail), largest line count first.
pub fn sort_by_size(mut records: Vec<CommitRecord>) -> Vec<CommitRecord> {
    records.sort_by(|a, b| a.author_mail.cmp(&b.author_mail));
    let mut users: Vec<CommitRecord> = records
        .chunk_by(|a, b| a.author_mail == b.author_mail)
        .filter_map(|group| merge_user_commits(group.iter().cloned()))
        .collect();
    users.sort_by(|a, b| b.line_count.cmp(&a.line_count));
    users
}

/// Collapse runs of consecutive lines from the same commit into spans.
///
/// Records are taken in the order blame emitted them. Each span keeps its
/// first record, with `lines` set to `"N"` or `"N-M"` and `line_count` set to
/// the span length.
pub fn group_contiguous(records: Vec<CommitRecord>) -> Vec<CommitRecord> {
    let mut spans: Vec<(CommitRecord, u32)> = Vec::new();
    for record in records {
        if let Some((first, end)) = spans.last_mut() {
            if first.uuid == record.uuid && record.line_number == *end + 1 {
                *end = record.line_number;
                continue;
            }
        }
        let end = record.line_number;
        spans.push((record, end));
    }

    spans
        .into_iter()
        .map(|(mut record, end)| {
            let start = record.line_number;
            record.lines = Some(if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            });
            record.line_count = end - start + 1;
            record
        })
        .collect()
}

/// Distinct author names in first-seen order.
pub fn unique_authors(records: &[CommitRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.author.as_str()))
        .map(|r| r.author.clone())
        .collect()
}

/// Deduplicate names and order them by surname.
///
/// The surname is the last whitespace-separated token, compared without
/// case; names with equal surnames fall back to the full name.
///
/// # Examples
///
/// ```
/// use blamecov_blame::aggregate::sort_by_name;
///
/// let names = sort_by_name(["Peter", "paul", "Mary", "paul"]);
/// assert_eq!(names, vec!["Mary", "paul", "Peter"]);
/// ```
pub fn sort_by_name<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let unique: BTreeSet<String> = names.into_iter().map(Into::into).collect();
    let mut names: Vec<String> = unique.into_iter().collect();
    names.sort_by(|a, b| surname_key(a).cmp(&surname_key(b)).then_with(|| a.cmp(b)));
    names
}

fn surname_key(name: &str) -> String {
    name.split_whitespace()
        .last()
        .unwrap_or_default()
        .to_uppercase()
}
