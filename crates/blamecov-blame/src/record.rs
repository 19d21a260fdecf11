//! Blame records: the attributes collected for one blamed line.
//!
//! A [`PendingRecord`] accumulates `key value` attribute lines while a
//! porcelain block is read; [`PendingRecord::validate`] turns it into a
//! [`CommitRecord`] once the block closes.

use std::fmt;
use std::str::FromStr;

use blamecov_core::BlamecovError;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

/// Porcelain attribute keys the aggregator keeps or knowingly drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlameAttribute {
    /// `author`: author name.
    Author,
    /// `author-mail`: author address, angle brackets included.
    AuthorMail,
    /// `author-time`: seconds since the epoch.
    AuthorTime,
    /// `author-tz`: author zone offset such as `-0500`.
    AuthorTz,
    /// `committer`: committer name.
    Committer,
    /// `committer-mail`: committer address.
    CommitterMail,
    /// `committer-time`: seconds since the epoch.
    CommitterTime,
    /// `committer-tz`: committer zone offset.
    CommitterTz,
    /// `summary`, `filename` and `previous`: recognized, never stored.
    Discarded,
}

impl FromStr for BlameAttribute {
    type Err = BlamecovError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "author" => Ok(Self::Author),
            "author-mail" => Ok(Self::AuthorMail),
            "author-time" => Ok(Self::AuthorTime),
            "author-tz" => Ok(Self::AuthorTz),
            "committer" => Ok(Self::Committer),
            "committer-mail" => Ok(Self::CommitterMail),
            "committer-time" => Ok(Self::CommitterTime),
            "committer-tz" => Ok(Self::CommitterTz),
            "summary" | "filename" | "previous" => Ok(Self::Discarded),
            other => Err(BlamecovError::InvalidInput(format!(
                "unknown blame attribute: {other}"
            ))),
        }
    }
}

/// A record whose attribute block is still being read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRecord {
    pub uuid: String,
    pub line_number: u32,
    author: Option<String>,
    author_mail: Option<String>,
    author_time: Option<i64>,
    author_tz: Option<String>,
    committer: Option<String>,
    committer_mail: Option<String>,
    committer_time: Option<i64>,
    committer_tz: Option<String>,
}

impl PendingRecord {
    /// Open a record for `uuid` at final line `line_number`.
    pub fn new(uuid: impl Into<String>, line_number: u32) -> Self {
        Self {
            uuid: uuid.into(),
            line_number,
            ..Self::default()
        }
    }

    /// Store one attribute line.
    ///
    /// Unknown keys are ignored; the porcelain format grows new keys
    /// (`boundary`, `encoding`) that carry nothing the reports use.
    ///
    /// # Errors
    ///
    /// Returns [`BlamecovError::InvalidInput`] if a `*-time` value is not an
    /// integer.
    pub fn store_attribute(&mut self, key: &str, value: &str) -> Result<(), BlamecovError> {
        let Ok(attribute) = key.parse::<BlameAttribute>() else {
            tracing::trace!(key, uuid = %self.uuid, "ignoring blame attribute");
            return Ok(());
        };
        let value = value.to_string();
        match attribute {
            BlameAttribute::Author => self.author = Some(value),
            BlameAttribute::AuthorMail => self.author_mail = Some(value),
            BlameAttribute::AuthorTime => self.author_time = Some(parse_time(key, &value)?),
            BlameAttribute::AuthorTz => self.author_tz = Some(value),
            BlameAttribute::Committer => self.committer = Some(value),
            BlameAttribute::CommitterMail => self.committer_mail = Some(value),
            BlameAttribute::CommitterTime => {
                self.committer_time = Some(parse_time(key, &value)?);
            }
            BlameAttribute::CommitterTz => self.committer_tz = Some(value),
            BlameAttribute::Discarded => {}
        }
        Ok(())
    }

    /// Check that every mandatory attribute was seen.
    ///
    /// Missing fields are reported in a fixed order, first failure wins.
    ///
    /// # Errors
    ///
    /// Returns [`BlamecovError::IncompleteBlameRecord`] naming the first
    /// missing field.
    pub fn validate(self) -> Result<CommitRecord, BlamecovError> {
        let uuid = self.uuid;
        let missing = |reason: &str| BlamecovError::IncompleteBlameRecord {
            uuid: uuid.clone(),
            reason: reason.to_string(),
        };

        let (Some(author_time), Some(author_tz)) = (self.author_time, self.author_tz) else {
            return Err(missing("Missing author time information"));
        };
        let (Some(committer_time), Some(committer_tz)) = (self.committer_time, self.committer_tz)
        else {
            return Err(missing("Missing committer time information"));
        };
        let author = self.author.ok_or_else(|| missing("Missing author name"))?;
        let author_mail = self
            .author_mail
            .ok_or_else(|| missing("Missing author email"))?;
        let committer = self
            .committer
            .ok_or_else(|| missing("Missing committer name"))?;
        let committer_mail = self
            .committer_mail
            .ok_or_else(|| missing("Missing committer email"))?;

        Ok(CommitRecord {
            uuid,
            line_number: self.line_number,
            line_count: 1,
            author,
            author_mail,
            author_time,
            author_tz,
            committer,
            committer_mail,
            committer_time,
            committer_tz,
            lines: None,
        })
    }
}

fn parse_time(key: &str, value: &str) -> Result<i64, BlamecovError> {
    value
        .trim()
        .parse()
        .map_err(|_| BlamecovError::InvalidInput(format!("invalid {key} value: {value}")))
}

/// A validated blame record.
///
/// # Examples
///
/// ```
/// use blamecov_blame::record::PendingRecord;
///
/// let mut pending = PendingRecord::new("6e3b3aec8a73da4129e83554ad5ac2f43d4ec775", 1794);
/// for (key, value) in [
///     ("author", "Joe Dirt"),
///     ("author-mail", "<joe@dirt.com>"),
///     ("author-time", "1453922613"),
///     ("author-tz", "-0500"),
///     ("committer", "Joe Dirt"),
///     ("committer-mail", "<joe@dirt.com>"),
///     ("committer-time", "1454335722"),
///     ("committer-tz", "-0500"),
/// ] {
///     pending.store_attribute(key, value).unwrap();
/// }
/// let record = pending.validate().unwrap();
/// assert_eq!(record.short_uuid(), "6e3b3aec");
/// assert_eq!(record.date(), "2016-02-01 09:08:42 -0500");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub uuid: String,
    /// Final line number of the first line attributed to this record.
    pub line_number: u32,
    /// Lines attributed to this record.
    pub line_count: u32,
    pub author: String,
    pub author_mail: String,
    pub author_time: i64,
    pub author_tz: String,
    pub committer: String,
    pub committer_mail: String,
    pub committer_time: i64,
    pub committer_tz: String,
    /// Line span (`"N"` or `"N-M"`) once grouped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<String>,
}

impl CommitRecord {
    /// First eight characters of the commit id.
    pub fn short_uuid(&self) -> &str {
        self.uuid.get(..8).unwrap_or(&self.uuid)
    }

    /// Commit date in the committer's zone, with time and zone.
    pub fn date(&self) -> String {
        date_to_str(self.committer_time, &self.committer_tz, true)
    }

    /// One detail line with `count` in the count column.
    ///
    /// Verbose output appends the author mail, the time of day and the
    /// committer identity.
    pub fn show(&self, count: &str, verbose: bool) -> String {
        let commit_date = date_to_str(self.committer_time, &self.committer_tz, verbose);
        if verbose {
            let author = format!("{} {}", self.author, self.author_mail);
            format!(
                "    {} {:>5} {:<50} {} {} {}",
                self.short_uuid(),
                count,
                author,
                commit_date,
                self.committer,
                self.committer_mail
            )
        } else {
            format!(
                "    {} {:>5} {:<25} {}",
                self.short_uuid(),
                count,
                self.author,
                commit_date
            )
        }
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:5} {} {} {}",
            self.short_uuid(),
            self.line_count,
            self.author,
            self.author_mail,
            self.date()
        )
    }
}

/// Parse a `+HHMM`/`-HHMM` zone; anything else is treated as UTC.
fn parse_offset(tz: &str) -> FixedOffset {
    let utc = Utc.fix();
    let (sign, digits) = match tz.as_bytes().first() {
        Some(b'-') => (-1, &tz[1..]),
        Some(b'+') => (1, &tz[1..]),
        _ => (1, tz),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return utc;
    }
    let hours: i32 = digits[..2].parse().unwrap_or(0);
    let minutes: i32 = digits[2..].parse().unwrap_or(0);
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).unwrap_or(utc)
}

/// Render a unix timestamp in the given zone.
///
/// Verbose: `YYYY-mm-dd HH:MM:SS ±HHMM`; otherwise `YYYY-mm-dd`.
///
/// # Examples
///
/// ```
/// use blamecov_blame::record::date_to_str;
///
/// assert_eq!(date_to_str(1454335722, "-0500", false), "2016-02-01");
/// assert_eq!(date_to_str(1456193499, "-0500", true), "2016-02-22 21:11:39 -0500");
/// ```
pub fn date_to_str(timestamp: i64, tz: &str, verbose: bool) -> String {
    let Some(utc) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
        return timestamp.to_string();
    };
    let local = utc.with_timezone(&parse_offset(tz));
    if verbose {
        format!("{} {tz}", local.format("%Y-%m-%d %H:%M:%S"))
    } else {
        local.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "6e3b3aec8a73da4129e83554ad5ac2f43d4ec775";

    fn complete() -> PendingRecord {
        let mut pending = PendingRecord::new(UUID, 1794);
        for (key, value) in [
            ("author", "Joe Dirt"),
            ("author-mail", "joe@dirt.com"),
            ("author-time", "1453922613"),
            ("author-tz", "-0500"),
            ("committer", "Patty Python"),
            ("committer-mail", "patty.python.com"),
            ("committer-time", "1454335722"),
            ("committer-tz", "-0500"),
        ] {
            pending.store_attribute(key, value).unwrap();
        }
        pending
    }

    fn reason(pending: PendingRecord) -> String {
        match pending.validate().unwrap_err() {
            BlamecovError::IncompleteBlameRecord { reason, .. } => reason,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validates_complete_record() {
        let record = complete().validate().unwrap();
        assert_eq!(record.line_number, 1794);
        assert_eq!(record.line_count, 1);
        assert_eq!(record.author_time, 1453922613);
        assert_eq!(record.committer_tz, "-0500");
        assert_eq!(record.lines, None);
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        assert_eq!(
            reason(PendingRecord::new(UUID, 1)),
            "Missing author time information"
        );

        let mut pending = complete();
        pending.author_tz = None;
        assert_eq!(reason(pending), "Missing author time information");

        let mut pending = complete();
        pending.committer_time = None;
        pending.author = None;
        assert_eq!(reason(pending), "Missing committer time information");

        let mut pending = complete();
        pending.author = None;
        pending.committer_mail = None;
        assert_eq!(reason(pending), "Missing author name");

        let mut pending = complete();
        pending.author_mail = None;
        assert_eq!(reason(pending), "Missing author email");

        let mut pending = complete();
        pending.committer = None;
        assert_eq!(reason(pending), "Missing committer name");

        let mut pending = complete();
        pending.committer_mail = None;
        assert_eq!(reason(pending), "Missing committer email");
    }

    #[test]
    fn discarded_and_unknown_keys_store_nothing() {
        let mut pending = PendingRecord::new(UUID, 1);
        pending.store_attribute("summary", "Fix it").unwrap();
        pending.store_attribute("filename", "foo.py").unwrap();
        pending.store_attribute("previous", "abc foo.py").unwrap();
        pending.store_attribute("boundary", "1").unwrap();
        assert_eq!(pending, PendingRecord::new(UUID, 1));
    }

    #[test]
    fn non_numeric_time_is_invalid_input() {
        let mut pending = PendingRecord::new(UUID, 1);
        let err = pending.store_attribute("author-time", "yesterday").unwrap_err();
        assert!(matches!(err, BlamecovError::InvalidInput(_)));
    }

    #[test]
    fn show_plain_line() {
        let mut record = complete().validate().unwrap();
        record.line_count = 10;
        assert_eq!(
            record.show("10", false),
            "    6e3b3aec    10 Joe Dirt                  2016-02-01"
        );
    }

    #[test]
    fn show_verbose_line() {
        let record = complete().validate().unwrap();
        assert_eq!(
            record.show("10", true),
            "    6e3b3aec    10 Joe Dirt joe@dirt.com                              \
             2016-02-01 09:08:42 -0500 Patty Python patty.python.com"
        );
    }

    #[test]
    fn dates_follow_the_committer_zone() {
        assert_eq!(date_to_str(1454335722, "-0500", true), "2016-02-01 09:08:42 -0500");
        assert_eq!(date_to_str(1427468897, "+0000", false), "2015-03-27");
        assert_eq!(date_to_str(0, "+0530", true), "1970-01-01 05:30:00 +0530");
    }

    #[test]
    fn invalid_zone_falls_back_to_utc() {
        assert_eq!(date_to_str(0, "bogus", true), "1970-01-01 00:00:00 bogus");
    }

    #[test]
    fn serializes_camel_case_without_empty_span() {
        let record = complete().validate().unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["authorMail"], "joe@dirt.com");
        assert_eq!(json["committerTime"], 1454335722);
        assert!(json.get("lines").is_none());
    }
}
