use std::path::PathBuf;

/// Errors that can occur across the blamecov workspace.
///
/// The four engine failures (`InvalidInput`, `MalformedDiff`,
/// `IncompleteBlameRecord`, `SourceFileNotFound`) are fatal to the current
/// file only; callers decide whether to continue with the next one. The
/// remaining variants wrap the ambient I/O, configuration and git layers.
///
/// # Examples
///
/// ```
/// use blamecov_core::BlamecovError;
///
/// let err = BlamecovError::MalformedDiff("@@ -x +y @@".into());
/// assert!(err.to_string().contains("@@ -x +y @@"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum BlamecovError {
    /// Caller supplied input that violates a precondition.
    #[error("invalid input: {0}")]
    #[diagnostic(code(blamecov::invalid_input))]
    InvalidInput(String),

    /// A unified diff that could not be parsed.
    #[error("malformed diff: {0}")]
    #[diagnostic(code(blamecov::malformed_diff))]
    MalformedDiff(String),

    /// A blame record closed without all mandatory attributes.
    #[error("incomplete blame record {uuid}: {reason}")]
    #[diagnostic(code(blamecov::incomplete_blame_record))]
    IncompleteBlameRecord {
        /// Commit the record belongs to.
        uuid: String,
        /// First missing field, e.g. `Missing author name`.
        reason: String,
    },

    /// A coverage report names a source file absent from the working tree.
    #[error("source file {file} not found at {}", .area.display())]
    #[diagnostic(
        code(blamecov::source_not_found),
        help("run blamecov from the project root that produced the coverage report")
    )]
    SourceFileNotFound {
        /// Base name of the missing file.
        file: String,
        /// Directory that was searched.
        area: PathBuf,
    },

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git invocation or repository access failure.
    #[error("git error: {0}")]
    Git(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BlamecovError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = BlamecovError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn incomplete_record_names_missing_field() {
        let err = BlamecovError::IncompleteBlameRecord {
            uuid: "6e3b3aec".into(),
            reason: "Missing author name".into(),
        };
        assert_eq!(
            err.to_string(),
            "incomplete blame record 6e3b3aec: Missing author name"
        );
    }

    #[test]
    fn source_not_found_shows_file_and_area() {
        let err = BlamecovError::SourceFileNotFound {
            file: "mod.py".into(),
            area: PathBuf::from("/tmp/project/pkg"),
        };
        let msg = err.to_string();
        assert!(msg.contains("mod.py"));
        assert!(msg.contains("/tmp/project/pkg"));
    }
}
