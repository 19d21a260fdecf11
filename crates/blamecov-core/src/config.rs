use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BlamecovError;
use crate::types::SortOrder;

/// Top-level configuration loaded from `.blamecov.toml`.
///
/// Resolution order: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use blamecov_core::BlamecovConfig;
///
/// let config = BlamecovConfig::default();
/// assert_eq!(config.owners.max, 5);
/// assert_eq!(config.diff.context_lines, 3);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlamecovConfig {
    /// Where coverage reports live.
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// How diffs are requested from git.
    #[serde(default)]
    pub diff: DiffConfig,
    /// Ownership report defaults.
    #[serde(default)]
    pub owners: OwnersConfig,
}

impl BlamecovConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BlamecovError::Io`] if the file cannot be read, or
    /// [`BlamecovError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use blamecov_core::BlamecovConfig;
    /// use std::path::Path;
    ///
    /// let config = BlamecovConfig::from_file(Path::new(".blamecov.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, BlamecovError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`BlamecovError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use blamecov_core::BlamecovConfig;
    ///
    /// let toml = r#"
    /// [owners]
    /// max = 10
    /// "#;
    /// let config = BlamecovConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.owners.max, 10);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, BlamecovError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Coverage report location.
///
/// # Examples
///
/// ```
/// use blamecov_core::CoverageConfig;
///
/// let config = CoverageConfig::default();
/// assert_eq!(config.report_dir.to_str(), Some("cover"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Directory holding the HTML reports, relative to the repository root.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("cover")
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
        }
    }
}

/// Options passed to `git diff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Lines of context around each hunk (default: 3).
    #[serde(default = "default_context_lines")]
    pub context_lines: u32,
    /// Ignore whitespace-only changes (default: true).
    #[serde(default = "default_true")]
    pub ignore_whitespace: bool,
}

fn default_context_lines() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            ignore_whitespace: true,
        }
    }
}

/// Ownership report defaults.
///
/// # Examples
///
/// ```
/// use blamecov_core::{OwnersConfig, SortOrder};
///
/// let config = OwnersConfig::default();
/// assert_eq!(config.sort, SortOrder::Date);
/// assert!(!config.details);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnersConfig {
    /// Report ordering (default: date).
    #[serde(default)]
    pub sort: SortOrder,
    /// Maximum owners shown per file; 0 shows all (default: 5).
    #[serde(default = "default_max_owners")]
    pub max: usize,
    /// Print one line per commit record.
    #[serde(default)]
    pub details: bool,
    /// Include mail addresses and committer details.
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_owners() -> usize {
    5
}

impl Default for OwnersConfig {
    fn default() -> Self {
        Self {
            sort: SortOrder::default(),
            max: default_max_owners(),
            details: false,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = BlamecovConfig::default();
        assert_eq!(config.coverage.report_dir, PathBuf::from("cover"));
        assert_eq!(config.diff.context_lines, 3);
        assert!(config.diff.ignore_whitespace);
        assert_eq!(config.owners.sort, SortOrder::Date);
        assert_eq!(config.owners.max, 5);
        assert!(!config.owners.details);
        assert!(!config.owners.verbose);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[coverage]
report_dir = "build/htmlcov"

[diff]
context_lines = 5
ignore_whitespace = false

[owners]
sort = "size"
max = 0
details = true
verbose = true
"#;
        let config = BlamecovConfig::from_toml(toml).unwrap();
        assert_eq!(config.coverage.report_dir, PathBuf::from("build/htmlcov"));
        assert_eq!(config.diff.context_lines, 5);
        assert!(!config.diff.ignore_whitespace);
        assert_eq!(config.owners.sort, SortOrder::Size);
        assert_eq!(config.owners.max, 0);
        assert!(config.owners.details);
        assert!(config.owners.verbose);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = BlamecovConfig::from_toml("[owners]\nsort = \"cover\"\n").unwrap();
        assert_eq!(config.owners.sort, SortOrder::Cover);
        assert_eq!(config.owners.max, 5);
        assert_eq!(config.diff.context_lines, 3);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = BlamecovConfig::from_toml("").unwrap();
        assert_eq!(config.owners.max, 5);
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(BlamecovConfig::from_toml("{{invalid}}").is_err());
        assert!(BlamecovConfig::from_toml("[owners]\nsort = \"alphabet\"\n").is_err());
    }
}
