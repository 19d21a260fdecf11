//! Coverage report scanning and correlation with diffs.
//!
//! Reads the summary section of HTML coverage reports to classify each
//! source line, annotates changed lines with that status, and finds the
//! modules whose reports still list missed or partially covered lines.

pub mod discovery;
pub mod module;
pub mod scanner;
