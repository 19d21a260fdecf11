//! Unified diff parsing.
//!
//! Reconstructs the exact post-image line numbers of every hunk, marking
//! each line as unchanged context or an addition, so changed lines can be
//! correlated with coverage reports and blame traces.

pub mod parser;
