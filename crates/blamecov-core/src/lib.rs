//! Core types, configuration, and error handling for blamecov.
//!
//! This crate provides the shared foundation used by the other crates:
//! - [`BlamecovError`]: unified error type using `thiserror`
//! - [`BlamecovConfig`]: configuration loaded from `.blamecov.toml`
//! - [`make_ranges`]: the contiguous range builder
//! - Shared types: [`DiffRange`], [`LineStatus`], [`SortOrder`], [`OutputFormat`]

mod config;
mod error;
mod ranges;
pub mod telemetry;
mod types;

pub use config::{BlamecovConfig, CoverageConfig, DiffConfig, OwnersConfig};
pub use error::BlamecovError;
pub use ranges::{build_line_range_filter, make_ranges};
pub use types::{DiffRange, LineStatus, OutputFormat, SortOrder};

/// A convenience `Result` type for blamecov operations.
pub type Result<T> = std::result::Result<T, BlamecovError>;
