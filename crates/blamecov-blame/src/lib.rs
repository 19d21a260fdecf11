//! Blame aggregation: who owns a file, or the lines coverage missed.
//!
//! Parses `git blame --line-porcelain` output into validated
//! [`record::CommitRecord`]s, orders and merges them per file, and renders
//! ownership reports through the [`owners::OwnersStrategy`] implementations.

pub mod aggregate;
pub mod owners;
pub mod parser;
pub mod record;
