//! Core domain types for the serverless benchmark pipeline.
//!
//! Canonical invocation records, CPU label normalisation, the per-provider
//! cost model, percentile statistics and the CLI settings shared by the data
//! layer and the `faas-bench` binary.

pub mod cpus;
pub mod data_processors;
pub mod error;
pub mod models;
pub mod pricing;
pub mod settings;
pub mod stats;

pub use error::{BenchError, Result};
