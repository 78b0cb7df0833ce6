//! Data layer for the serverless benchmark pipeline.
//!
//! Discovers and parses benchmark log units, reconciles them with provider
//! billing exports, filters comparison cohorts and summarises them per CPU.

pub mod aggregator;
pub mod analysis;
pub mod billing;
pub mod filter;
pub mod parser;
pub mod reader;
