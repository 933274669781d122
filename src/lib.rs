//! shopinsight - natural-language questions over e-commerce metrics.
//!
//! A question is turned into SQL by a language model, the SQL is checked
//! and run read-only against the metrics store, and the rows are summarized
//! back into prose. This library exposes the core modules for the binary and
//! for integration tests.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod safety;
pub mod server;
pub mod stats;
