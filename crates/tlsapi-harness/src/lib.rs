//! Conformance harness for the TLS configuration/session lifecycle API.
//!
//! This crate provides:
//! - Checkers for method allocation, context lifecycle, credential and
//!   trust-store loading, and session creation
//! - Crash trapping and RAII guards so every object is released on every path
//! - A census-based resource audit per checker
//! - Report generation: plain text, markdown and JSON
//! - Structured JSONL logs with an artifact index

#![forbid(unsafe_code)]

pub mod audit;
pub mod checks;
pub mod config;
pub mod error;
pub mod fault;
pub mod guard;
pub mod recorder;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use config::{Expectations, FixturePaths, HarnessConfig};
pub use error::HarnessError;
pub use report::{ApiReport, QuirkNote};
pub use runner::ApiTestRunner;
pub use verify::{RunSummary, SubTestResult, Verdict};
