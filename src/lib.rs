//! Pilot E2E - end-to-end test harness for the Pilot control plane
//!
//! This library provisions a mesh test environment per auth mode, runs the
//! registered integration cases against it and reports per case outcomes.

pub mod cases;
pub mod cli;
pub mod commands;
pub mod common;
pub mod environment;
pub mod harness;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use harness::{Harness, RunConfig, UnitReport};
