//! E2E harness
//!
//! Resolves the run configuration, decides between skipping and running,
//! and drives the auth matrix of branches, each against its own environment.

mod config;
mod matrix;
mod preflight;
mod report;
mod runner;

pub use config::{AuthMode, AuthVariant, BranchConfig, RunConfig};
pub use matrix::{Harness, RUN_NAME};
pub use preflight::skip_reason;
pub use report::{Status, Summary, UnitReport};
pub use runner::{attempt_name, run_branch};
