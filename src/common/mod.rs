//! Common utilities shared by the harness, environments and test cases

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
