//! Error types for the e2e harness
//!
//! Configuration errors abort the whole run. Everything raised while a
//! branch or a test case is executing is recorded against the narrowest
//! named unit in the report instead of being propagated.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid defaults file '{path}': {message}")]
    ConfigParse { path: String, message: String },

    #[error("Unknown auth mode(={0}). Choose from enable, disable, both")]
    UnknownAuthMode(String),

    // === Tooling Errors ===
    #[error("Required tool '{0}' not found in PATH")]
    ToolNotFound(String),

    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    // === Manifest Errors ===
    #[error("Failed to read template '{path}': {error}")]
    TemplateRead { path: String, error: String },

    #[error("Template '{template}' references unknown placeholder '{placeholder}'")]
    UnknownPlaceholder { template: String, placeholder: String },

    // === Environment Errors ===
    #[error("Environment setup failed: {0}")]
    EnvironmentSetup(String),

    // === Test Case Errors ===
    #[error("Test case '{case}' setup failed: {message}")]
    CaseSetup { case: String, message: String },

    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    #[error("{0} panicked: {1}")]
    Panicked(String, String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a command failed error
    pub fn command_failed(command: &str, message: &str) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            message: message.trim().to_string(),
        }
    }

    /// Create a case setup error
    pub fn case_setup(case: &str, source: &Error) -> Self {
        Self::CaseSetup {
            case: case.to_string(),
            message: source.to_string(),
        }
    }

    /// Create a file write error
    pub fn file_write(path: &Path, error: io::Error) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
