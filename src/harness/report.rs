//! Run report
//!
//! A tree of named units (run, branch, case attempt), each carrying its own
//! status so a multi-case run yields granular pass/fail/skip data.

use colored::Colorize;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use crate::common::{Error, Result};

/// Final status of a named unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "PASS"),
            Status::Failed => write!(f, "FAIL"),
            Status::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Outcome of one named unit and its children
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UnitReport>,
    #[serde(skip)]
    started: Option<Instant>,
}

impl UnitReport {
    /// Start a new unit; it passes unless something marks it otherwise
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Passed,
            errors: Vec::new(),
            skip_reason: None,
            elapsed_ms: 0,
            children: Vec::new(),
            started: Some(Instant::now()),
        }
    }

    /// Record an error against this unit and mark it failed
    pub fn fail(&mut self, error: impl fmt::Display) {
        self.errors.push(error.to_string());
        self.status = Status::Failed;
    }

    /// Mark the unit skipped; a failed unit stays failed
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.skip_reason = Some(reason.into());
        if self.status != Status::Failed {
            self.status = Status::Skipped;
        }
    }

    /// Attach a finished child; a failing child fails its parent
    pub fn push(&mut self, child: UnitReport) {
        if child.failed() {
            self.status = Status::Failed;
        }
        self.children.push(child);
    }

    /// Stop the clock
    pub fn finish(mut self) -> Self {
        if let Some(started) = self.started.take() {
            self.elapsed_ms = started.elapsed().as_millis() as u64;
        }
        self
    }

    pub fn failed(&self) -> bool {
        self.status == Status::Failed
    }

    /// Find a direct child by name
    pub fn child(&self, name: &str) -> Option<&UnitReport> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Count leaf outcomes
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        self.collect(&mut summary);
        summary
    }

    fn collect(&self, summary: &mut Summary) {
        if self.children.is_empty() {
            match self.status {
                Status::Passed => summary.passed += 1,
                Status::Failed => summary.failed += 1,
                Status::Skipped => summary.skipped += 1,
            }
        } else {
            for child in &self.children {
                child.collect(summary);
            }
        }
    }

    /// Print the tree in `go test -v` style
    pub fn print(&self) {
        self.print_at(0);
        let summary = self.summary();
        println!(
            "\n{} passed, {} failed, {} skipped",
            summary.passed.to_string().green(),
            summary.failed.to_string().red(),
            summary.skipped.to_string().yellow()
        );
    }

    fn print_at(&self, depth: usize) {
        let indent = "    ".repeat(depth);
        let marker = match self.status {
            Status::Passed => "✓".green(),
            Status::Failed => "✗".red(),
            Status::Skipped => "-".yellow(),
        };
        println!(
            "{}{} {} {}",
            indent,
            marker,
            self.name.white().bold(),
            format!("({:.2}s)", self.elapsed_ms as f64 / 1000.0).dimmed()
        );
        if let Some(reason) = &self.skip_reason {
            println!("{}    {}", indent, reason.dimmed());
        }
        for error in &self.errors {
            println!("{}    {}", indent, error.red());
        }
        for child in &self.children {
            child.print_at(depth + 1);
        }
    }

    /// Write the tree as JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::file_write(path, e))
    }
}

/// Leaf outcome counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}
