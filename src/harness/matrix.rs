//! Auth matrix
//!
//! Top level of a run: applies the skip policy, then executes one branch per
//! auth variant the configuration asks for, no-auth first.

use tracing::info;

use super::config::RunConfig;
use super::preflight::skip_reason;
use super::report::UnitReport;
use super::runner::run_branch;
use crate::cases::TestCase;
use crate::environment::EnvironmentFactory;

/// Name of the root unit in the report
pub const RUN_NAME: &str = "TestPilot";

/// A resolved run: configuration, case registry and environment factory
pub struct Harness {
    config: RunConfig,
    cases: Vec<Box<dyn TestCase>>,
    factory: Box<dyn EnvironmentFactory>,
}

impl Harness {
    pub fn new(
        config: RunConfig,
        cases: Vec<Box<dyn TestCase>>,
        factory: Box<dyn EnvironmentFactory>,
    ) -> Self {
        Self {
            config,
            cases,
            factory,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute every required branch and collect their reports
    ///
    /// Branches are independent: a failing branch never stops the next one
    /// from starting.
    pub async fn run(&self) -> UnitReport {
        let mut root = UnitReport::start(RUN_NAME);

        if let Some(reason) = skip_reason(&self.config) {
            info!(reason = %reason, "Skipping run");
            root.skip(reason);
            return root.finish();
        }

        for variant in self.config.auth_mode.variants() {
            let branch = self.config.branch(*variant);
            let report = run_branch(branch, self.factory.as_ref(), &self.cases).await;
            info!(branch = %variant, status = %report.status, "Branch finished");
            root.push(report);
        }

        root.finish()
    }
}
