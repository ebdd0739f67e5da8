//! Branch runner
//!
//! Drives one auth branch: builds its environment, runs every selected case
//! the configured number of times and always releases what was acquired.

use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

use super::config::BranchConfig;
use super::report::UnitReport;
use crate::cases::TestCase;
use crate::common::{Error, Result};
use crate::environment::{Environment, EnvironmentFactory};

/// Run one branch against a fresh environment
pub async fn run_branch(
    config: BranchConfig,
    factory: &dyn EnvironmentFactory,
    cases: &[Box<dyn TestCase>],
) -> UnitReport {
    let branch = config.variant().name();
    let mut unit = UnitReport::start(branch);

    match serde_yaml::to_string(&config) {
        Ok(dump) => info!(branch, "Deploying infrastructure\n{}", dump),
        Err(e) => warn!(branch, error = %e, "Could not render configuration"),
    }

    let mut env = factory.create(config);

    match guarded("environment setup", env.setup()).await {
        Ok(()) => run_cases(env.as_ref(), cases, &mut unit).await,
        Err(e) => {
            error!(branch, error = %e, "Environment setup failed");
            unit.fail(Error::EnvironmentSetup(e.to_string()));
        }
    }

    release(env.as_mut(), unit.failed()).await;
    unit.finish()
}

async fn run_cases(env: &dyn Environment, cases: &[Box<dyn TestCase>], unit: &mut UnitReport) {
    let run = &env.config().run;

    if let Some(selected) = &run.selected_test {
        if !cases.iter().any(|case| case.name() == selected) {
            warn!(selected = %selected, "Selected test matches no registered case");
        }
    }

    for case in cases {
        if !run.is_selected(case.name()) {
            continue;
        }

        for attempt in 1..=run.test_count {
            let name = attempt_name(case.name(), attempt, run.test_count);
            unit.push(run_attempt(env, case.as_ref(), name).await);
        }
    }
}

/// Name of one repetition; only repeated runs carry the attempt suffix
pub fn attempt_name(case: &str, attempt: u32, count: u32) -> String {
    if count > 1 {
        format!("{}_attempt_{}", case, attempt)
    } else {
        case.to_string()
    }
}

async fn run_attempt(env: &dyn Environment, case: &dyn TestCase, name: String) -> UnitReport {
    let mut unit = UnitReport::start(name);
    info!(test = %unit.name, "Running test");

    if let Err(e) = guarded("test setup", case.setup(env)).await {
        error!(test = %unit.name, error = %e, "Test setup failed");
        unit.fail(Error::case_setup(case.name(), &e));
        return unit.finish();
    }

    if let Err(e) = guarded("test run", case.run(env)).await {
        error!(test = %unit.name, error = %e, "Test failed");
        unit.fail(e);
    }

    if let Err(e) = guarded("test teardown", case.teardown(env)).await {
        warn!(test = %unit.name, error = %e, "Test teardown failed");
    }

    unit.finish()
}

/// Tear the environment down unless cleanup is suppressed
async fn release(env: &mut dyn Environment, failed: bool) {
    let run = env.config().run.clone();

    if failed {
        if let Some(dir) = &run.error_logs_dir {
            if let Err(e) = guarded("log collection", env.collect_logs(dir)).await {
                warn!(dir = %dir.display(), error = %e, "Failed to collect pod logs");
            }
        }
    }

    if run.skip_cleanup {
        warn!("Skipping cleanup as requested");
        return;
    }
    if failed && run.skip_cleanup_on_failure {
        warn!("Skipping cleanup after failure as requested");
        return;
    }

    let teardown = async {
        env.teardown().await;
        Ok::<(), Error>(())
    };
    if let Err(e) = guarded("environment teardown", teardown).await {
        warn!(error = %e, "Environment teardown aborted");
    }
}

/// Await a step, turning a panic into an error of that step
async fn guarded<T, F>(step: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::Panicked(step.to_string(), panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
