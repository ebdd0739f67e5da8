//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use colored::Colorize;

use crate::cases;
use crate::commands::{Commands, RunArgs};
use crate::common::config::Defaults;
use crate::common::Result;
use crate::environment::{Environment, KubeEnvironment};
use crate::harness::{BranchConfig, Harness, RunConfig};

/// Dispatch a CLI command, returning whether everything passed
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run(args) => run(args).await,
        Commands::List => {
            for (index, case) in cases::registry().iter().enumerate() {
                println!("{:3}  {}", index + 1, case.name());
            }
            Ok(true)
        }
    }
}

async fn run(args: RunArgs) -> Result<bool> {
    let defaults = Defaults::load(args.config.as_deref())?;
    let config = RunConfig::resolve(&args, &defaults.run, |key| std::env::var(key).ok())?;

    let factory = |config: BranchConfig| -> Box<dyn Environment> {
        Box::new(KubeEnvironment::new(config))
    };
    let harness = Harness::new(config, cases::registry(), Box::new(factory));

    println!(
        "\n{} {}",
        "Running:".blue().bold(),
        format!("auth={}", harness.config().auth_mode).white().bold()
    );

    let report = harness.run().await;
    report.print();

    if let Some(path) = &args.report {
        report.write_json(path)?;
        println!("Report written to {}", path.display().to_string().dimmed());
    }

    Ok(!report.failed())
}
