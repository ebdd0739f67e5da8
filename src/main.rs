//! Pilot E2E - end-to-end test harness for the Pilot control plane
//!
//! Parses flags, initializes logging and runs the harness. Exits 0 when no
//! test failed (skipped runs included), non-zero otherwise.

use clap::Parser;
use pilot_e2e::commands::Commands;
use pilot_e2e::{cli, common::logging};

#[derive(Parser)]
#[command(name = "pilot-e2e", about = "Pilot end-to-end test harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli();

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_e2e::commands::RunArgs;
    use std::path::PathBuf;

    fn run_args(flags: &[&str]) -> RunArgs {
        let argv = ["pilot-e2e", "run"].iter().chain(flags);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            Commands::List => panic!("expected run"),
        }
    }

    #[test]
    fn test_unset_flags_stay_unset() {
        let args = run_args(&[]);
        assert!(args.logs.is_none());
        assert!(args.namespace.is_none());
        assert!(args.auth.is_none());
    }

    #[test]
    fn test_bool_flags_bare_and_explicit() {
        assert_eq!(run_args(&["--logs"]).logs, Some(true));
        assert_eq!(run_args(&["--logs=false"]).logs, Some(false));
        assert_eq!(run_args(&["--logs=true"]).logs, Some(true));
        assert_eq!(run_args(&["--mixer=false"]).mixer, Some(false));
        assert_eq!(run_args(&["--use-sidecar-injector"]).use_sidecar_injector, Some(true));
        assert_eq!(
            run_args(&["--skip-cleanup-on-failure"]).skip_cleanup_on_failure,
            Some(true)
        );
    }

    #[test]
    fn test_namespace_flags() {
        let args = run_args(&["-n", "apps", "--ns", "istio-system"]);
        assert_eq!(args.namespace.as_deref(), Some("apps"));
        assert_eq!(args.ns.as_deref(), Some("istio-system"));
    }

    #[test]
    fn test_valued_flags() {
        let args = run_args(&[
            "--hub",
            "docker.io/istio",
            "--tag=0.8.0",
            "--count",
            "3",
            "--auth",
            "enable",
            "--core-files-dir",
            "/var/lib/istio",
            "--errorlogsdir",
            "/tmp/logs",
            "--testtype",
            "grpc-reachability",
            "--admission-service-name",
            "pilot-webhook",
            "--debugport",
            "9000",
        ]);
        assert_eq!(args.hub.as_deref(), Some("docker.io/istio"));
        assert_eq!(args.tag.as_deref(), Some("0.8.0"));
        assert_eq!(args.count, Some(3));
        assert_eq!(args.auth.as_deref(), Some("enable"));
        assert_eq!(args.core_files_dir, Some(PathBuf::from("/var/lib/istio")));
        assert_eq!(args.errorlogsdir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(args.testtype.as_deref(), Some("grpc-reachability"));
        assert_eq!(args.admission_service_name.as_deref(), Some("pilot-webhook"));
        assert_eq!(args.debugport, Some(9000));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(Cli::try_parse_from(["pilot-e2e", "run", "--count", "many"]).is_err());
        assert!(Cli::try_parse_from(["pilot-e2e", "run", "--logs=maybe"]).is_err());
    }
}
