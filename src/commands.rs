//! CLI command definitions
//!
//! Defines the clap commands for the e2e harness. Every run flag is optional
//! so that unset flags fall through to the defaults file and the environment.
//! Boolean flags accept both `--logs` and `--logs=false`.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the mesh and run the registered test cases
    Run(RunArgs),

    /// List the registered test cases in execution order
    List,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Defaults file (TOML with a [run] table)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Docker hub
    #[arg(long)]
    pub hub: Option<String>,

    /// Docker tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Namespace in which to install Istio components (empty to create/delete temporary one)
    #[arg(long)]
    pub ns: Option<String>,

    /// Namespace in which to install the applications (empty to create/delete temporary one)
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// Pilot registry
    #[arg(long)]
    pub registry: Option<String>,

    /// Debug level noise from proxies
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub verbose: Option<bool>,

    /// Validate pod logs (expensive in long-running tests)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub logs: Option<bool>,

    /// Kube config file; the run is skipped when unset
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Number of times to run each test
    #[arg(long)]
    pub count: Option<u32>,

    /// Auth mode for the tests (enable, disable, both)
    #[arg(long)]
    pub auth: Option<String>,

    /// Enable / disable mixer
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub mixer: Option<bool>,

    /// Enable / disable v1alpha1 routing rules
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub v1alpha1: Option<bool>,

    /// Enable / disable v1alpha2 routing rules
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub v1alpha2: Option<bool>,

    /// Store per pod logs as individual files in this directory on failure
    #[arg(long)]
    pub errorlogsdir: Option<PathBuf>,

    /// Copy core files to this directory on the Kubernetes node machine
    #[arg(long = "core-files-dir")]
    pub core_files_dir: Option<PathBuf>,

    /// Select test to run (default is all tests)
    #[arg(long)]
    pub testtype: Option<String>,

    /// Use automatic sidecar injector
    #[arg(long = "use-sidecar-injector", num_args = 0..=1, default_missing_value = "true")]
    pub use_sidecar_injector: Option<bool>,

    /// Use k8s external admission webhook for config validation
    #[arg(long = "use-admission-webhook", num_args = 0..=1, default_missing_value = "true")]
    pub use_admission_webhook: Option<bool>,

    /// Name of admission webhook service name
    #[arg(long = "admission-service-name")]
    pub admission_service_name: Option<String>,

    /// Debugging port
    #[arg(long)]
    pub debugport: Option<u16>,

    /// Use debug images and mode (false for prod)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub debug: Option<bool>,

    /// Debug, skip clean up
    #[arg(long = "skip-cleanup", num_args = 0..=1, default_missing_value = "true")]
    pub skip_cleanup: Option<bool>,

    /// Debug, skip clean up on failure
    #[arg(long = "skip-cleanup-on-failure", num_args = 0..=1, default_missing_value = "true")]
    pub skip_cleanup_on_failure: Option<bool>,

    /// Directory holding the manifest templates
    #[arg(long)]
    pub manifests: Option<PathBuf>,

    /// kubectl binary (default: found in PATH)
    #[arg(long)]
    pub kubectl: Option<PathBuf>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}
