//! Test environments
//!
//! An environment is the shared fixture a branch tests against: namespaces,
//! the deployed control plane and the sample applications. Each auth branch
//! builds its own through an [`EnvironmentFactory`].

mod kube;
mod kubectl;
pub mod template;

pub use kube::KubeEnvironment;
pub use kubectl::Kubectl;

use async_trait::async_trait;
use std::path::Path;

use crate::common::Result;
use crate::harness::BranchConfig;

/// Lifecycle and access to one provisioned fixture
#[async_trait]
pub trait Environment: Send + Sync {
    /// Resolved configuration of the branch owning this environment
    fn config(&self) -> &BranchConfig;

    /// Namespace the control plane runs in
    fn istio_namespace(&self) -> &str;

    /// Namespace the sample applications run in
    fn app_namespace(&self) -> &str;

    /// Provision the fixture
    async fn setup(&mut self) -> Result<()>;

    /// Release everything setup acquired; failures are logged, never raised
    async fn teardown(&mut self);

    /// Run a kubectl command against the fixture's cluster
    async fn kubectl(&self, args: &[String], stdin: Option<String>) -> Result<String>;

    /// Store per pod logs under `dir` for post mortem
    async fn collect_logs(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    /// Apply a rendered manifest in the app namespace
    async fn apply(&self, manifest: &str) -> Result<()> {
        let args = namespaced(self.app_namespace(), &["apply", "-f", "-"]);
        self.kubectl(&args, Some(manifest.to_string())).await.map(|_| ())
    }

    /// Delete the resources of a rendered manifest in the app namespace
    async fn delete(&self, manifest: &str) -> Result<()> {
        let args = namespaced(
            self.app_namespace(),
            &["delete", "--ignore-not-found", "-f", "-"],
        );
        self.kubectl(&args, Some(manifest.to_string())).await.map(|_| ())
    }
}

/// Builds a fresh environment for one branch
pub trait EnvironmentFactory: Send + Sync {
    fn create(&self, config: BranchConfig) -> Box<dyn Environment>;
}

impl<F> EnvironmentFactory for F
where
    F: Fn(BranchConfig) -> Box<dyn Environment> + Send + Sync,
{
    fn create(&self, config: BranchConfig) -> Box<dyn Environment> {
        self(config)
    }
}

/// Prefix kubectl arguments with `-n <namespace>`
pub fn namespaced(namespace: &str, args: &[&str]) -> Vec<String> {
    let mut out = vec!["-n".to_string(), namespace.to_string()];
    out.extend(args.iter().map(|a| a.to_string()));
    out
}
