//! Probe driven test case
//!
//! A probe execs the echo client inside a source app's pod and expects a
//! given status code back. Each request carries a unique `x-request-id` so
//! the destination proxy's access log can be checked for it.

use async_trait::async_trait;
use tracing::{debug, info};

use super::TestCase;
use crate::common::{Error, Result};
use crate::environment::template::{render, render_file, Vars};
use crate::environment::{namespaced, Environment};

/// One request issued from a source app
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// App the request originates from
    pub src: &'static str,
    /// Target URL; may contain template placeholders
    pub url: &'static str,
    /// Expected status code
    pub expect: u16,
    /// App whose proxy must have logged the request
    pub dst: Option<&'static str>,
}

impl Probe {
    pub const fn new(src: &'static str, url: &'static str, expect: u16) -> Self {
        Self {
            src,
            url,
            expect,
            dst: None,
        }
    }

    pub const fn logged_by(self, dst: &'static str) -> Self {
        Self {
            dst: Some(dst),
            ..self
        }
    }
}

/// A case made of fixtures and probes
#[derive(Debug, Clone, Copy)]
pub struct ProbeCase {
    pub name: &'static str,
    /// Templates under `testdata/<rules version>/` applied for the case
    pub fixtures: &'static [&'static str],
    pub probes: &'static [Probe],
}

impl ProbeCase {
    fn vars(env: &dyn Environment) -> Vars {
        Vars::for_branch(env.config(), env.istio_namespace(), env.app_namespace())
    }

    fn render_fixtures(&self, env: &dyn Environment) -> Result<Vec<String>> {
        let dir = env
            .config()
            .run
            .manifests_dir
            .join("testdata")
            .join(env.config().rules_version());
        let vars = Self::vars(env);
        self.fixtures
            .iter()
            .map(|fixture| render_file(&dir.join(fixture), &vars))
            .collect()
    }

    fn request_id(&self, index: usize) -> String {
        format!("{}-{}", self.name, index)
    }

    async fn send(&self, env: &dyn Environment, probe: &Probe, id: &str) -> Result<()> {
        let url = render(self.name, probe.url, &Self::vars(env))?;
        let deployment = format!("deploy/{}-v1", probe.src);
        let args = namespaced(
            env.app_namespace(),
            &[
                "exec",
                deployment.as_str(),
                "-c",
                "app",
                "--",
                "client",
                "-url",
                url.as_str(),
                "-key",
                "x-request-id",
                "-val",
                id,
            ],
        );

        let out = env.kubectl(&args, None).await?;
        let wanted = format!("StatusCode={}", probe.expect);
        if out.lines().any(|line| line.contains(&wanted)) {
            debug!(case = self.name, src = probe.src, url = %url, "Probe passed");
            Ok(())
        } else {
            Err(Error::TestAssertion(format!(
                "{} -> {}: expected {}, got {}",
                probe.src,
                url,
                wanted,
                status_line(&out)
            )))
        }
    }

    async fn check_logged(&self, env: &dyn Environment, dst: &str, id: &str) -> Result<()> {
        let deployment = format!("deploy/{}-v1", dst);
        let args = namespaced(
            env.app_namespace(),
            &["logs", deployment.as_str(), "-c", "istio-proxy"],
        );
        let logs = env.kubectl(&args, None).await?;
        if logs.contains(id) {
            Ok(())
        } else {
            Err(Error::TestAssertion(format!(
                "request {} missing from {} proxy log",
                id, dst
            )))
        }
    }
}

fn status_line(output: &str) -> &str {
    output
        .lines()
        .find(|line| line.contains("StatusCode="))
        .map(str::trim)
        .unwrap_or("no status")
}

#[async_trait]
impl TestCase for ProbeCase {
    fn name(&self) -> &str {
        self.name
    }

    async fn setup(&self, env: &dyn Environment) -> Result<()> {
        for manifest in self.render_fixtures(env)? {
            env.apply(&manifest).await?;
        }
        Ok(())
    }

    async fn run(&self, env: &dyn Environment) -> Result<()> {
        let mut failures = Vec::new();

        for (index, probe) in self.probes.iter().enumerate() {
            let id = self.request_id(index);
            if let Err(e) = self.send(env, probe, &id).await {
                failures.push(e.to_string());
                continue;
            }
            if let (true, Some(dst)) = (env.config().run.check_logs, probe.dst) {
                if let Err(e) = self.check_logged(env, dst, &id).await {
                    failures.push(e.to_string());
                }
            }
        }

        if failures.is_empty() {
            info!(case = self.name, probes = self.probes.len(), "All probes passed");
            Ok(())
        } else {
            Err(Error::TestAssertion(failures.join("; ")))
        }
    }

    async fn teardown(&self, env: &dyn Environment) -> Result<()> {
        for manifest in self.render_fixtures(env)?.iter().rev() {
            env.delete(manifest).await?;
        }
        Ok(())
    }
}
