//! Kubernetes backed environment
//!
//! Provisions namespaces, the control plane and the sample applications with
//! kubectl. Everything applied is recorded so teardown can release it even
//! when setup stopped half way.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::kubectl::{exec, Kubectl};
use super::template::{render_file, Vars};
use super::{namespaced, Environment};
use crate::common::{Error, Result};
use crate::harness::BranchConfig;

/// Sample application deployed into the app namespace
struct App {
    name: &'static str,
    version: &'static str,
    inject: bool,
}

const APPS: &[App] = &[
    App { name: "a", version: "v1", inject: true },
    App { name: "b", version: "v1", inject: true },
    App { name: "c", version: "v1", inject: true },
    App { name: "c", version: "v2", inject: true },
    App { name: "d", version: "v1", inject: true },
    App { name: "headless", version: "v1", inject: true },
    // Plain pod without a proxy, used to reach services from outside the mesh
    App { name: "t", version: "v1", inject: false },
];

const ROLLOUT_TIMEOUT: &str = "--timeout=300s";

/// Fixture living in a real cluster
pub struct KubeEnvironment {
    config: BranchConfig,
    kubectl: Option<Kubectl>,
    istio_namespace: String,
    app_namespace: String,
    owned_namespaces: Vec<String>,
    /// (namespace, manifest) in apply order
    applied: Vec<(String, String)>,
}

impl KubeEnvironment {
    pub fn new(config: BranchConfig) -> Self {
        let istio_namespace = config.run.istio_namespace.clone().unwrap_or_default();
        let app_namespace = config.run.namespace.clone().unwrap_or_default();
        Self {
            config,
            kubectl: None,
            istio_namespace,
            app_namespace,
            owned_namespaces: Vec::new(),
            applied: Vec::new(),
        }
    }

    fn client(&self) -> Result<&Kubectl> {
        self.kubectl
            .as_ref()
            .ok_or_else(|| Error::EnvironmentSetup("kubectl not initialised".into()))
    }

    fn template(&self, name: &str) -> PathBuf {
        self.config.run.manifests_dir.join(name)
    }

    fn vars(&self) -> Vars {
        Vars::for_branch(&self.config, &self.istio_namespace, &self.app_namespace)
    }

    /// Create a namespace with a cluster generated name
    async fn create_namespace(&mut self, prefix: &str) -> Result<String> {
        let manifest = serde_yaml::to_string(&serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {
                "generateName": prefix,
                "labels": { "istio-e2e": "true" },
            },
        }))?;
        let args = ["create", "-o", "name", "-f", "-"].map(String::from);
        let out = self.client()?.run(&args, Some(manifest)).await?;
        let name = out.trim().trim_start_matches("namespace/").to_string();
        if name.is_empty() {
            return Err(Error::EnvironmentSetup(format!(
                "namespace creation with prefix '{}' returned no name",
                prefix
            )));
        }
        info!(namespace = %name, "Created namespace");
        self.owned_namespaces.push(name.clone());
        Ok(name)
    }

    async fn apply_in(&mut self, namespace: &str, manifest: String) -> Result<()> {
        let args = namespaced(namespace, &["apply", "-f", "-"]);
        self.client()?.run(&args, Some(manifest.clone())).await?;
        self.applied.push((namespace.to_string(), manifest));
        Ok(())
    }

    async fn apply_template(&mut self, namespace: &str, template: &str) -> Result<()> {
        debug!(template, namespace, "Applying template");
        let manifest = render_file(&self.template(template), &self.vars())?;
        let namespace = namespace.to_string();
        self.apply_in(&namespace, manifest).await
    }

    async fn wait_available(&self, namespace: &str) -> Result<()> {
        let args = namespaced(
            namespace,
            &[
                "wait",
                "--for=condition=available",
                "deployment",
                "--all",
                ROLLOUT_TIMEOUT,
            ],
        );
        self.client()?.run(&args, None).await.map(|_| ())
    }

    async fn deploy_control_plane(&mut self) -> Result<()> {
        let istio = self.istio_namespace.clone();
        let main = if self.config.auth {
            "istio-auth.yaml.tmpl"
        } else {
            "istio.yaml.tmpl"
        };
        self.apply_template(&istio, main).await?;

        if self.config.run.mixer {
            self.apply_template(&istio, "mixer.yaml.tmpl").await?;
        }
        if self.config.run.use_admission_webhook {
            self.apply_template(&istio, "admission-webhook.yaml.tmpl").await?;
        }
        if self.config.run.use_automatic_injection {
            self.apply_template(&istio, "sidecar-injector.yaml.tmpl").await?;
        }

        self.wait_available(&istio).await
    }

    async fn deploy_apps(&mut self) -> Result<()> {
        let template = self.template("app.yaml.tmpl");
        let istioctl = if self.config.run.use_automatic_injection {
            None
        } else {
            Some(which::which("istioctl").map_err(|_| Error::ToolNotFound("istioctl".into()))?)
        };

        for app in APPS {
            let vars = self
                .vars()
                .with("APP", app.name)
                .with("VERSION", app.version)
                .with("INJECT", app.inject.to_string());
            let mut manifest = render_file(&template, &vars)?;

            if let (Some(istioctl), true) = (&istioctl, app.inject) {
                manifest = self.kube_inject(istioctl, manifest).await?;
            }

            let namespace = self.app_namespace.clone();
            self.apply_in(&namespace, manifest).await?;
            debug!(app = app.name, version = app.version, "Deployed app");
        }

        let namespace = self.app_namespace.clone();
        self.wait_available(&namespace).await
    }

    async fn kube_inject(&self, istioctl: &Path, manifest: String) -> Result<String> {
        let run = &self.config.run;
        let mut args = vec![
            "kube-inject".to_string(),
            "-f".to_string(),
            "-".to_string(),
            "--hub".to_string(),
            run.hub.clone(),
            "--tag".to_string(),
            run.tag.clone(),
            "-i".to_string(),
            self.istio_namespace.clone(),
        ];
        if let Some(kubeconfig) = &run.kube_config {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        exec(istioctl, &args, Some(manifest)).await
    }

    async fn pod_names(&self, namespace: &str) -> Result<Vec<String>> {
        let args = namespaced(
            namespace,
            &["get", "pods", "-o", "jsonpath={.items[*].metadata.name}"],
        );
        let out = self.client()?.run(&args, None).await?;
        Ok(out.split_whitespace().map(String::from).collect())
    }
}

#[async_trait]
impl Environment for KubeEnvironment {
    fn config(&self) -> &BranchConfig {
        &self.config
    }

    fn istio_namespace(&self) -> &str {
        &self.istio_namespace
    }

    fn app_namespace(&self) -> &str {
        &self.app_namespace
    }

    async fn setup(&mut self) -> Result<()> {
        let run = &self.config.run;
        self.kubectl = Some(Kubectl::locate(
            run.kubectl.as_deref(),
            run.kube_config.as_deref(),
        )?);

        if self.istio_namespace.is_empty() {
            self.istio_namespace = self.create_namespace("istio-system-").await?;
        }
        if self.app_namespace.is_empty() {
            self.app_namespace = self.create_namespace("istio-test-app-").await?;
        }

        if self.config.run.use_automatic_injection {
            let args = [
                "label",
                "namespace",
                self.app_namespace.as_str(),
                "istio-injection=enabled",
                "--overwrite",
            ]
            .map(String::from);
            self.client()?.run(&args, None).await?;
        }

        self.deploy_control_plane().await?;
        self.deploy_apps().await?;

        info!(
            istio_namespace = %self.istio_namespace,
            app_namespace = %self.app_namespace,
            auth = self.config.auth,
            "Environment ready"
        );
        Ok(())
    }

    async fn teardown(&mut self) {
        let Some(kubectl) = self.kubectl.clone() else {
            return;
        };

        while let Some((namespace, manifest)) = self.applied.pop() {
            let args = namespaced(&namespace, &["delete", "--ignore-not-found", "-f", "-"]);
            if let Err(e) = kubectl.run(&args, Some(manifest)).await {
                warn!(namespace = %namespace, error = %e, "Failed to delete resources");
            }
        }

        for namespace in self.owned_namespaces.drain(..) {
            let args =
                ["delete", "namespace", namespace.as_str(), "--ignore-not-found"].map(String::from);
            match kubectl.run(&args, None).await {
                Ok(_) => info!(namespace = %namespace, "Deleted namespace"),
                Err(e) => warn!(namespace = %namespace, error = %e, "Failed to delete namespace"),
            }
        }
    }

    async fn kubectl(&self, args: &[String], stdin: Option<String>) -> Result<String> {
        self.client()?.run(args, stdin).await
    }

    async fn collect_logs(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        for namespace in [&self.app_namespace, &self.istio_namespace] {
            if namespace.is_empty() {
                continue;
            }
            for pod in self.pod_names(namespace).await? {
                let args = namespaced(namespace, &["logs", pod.as_str(), "--all-containers"]);
                let logs = match self.client()?.run(&args, None).await {
                    Ok(logs) => logs,
                    Err(e) => {
                        warn!(pod = %pod, error = %e, "Failed to fetch pod logs");
                        continue;
                    }
                };
                let path = dir.join(format!("{}_{}.log", namespace, pod));
                std::fs::write(&path, logs).map_err(|e| Error::file_write(&path, e))?;
            }
        }

        info!(dir = %dir.display(), "Stored pod logs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{AuthVariant, RunConfig};

    #[test]
    fn test_new_uses_configured_namespaces() {
        let run = RunConfig {
            istio_namespace: Some("istio-system".into()),
            namespace: Some("apps".into()),
            ..Default::default()
        };
        let env = KubeEnvironment::new(run.branch(AuthVariant::NoAuth));
        assert_eq!(env.istio_namespace(), "istio-system");
        assert_eq!(env.app_namespace(), "apps");
        assert!(env.owned_namespaces.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_before_setup_is_noop() {
        let mut env = KubeEnvironment::new(RunConfig::default().branch(AuthVariant::Auth));
        env.teardown().await;
        assert!(env.applied.is_empty());
    }

    #[tokio::test]
    async fn test_setup_fails_on_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunConfig {
            istio_namespace: Some("istio-system".into()),
            namespace: Some("apps".into()),
            manifests_dir: dir.path().to_path_buf(),
            kubectl: Some(PathBuf::from("true")),
            ..Default::default()
        };
        let mut env = KubeEnvironment::new(run.branch(AuthVariant::NoAuth));
        let err = env.setup().await.unwrap_err();
        assert!(matches!(err, Error::TemplateRead { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_logs_writes_one_file_per_pod() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Stand-in kubectl: `-n <ns> get pods ...` and `-n <ns> logs <pod> ...`
        let script = dir.path().join("kubectl");
        std::fs::write(
            &script,
            "#!/bin/sh\ncase \"$3\" in\n  get) echo \"pilot-1 app-2\" ;;\n  logs) echo \"log of $2/$4\" ;;\nesac\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let run = RunConfig {
            istio_namespace: Some("istio-system".into()),
            namespace: Some("apps".into()),
            ..Default::default()
        };
        let mut env = KubeEnvironment::new(run.branch(AuthVariant::NoAuth));
        env.kubectl = Some(Kubectl::locate(Some(script.as_path()), None).unwrap());

        let out = dir.path().join("logs");
        env.collect_logs(&out).await.unwrap();

        let read = |name: &str| std::fs::read_to_string(out.join(name)).unwrap();
        assert_eq!(read("apps_pilot-1.log"), "log of apps/pilot-1\n");
        assert_eq!(read("apps_app-2.log"), "log of apps/app-2\n");
        assert_eq!(read("istio-system_pilot-1.log"), "log of istio-system/pilot-1\n");
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 4);
    }
}
