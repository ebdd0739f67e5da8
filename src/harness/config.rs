//! Run configuration
//!
//! A [`RunConfig`] is resolved once from the command line, the defaults file
//! and the process environment, and is never mutated afterwards. Each auth
//! branch receives its own [`BranchConfig`] holding a value copy.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::commands::RunArgs;
use crate::common::config::RunDefaults;
use crate::common::paths::default_manifests_dir;

use super::preflight::missing_prerequisite;
use crate::common::{Error, Result};

/// Which auth variants a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Enable,
    Disable,
    Both,
}

impl AuthMode {
    /// Branches to execute for this mode, in execution order
    pub fn variants(self) -> &'static [AuthVariant] {
        match self {
            AuthMode::Enable => &[AuthVariant::Auth],
            AuthMode::Disable => &[AuthVariant::NoAuth],
            AuthMode::Both => &[AuthVariant::NoAuth, AuthVariant::Auth],
        }
    }
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enable" => Ok(AuthMode::Enable),
            "disable" => Ok(AuthMode::Disable),
            "both" => Ok(AuthMode::Both),
            other => Err(Error::UnknownAuthMode(other.to_string())),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Enable => write!(f, "enable"),
            AuthMode::Disable => write!(f, "disable"),
            AuthMode::Both => write!(f, "both"),
        }
    }
}

/// One side of the auth matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthVariant {
    NoAuth,
    Auth,
}

impl AuthVariant {
    /// Name of the branch unit in the report
    pub fn name(self) -> &'static str {
        match self {
            AuthVariant::NoAuth => "NoAuth",
            AuthVariant::Auth => "Auth",
        }
    }
}

impl fmt::Display for AuthVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable parameters of one harness invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub hub: String,
    pub tag: String,
    /// Istio namespace; `None` means a temporary one is created
    pub istio_namespace: Option<String>,
    /// Application namespace; `None` means a temporary one is created
    pub namespace: Option<String>,
    pub registry: String,
    pub verbosity: u8,
    pub check_logs: bool,
    pub kube_config: Option<PathBuf>,
    pub test_count: u32,
    pub auth_mode: AuthMode,
    pub mixer: bool,
    pub v1alpha1: bool,
    pub v1alpha2: bool,
    pub error_logs_dir: Option<PathBuf>,
    pub core_files_dir: Option<PathBuf>,
    /// Single case to run; `None` runs the whole registry
    pub selected_test: Option<String>,
    pub use_automatic_injection: bool,
    pub use_admission_webhook: bool,
    pub admission_service_name: String,
    pub debug_port: u16,
    pub debug_images_and_mode: bool,
    pub skip_cleanup: bool,
    pub skip_cleanup_on_failure: bool,
    pub manifests_dir: PathBuf,
    pub kubectl: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            hub: String::new(),
            tag: String::new(),
            istio_namespace: None,
            namespace: None,
            registry: "kube".to_string(),
            verbosity: 2,
            check_logs: false,
            kube_config: None,
            test_count: 1,
            auth_mode: AuthMode::Both,
            mixer: true,
            v1alpha1: true,
            v1alpha2: false,
            error_logs_dir: None,
            core_files_dir: None,
            selected_test: None,
            use_automatic_injection: false,
            use_admission_webhook: false,
            admission_service_name: "istio-pilot".to_string(),
            debug_port: 0,
            debug_images_and_mode: true,
            skip_cleanup: false,
            skip_cleanup_on_failure: false,
            manifests_dir: default_manifests_dir(),
            kubectl: None,
        }
    }
}

impl RunConfig {
    /// Merge command line flags over the defaults file over the environment
    ///
    /// `env` looks up process environment variables (`HUB`, `TAG`,
    /// `KUBECONFIG`). Only value assignment and the checks that decide
    /// whether a run can be attempted at all happen here.
    ///
    /// An unrecognized auth mode is fatal only when the cluster credentials
    /// and images are present. Otherwise the run resolves with the default
    /// mode and is skipped before it starts.
    pub fn resolve<F>(args: &RunArgs, defaults: &RunDefaults, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();

        let (auth_mode, auth_error) = match pick(args.auth.clone(), defaults.auth.clone()) {
            Some(mode) => match mode.parse::<AuthMode>() {
                Ok(mode) => (mode, None),
                Err(e) => (base.auth_mode, Some(e)),
            },
            None => (base.auth_mode, None),
        };

        let test_count = pick(args.count, defaults.count).unwrap_or(base.test_count);
        if test_count == 0 {
            return Err(Error::Config("count must be at least 1".to_string()));
        }

        let verbose = pick(args.verbose, defaults.verbose).unwrap_or(false);

        let config = Self {
            hub: pick(args.hub.clone(), defaults.hub.clone())
                .or_else(|| env("HUB"))
                .unwrap_or(base.hub),
            tag: pick(args.tag.clone(), defaults.tag.clone())
                .or_else(|| env("TAG"))
                .unwrap_or(base.tag),
            istio_namespace: non_empty(pick(args.ns.clone(), defaults.ns.clone())),
            namespace: non_empty(pick(args.namespace.clone(), defaults.namespace.clone())),
            registry: pick(args.registry.clone(), defaults.registry.clone())
                .unwrap_or(base.registry),
            verbosity: if verbose { 3 } else { base.verbosity },
            check_logs: pick(args.logs, defaults.logs).unwrap_or(base.check_logs),
            kube_config: pick(args.kubeconfig.clone(), defaults.kubeconfig.clone())
                .or_else(|| env("KUBECONFIG").map(PathBuf::from))
                .filter(|p| !p.as_os_str().is_empty()),
            test_count,
            auth_mode,
            mixer: pick(args.mixer, defaults.mixer).unwrap_or(base.mixer),
            v1alpha1: pick(args.v1alpha1, defaults.v1alpha1).unwrap_or(base.v1alpha1),
            v1alpha2: pick(args.v1alpha2, defaults.v1alpha2).unwrap_or(base.v1alpha2),
            error_logs_dir: pick(args.errorlogsdir.clone(), defaults.errorlogsdir.clone())
                .filter(|p| !p.as_os_str().is_empty()),
            core_files_dir: pick(args.core_files_dir.clone(), defaults.core_files_dir.clone())
                .filter(|p| !p.as_os_str().is_empty()),
            selected_test: non_empty(pick(args.testtype.clone(), defaults.testtype.clone())),
            use_automatic_injection: pick(args.use_sidecar_injector, defaults.use_sidecar_injector)
                .unwrap_or(base.use_automatic_injection),
            use_admission_webhook: pick(args.use_admission_webhook, defaults.use_admission_webhook)
                .unwrap_or(base.use_admission_webhook),
            admission_service_name: pick(
                args.admission_service_name.clone(),
                defaults.admission_service_name.clone(),
            )
            .unwrap_or(base.admission_service_name),
            debug_port: pick(args.debugport, defaults.debugport).unwrap_or(base.debug_port),
            debug_images_and_mode: pick(args.debug, defaults.debug)
                .unwrap_or(base.debug_images_and_mode),
            skip_cleanup: pick(args.skip_cleanup, defaults.skip_cleanup)
                .unwrap_or(base.skip_cleanup),
            skip_cleanup_on_failure: pick(
                args.skip_cleanup_on_failure,
                defaults.skip_cleanup_on_failure,
            )
            .unwrap_or(base.skip_cleanup_on_failure),
            manifests_dir: pick(args.manifests.clone(), defaults.manifests.clone())
                .unwrap_or(base.manifests_dir),
            kubectl: pick(args.kubectl.clone(), defaults.kubectl.clone()),
        };

        match auth_error {
            Some(e) if missing_prerequisite(&config).is_none() => Err(e),
            _ => Ok(config),
        }
    }

    /// Whether a case with this name takes part in the run
    pub fn is_selected(&self, name: &str) -> bool {
        self.selected_test.as_deref().map_or(true, |selected| selected == name)
    }

    /// Derive the configuration for one branch of the auth matrix
    pub fn branch(&self, variant: AuthVariant) -> BranchConfig {
        BranchConfig {
            auth: variant == AuthVariant::Auth,
            run: self.clone(),
        }
    }
}

/// Configuration of a single auth branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchConfig {
    pub auth: bool,
    #[serde(flatten)]
    pub run: RunConfig,
}

impl BranchConfig {
    pub fn variant(&self) -> AuthVariant {
        if self.auth {
            AuthVariant::Auth
        } else {
            AuthVariant::NoAuth
        }
    }

    /// Routing rule API version directory used by case fixtures
    ///
    /// Only one rule set is applied per branch. v1alpha2 is used when it is
    /// the only version enabled; in every other combination v1alpha1 wins.
    pub fn rules_version(&self) -> &'static str {
        if self.run.v1alpha2 && !self.run.v1alpha1 {
            "v1alpha2"
        } else {
            "v1alpha1"
        }
    }
}

fn pick<T>(flag: Option<T>, default: Option<T>) -> Option<T> {
    flag.or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_input() {
        let config =
            RunConfig::resolve(&RunArgs::default(), &RunDefaults::default(), env_of(&[])).unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.auth_mode, AuthMode::Both);
        assert_eq!(config.test_count, 1);
    }

    #[test]
    fn test_flag_beats_file_beats_env() {
        let args = RunArgs {
            hub: Some("flag-hub".into()),
            ..Default::default()
        };
        let defaults = RunDefaults {
            hub: Some("file-hub".into()),
            tag: Some("file-tag".into()),
            ..Default::default()
        };
        let config = RunConfig::resolve(
            &args,
            &defaults,
            env_of(&[("HUB", "env-hub"), ("TAG", "env-tag"), ("KUBECONFIG", "/kube")]),
        )
        .unwrap();

        assert_eq!(config.hub, "flag-hub");
        assert_eq!(config.tag, "file-tag");
        assert_eq!(config.kube_config, Some(PathBuf::from("/kube")));
    }

    #[test]
    fn test_unknown_auth_mode_is_fatal() {
        let args = RunArgs {
            auth: Some("sometimes".into()),
            namespace: Some("apps".into()),
            ..Default::default()
        };
        let env = env_of(&[("HUB", "hub"), ("TAG", "tag"), ("KUBECONFIG", "/kube")]);
        let err = RunConfig::resolve(&args, &RunDefaults::default(), env).unwrap_err();
        assert!(matches!(err, Error::UnknownAuthMode(ref m) if m == "sometimes"));
    }

    #[test]
    fn test_unknown_auth_mode_without_kubeconfig_resolves() {
        let args = RunArgs {
            auth: Some("bogus".into()),
            ..Default::default()
        };
        let config = RunConfig::resolve(
            &args,
            &RunDefaults::default(),
            env_of(&[("HUB", "hub"), ("TAG", "tag")]),
        )
        .unwrap();
        assert!(config.kube_config.is_none());
        assert_eq!(config.auth_mode, AuthMode::Both);

        // Missing images skip before the auth mode matters as well
        let config = RunConfig::resolve(
            &args,
            &RunDefaults::default(),
            env_of(&[("KUBECONFIG", "/kube"), ("TAG", "tag")]),
        )
        .unwrap();
        assert!(config.hub.is_empty());
    }

    #[test]
    fn test_zero_count_rejected() {
        let args = RunArgs {
            count: Some(0),
            ..Default::default()
        };
        assert!(RunConfig::resolve(&args, &RunDefaults::default(), env_of(&[])).is_err());
    }

    #[test]
    fn test_empty_strings_normalized() {
        let args = RunArgs {
            namespace: Some(String::new()),
            testtype: Some(String::new()),
            kubeconfig: Some(PathBuf::new()),
            ..Default::default()
        };
        let config = RunConfig::resolve(&args, &RunDefaults::default(), env_of(&[])).unwrap();
        assert!(config.namespace.is_none());
        assert!(config.selected_test.is_none());
        assert!(config.kube_config.is_none());
    }

    #[test]
    fn test_verbose_raises_proxy_verbosity() {
        let args = RunArgs {
            verbose: Some(true),
            ..Default::default()
        };
        let config = RunConfig::resolve(&args, &RunDefaults::default(), env_of(&[])).unwrap();
        assert_eq!(config.verbosity, 3);
    }

    #[test]
    fn test_variants_order() {
        assert_eq!(
            AuthMode::Both.variants(),
            &[AuthVariant::NoAuth, AuthVariant::Auth]
        );
        assert_eq!(AuthMode::Enable.variants(), &[AuthVariant::Auth]);
        assert_eq!(AuthMode::Disable.variants(), &[AuthVariant::NoAuth]);
    }

    #[test]
    fn test_branches_differ_only_in_auth() {
        let config = RunConfig {
            hub: "hub".into(),
            ..Default::default()
        };
        let no_auth = config.branch(AuthVariant::NoAuth);
        let auth = config.branch(AuthVariant::Auth);

        assert!(!no_auth.auth);
        assert!(auth.auth);
        assert_eq!(no_auth.run, auth.run);
        assert_eq!(auth.variant(), AuthVariant::Auth);
    }

    #[test]
    fn test_rules_version_prefers_v1alpha1() {
        let version = |v1alpha1, v1alpha2| {
            RunConfig {
                v1alpha1,
                v1alpha2,
                ..Default::default()
            }
            .branch(AuthVariant::NoAuth)
            .rules_version()
        };
        assert_eq!(version(true, false), "v1alpha1");
        assert_eq!(version(true, true), "v1alpha1");
        assert_eq!(version(false, true), "v1alpha2");
        assert_eq!(version(false, false), "v1alpha1");
    }

    #[test]
    fn test_selection() {
        let mut config = RunConfig::default();
        assert!(config.is_selected("http"));
        config.selected_test = Some("grpc".into());
        assert!(!config.is_selected("http"));
        assert!(config.is_selected("grpc"));
    }
}
