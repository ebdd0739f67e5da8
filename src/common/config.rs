//! Defaults file handling
//!
//! The defaults file is a TOML document with a single `[run]` table whose
//! keys mirror the long command line flags. Anything set on the command line
//! wins over the file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Top level layout of the defaults file
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Defaults {
    /// Defaults for `pilot-e2e run`
    #[serde(default)]
    pub run: RunDefaults,
}

/// Per flag defaults; every key is optional
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RunDefaults {
    pub hub: Option<String>,
    pub tag: Option<String>,
    pub ns: Option<String>,
    pub namespace: Option<String>,
    pub registry: Option<String>,
    pub verbose: Option<bool>,
    pub logs: Option<bool>,
    pub kubeconfig: Option<PathBuf>,
    pub count: Option<u32>,
    pub auth: Option<String>,
    pub mixer: Option<bool>,
    pub v1alpha1: Option<bool>,
    pub v1alpha2: Option<bool>,
    pub errorlogsdir: Option<PathBuf>,
    pub core_files_dir: Option<PathBuf>,
    pub testtype: Option<String>,
    pub use_sidecar_injector: Option<bool>,
    pub use_admission_webhook: Option<bool>,
    pub admission_service_name: Option<String>,
    pub debugport: Option<u16>,
    pub debug: Option<bool>,
    pub skip_cleanup: Option<bool>,
    pub skip_cleanup_on_failure: Option<bool>,
    pub manifests: Option<PathBuf>,
    pub kubectl: Option<PathBuf>,
}

impl Defaults {
    /// Load the defaults file
    ///
    /// An explicitly requested file must exist. Without one, the platform
    /// config path is tried and an empty set of defaults is returned when it
    /// is absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a defaults file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| Error::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_run_table() {
        let defaults = Defaults::parse(
            r#"
[run]
hub = "gcr.io/istio-testing"
tag = "latest"
count = 3
skip-cleanup = true
use-sidecar-injector = true
"#,
        )
        .unwrap();

        assert_eq!(defaults.run.hub.as_deref(), Some("gcr.io/istio-testing"));
        assert_eq!(defaults.run.count, Some(3));
        assert_eq!(defaults.run.skip_cleanup, Some(true));
        assert_eq!(defaults.run.use_sidecar_injector, Some(true));
        assert!(defaults.run.auth.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Defaults::parse("[run]\nhubb = \"x\"\n").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Defaults::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[run]\nauth = \"enable\"").unwrap();

        let defaults = Defaults::from_file(file.path()).unwrap();
        assert_eq!(defaults.run.auth.as_deref(), Some("enable"));
    }
}
