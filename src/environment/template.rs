//! Manifest templates
//!
//! Templates are plain YAML with `{UPPER_CASE}` placeholders. Braces that do
//! not enclose an upper case identifier are copied verbatim, so inline YAML
//! maps such as `{}` survive rendering.

use std::collections::BTreeMap;
use std::path::Path;

use crate::common::{Error, Result};
use crate::harness::BranchConfig;

/// Placeholder values for one render
#[derive(Debug, Clone, Default)]
pub struct Vars(BTreeMap<&'static str, String>);

impl Vars {
    /// Values derived from a branch configuration and its namespaces
    pub fn for_branch(config: &BranchConfig, istio_namespace: &str, app_namespace: &str) -> Self {
        let run = &config.run;
        Self::default()
            .with("ISTIO_NAMESPACE", istio_namespace)
            .with("NAMESPACE", app_namespace)
            .with("HUB", &run.hub)
            .with("TAG", &run.tag)
            .with("REGISTRY", &run.registry)
            .with(
                "PROXY_IMAGE",
                if run.debug_images_and_mode {
                    "proxy_debug"
                } else {
                    "proxy"
                },
            )
            .with("VERBOSITY", run.verbosity.to_string())
            .with("DEBUG_PORT", run.debug_port.to_string())
            .with(
                "CORE_DUMP_DIR",
                run.core_files_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            )
            .with("ADMISSION_SERVICE", &run.admission_service_name)
            .with("AUTH", config.auth.to_string())
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Substitute every placeholder in `text`
pub fn render(name: &str, text: &str, vars: &Vars) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                let key = &after[..close];
                let value = vars.get(key).ok_or_else(|| Error::UnknownPlaceholder {
                    template: name.to_string(),
                    placeholder: key.to_string(),
                })?;
                out.push_str(value);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Read and render a template file
pub fn render_file(path: &Path, vars: &Vars) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::TemplateRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    render(&path.display().to_string(), &text, vars)
}

fn is_placeholder(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{AuthVariant, RunConfig};

    #[test]
    fn test_render_substitutes_and_keeps_braces() {
        let vars = Vars::default().with("HUB", "docker.io/istio").with("TAG", "0.8");
        let out = render(
            "inline",
            "image: {HUB}/pilot:{TAG}\nannotations: {}\nenv: {a: b}\n",
            &vars,
        )
        .unwrap();
        assert_eq!(
            out,
            "image: docker.io/istio/pilot:0.8\nannotations: {}\nenv: {a: b}\n"
        );
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = render("istio.yaml.tmpl", "x: {NOPE}", &Vars::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownPlaceholder { ref placeholder, .. } if placeholder == "NOPE"
        ));
    }

    #[test]
    fn test_branch_vars() {
        let run = RunConfig {
            hub: "hub".into(),
            tag: "tag".into(),
            debug_images_and_mode: false,
            ..Default::default()
        };
        let vars = Vars::for_branch(&run.branch(AuthVariant::Auth), "istio-system", "apps");
        assert_eq!(vars.get("PROXY_IMAGE"), Some("proxy"));
        assert_eq!(vars.get("NAMESPACE"), Some("apps"));
        assert_eq!(vars.get("AUTH"), Some("true"));
        assert_eq!(vars.get("CORE_DUMP_DIR"), Some(""));
    }

    #[test]
    fn test_render_file_missing() {
        let err = render_file(Path::new("/nonexistent/istio.yaml.tmpl"), &Vars::default())
            .unwrap_err();
        assert!(matches!(err, Error::TemplateRead { .. }));
    }
}
