//! Pre-flight skip policy
//!
//! Decides whether the run should be attempted at all. A skip means the
//! harness is not configured to run here; nothing is provisioned.

use super::config::{AuthMode, RunConfig};

/// Check the run preconditions in order, returning the first skip reason
pub fn skip_reason(config: &RunConfig) -> Option<String> {
    if let Some(reason) = missing_prerequisite(config) {
        return Some(reason);
    }

    if let Some(namespace) = &config.namespace {
        if config.auth_mode == AuthMode::Both {
            return Some(format!(
                "When namespace(={}) is specified, auth mode(={}) must be one of enable or disable. Skipping tests.",
                namespace, config.auth_mode
            ));
        }
    }

    None
}

/// Cluster credentials and images, which do not depend on the auth mode
pub(super) fn missing_prerequisite(config: &RunConfig) -> Option<String> {
    if config.kube_config.is_none() {
        return Some("Env variable KUBECONFIG not set. Skipping tests".to_string());
    }

    if config.hub.is_empty() {
        return Some("HUB not specified. Skipping tests".to_string());
    }

    if config.tag.is_empty() {
        return Some("TAG not specified. Skipping tests".to_string());
    }

    None
}
