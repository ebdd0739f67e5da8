//! Configuration and working paths

use std::path::PathBuf;

/// Name used for the project directories
const APP_NAME: &str = "pilot-e2e";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/pilot-e2e/`
/// - macOS: `~/Library/Application Support/pilot-e2e/`
/// - Windows: `%APPDATA%\pilot-e2e\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the defaults file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Default directory holding the manifest templates
pub fn default_manifests_dir() -> PathBuf {
    PathBuf::from("install").join("kubernetes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
        }
    }
}
