use std::path::{Path, PathBuf};

use taskdeck_common::{Error, Result};
use tracing::{debug, info};

use crate::model::{AppConfig, default_home_dir};

const CANDIDATE_FILES: &[&str] = &["config.yml", "config.yaml", "config.toml"];

/// Locates and parses the taskdeck config file.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `path` if given (it must exist), otherwise from the first
    /// config file found in `~/.taskdeck`, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        match path {
            Some(path) => Self::load_file(path),
            None => match Self::discover(&default_home_dir()) {
                Some(found) => Self::load_file(&found),
                None => {
                    debug!("no config file found, using defaults");
                    Ok(AppConfig::default())
                }
            },
        }
    }

    /// First existing candidate config file inside `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CANDIDATE_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn load_file(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::parse(path, &contents)?;
        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Parse `contents` in the format implied by the extension of `path`.
    pub fn parse(path: &Path, contents: &str) -> Result<AppConfig> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yml" | "yaml" => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
            "toml" => toml::from_str(contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}"))),
            other => Err(Error::Config(format!(
                "unsupported config extension: {other}"
            ))),
        }
    }
}
