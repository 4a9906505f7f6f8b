use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default SQLite busy timeout. Another taskdeck process holding the write
/// lock (e.g. while migrating) is waited on for this long.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub const DATABASE_FILE_NAME: &str = "tasks.db";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database (and logs unless `log.dir` is set).
    /// Defaults to `~/.taskdeck/data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `taskdeck_db=debug`. `RUST_LOG` wins.
    pub level: String,
    /// Also append log lines to a dated file under `dir`.
    pub file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            dir: None,
        }
    }
}

impl AppConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| default_home_dir().join("data"))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(DATABASE_FILE_NAME))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log
            .dir
            .clone()
            .unwrap_or_else(|| default_home_dir().join("logs"))
    }
}

/// `~/.taskdeck`, falling back to the working directory when no home is known.
pub fn default_home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".taskdeck")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_prefers_explicit_path() {
        let mut config = AppConfig::default();
        config.data_dir = Some(PathBuf::from("/srv/taskdeck"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/taskdeck/tasks.db")
        );

        config.database.path = Some(PathBuf::from("/tmp/other.db"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn defaults_enable_file_logging_at_info() {
        let config = AppConfig::default();
        assert_eq!(config.log.level, "info");
        assert!(config.log.file);
        assert_eq!(config.database.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert!(config.log_dir().ends_with(".taskdeck/logs"));
    }
}
