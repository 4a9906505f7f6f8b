use std::path::PathBuf;

use thiserror::Error;

/// Failures while opening the database or bringing its schema up to date.
///
/// Every variant raised while a specific migration was in flight carries that
/// migration's version so the caller can report which step broke.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("failed to open database at {}: {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("storage error while {operation}{}: {source}", for_version(.version))]
    Storage {
        operation: &'static str,
        version: Option<String>,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration {version} is already recorded in the history table")]
    DuplicateVersion { version: String },

    #[error("invalid migration catalog: {0}")]
    InvalidCatalog(String),
}

impl MigrationError {
    pub(crate) fn storage(operation: &'static str, source: rusqlite::Error) -> Self {
        Self::Storage {
            operation,
            version: None,
            source,
        }
    }

    pub(crate) fn storage_for(
        operation: &'static str,
        version: &str,
        source: rusqlite::Error,
    ) -> Self {
        Self::Storage {
            operation,
            version: Some(version.to_string()),
            source,
        }
    }

    /// The migration version involved, when the failure is tied to one.
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Storage { version, .. } => version.as_deref(),
            Self::DuplicateVersion { version } => Some(version),
            Self::Connection { .. } | Self::InvalidCatalog(_) => None,
        }
    }
}

fn for_version(version: &Option<String>) -> String {
    match version {
        Some(v) => format!(" (migration {v})"),
        None => String::new(),
    }
}

impl From<MigrationError> for taskdeck_common::Error {
    fn from(e: MigrationError) -> Self {
        taskdeck_common::Error::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_display_names_the_version() {
        let e = MigrationError::storage_for(
            "applying migration",
            "1.0.1",
            rusqlite::Error::InvalidQuery,
        );
        assert_eq!(e.version(), Some("1.0.1"));
        assert!(
            e.to_string()
                .starts_with("storage error while applying migration (migration 1.0.1): ")
        );

        let e = MigrationError::storage("reading history", rusqlite::Error::InvalidQuery);
        assert_eq!(e.version(), None);
        assert!(e.to_string().starts_with("storage error while reading history: "));
    }

    #[test]
    fn duplicate_version_converts_to_database_error() {
        let e = MigrationError::DuplicateVersion {
            version: "1.0.0".into(),
        };
        assert_eq!(e.version(), Some("1.0.0"));
        let common: taskdeck_common::Error = e.into();
        assert_eq!(
            common.to_string(),
            "database error: migration 1.0.0 is already recorded in the history table"
        );
    }
}
