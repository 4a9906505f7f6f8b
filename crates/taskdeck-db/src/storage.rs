use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use taskdeck_config::DatabaseConfig;
use tracing::{debug, info};

use crate::error::MigrationError;

/// Open (creating if absent) the database file at `path`.
///
/// Missing parent directories are created as well. The connection gets the
/// configured busy timeout so that a second process waits for a concurrent
/// migration instead of failing straight away.
pub fn open_connection(path: &Path, config: &DatabaseConfig) -> Result<Connection, MigrationError> {
    info!("opening database at {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MigrationError::Connection {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
    }

    let conn = Connection::open(path).map_err(|e| MigrationError::Connection {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| MigrationError::storage("setting busy timeout", e))?;
    apply_pragmas(&conn)?;

    debug!(
        "database ready at {} (busy timeout {}ms)",
        path.display(),
        config.busy_timeout_ms
    );
    Ok(conn)
}

/// Open an existing database without write access, for inspection.
///
/// Returns `None` when there is no file yet; nothing is created on disk and
/// no pragma that would change the file is issued.
pub fn open_read_only(
    path: &Path,
    config: &DatabaseConfig,
) -> Result<Option<Connection>, MigrationError> {
    if !path.is_file() {
        debug!("no database at {}", path.display());
        return Ok(None);
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| MigrationError::Connection {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| MigrationError::storage("setting busy timeout", e))?;
    Ok(Some(conn))
}

pub fn open_in_memory() -> Result<Connection, MigrationError> {
    let conn = Connection::open_in_memory().map_err(|e| MigrationError::Connection {
        path: ":memory:".into(),
        source: Box::new(e),
    })?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<(), MigrationError> {
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .map_err(|e| MigrationError::storage("setting pragmas", e))
}
