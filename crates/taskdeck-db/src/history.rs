//! Access to the `__MigrationHistory` table.
//!
//! The table lives in the same database the migrations change. Rows are
//! append-only: one per applied version, never updated or pruned.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, Row, params};
use serde::Serialize;

use crate::error::MigrationError;

pub const HISTORY_TABLE: &str = "__MigrationHistory";

/// A persisted history row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub version: String,
    pub description: String,
    pub applied_on: DateTime<Utc>,
}

/// Create the history table if it does not exist yet. Safe on every startup.
pub fn ensure_table(conn: &Connection) -> Result<(), MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS __MigrationHistory (
            version TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            applied_on TIMESTAMP NOT NULL
        );",
    )
    .map_err(|e| MigrationError::storage("creating the migration history table", e))
}

pub fn table_exists(conn: &Connection) -> Result<bool, MigrationError> {
    conn.query_row(
        "SELECT count(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
        params![HISTORY_TABLE],
        |row| row.get(0),
    )
    .map_err(|e| MigrationError::storage("checking for the migration history table", e))
}

/// Every recorded version. Empty on a freshly created table.
pub fn applied_versions(conn: &Connection) -> Result<BTreeSet<String>, MigrationError> {
    let read = |e: rusqlite::Error| MigrationError::storage("reading applied migrations", e);

    let mut stmt = conn
        .prepare("SELECT version FROM __MigrationHistory")
        .map_err(read)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(read)?;

    rows.collect::<std::result::Result<BTreeSet<_>, _>>()
        .map_err(read)
}

/// Insert one history row.
///
/// A second row for the same version violates the primary key and comes back
/// as [`MigrationError::DuplicateVersion`].
pub fn record(
    conn: &Connection,
    version: &str,
    description: &str,
    applied_on: DateTime<Utc>,
) -> Result<(), MigrationError> {
    conn.execute(
        "INSERT INTO __MigrationHistory (version, description, applied_on) VALUES (?1, ?2, ?3)",
        params![version, description, applied_on.to_rfc3339()],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => MigrationError::DuplicateVersion {
            version: version.to_string(),
        },
        _ => MigrationError::storage_for("recording migration history", version, e),
    })?;
    Ok(())
}

/// All history rows, oldest application first.
pub fn records(conn: &Connection) -> Result<Vec<HistoryRecord>, MigrationError> {
    let read = |e: rusqlite::Error| MigrationError::storage("reading migration history", e);

    let mut stmt = conn
        .prepare(
            "SELECT version, description, applied_on
             FROM __MigrationHistory
             ORDER BY applied_on ASC, version ASC",
        )
        .map_err(read)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(HistoryRecord {
                version: row.get(0)?,
                description: row.get(1)?,
                applied_on: datetime_column(row, 2)?,
            })
        })
        .map_err(read)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(read)
}

/// Accept RFC 3339 (what we write) as well as SQLite's own
/// `YYYY-MM-DD HH:MM:SS` form for rows written by other tools.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
        })
}

/// Read a timestamp column. Text that is not a timestamp is a conversion
/// failure rather than a made-up date.
pub(crate) fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
