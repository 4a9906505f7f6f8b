//! Migration runner: brings a database up to the set of migrations in a
//! [`MigrationCatalog`], applying each missing version exactly once.
//!
//! Pending migrations are applied in ascending [`SchemaVersion`] order. Each
//! one runs in its own `IMMEDIATE` transaction together with the insert into
//! `__MigrationHistory`, so a crash can never leave a schema change applied
//! but unrecorded. The first failure rolls back that migration and ends the
//! run; callers must treat it as fatal.
//!
//! [`SchemaVersion`]: crate::SchemaVersion

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::{Migration, MigrationCatalog, same_version};
use crate::error::MigrationError;
use crate::history::{self, HistoryRecord};

/// A migration applied during this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedMigration {
    pub version: String,
    pub description: String,
    pub applied_on: DateTime<Utc>,
}

/// Outcome of a successful [`Migrator::apply_migrations`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    /// In the order they were applied.
    pub applied: Vec<AppliedMigration>,
    /// Catalog entries that were already recorded before this run.
    pub already_applied: usize,
    /// Recorded versions this catalog does not know about.
    pub unknown: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Read-only view of where a database stands relative to a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationStatus {
    pub applied: Vec<HistoryRecord>,
    /// Sorted ascending, i.e. the order the next run would apply them in.
    pub pending: Vec<String>,
    pub unknown: Vec<String>,
}

pub struct Migrator<'a> {
    catalog: &'a MigrationCatalog,
}

impl<'a> Migrator<'a> {
    pub fn new(catalog: &'a MigrationCatalog) -> Self {
        Self { catalog }
    }

    /// Apply every pending migration, in version order, stopping at the first
    /// failure.
    pub fn apply_migrations(&self, conn: &mut Connection) -> Result<MigrationReport, MigrationError> {
        let started_at = Instant::now();

        self.catalog.validate().map_err(log_failure)?;
        history::ensure_table(conn).map_err(log_failure)?;
        let applied = history::applied_versions(conn).map_err(log_failure)?;

        let unknown = self.unknown_versions(&applied);
        if !unknown.is_empty() {
            warn!(
                "database records migrations this build does not know: {} (left untouched)",
                unknown.join(", ")
            );
        }

        let pending = self.pending_from(&applied);
        let mut report = MigrationReport {
            applied: Vec::with_capacity(pending.len()),
            already_applied: self.catalog.len() - pending.len(),
            unknown,
        };

        if pending.is_empty() {
            info!(
                "schema is up to date ({} migrations applied)",
                report.already_applied
            );
            return Ok(report);
        }

        info!(
            "applying {} pending migration(s), {} already applied",
            pending.len(),
            report.already_applied
        );

        for migration in pending {
            let step_started_at = Instant::now();
            info!(
                "Applying migration {}: {}",
                migration.version, migration.description
            );

            match apply_one(conn, migration) {
                Ok(applied_on) => {
                    debug!(
                        version = migration.version,
                        duration_ms = step_started_at.elapsed().as_millis() as u64,
                        "migration recorded"
                    );
                    report.applied.push(AppliedMigration {
                        version: migration.version.to_string(),
                        description: migration.description.to_string(),
                        applied_on,
                    });
                }
                Err(e) => {
                    error!(
                        version = migration.version,
                        description = migration.description,
                        applied = report.applied.len(),
                        "migration failed, aborting run: {e}"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            "applied {} migration(s) in {}ms",
            report.applied.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Versions the next run would apply, in order. Does not create the
    /// history table; without it every catalog entry is pending.
    pub fn pending(&self, conn: &Connection) -> Result<Vec<String>, MigrationError> {
        let applied = if history::table_exists(conn)? {
            history::applied_versions(conn)?
        } else {
            BTreeSet::new()
        };
        Ok(self
            .pending_from(&applied)
            .into_iter()
            .map(|m| m.version.to_string())
            .collect())
    }

    pub fn status(&self, conn: &Connection) -> Result<MigrationStatus, MigrationError> {
        if !history::table_exists(conn)? {
            return Ok(MigrationStatus {
                pending: self.pending(conn)?,
                ..Default::default()
            });
        }

        let records = history::records(conn)?;
        let applied: BTreeSet<String> = records.iter().map(|r| r.version.clone()).collect();
        Ok(MigrationStatus {
            pending: self
                .pending_from(&applied)
                .into_iter()
                .map(|m| m.version.to_string())
                .collect(),
            unknown: self.unknown_versions(&applied),
            applied: records,
        })
    }

    fn pending_from(&self, applied: &BTreeSet<String>) -> Vec<&'a Migration> {
        self.catalog
            .sorted()
            .into_iter()
            .filter(|m| !applied.iter().any(|v| same_version(v, m.version)))
            .collect()
    }

    fn unknown_versions(&self, applied: &BTreeSet<String>) -> Vec<String> {
        applied
            .iter()
            .filter(|v| !self.catalog.contains(v))
            .cloned()
            .collect()
    }
}

/// Run one migration and its history insert as a single transaction.
/// Dropping the transaction on any error rolls both back.
fn apply_one(conn: &mut Connection, migration: &Migration) -> Result<DateTime<Utc>, MigrationError> {
    let version = migration.version;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| MigrationError::storage_for("starting migration transaction", version, e))?;

    tx.execute_batch(migration.statement)
        .map_err(|e| MigrationError::storage_for("applying migration", version, e))?;

    let applied_on = Utc::now();
    history::record(&tx, version, migration.description, applied_on)?;

    tx.commit()
        .map_err(|e| MigrationError::storage_for("committing migration", version, e))?;
    Ok(applied_on)
}

fn log_failure(e: MigrationError) -> MigrationError {
    error!("schema migration failed: {e}");
    e
}
