//! The fixed set of schema changes a build knows about.
//!
//! Entries are only ever appended. Once a version has shipped, its statement
//! must not change: deployed databases already record it as applied.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MigrationError;

/// One versioned, one-shot schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: &'static str,
    pub description: &'static str,
    /// Executed as a batch, so it may hold several `;`-separated statements.
    pub statement: &'static str,
}

impl Migration {
    pub const fn new(
        version: &'static str,
        description: &'static str,
        statement: &'static str,
    ) -> Self {
        Self {
            version,
            description,
            statement,
        }
    }
}

pub const CREATE_TASKS_TABLE: Migration = Migration::new(
    "1.0.0",
    "Create tasks table",
    "CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );",
);

pub const ADD_COMPLETED_STATUS: Migration = Migration::new(
    "1.0.1",
    "Add completed status",
    "ALTER TABLE tasks ADD COLUMN is_completed INTEGER NOT NULL DEFAULT 0;",
);

pub const ADD_PRIORITY_FIELD: Migration = Migration::new(
    "1.0.2",
    "Add priority field",
    "ALTER TABLE tasks ADD COLUMN priority INTEGER NOT NULL DEFAULT 0;
     CREATE INDEX IF NOT EXISTS idx_tasks_completed_priority
        ON tasks(is_completed, priority);",
);

/// Ordered registration list handed to the [`Migrator`](crate::Migrator).
///
/// Declaration order carries no meaning; the runner sorts by [`SchemaVersion`].
#[derive(Debug, Clone, Default)]
pub struct MigrationCatalog {
    migrations: Vec<Migration>,
}

impl MigrationCatalog {
    pub fn new(migrations: Vec<Migration>) -> Self {
        Self { migrations }
    }

    /// The migrations that define the task schema.
    pub fn default_catalog() -> Self {
        Self::new(vec![
            CREATE_TASKS_TABLE,
            ADD_COMPLETED_STATUS,
            ADD_PRIORITY_FIELD,
        ])
    }

    pub fn register(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Migrations in declaration order.
    pub fn list(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Whether a migration with an equal version is registered. Versions
    /// compare numerically, so `1.0` finds `1.0.0`.
    pub fn contains(&self, version: &str) -> bool {
        self.migrations.iter().any(|m| same_version(m.version, version))
    }

    /// Check that every version parses and that no two versions collide.
    ///
    /// `1.0` and `1.0.0` order identically and count as a collision.
    pub fn validate(&self) -> Result<(), MigrationError> {
        let mut seen: BTreeMap<SchemaVersion, &str> = BTreeMap::new();
        for migration in &self.migrations {
            let parsed: SchemaVersion = migration.version.parse()?;
            if let Some(previous) = seen.insert(parsed, migration.version) {
                return Err(MigrationError::InvalidCatalog(format!(
                    "duplicate migration version {} (collides with {previous})",
                    migration.version
                )));
            }
            if migration.statement.trim().is_empty() {
                return Err(MigrationError::InvalidCatalog(format!(
                    "migration {} has an empty statement",
                    migration.version
                )));
            }
        }
        Ok(())
    }

    /// Migrations sorted ascending by version. Unparseable versions sort last;
    /// [`validate`](Self::validate) rejects them before a run starts.
    pub fn sorted(&self) -> Vec<&Migration> {
        let mut sorted: Vec<&Migration> = self.migrations.iter().collect();
        sorted.sort_by(|a, b| compare_versions(a.version, b.version));
        sorted
    }

    pub fn latest_version(&self) -> Option<&'static str> {
        self.sorted().last().map(|m| m.version)
    }
}

/// Numeric equality for parseable versions, exact string equality otherwise.
pub(crate) fn same_version(a: &str, b: &str) -> bool {
    compare_versions(a, b) == Ordering::Equal
}

pub(crate) fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.parse::<SchemaVersion>(), b.parse::<SchemaVersion>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// A dotted numeric version such as `1.0.2`, ordered component by component.
///
/// Missing trailing components count as zero, so `1.2 == 1.2.0`.
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    parts: Vec<u64>,
}

impl SchemaVersion {
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    fn significant(&self) -> &[u64] {
        let end = self
            .parts
            .iter()
            .rposition(|p| *p != 0)
            .map_or(0, |i| i + 1);
        &self.parts[..end]
    }
}

impl FromStr for SchemaVersion {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(MigrationError::InvalidCatalog(
                "migration version cannot be empty".into(),
            ));
        }
        let parts = s
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(MigrationError::InvalidCatalog(format!(
                        "malformed migration version {s:?}: expected dotted numbers like 1.0.2"
                    )));
                }
                part.parse::<u64>().map_err(|e| {
                    MigrationError::InvalidCatalog(format!(
                        "malformed migration version {s:?}: {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { parts })
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.significant().cmp(other.significant())
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SchemaVersion {}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SchemaVersion {
        s.parse().unwrap()
    }

    #[test]
    fn versions_compare_numerically() {
        assert!(v("1.0.10") > v("1.0.9"));
        assert!(v("2.0.0") > v("1.99.99"));
        assert!(v("1.0.1") < v("1.1"));
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("1.0.2").to_string(), "1.0.2");
    }

    #[test]
    fn malformed_versions_are_rejected() {
        for bad in ["", "1..0", "1.0.x", "v1.0", "1.0.", " 1.0"] {
            let err = bad.parse::<SchemaVersion>().unwrap_err();
            assert!(matches!(err, MigrationError::InvalidCatalog(_)), "{bad:?}");
        }
    }

    #[test]
    fn sorted_ignores_declaration_order() {
        let catalog = MigrationCatalog::new(vec![
            Migration::new("1.0.2", "third", "SELECT 1;"),
            Migration::new("1.0.0", "first", "SELECT 1;"),
            Migration::new("1.0.10", "fourth", "SELECT 1;"),
            Migration::new("1.0.1", "second", "SELECT 1;"),
        ]);
        let order: Vec<_> = catalog.sorted().iter().map(|m| m.version).collect();
        assert_eq!(order, vec!["1.0.0", "1.0.1", "1.0.2", "1.0.10"]);
        assert_eq!(catalog.latest_version(), Some("1.0.10"));
    }

    #[test]
    fn validate_rejects_duplicates_and_empty_statements() {
        let dup = MigrationCatalog::default()
            .register(Migration::new("1.0", "a", "SELECT 1;"))
            .register(Migration::new("1.0.0", "b", "SELECT 1;"));
        let err = dup.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate migration version 1.0.0"));

        let empty = MigrationCatalog::default().register(Migration::new("1.0.0", "a", "  "));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn default_catalog_is_valid() {
        let catalog = MigrationCatalog::default_catalog();
        catalog.validate().unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains("1.0.1"));
        assert!(catalog.contains("1.0"));
        assert!(catalog.contains("1.0.2.0"));
        assert!(!catalog.contains("1.0.3"));
        assert!(!catalog.contains("v1"));
        assert_eq!(catalog.latest_version(), Some("1.0.2"));
    }
}
