use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use taskdeck_common::{Error, Result};
use taskdeck_config::DatabaseConfig;
use tracing::{debug, info};

use crate::catalog::MigrationCatalog;
use crate::history::datetime_column;
use crate::migrations::{MigrationReport, Migrator};
use crate::storage;

/// Persistent storage for tasks.
///
/// A store only exists once its database has been migrated to the catalog it
/// was opened with; a migration failure aborts construction.
pub struct TaskStore {
    conn: Mutex<Connection>,
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub is_completed: bool,
    pub priority: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    #[default]
    All,
    Open,
    Done,
}

impl TaskFilter {
    fn where_clause(self) -> &'static str {
        match self {
            TaskFilter::All => "",
            TaskFilter::Open => "WHERE is_completed = 0",
            TaskFilter::Done => "WHERE is_completed = 1",
        }
    }
}

const TASK_COLUMNS: &str = "id, description, created_at, is_completed, priority";

impl TaskStore {
    pub fn open(
        db_path: &Path,
        config: &DatabaseConfig,
        catalog: &MigrationCatalog,
    ) -> Result<(Self, MigrationReport)> {
        let mut conn = storage::open_connection(db_path, config)?;
        let report = Migrator::new(catalog).apply_migrations(&mut conn)?;
        info!("task store opened at {}", db_path.display());
        Ok((
            Self {
                conn: Mutex::new(conn),
            },
            report,
        ))
    }

    pub fn in_memory(catalog: &MigrationCatalog) -> Result<Self> {
        let mut conn = storage::open_in_memory()?;
        Migrator::new(catalog).apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("task store lock poisoned".into()))
    }

    /// Tasks, newest first.
    pub fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<TaskRecord>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks {} ORDER BY id DESC",
                filter.where_clause()
            ))
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], task_from_row)
            .map_err(|e| Error::Database(format!("failed to query tasks: {e}")))?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_err(|e| Error::Database(format!("failed to read task row: {e}")))?);
        }
        debug!("loaded {} tasks", tasks.len());
        Ok(tasks)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<TaskRecord>> {
        let conn = self.connection()?;
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            task_from_row,
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to load task {id}: {e}")))
    }

    /// Insert a task and return its id.
    pub fn add_task(&self, description: &str) -> Result<i64> {
        self.add_task_with_priority(description, 0)
    }

    pub fn add_task_with_priority(&self, description: &str, priority: i64) -> Result<i64> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO tasks (description, priority) VALUES (?1, ?2)",
            params![description, priority],
        )
        .map_err(|e| Error::Database(format!("failed to create task: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns `false` when no task has this id.
    pub fn update_description(&self, id: i64, description: &str) -> Result<bool> {
        self.update(
            "UPDATE tasks SET description = ?2 WHERE id = ?1",
            params![id, description],
            "update task description",
        )
    }

    pub fn set_completed(&self, id: i64, completed: bool) -> Result<bool> {
        self.update(
            "UPDATE tasks SET is_completed = ?2 WHERE id = ?1",
            params![id, completed],
            "update task status",
        )
    }

    /// Flip completion and return the new state, or `None` for an unknown id.
    pub fn toggle_completed(&self, id: i64) -> Result<Option<bool>> {
        let conn = self.connection()?;
        conn.query_row(
            "UPDATE tasks SET is_completed = NOT is_completed WHERE id = ?1 RETURNING is_completed",
            params![id],
            |row| row.get::<_, bool>(0),
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to toggle task {id}: {e}")))
    }

    pub fn set_priority(&self, id: i64, priority: i64) -> Result<bool> {
        self.update(
            "UPDATE tasks SET priority = ?2 WHERE id = ?1",
            params![id, priority],
            "update task priority",
        )
    }

    pub fn delete_task(&self, id: i64) -> Result<bool> {
        self.update("DELETE FROM tasks WHERE id = ?1", params![id], "delete task")
    }

    pub fn task_count(&self) -> Result<usize> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .map_err(|e| Error::Database(format!("failed to count tasks: {e}")))?;
        Ok(count as usize)
    }

    fn update(&self, sql: &str, params: &[&dyn rusqlite::ToSql], action: &str) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn
            .execute(sql, params)
            .map_err(|e| Error::Database(format!("failed to {action}: {e}")))?;
        Ok(changed > 0)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        description: row.get(1)?,
        created_at: datetime_column(row, 2)?,
        is_completed: row.get(3)?,
        priority: row.get(4)?,
    })
}
