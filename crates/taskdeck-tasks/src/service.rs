use taskdeck_common::{Error, Result};
use taskdeck_db::{TaskFilter, TaskRecord, TaskStore};
use tracing::{info, warn};

use crate::validation::InputValidator;

/// Task operations with validation on top of a migrated [`TaskStore`].
pub struct TaskService {
    store: TaskStore,
}

impl TaskService {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn list(&self, filter: TaskFilter) -> Result<Vec<TaskRecord>> {
        self.store.list_tasks(filter)
    }

    pub fn get(&self, id: i64) -> Result<TaskRecord> {
        self.store.get_task(id)?.ok_or_else(|| not_found(id))
    }

    pub fn add(&self, description: &str) -> Result<TaskRecord> {
        self.add_with_priority(description, 0)
    }

    /// Validates both fields before anything is written.
    pub fn add_with_priority(&self, description: &str, priority: i64) -> Result<TaskRecord> {
        let description = validated(InputValidator::validate_description(description), "add")?;
        let priority = validated(InputValidator::validate_priority(priority), "add")?;
        let id = self.store.add_task_with_priority(&description, priority)?;
        info!("created task {id}");
        self.get(id)
    }

    pub fn update(&self, id: i64, description: &str) -> Result<TaskRecord> {
        let description =
            validated(InputValidator::validate_description(description), "update")?;
        if !self.store.update_description(id, &description)? {
            return Err(not_found(id));
        }
        info!("updated task {id}");
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete_task(id)? {
            return Err(not_found(id));
        }
        info!("deleted task {id}");
        Ok(())
    }

    /// Flip completion; returns the updated task.
    pub fn toggle(&self, id: i64) -> Result<TaskRecord> {
        let completed = self.store.toggle_completed(id)?.ok_or_else(|| not_found(id))?;
        info!(
            "marked task {id} as {}",
            if completed { "done" } else { "open" }
        );
        self.get(id)
    }

    pub fn complete(&self, id: i64, completed: bool) -> Result<TaskRecord> {
        if !self.store.set_completed(id, completed)? {
            return Err(not_found(id));
        }
        self.get(id)
    }

    pub fn set_priority(&self, id: i64, priority: i64) -> Result<TaskRecord> {
        let priority = validated(InputValidator::validate_priority(priority), "reprioritize")?;
        if !self.store.set_priority(id, priority)? {
            return Err(not_found(id));
        }
        info!("set priority of task {id} to {priority}");
        self.get(id)
    }

    pub fn count(&self) -> Result<usize> {
        self.store.task_count()
    }
}

fn validated<T>(result: Result<T>, action: &str) -> Result<T> {
    result.inspect_err(|e| warn!("rejected attempt to {action} task: {e}"))
}

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("task {id}"))
}
