pub mod catalog;
pub mod error;
pub mod history;
pub mod migrations;
pub mod storage;
pub mod task_store;

pub use catalog::{Migration, MigrationCatalog, SchemaVersion};
pub use error::MigrationError;
pub use history::{HISTORY_TABLE, HistoryRecord};
pub use migrations::{AppliedMigration, MigrationReport, MigrationStatus, Migrator};
pub use task_store::{TaskFilter, TaskRecord, TaskStore};
