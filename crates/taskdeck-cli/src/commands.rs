use anyhow::{Context, Result, bail};
use clap::Subcommand;
use taskdeck_config::AppConfig;
use taskdeck_db::storage::{open_connection, open_in_memory, open_read_only};
use taskdeck_db::{MigrationCatalog, MigrationStatus, Migrator, TaskFilter, TaskStore};
use taskdeck_tasks::TaskService;
use tracing::info;

use crate::{prompt, render};

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List tasks, newest first.
    List {
        #[arg(long, conflicts_with = "done")]
        open: bool,
        #[arg(long)]
        done: bool,
        #[arg(long)]
        json: bool,
    },
    /// Add a task. Prompts for the text when none is given.
    Add {
        text: Vec<String>,
        #[arg(short, long)]
        priority: Option<i64>,
    },
    /// Change a task's text. Prompts with the current text when none is given.
    Edit { id: i64, text: Vec<String> },
    /// Delete a task.
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Flip a task between open and done.
    Toggle { id: i64 },
    /// Mark a task as done.
    Done { id: i64 },
    /// Set a task's priority (0-3).
    Priority { id: i64, priority: i64 },
}

/// Open the database, bring its schema up to date and wrap it in a service.
/// A migration failure is fatal: no task command runs against a schema that
/// may be out of date.
pub fn open_service(config: &AppConfig) -> Result<TaskService> {
    let db_path = config.database_path();
    let catalog = MigrationCatalog::default_catalog();
    let (store, report) = TaskStore::open(&db_path, &config.database, &catalog)
        .with_context(|| format!("database migration failed for {}", db_path.display()))?;
    if !report.is_noop() {
        info!(
            "upgraded schema at {} ({} migration(s))",
            db_path.display(),
            report.applied.len()
        );
    }
    Ok(TaskService::new(store))
}

pub fn migrate(config: &AppConfig, dry_run: bool) -> Result<()> {
    let db_path = config.database_path();
    let catalog = MigrationCatalog::default_catalog();

    if dry_run {
        let (_, status) = inspect(config, &catalog)?;
        print!("{}", render::pending_list(&catalog, &status.pending));
        return Ok(());
    }

    let mut conn = open_connection(&db_path, &config.database)?;
    let report = Migrator::new(&catalog)
        .apply_migrations(&mut conn)
        .with_context(|| format!("database migration failed for {}", db_path.display()))?;
    print!("{}", render::migration_report(&report));
    Ok(())
}

pub fn status(config: &AppConfig, json: bool) -> Result<()> {
    let db_path = config.database_path();
    let catalog = MigrationCatalog::default_catalog();
    let (exists, status) = inspect(config, &catalog)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if exists {
        println!("Database: {}", db_path.display());
        print!("{}", render::migration_status(&status));
    } else {
        println!("Database: {} (not created yet)", db_path.display());
        print!("{}", render::migration_status(&status));
    }
    Ok(())
}

/// Where the database stands, read without writing to it. A missing file
/// reads as an empty database: nothing applied, everything pending.
fn inspect(config: &AppConfig, catalog: &MigrationCatalog) -> Result<(bool, MigrationStatus)> {
    let migrator = Migrator::new(catalog);
    match open_read_only(&config.database_path(), &config.database)? {
        Some(conn) => Ok((true, migrator.status(&conn)?)),
        None => Ok((false, migrator.status(&open_in_memory()?)?)),
    }
}

pub fn filter(open: bool, done: bool) -> TaskFilter {
    match (open, done) {
        (true, _) => TaskFilter::Open,
        (_, true) => TaskFilter::Done,
        _ => TaskFilter::All,
    }
}

pub fn execute(service: &TaskService, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::List { open, done, json } => {
            let tasks = service.list(filter(open, done))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                print!("{}", render::task_table(&tasks));
            }
        }
        TaskCommand::Add { text, priority } => {
            let description = match joined(&text) {
                Some(text) => text,
                None => prompt::ask_description("New task", None)?,
            };
            let task = service.add_with_priority(&description, priority.unwrap_or(0))?;
            println!("Added {}", render::task_line(&task));
        }
        TaskCommand::Edit { id, text } => {
            let description = match joined(&text) {
                Some(text) => text,
                None => {
                    let current = service.get(id)?;
                    prompt::ask_description("New description", Some(&current.description))?
                }
            };
            let task = service.update(id, &description)?;
            println!("Updated {}", render::task_line(&task));
        }
        TaskCommand::Delete { id, yes } => {
            let task = service.get(id)?;
            if !yes {
                if !prompt::is_interactive() {
                    bail!("refusing to delete task {id} without --yes in a non-interactive session");
                }
                if !prompt::confirm(&format!("Delete task '{}'?", task.description))? {
                    println!("Kept task {id}.");
                    return Ok(());
                }
            }
            service.delete(id)?;
            println!("Deleted task {id}.");
        }
        TaskCommand::Toggle { id } => {
            let task = service.toggle(id)?;
            println!("{}", render::task_line(&task));
        }
        TaskCommand::Done { id } => {
            let task = service.complete(id, true)?;
            println!("{}", render::task_line(&task));
        }
        TaskCommand::Priority { id, priority } => {
            let task = service.set_priority(id, priority)?;
            println!("{}", render::task_line(&task));
        }
    }
    Ok(())
}

/// Positional words as one description, or `None` when nothing was given.
fn joined(words: &[String]) -> Option<String> {
    let text = words.join(" ");
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.data_dir = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn filter_flags() {
        assert_eq!(filter(false, false), TaskFilter::All);
        assert_eq!(filter(true, false), TaskFilter::Open);
        assert_eq!(filter(false, true), TaskFilter::Done);
    }

    #[test]
    fn joined_ignores_blank_input() {
        assert_eq!(joined(&[]), None);
        assert_eq!(joined(&["  ".to_string()]), None);
        assert_eq!(
            joined(&["feed".to_string(), "cat".to_string()]),
            Some("feed cat".to_string())
        );
    }

    #[test]
    fn open_service_migrates_a_fresh_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let service = open_service(&config).unwrap();
        assert!(config.database_path().exists());
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn commands_drive_the_service() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_service(&config_in(dir.path())).unwrap();

        execute(
            &service,
            TaskCommand::Add {
                text: vec!["write".into(), "report".into()],
                priority: Some(1),
            },
        )
        .unwrap();
        let task = &service.list(TaskFilter::All).unwrap()[0];
        assert_eq!(task.description, "write report");
        assert_eq!(task.priority, 1);

        execute(&service, TaskCommand::Done { id: task.id }).unwrap();
        assert!(service.get(task.id).unwrap().is_completed);

        execute(&service, TaskCommand::Delete { id: task.id, yes: true }).unwrap();
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn add_with_invalid_priority_leaves_no_task() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_service(&config_in(dir.path())).unwrap();

        let result = execute(
            &service,
            TaskCommand::Add {
                text: vec!["x".into()],
                priority: Some(9),
            },
        );
        assert!(result.is_err());
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn dry_run_and_status_do_not_create_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir.path().join("not-yet"));

        migrate(&config, true).unwrap();
        status(&config, false).unwrap();
        status(&config, true).unwrap();
        assert!(!config.database_path().exists());
        assert!(!dir.path().join("not-yet").exists());

        let (exists, status) = inspect(&config, &MigrationCatalog::default_catalog()).unwrap();
        assert!(!exists);
        assert!(status.applied.is_empty());
        assert_eq!(status.pending, vec!["1.0.0", "1.0.1", "1.0.2"]);
    }

    #[test]
    fn migrate_then_status_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        migrate(&config, true).unwrap();
        migrate(&config, false).unwrap();
        status(&config, true).unwrap();

        let (exists, status) = inspect(&config, &MigrationCatalog::default_catalog()).unwrap();
        assert!(exists);
        assert_eq!(status.applied.len(), 3);
        assert!(status.pending.is_empty());
    }
}
