use std::fmt::Write;

use chrono::Local;
use taskdeck_db::{MigrationCatalog, MigrationReport, MigrationStatus, TaskRecord};

static PRIORITY_LABELS: [&str; 4] = ["-", "low", "med", "high"];

fn priority_label(priority: i64) -> &'static str {
    usize::try_from(priority)
        .ok()
        .and_then(|p| PRIORITY_LABELS.get(p))
        .copied()
        .unwrap_or("?")
}

fn status_box(task: &TaskRecord) -> &'static str {
    if task.is_completed { "[x]" } else { "[ ]" }
}

/// One-line summary, e.g. `#3 [ ] buy milk (priority high)`.
pub fn task_line(task: &TaskRecord) -> String {
    format!(
        "#{} {} {} (priority {})",
        task.id,
        status_box(task),
        task.description,
        priority_label(task.priority)
    )
}

pub fn task_table(tasks: &[TaskRecord]) -> String {
    if tasks.is_empty() {
        return "No tasks.\n".to_string();
    }

    let id_w = tasks
        .iter()
        .map(|t| t.id.to_string().len())
        .max()
        .unwrap_or(1)
        .max(2);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>id_w$}  {:<3}  {:<4}  {:<16}  DESCRIPTION",
        "ID", "", "PRIO", "CREATED"
    );
    for task in tasks {
        let _ = writeln!(
            out,
            "{:>id_w$}  {}  {:<4}  {:<16}  {}",
            task.id,
            status_box(task),
            priority_label(task.priority),
            task.created_at
                .with_timezone(&Local)
                .format("%d.%m.%Y %H:%M"),
            task.description
        );
    }
    let done = tasks.iter().filter(|t| t.is_completed).count();
    let _ = writeln!(out, "{} task(s), {done} done", tasks.len());
    out
}

pub fn migration_report(report: &MigrationReport) -> String {
    let mut out = String::new();
    if report.is_noop() {
        let _ = writeln!(
            out,
            "Schema is up to date ({} migration(s) already applied).",
            report.already_applied
        );
    } else {
        for applied in &report.applied {
            let _ = writeln!(
                out,
                "Applied {:<8} {}",
                applied.version, applied.description
            );
        }
        let _ = writeln!(out, "{} migration(s) applied.", report.applied.len());
    }
    for version in &report.unknown {
        let _ = writeln!(out, "Note: database records unknown migration {version}.");
    }
    out
}

pub fn pending_list(catalog: &MigrationCatalog, pending: &[String]) -> String {
    if pending.is_empty() {
        return "Nothing to apply.\n".to_string();
    }
    let mut out = String::new();
    for version in pending {
        let description = catalog
            .list()
            .iter()
            .find(|m| m.version == version.as_str())
            .map_or("", |m| m.description);
        let _ = writeln!(out, "Would apply {version:<8} {description}");
    }
    out
}

pub fn migration_status(status: &MigrationStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Applied:");
    if status.applied.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for record in &status.applied {
        let _ = writeln!(
            out,
            "  {:<8} {:<28} {}",
            record.version,
            record.description,
            record.applied_on.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    let _ = writeln!(out, "Pending:");
    if status.pending.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for version in &status.pending {
        let _ = writeln!(out, "  {version}");
    }
    if !status.unknown.is_empty() {
        let _ = writeln!(out, "Unknown to this build: {}", status.unknown.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use taskdeck_db::AppliedMigration;

    use super::*;

    fn task(id: i64, description: &str, done: bool, priority: i64) -> TaskRecord {
        TaskRecord {
            id,
            description: description.to_string(),
            created_at: Utc::now(),
            is_completed: done,
            priority,
        }
    }

    #[test]
    fn task_line_shows_status_and_priority() {
        assert_eq!(
            task_line(&task(3, "buy milk", false, 3)),
            "#3 [ ] buy milk (priority high)"
        );
        assert_eq!(
            task_line(&task(4, "done already", true, 0)),
            "#4 [x] done already (priority -)"
        );
        assert_eq!(priority_label(17), "?");
        assert_eq!(priority_label(-1), "?");
    }

    #[test]
    fn table_counts_done_tasks() {
        let table = task_table(&[task(2, "b", true, 1), task(1, "a", false, 0)]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("[x]"));
        assert!(lines[1].ends_with("  b"));
        assert_eq!(lines[3], "2 task(s), 1 done");
        assert_eq!(task_table(&[]), "No tasks.\n");
    }

    #[test]
    fn report_lists_applied_versions() {
        let report = MigrationReport {
            applied: vec![AppliedMigration {
                version: "1.0.2".into(),
                description: "Add priority field".into(),
                applied_on: Utc::now(),
            }],
            already_applied: 2,
            unknown: vec!["9.9.9".into()],
        };
        let text = migration_report(&report);
        assert!(text.contains("Applied 1.0.2    Add priority field"));
        assert!(text.contains("1 migration(s) applied."));
        assert!(text.contains("unknown migration 9.9.9"));

        let noop = migration_report(&MigrationReport {
            already_applied: 3,
            ..Default::default()
        });
        assert_eq!(noop, "Schema is up to date (3 migration(s) already applied).\n");
    }

    #[test]
    fn pending_list_uses_catalog_descriptions() {
        let catalog = MigrationCatalog::default_catalog();
        let text = pending_list(&catalog, &["1.0.1".to_string()]);
        assert_eq!(text, "Would apply 1.0.1    Add completed status\n");
        assert_eq!(pending_list(&catalog, &[]), "Nothing to apply.\n");
    }
}
