use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select};
use taskdeck_config::model::default_home_dir;
use taskdeck_config::{AppConfig, LogConfig};
use tracing::info;

use crate::prompt;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug"];

/// Run the interactive setup wizard and write `config.yml`.
///
/// Without a terminal it only prints where the file goes and what it looks
/// like; nothing is written.
pub fn run_wizard(config_path: Option<&Path>) -> Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_home_dir().join("config.yml"));

    if !prompt::is_interactive() {
        println!("Non-interactive environment detected.");
        println!("To configure taskdeck, edit: {}", config_path.display());
        println!();
        println!("Minimal config.yml example:");
        println!("---");
        println!("data_dir: {}", AppConfig::default().data_dir().display());
        println!("database:");
        println!("  busy_timeout_ms: 5000");
        println!("log:");
        println!("  level: info");
        println!("  file: true");
        return Ok(());
    }

    println!();
    println!("  taskdeck setup");
    println!("  --------------");
    println!();

    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(AppConfig::default().data_dir().display().to_string())
        .interact_text()
        .context("data directory input cancelled")?;

    let level = Select::new()
        .with_prompt("Log level")
        .items(LOG_LEVELS)
        .default(2)
        .interact()
        .context("log level selection cancelled")?;

    let file_logging = Confirm::new()
        .with_prompt("Write log files?")
        .default(true)
        .interact()
        .context("log file choice cancelled")?;

    let config = build_config(PathBuf::from(data_dir.trim()), LOG_LEVELS[level], file_logging);
    write_config(&config_path, &config)?;

    println!();
    println!("  Config written to {}", config_path.display());
    println!("  Run `taskdeck migrate` to create the database.");
    println!();

    Ok(())
}

fn build_config(data_dir: PathBuf, level: &str, file_logging: bool) -> AppConfig {
    AppConfig {
        data_dir: Some(data_dir),
        log: LogConfig {
            level: level.to_string(),
            file: file_logging,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(config).context("failed to serialize config")?;
    std::fs::write(path, &yaml).with_context(|| format!("failed to write {}", path.display()))?;
    info!("config written to {}", path.display());
    Ok(())
}
