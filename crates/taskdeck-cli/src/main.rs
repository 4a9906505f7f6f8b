mod commands;
mod logging;
mod prompt;
mod render;
mod wizard;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskdeck_config::{AppConfig, ConfigLoader};
use tracing::error;

use crate::commands::TaskCommand;

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about = "Local task manager backed by SQLite")]
struct Cli {
    /// Config file (YAML or TOML). Defaults to ~/.taskdeck/config.yml.
    #[arg(long, global = true, env = "TASKDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overriding the configured location.
    #[arg(long, global = true, env = "TASKDECK_DB")]
    db: Option<PathBuf>,

    /// Log debug output to the console.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config file interactively.
    Init,
    /// Apply pending schema migrations.
    Migrate {
        /// Only list what would be applied.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show applied and pending schema migrations.
    Status {
        #[arg(long)]
        json: bool,
    },
    #[command(flatten)]
    Task(TaskCommand),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match (&cli.command, cli.config.as_deref()) {
        // `init` is what creates the file, so it may not exist yet.
        (Command::Init, Some(path)) if !path.exists() => AppConfig::default(),
        (_, path) => ConfigLoader::load(path).context("failed to load config")?,
    };
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    logging::init(&config, cli.verbose);

    match cli.command {
        Command::Init => wizard::run_wizard(cli.config.as_deref()),
        Command::Migrate { dry_run } => commands::migrate(&config, dry_run),
        Command::Status { json } => commands::status(&config, json),
        Command::Task(command) => {
            // Task commands only ever see a fully migrated store.
            let service = commands::open_service(&config)?;
            commands::execute(&service, command)
        }
    }
}
