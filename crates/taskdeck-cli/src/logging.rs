use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use taskdeck_config::AppConfig;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Install the global subscriber.
///
/// The console only shows warnings unless `verbose` is set, so command output
/// stays readable. The dated log file under `log.dir` receives everything at
/// the configured level. `RUST_LOG` overrides both.
pub fn init(config: &AppConfig, verbose: bool) {
    let console_level = if verbose { "debug" } else { "warn" };
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter_or(console_level));

    let mut file_error = None;
    let file = if config.log.file {
        let path = log_file_path(&config.log_dir());
        match open_log_file(&path) {
            Ok(handle) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(handle))
                    .with_filter(filter_or(&config.log.level)),
            ),
            Err(e) => {
                file_error = Some(format!("{}: {e}", path.display()));
                None
            }
        }
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();

    if let Some(e) = file_error {
        warn!("file logging disabled, cannot open log file {e}");
    }
}

/// `<dir>/taskdeck_<YYYY-MM-DD>.log`, one file per local day.
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("taskdeck_{}.log", Local::now().format("%Y-%m-%d")))
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
