use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ConfigManager;

const FILE_PREFIX: &str = "face-files";

/// Configuration for the logging system
pub struct LogConfig {
    /// Directory where log files will be stored
    pub log_dir: PathBuf,
    /// Prefix for log file names
    pub file_prefix: String,
    /// Maximum number of log files to keep (rotation)
    pub max_files: usize,
    /// Whether to write logs to file
    pub log_to_file: bool,
    /// Log level filter string
    pub log_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: ConfigManager::get_log_dir(),
            file_prefix: FILE_PREFIX.to_string(),
            max_files: 5,
            log_to_file: true,
            log_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Create LogConfig from ConfigManager settings
    pub fn from_config_manager() -> Self {
        match ConfigManager::try_get() {
            Some(manager) => {
                let config = manager.get_config();
                Self {
                    log_dir: ConfigManager::get_log_dir(),
                    file_prefix: FILE_PREFIX.to_string(),
                    max_files: config.log_max_files,
                    log_to_file: config.log_to_file,
                    log_level: config.log_level.as_str().to_string(),
                }
            }
            None => Self::default(),
        }
    }
}

/// Initialize the logging system with stdout and optional rolling file output
///
/// # Log Targets
/// - `main` - Application lifecycle
/// - `config` - Configuration loading
/// - `storage` - Durable key-value store
/// - `resolver` - Base directory resolution
/// - `files` - File reads, existence checks and deletes
/// - `object_url` - Object URL creation and revocation
/// - `face_image` - Face image binding
/// - `commands` - IPC command surface
///
/// `RUST_LOG` takes precedence over the configured level:
/// ```bash
/// RUST_LOG=resolver=debug,files=trace
/// ```
pub fn init_logging(config: LogConfig) -> Result<LogGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Separate branches because the layered subscriber types differ
    let worker_guard = if config.log_to_file {
        std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

        let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_dir)
            .context("Failed to create file appender")?;

        let (non_blocking_file, worker_guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = fmt::layer()
            .compact()
            .with_writer(non_blocking_file)
            .with_target(true)
            .with_ansi(false);

        let stdout_layer = fmt::layer()
            .compact()
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stdout_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        worker_guard
    } else {
        let (non_blocking_sink, worker_guard) = tracing_appender::non_blocking(std::io::sink());
        drop(non_blocking_sink);

        let stdout_layer = fmt::layer()
            .compact()
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        worker_guard
    };

    tracing::info!(
        target: "main",
        log_dir = %config.log_dir.display(),
        max_files = config.max_files,
        log_to_file = config.log_to_file,
        log_level = %config.log_level,
        "Logging system initialized"
    );

    Ok(LogGuard {
        _worker_guard: worker_guard,
    })
}

/// Keeps the non-blocking file writer alive; logs are flushed when dropped
pub struct LogGuard {
    _worker_guard: tracing_appender::non_blocking::WorkerGuard,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        tracing::info!(target: "main", "Flushing logs before shutdown");
    }
}
