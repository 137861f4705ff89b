use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};
use thiserror::Error;

/// Key under which the resolved base directory is persisted
pub const DEFAULT_EXE_DIR_KEY: &str = "exe_dir";

static CONFIG_MANAGER: OnceLock<ConfigManager> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Application settings, loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Durable key-value store file. `None` means `~/.face-files/storage.json`.
    pub storage_path: Option<PathBuf>,
    /// Keep the key-value store in memory only; nothing survives a restart
    pub in_memory_storage: bool,
    /// Key the resolved base directory is persisted under
    pub exe_dir_key: String,
    /// Image format assumed when a read does not name one
    pub default_format: String,
    /// Directory (relative to the base directory) holding face images
    pub faces_dir: String,
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub log_max_files: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            in_memory_storage: false,
            exe_dir_key: DEFAULT_EXE_DIR_KEY.to_string(),
            default_format: "jpg".to_string(),
            faces_dir: "faces".to_string(),
            log_level: LogLevel::Info,
            log_to_file: true,
            log_max_files: 5,
        }
    }
}

/// Process-wide configuration holder
pub struct ConfigManager {
    config: RwLock<AppConfig>,
}

impl ConfigManager {
    /// Load configuration from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: "config", path = %path.display(), "Config file not found, using defaults");
                return Ok(AppConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Install the process-wide config. The first call creates the instance;
    /// later calls replace the config it holds.
    pub fn init(config: AppConfig) -> &'static ConfigManager {
        let manager = CONFIG_MANAGER.get_or_init(|| ConfigManager {
            config: RwLock::new(AppConfig::default()),
        });
        let mut current = manager
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = config;
        drop(current);
        manager
    }

    pub fn try_get() -> Option<&'static ConfigManager> {
        CONFIG_MANAGER.get()
    }

    pub fn get_config(&self) -> AppConfig {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Root directory for files owned by this application
    pub fn get_app_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".face-files")
    }

    pub fn get_log_dir() -> PathBuf {
        Self::get_app_data_dir().join("logs")
    }

    /// Resolve the durable store path for a config
    pub fn get_storage_path(config: &AppConfig) -> PathBuf {
        config
            .storage_path
            .clone()
            .unwrap_or_else(|| Self::get_app_data_dir().join("storage.json"))
    }
}
