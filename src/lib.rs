pub mod accessor;
pub mod commands;
pub mod config;
pub mod error;
pub mod face_image;
pub mod host;
pub mod logging;
pub mod object_url;
pub mod resolver;
pub mod storage;

// Re-export commonly used types
pub use accessor::{Blob, FileAccessor, FileReadResult, ImageFormat, ReadType};
pub use config::{AppConfig, ConfigManager};
pub use error::{FileResult, ReadError};
pub use face_image::{FaceImageBinding, FaceImageRequest, ImageSlot};
pub use logging::{LogConfig, LogGuard};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};
pub use resolver::{BaseDir, BaseDirResolver};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use host::{CommandQuery, TokioFs};
use storage::{JsonFileStore, KeyValueStore, MemoryStore};

/// Everything the UI layer talks to
#[derive(Clone)]
pub struct FileService {
    pub accessor: FileAccessor,
    pub face_images: FaceImageBinding,
    pub object_urls: ObjectUrlRegistry,
}

/// Build the file service from a config. Logging is initialised separately.
pub fn init_file_service(config: AppConfig) -> Result<FileService> {
    ConfigManager::init(config.clone());

    let store: Arc<dyn KeyValueStore> = if config.in_memory_storage {
        tracing::info!(target: "main", "Initializing file service with in-memory storage");
        Arc::new(MemoryStore::new())
    } else {
        let storage_path = ConfigManager::get_storage_path(&config);
        tracing::info!(target: "main", storage = %storage_path.display(), "Initializing file service");
        Arc::new(JsonFileStore::new(storage_path))
    };

    let resolver = Arc::new(BaseDirResolver::new(
        store,
        Arc::new(CommandQuery),
        config.exe_dir_key.clone(),
    ));
    let accessor = FileAccessor::new(resolver, Arc::new(TokioFs))
        .with_default_format(ImageFormat::parse(&config.default_format));
    let object_urls = ObjectUrlRegistry::new();
    let face_images =
        FaceImageBinding::new(accessor.clone(), object_urls.clone(), config.faces_dir);

    Ok(FileService {
        accessor,
        face_images,
        object_urls,
    })
}

/// Load a config file and build the file service from it
pub fn init_file_service_from(config_path: &Path) -> Result<FileService> {
    let config = ConfigManager::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    init_file_service(config).context("Failed to initialize file service")
}
