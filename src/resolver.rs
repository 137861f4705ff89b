use std::fmt;
use std::io;
use std::path::{MAIN_SEPARATOR, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::EXE_DIR_FAILED_PREFIX;
use crate::host::{HostQuery, executable_dir};
use crate::storage::{KeyValueStore, is_unset};

/// Resolved base directory, always ending in a path separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDir(Arc<str>);

impl BaseDir {
    /// Normalize a raw directory so that it ends with a separator. The
    /// separator style already present in the string is kept.
    pub fn normalize(raw: &str) -> Self {
        if raw.ends_with('\\') || raw.ends_with('/') {
            return Self(Arc::from(raw));
        }
        let separator = if raw.contains('\\') && !raw.contains('/') {
            '\\'
        } else if raw.contains('/') {
            '/'
        } else {
            MAIN_SEPARATOR
        };
        Self(Arc::from(format!("{raw}{separator}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn separator(&self) -> char {
        self.0.chars().last().unwrap_or(MAIN_SEPARATOR)
    }

    /// Join a relative path onto the base. Leading separators are dropped
    /// and every separator is rewritten to the base's style.
    pub fn join(&self, relative: &str) -> PathBuf {
        let separator = self.separator();
        let relative: String = relative
            .trim_start_matches(['/', '\\'])
            .chars()
            .map(|c| if c == '/' || c == '\\' { separator } else { c })
            .collect();
        PathBuf::from(format!("{}{}", self.0, relative))
    }
}

impl fmt::Display for BaseDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type FallbackFn = fn() -> io::Result<PathBuf>;

/// Resolves the application directory once per process.
///
/// Sources, in order: the in-memory cache, the durable store, the host
/// directory query, the executable's directory. Concurrent first callers
/// wait on the same resolution.
pub struct BaseDirResolver {
    store: Arc<dyn KeyValueStore>,
    query: Arc<dyn HostQuery>,
    key: String,
    fallback: FallbackFn,
    cached: OnceCell<BaseDir>,
}

impl BaseDirResolver {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        query: Arc<dyn HostQuery>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            query,
            key: key.into(),
            fallback: executable_dir,
            cached: OnceCell::new(),
        }
    }

    /// Replace the platform default lookup
    pub fn with_fallback(mut self, fallback: FallbackFn) -> Self {
        self.fallback = fallback;
        self
    }

    /// The cached directory, if resolution already happened
    pub fn cached(&self) -> Option<BaseDir> {
        self.cached.get().cloned()
    }

    pub async fn resolve(&self) -> BaseDir {
        self.cached
            .get_or_init(|| self.resolve_uncached())
            .await
            .clone()
    }

    async fn resolve_uncached(&self) -> BaseDir {
        let persisted = match self.store.get(&self.key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(target: "resolver", key = %self.key, error = %e, "Failed to read persisted base directory");
                None
            }
        };

        let raw = match persisted {
            Some(value) if !is_unset(Some(value.as_str())) => {
                tracing::debug!(target: "resolver", base_dir = %value, "Using persisted base directory");
                value
            }
            _ => match self.query_host().await {
                Some(path) => path,
                None => self.platform_default(),
            },
        };

        // Written back unconditionally so a stale "null" entry is replaced
        if let Err(e) = self.store.set(&self.key, &raw).await {
            tracing::warn!(target: "resolver", key = %self.key, error = %e, "Failed to persist base directory");
        }

        let base_dir = BaseDir::normalize(&raw);
        tracing::info!(target: "resolver", base_dir = %base_dir, "Base directory resolved");
        base_dir
    }

    async fn query_host(&self) -> Option<String> {
        match self.query.query_exe_dir().await {
            Ok(response) => match response.path() {
                Some(path) => Some(path.to_string()),
                None => {
                    tracing::debug!(target: "resolver", "Host response carried no data.path");
                    None
                }
            },
            Err(e) => {
                tracing::error!(target: "resolver", "{EXE_DIR_FAILED_PREFIX}{e}");
                None
            }
        }
    }

    fn platform_default(&self) -> String {
        match (self.fallback)() {
            Ok(dir) => dir.to_string_lossy().into_owned(),
            Err(e) => {
                tracing::error!(target: "resolver", error = %e, "No platform default directory, using current directory");
                ".".to_string()
            }
        }
    }
}
