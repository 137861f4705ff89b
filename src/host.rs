//! Capabilities provided by the native host: file system access, the
//! directory query and the platform default directory.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::HostQueryError;

/// File system operations keyed by absolute path
#[async_trait]
pub trait HostFs: Send + Sync {
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    async fn read(&self, path: &Path) -> io::Result<Bytes>;

    async fn read_text(&self, path: &Path) -> io::Result<String>;

    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// `HostFs` on top of `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl HostFs for TokioFs {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn read(&self, path: &Path) -> io::Result<Bytes> {
        tokio::fs::read(path).await.map(Bytes::from)
    }

    async fn read_text(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// Payload of the directory query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExeDirData {
    #[serde(default)]
    pub path: Option<String>,
}

/// Response schema of the host directory query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExeDirResponse {
    #[serde(default)]
    pub data: Option<ExeDirData>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExeDirResponse {
    /// The reported directory. A missing or empty field yields `None`.
    pub fn path(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.path.as_deref())
            .filter(|path| !path.is_empty())
    }
}

/// Asks the host process for its own directory
#[async_trait]
pub trait HostQuery: Send + Sync {
    async fn query_exe_dir(&self) -> Result<ExeDirResponse, HostQueryError>;
}

/// Invokes the in-process `get_exe_dir` command and decodes its reply the
/// same way a webview would after the IPC hop.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandQuery;

#[async_trait]
impl HostQuery for CommandQuery {
    async fn query_exe_dir(&self) -> Result<ExeDirResponse, HostQueryError> {
        let reply = crate::commands::get_exe_dir().await;
        let value = serde_json::to_value(&reply)?;
        let response: ExeDirResponse = serde_json::from_value(value)?;

        match (&response.error, response.path()) {
            (Some(error), None) => Err(HostQueryError::Failed(error.clone())),
            _ => Ok(response),
        }
    }
}

/// Directory containing the running executable
pub fn executable_dir() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("executable {} has no parent directory", exe.display()),
        )
    })
}
