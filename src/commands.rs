use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

use crate::accessor::{FileAccessor, FileReadResult, ImageFormat, ReadType};
use crate::host::{ExeDirData, executable_dir};

/// Result type for commands invoked over IPC
pub type CommandResult<T> = Result<T, String>;

/// Standard response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Serializable form of a read result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadPayload {
    DataUrl { url: String },
    Blob { mime_type: String, base64: String },
    Text { text: String },
}

impl From<FileReadResult> for ReadPayload {
    fn from(result: FileReadResult) -> Self {
        match result {
            FileReadResult::DataUrl(url) => ReadPayload::DataUrl { url },
            FileReadResult::Blob(blob) => ReadPayload::Blob {
                mime_type: blob.mime_type.to_string(),
                base64: general_purpose::STANDARD.encode(&blob.bytes),
            },
            FileReadResult::Text(text) => ReadPayload::Text { text },
        }
    }
}

/// Report the directory of the running executable
pub async fn get_exe_dir() -> ApiResponse<ExeDirData> {
    match executable_dir() {
        Ok(dir) => ApiResponse::success(ExeDirData {
            path: Some(dir.to_string_lossy().into_owned()),
        }),
        Err(e) => {
            tracing::error!(target: "commands", error = %e, "Failed to determine executable directory");
            ApiResponse::error(e.to_string())
        }
    }
}

pub async fn exists(accessor: &FileAccessor, path: String) -> CommandResult<bool> {
    accessor.exists(&path).await.map_err(|e| e.to_string())
}

pub async fn remove(accessor: &FileAccessor, path: String) -> CommandResult<()> {
    accessor.remove(&path).await.map_err(|e| e.to_string())
}

/// Read an image. `read_type` defaults to `base64`, `format` to the accessor's default.
pub async fn read(
    accessor: &FileAccessor,
    path: String,
    read_type: Option<String>,
    format: Option<String>,
) -> CommandResult<ReadPayload> {
    let read_type = match read_type {
        Some(read_type) => read_type.parse::<ReadType>()?,
        None => ReadType::default(),
    };
    let format = match format {
        Some(format) => ImageFormat::parse(&format),
        None => accessor.default_format().clone(),
    };

    accessor
        .read(&path, read_type, format)
        .await
        .map(ReadPayload::from)
        .map_err(|e| e.to_string())
}

pub async fn read_text(accessor: &FileAccessor, path: String) -> CommandResult<String> {
    accessor.read_text(&path).await.map_err(|e| e.to_string())
}
