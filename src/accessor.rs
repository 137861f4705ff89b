use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{FileResult, ReadError};
use crate::host::HostFs;
use crate::resolver::BaseDirResolver;

/// Output shape of a binary read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadType {
    #[default]
    Base64,
    Blob,
}

impl FromStr for ReadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base64" => Ok(ReadType::Base64),
            "blob" => Ok(ReadType::Blob),
            other => Err(format!("Unknown read type: {other}")),
        }
    }
}

/// Image format hint. Anything unrecognised is kept and served as PNG.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Jpg,
    Jpeg,
    Png,
    Other(String),
}

impl ImageFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "jpg" => ImageFormat::Jpg,
            "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            _ => ImageFormat::Other(s.to_string()),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpg | ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png | ImageFormat::Other(_) => "image/png",
        }
    }
}

impl From<&str> for ImageFormat {
    fn from(s: &str) -> Self {
        ImageFormat::parse(s)
    }
}

/// In-memory binary object tagged with a MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

impl Blob {
    pub fn new(bytes: Bytes, mime_type: &'static str) -> Self {
        Self { mime_type, bytes }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileReadResult {
    Text(String),
    DataUrl(String),
    Blob(Blob),
}

impl FileReadResult {
    pub fn into_blob(self) -> Option<Blob> {
        match self {
            FileReadResult::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn into_data_url(self) -> Option<String> {
        match self {
            FileReadResult::DataUrl(url) => Some(url),
            _ => None,
        }
    }
}

/// Build a `data:` URL from raw bytes
pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

struct NotFound<'a>(&'a Path);

impl fmt::Display for NotFound<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file not found: {}", self.0.display())
    }
}

/// File operations relative to the resolved base directory
#[derive(Clone)]
pub struct FileAccessor {
    resolver: Arc<BaseDirResolver>,
    fs: Arc<dyn HostFs>,
    default_format: ImageFormat,
}

impl FileAccessor {
    pub fn new(resolver: Arc<BaseDirResolver>, fs: Arc<dyn HostFs>) -> Self {
        Self {
            resolver,
            fs,
            default_format: ImageFormat::default(),
        }
    }

    /// Format assumed by `read_image` and by callers that omit one
    pub fn with_default_format(mut self, format: ImageFormat) -> Self {
        self.default_format = format;
        self
    }

    pub fn default_format(&self) -> &ImageFormat {
        &self.default_format
    }

    pub fn resolver(&self) -> &Arc<BaseDirResolver> {
        &self.resolver
    }

    /// Absolute path for a path relative to the base directory
    pub async fn full_path(&self, path: &str) -> PathBuf {
        self.resolver.resolve().await.join(path)
    }

    pub async fn exists(&self, path: &str) -> io::Result<bool> {
        let full_path = self.full_path(path).await;
        self.fs.exists(&full_path).await
    }

    /// Delete a file. Host errors are returned unchanged.
    pub async fn remove(&self, path: &str) -> io::Result<()> {
        let full_path = self.full_path(path).await;
        tracing::debug!(target: "files", path = %full_path.display(), "Removing file");
        self.fs.remove(&full_path).await
    }

    /// Read an image as a data URL or a blob
    pub async fn read(
        &self,
        path: &str,
        read_type: ReadType,
        format: ImageFormat,
    ) -> FileResult<FileReadResult> {
        let full_path = self.full_path(path).await;
        let bytes = self
            .checked(&full_path, self.fs.read(&full_path))
            .await?;

        let mime_type = format.mime_type();
        tracing::trace!(target: "files", path = %full_path.display(), size = bytes.len(), mime_type, "File read");

        Ok(match read_type {
            ReadType::Base64 => FileReadResult::DataUrl(to_data_url(&bytes, mime_type)),
            ReadType::Blob => FileReadResult::Blob(Blob::new(bytes, mime_type)),
        })
    }

    /// `read` as base64 with the accessor's default format
    pub async fn read_image(&self, path: &str) -> FileResult<FileReadResult> {
        self.read(path, ReadType::default(), self.default_format.clone())
            .await
    }

    pub async fn read_text(&self, path: &str) -> FileResult<String> {
        let full_path = self.full_path(path).await;
        self.checked(&full_path, self.fs.read_text(&full_path))
            .await
    }

    /// Existence check followed by the read; either failing becomes a `ReadError`
    async fn checked<T>(
        &self,
        full_path: &Path,
        read: impl Future<Output = io::Result<T>>,
    ) -> FileResult<T> {
        let outcome = match self.fs.exists(full_path).await {
            Ok(true) => read.await.map_err(ReadError::from_detail),
            Ok(false) => Err(ReadError::from_detail(NotFound(full_path))),
            Err(e) => Err(ReadError::from_detail(e)),
        };

        outcome.inspect_err(|e| {
            tracing::error!(target: "files", "{}", e.message());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::READ_FAILED_PREFIX;
    use crate::host::{CommandQuery, TokioFs};
    use crate::storage::{KeyValueStore, MemoryStore};

    async fn accessor_in(dir: &Path) -> FileAccessor {
        let store = MemoryStore::new();
        store
            .set("exe_dir", &dir.to_string_lossy())
            .await
            .unwrap();
        let resolver = BaseDirResolver::new(Arc::new(store), Arc::new(CommandQuery), "exe_dir");
        FileAccessor::new(Arc::new(resolver), Arc::new(TokioFs))
    }

    #[test]
    fn test_format_mime_selection() {
        assert_eq!(ImageFormat::parse("jpg").mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::parse("JPEG").mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::parse("png").mime_type(), "image/png");
        assert_eq!(ImageFormat::parse("gif").mime_type(), "image/png");
        assert_eq!(ImageFormat::default().mime_type(), "image/jpeg");
    }

    #[test]
    fn test_read_type_parsing() {
        assert_eq!("base64".parse::<ReadType>(), Ok(ReadType::Base64));
        assert_eq!("blob".parse::<ReadType>(), Ok(ReadType::Blob));
        assert!("stream".parse::<ReadType>().is_err());
    }

    #[tokio::test]
    async fn test_base64_png_single_byte() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), [0x41]).unwrap();
        let accessor = accessor_in(dir.path()).await;

        let result = accessor
            .read("a.png", ReadType::Base64, ImageFormat::Png)
            .await
            .unwrap();
        assert_eq!(
            result,
            FileReadResult::DataUrl("data:image/png;base64,QQ==".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_format_defaults_to_png() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.gif"), b"GIF89a").unwrap();
        let accessor = accessor_in(dir.path()).await;

        let url = accessor
            .read("a.gif", ReadType::Base64, ImageFormat::parse("gif"))
            .await
            .unwrap()
            .into_data_url()
            .unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_blob_carries_raw_bytes_and_mime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("faces")).unwrap();
        std::fs::write(dir.path().join("faces").join("t1.faceimg"), [1u8, 2, 3]).unwrap();
        let accessor = accessor_in(dir.path()).await;

        let blob = accessor
            .read("faces/t1.faceimg", ReadType::Blob, ImageFormat::Jpg)
            .await
            .unwrap()
            .into_blob()
            .unwrap();
        assert_eq!(blob.mime_type, "image/jpeg");
        assert_eq!(blob.bytes.to_vec(), vec![1u8, 2, 3]);
        assert_eq!(blob.size(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_rejects_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let accessor = accessor_in(dir.path()).await;

        let err = accessor.read_image("missing.jpg").await.unwrap_err();
        assert!(err.message().starts_with(READ_FAILED_PREFIX));
        assert!(err.message().contains("missing.jpg"));

        let err = accessor.read_text("missing.txt").await.unwrap_err();
        assert!(err.message().starts_with(READ_FAILED_PREFIX));
    }

    #[tokio::test]
    async fn test_read_image_uses_default_format() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.img"), [0x41]).unwrap();
        let accessor = accessor_in(dir.path()).await;

        let jpeg = accessor.read_image("a.img").await.unwrap();
        assert_eq!(
            jpeg,
            FileReadResult::DataUrl("data:image/jpeg;base64,QQ==".to_string())
        );

        let png = accessor
            .with_default_format(ImageFormat::Png)
            .read_image("a.img")
            .await
            .unwrap();
        assert_eq!(
            png,
            FileReadResult::DataUrl("data:image/png;base64,QQ==".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "人脸").unwrap();
        let accessor = accessor_in(dir.path()).await;

        assert_eq!(accessor.read_text("notes.txt").await.unwrap(), "人脸");
    }

    #[tokio::test]
    async fn test_invalid_utf8_text_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.txt"), [0xff, 0xfe, 0xfd]).unwrap();
        let accessor = accessor_in(dir.path()).await;

        let err = accessor.read_text("bin.txt").await.unwrap_err();
        assert!(err.message().starts_with(READ_FAILED_PREFIX));
    }

    #[tokio::test]
    async fn test_exists_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let accessor = accessor_in(dir.path()).await;

        assert!(!accessor.exists("never.bin").await.unwrap());

        std::fs::write(dir.path().join("kept.bin"), b"x").unwrap();
        assert!(accessor.exists("kept.bin").await.unwrap());

        accessor.remove("kept.bin").await.unwrap();
        assert!(!accessor.exists("kept.bin").await.unwrap());

        let err = accessor.remove("kept.bin").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
