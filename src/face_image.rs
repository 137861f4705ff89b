//! Binding that loads a face image into a display slot.
//!
//! The slot owns at most one object URL at a time. Every rebind releases the
//! previous URL before a new one is acquired, and unmounting releases it.

use serde::{Deserialize, Serialize};

use crate::accessor::{FileAccessor, ReadType};
use crate::object_url::{ObjectUrl, ObjectUrlRegistry};

/// Prefix logged when a face image cannot be loaded
pub const LOAD_FAILED_PREFIX: &str = "加载图片失败：";

const FACE_IMAGE_EXTENSION: &str = "faceimg";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceJsonData {
    #[serde(default)]
    pub view: bool,
}

/// Value bound to an image element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceImageRequest {
    #[serde(default)]
    pub json_data: Option<FaceJsonData>,
    #[serde(default)]
    pub face_token: String,
}

impl FaceImageRequest {
    pub fn is_visible(&self) -> bool {
        self.json_data.as_ref().is_some_and(|data| data.view)
    }
}

/// Relative path of a stored face image
pub fn face_image_path(faces_dir: &str, face_token: &str) -> String {
    format!("{faces_dir}/{face_token}.{FACE_IMAGE_EXTENSION}")
}

/// Display state of one image element
#[derive(Debug, Default)]
pub struct ImageSlot {
    src: Option<String>,
    object_url: Option<ObjectUrl>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn release(&mut self) {
        if let Some(object_url) = self.object_url.take() {
            object_url.release();
        }
    }

    fn clear(&mut self) {
        self.src = None;
    }

    fn assign(&mut self, object_url: ObjectUrl) {
        self.src = Some(object_url.as_str().to_string());
        self.object_url = Some(object_url);
    }
}

#[derive(Clone)]
pub struct FaceImageBinding {
    accessor: FileAccessor,
    registry: ObjectUrlRegistry,
    faces_dir: String,
}

impl FaceImageBinding {
    pub fn new(
        accessor: FileAccessor,
        registry: ObjectUrlRegistry,
        faces_dir: impl Into<String>,
    ) -> Self {
        Self {
            accessor,
            registry,
            faces_dir: faces_dir.into(),
        }
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    pub async fn mounted(&self, slot: &mut ImageSlot, request: &FaceImageRequest) {
        self.bind(slot, request).await;
    }

    pub async fn updated(&self, slot: &mut ImageSlot, request: &FaceImageRequest) {
        self.bind(slot, request).await;
    }

    pub fn unmounted(&self, slot: &mut ImageSlot) {
        slot.release();
        slot.clear();
    }

    async fn bind(&self, slot: &mut ImageSlot, request: &FaceImageRequest) {
        slot.release();

        if !request.is_visible() {
            slot.clear();
            return;
        }

        let path = face_image_path(&self.faces_dir, &request.face_token);
        let blob = match self
            .accessor
            .read(&path, ReadType::Blob, self.accessor.default_format().clone())
            .await
        {
            Ok(result) => result.into_blob(),
            Err(e) => {
                tracing::warn!(target: "face_image", face_token = %request.face_token, "{LOAD_FAILED_PREFIX}{e}");
                None
            }
        };

        match blob {
            Some(blob) => slot.assign(self.registry.create(blob)),
            None => slot.clear(),
        }
    }
}
