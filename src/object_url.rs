//! Revocable object URLs for in-memory blobs.
//!
//! An [`ObjectUrl`] is a scoped handle: it is revoked exactly once, either
//! through [`ObjectUrl::release`] or when it is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::accessor::Blob;

/// Registry of live object URLs
#[derive(Clone, Default)]
pub struct ObjectUrlRegistry {
    live: Arc<Mutex<HashMap<String, Blob>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a blob and hand out a handle to it
    pub fn create(&self, blob: Blob) -> ObjectUrl {
        let url = format!("blob:{}", Uuid::new_v4());
        tracing::debug!(target: "object_url", url = %url, size = blob.size(), mime_type = blob.mime_type, "Object URL created");
        self.lock().insert(url.clone(), blob);
        ObjectUrl {
            url,
            registry: self.clone(),
            released: false,
        }
    }

    /// Look up the blob behind a live URL
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.lock().remove(url).is_some() {
            tracing::debug!(target: "object_url", url = %url, "Object URL revoked");
        }
    }
}

/// Handle to a registered blob
pub struct ObjectUrl {
    url: String,
    registry: ObjectUrlRegistry,
    released: bool,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn release(mut self) {
        self.revoke();
    }

    fn revoke(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.revoke(&self.url);
        }
    }
}

impl std::fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectUrl").field("url", &self.url).finish()
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.revoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn blob() -> Blob {
        Blob::new(Bytes::from_static(&[0xff, 0xd8]), "image/jpeg")
    }

    #[test]
    fn test_release_revokes() {
        let registry = ObjectUrlRegistry::new();
        let handle = registry.create(blob());
        let url = handle.as_str().to_string();

        assert!(url.starts_with("blob:"));
        assert_eq!(registry.resolve(&url), Some(blob()));

        handle.release();
        assert_eq!(registry.resolve(&url), None);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_drop_revokes() {
        let registry = ObjectUrlRegistry::new();
        {
            let _a = registry.create(blob());
            let _b = registry.create(blob());
            assert_eq!(registry.live_count(), 2);
        }
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.create(blob());
        let b = registry.create(blob());
        assert_ne!(a.as_str(), b.as_str());

        a.release();
        assert!(registry.resolve(b.as_str()).is_some());
    }
}
