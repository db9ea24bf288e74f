use async_trait::async_trait;
use uuid::Uuid;

use crate::{BlobResult, ImageFile};

/// Path segment every public image URL carries before the object id.
pub const UPLOAD_SEGMENT: &str = "upload";

/// Remote image host operations - implemented by every hosting backend
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store one image under `object_id`
    async fn upload(&self, object_id: &str, file: &ImageFile) -> BlobResult<HostedImage>;

    /// Delete the image stored under `object_id`
    async fn destroy(&self, object_id: &str) -> BlobResult<DestroyResult>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub secure_url: String,
    pub object_id: String,
}

/// What the host answered to a destroy request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyResult {
    Ok,
    NotFound,
    Other(String),
}

/// `<base>/upload/<object id>.<ext>`
pub fn public_url(base: &str, object_id: &str, ext: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        base.trim_end_matches('/'),
        UPLOAD_SEGMENT,
        object_id,
        ext
    )
}

/// Strategy for naming new remote objects
pub trait ImageKeyStrategy: Send + Sync {
    fn object_id(&self, folder: &str, file: &ImageFile) -> String;
}

/// `<folder>/<uuid>`: folder structure lives in the object id.
///
/// Only the path-aware rule maps these URLs back to their object.
#[derive(Debug, Clone, Default)]
pub struct NestedKeyStrategy;

impl ImageKeyStrategy for NestedKeyStrategy {
    fn object_id(&self, folder: &str, _file: &ImageFile) -> String {
        let folder = folder.trim_matches('/');
        let id = Uuid::new_v4().simple().to_string();
        if folder.is_empty() {
            id
        } else {
            format!("{folder}/{id}")
        }
    }
}

/// `<folder>_<uuid>`: a single path segment, so the simple and path-aware
/// rules resolve the same object id.
#[derive(Debug, Clone, Default)]
pub struct FlatKeyStrategy;

impl ImageKeyStrategy for FlatKeyStrategy {
    fn object_id(&self, folder: &str, _file: &ImageFile) -> String {
        let folder: String = folder
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let folder = folder.trim_matches('_');
        let id = Uuid::new_v4().simple().to_string();
        if folder.is_empty() {
            id
        } else {
            format!("{folder}_{id}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_strategies_shape_object_ids() {
        let file = ImageFile::new(vec![0u8]);

        let nested = NestedKeyStrategy.object_id("users", &file);
        assert!(nested.starts_with("users/"));
        assert_eq!(nested.split('/').count(), 2);

        let flat = FlatKeyStrategy.object_id("home/banners", &file);
        assert!(flat.starts_with("home_banners_"));
        assert!(!flat.contains('/'));
    }

    #[test]
    fn public_url_joins_base_and_id() {
        assert_eq!(
            public_url("https://cdn.example.com/", "categories/abc123", "png"),
            "https://cdn.example.com/upload/categories/abc123.png"
        );
    }
}
