//! Image plumbing shared by every image-bearing resource.

use std::sync::Arc;

use serde_json::Value;
use shop_blob::{
    BlobError, FlatKeyStrategy, ImageKeyStrategy, NestedKeyStrategy, ObjectIdStrategy, StagingKey,
    UploadTarget,
};
use shop_core::errors::ShopError;
use shop_core::ShopContext;

/// How one resource lays out its images on the host and which rule maps
/// its stored URLs back to object ids.
///
/// The key layout and the rules must agree: flat keys resolve under both
/// rules, nested keys only under [`ObjectIdStrategy::PathAwareId`].
#[derive(Clone)]
pub struct ImageResource {
    pub service: &'static str,
    pub folder: &'static str,
    pub keys: Arc<dyn ImageKeyStrategy>,
    /// Used when the owning record is deleted and by `deleteImage?img=`.
    pub release: ObjectIdStrategy,
    /// Used by `DELETE /{id}/images?imageId=`; `None` when not exposed.
    pub detach: Option<ObjectIdStrategy>,
}

impl ImageResource {
    pub fn target(&self) -> UploadTarget {
        UploadTarget::new(self.folder, Arc::clone(&self.keys))
    }

    pub fn categories() -> Self {
        Self {
            service: "categories",
            folder: "categories",
            keys: Arc::new(FlatKeyStrategy),
            release: ObjectIdStrategy::SimpleId,
            detach: Some(ObjectIdStrategy::PathAwareId),
        }
    }

    pub fn products() -> Self {
        Self {
            service: "products",
            folder: "products",
            keys: Arc::new(FlatKeyStrategy),
            release: ObjectIdStrategy::SimpleId,
            detach: None,
        }
    }

    pub fn banners() -> Self {
        Self {
            service: "banners",
            folder: "banners",
            keys: Arc::new(FlatKeyStrategy),
            release: ObjectIdStrategy::SimpleId,
            detach: None,
        }
    }

    pub fn users() -> Self {
        Self {
            service: "users",
            folder: "users",
            keys: Arc::new(NestedKeyStrategy),
            release: ObjectIdStrategy::PathAwareId,
            detach: Some(ObjectIdStrategy::PathAwareId),
        }
    }
}

pub fn staging_key(ctx: &ShopContext) -> StagingKey {
    StagingKey::new(
        ctx.tenant(),
        ctx.session_id.as_deref().unwrap_or("anonymous"),
    )
}

/// String entries of a record's `images` array, in order.
pub fn images_of(record: &Value) -> Vec<String> {
    record
        .get("images")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Map image failures onto HTTP-facing errors.
pub fn blob_error(err: BlobError) -> anyhow::Error {
    let message = err.to_string();
    let shop = match &err {
        BlobError::Invalid { .. } | BlobError::Resolution { .. } => ShopError::bad_request(message),
        BlobError::NotFound { .. } => ShopError::not_found(message),
        BlobError::Timeout { .. } => ShopError::timeout(message),
        BlobError::UploadFailed { .. }
        | BlobError::RemoteDelete { .. }
        | BlobError::Backend { .. }
        | BlobError::Io { .. } => ShopError::bad_gateway(message),
    };
    shop.with_source(anyhow::Error::new(err)).into_anyhow()
}
