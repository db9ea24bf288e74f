use std::sync::Arc;

use serde_json::Value;
use shop_blob::ImageAdapter;
use shop_core::{ServiceCapabilities, ShopApp};

use crate::services::image_hooks::register_image_hooks;
use crate::services::AdminParams;

pub const SERVICE: &str = "banners";
pub const COLLECTION: &str = "banners";

pub fn capabilities() -> ServiceCapabilities {
    ServiceCapabilities::standard_crud()
}

pub fn register_hooks(app: &ShopApp<Value, AdminParams>, images: Arc<ImageAdapter>) -> anyhow::Result<()> {
    app.service(SERVICE)?.hooks(|h| {
        h.before_create(Arc::new(super::banners_hooks::ValidateBannerCategory));
        h.before_update(Arc::new(super::banners_hooks::ValidateBannerCategory));
        h.before_patch(Arc::new(super::banners_hooks::ValidateBannerCategory));
    });
    register_image_hooks(app, SERVICE, images)
}
