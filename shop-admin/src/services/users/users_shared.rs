use std::sync::Arc;

use serde_json::Value;
use shop_blob::ImageAdapter;
use shop_core::{ServiceCapabilities, ShopApp};

use crate::services::image_hooks::register_image_hooks;
use crate::services::AdminParams;

pub const SERVICE: &str = "users";
pub const COLLECTION: &str = "users";

pub fn capabilities() -> ServiceCapabilities {
    ServiceCapabilities::standard_crud()
}

pub fn register_hooks(app: &ShopApp<Value, AdminParams>, images: Arc<ImageAdapter>) -> anyhow::Result<()> {
    app.service(SERVICE)?.hooks(|h| {
        h.before_create(Arc::new(super::users_hooks::ValidateUser));
        h.before_update(Arc::new(super::users_hooks::ValidateUser));
        h.before_patch(Arc::new(super::users_hooks::ValidateUser));
        h.before_create(Arc::new(super::users_hooks::UniqueEmail));
        h.before_update(Arc::new(super::users_hooks::UniqueEmail));
        h.before_patch(Arc::new(super::users_hooks::UniqueEmail));
        h.before_create(Arc::new(super::users_hooks::HashPassword));
        h.before_update(Arc::new(super::users_hooks::HashPassword));
        h.before_patch(Arc::new(super::users_hooks::HashPassword));
        h.after_all(Arc::new(super::users_hooks::ProtectPassword));
    });
    register_image_hooks(app, SERVICE, images)
}
