use std::sync::Arc;

use serde_json::Value;
use shop_blob::ImageAdapter;
use shop_core::{ServiceCapabilities, ServiceMethodKind, ShopApp};

use crate::services::image_hooks::register_image_hooks;
use crate::services::AdminParams;

pub const SERVICE: &str = "categories";
pub const COLLECTION: &str = "categories";

/// `find` is served by the `categoryList` route, not the generic one.
pub fn crud_capabilities() -> ServiceCapabilities {
    ServiceCapabilities::from_methods(vec![
        ServiceMethodKind::Get,
        ServiceMethodKind::Create,
        ServiceMethodKind::Update,
        ServiceMethodKind::Patch,
        ServiceMethodKind::Remove,
    ])
}

/// `"Men's Shoes"` → `"men-s-shoes"`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

pub fn register_hooks(app: &ShopApp<Value, AdminParams>, images: Arc<ImageAdapter>) -> anyhow::Result<()> {
    app.service(SERVICE)?.hooks(|h| {
        h.before_create(Arc::new(super::categories_hooks::ValidateCategory));
        h.before_update(Arc::new(super::categories_hooks::ValidateCategory));
        h.before_patch(Arc::new(super::categories_hooks::ValidateCategory));
    });
    register_image_hooks(app, SERVICE, images)
}
