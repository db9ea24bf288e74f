use std::sync::Arc;

use serde_json::Value;
use shop_blob::ImageAdapter;
use shop_core::{ServiceCapabilities, ServiceMethodKind, ShopApp};

use crate::services::image_hooks::register_image_hooks;
use crate::services::AdminParams;

pub const SERVICE: &str = "products";
pub const COLLECTION: &str = "products";

/// `find` is served by the paged listing route, not the generic one.
pub fn capabilities() -> ServiceCapabilities {
    ServiceCapabilities::from_methods(vec![
        ServiceMethodKind::Get,
        ServiceMethodKind::Create,
        ServiceMethodKind::Update,
        ServiceMethodKind::Patch,
        ServiceMethodKind::Remove,
    ])
}

pub fn register_hooks(app: &ShopApp<Value, AdminParams>, images: Arc<ImageAdapter>) -> anyhow::Result<()> {
    app.service(SERVICE)?.hooks(|h| {
        h.before_create(Arc::new(super::products_hooks::ValidateProduct));
        h.before_update(Arc::new(super::products_hooks::ValidateProduct));
        h.before_patch(Arc::new(super::products_hooks::ValidateProduct));
        h.before_create(Arc::new(super::products_hooks::ValidateProductCategory));
        h.before_update(Arc::new(super::products_hooks::ValidateProductCategory));
        h.before_patch(Arc::new(super::products_hooks::ValidateProductCategory));
        h.after(ServiceMethodKind::Find, Arc::new(super::products_hooks::ExpandProductCategory));
        h.after(ServiceMethodKind::Get, Arc::new(super::products_hooks::ExpandProductCategory));
    });
    register_image_hooks(app, SERVICE, images)
}
