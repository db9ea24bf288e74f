use std::sync::Arc;

use serde_json::Value;
use shop_core::{ServiceCapabilities, ServiceMethodKind, ShopApp};

use crate::services::AdminParams;

pub const SERVICE: &str = "orders";
pub const COLLECTION: &str = "orders";

pub const DEFAULT_PER_PAGE: usize = 6;

pub fn capabilities() -> ServiceCapabilities {
    ServiceCapabilities::from_methods(vec![
        ServiceMethodKind::Get,
        ServiceMethodKind::Create,
        ServiceMethodKind::Update,
        ServiceMethodKind::Patch,
        ServiceMethodKind::Remove,
    ])
}

pub fn register_hooks(app: &ShopApp<Value, AdminParams>) -> anyhow::Result<()> {
    app.service(SERVICE)?.hooks(|h| {
        h.before_create(Arc::new(super::orders_hooks::ValidateOrder));
        h.before_update(Arc::new(super::orders_hooks::ValidateOrder));
        h.before_patch(Arc::new(super::orders_hooks::ValidateOrder));
    });
    Ok(())
}
