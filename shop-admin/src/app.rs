use anyhow::Result;
use serde_json::Value;
use shop_axum::{axum, AxumApp};
use shop_core::ShopApp;

use crate::services::AdminParams;

pub fn admin_app() -> Result<AxumApp<Value, AdminParams>> {
    let shop_app: ShopApp<Value, AdminParams> = ShopApp::new();
    crate::config::config(&shop_app)?;
    crate::hooks::global_hooks(&shop_app);

    let admin_app: AxumApp<Value, AdminParams> = axum(shop_app);
    Ok(admin_app)
}
