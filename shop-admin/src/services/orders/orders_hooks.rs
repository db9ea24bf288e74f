use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shop_core::{BeforeHook, HookContext, ServiceMethodKind};
use validator::Validate;

use crate::services::AdminParams;
use crate::validation::validate;

const ERROR_MESSAGE: &str = "Order validation failed";
const STATUSES: &[&str] = &["pending", "confirmed", "shipped", "delivered", "cancelled"];

fn known_status(status: &str) -> Result<(), validator::ValidationError> {
    if STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("status").with_message("unknown order status".into()))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct OrderLine {
    #[serde(rename = "productId")]
    #[validate(length(min = 1, message = "productId is required"))]
    product_id: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct OrderInput {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(length(min = 1, message = "an order needs at least one product"), nested)]
    products: Vec<OrderLine>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    amount: f64,
    #[validate(email)]
    email: Option<String>,
    #[validate(custom(function = "known_status"))]
    status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct OrderPatch {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: Option<String>,
    #[validate(length(min = 1, message = "an order needs at least one product"), nested)]
    products: Option<Vec<OrderLine>>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    amount: Option<f64>,
    #[validate(email)]
    email: Option<String>,
    #[validate(custom(function = "known_status"))]
    status: Option<String>,
}

/// Validates the payload; new orders start as `pending`.
pub struct ValidateOrder;

#[async_trait]
impl BeforeHook<Value, AdminParams> for ValidateOrder {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(data) = ctx.data.as_mut() else {
            return Ok(());
        };

        if ctx.method == ServiceMethodKind::Patch {
            validate::<OrderPatch>(data, ERROR_MESSAGE)?;
            return Ok(());
        }

        validate::<OrderInput>(data, ERROR_MESSAGE)?;
        if let Some(obj) = data.as_object_mut() {
            if !obj.contains_key("status") {
                obj.insert("status".to_string(), Value::String("pending".to_string()));
            }
        }
        Ok(())
    }
}
