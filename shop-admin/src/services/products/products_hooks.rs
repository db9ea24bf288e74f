use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use shop_core::errors::ShopError;
use shop_core::{AfterHook, BeforeHook, HookContext, HookResult, ServiceMethodKind};
use validator::Validate;

use crate::services::categories::categories_shared::SERVICE as CATEGORIES;
use crate::services::AdminParams;
use crate::validation::validate;

const ERROR_MESSAGE: &str = "Product validation failed";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ProductInput {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(length(min = 1, message = "category is required"))]
    category: String,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    price: Option<f64>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    old_price: Option<f64>,
    #[validate(range(min = 0, message = "must not be negative"))]
    count_in_stock: Option<i64>,
    #[validate(range(min = 0.0, max = 5.0))]
    rating: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    discount: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ProductPatch {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: Option<String>,
    #[validate(length(min = 1, message = "category must not be empty"))]
    category: Option<String>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    price: Option<f64>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    old_price: Option<f64>,
    #[validate(range(min = 0, message = "must not be negative"))]
    count_in_stock: Option<i64>,
    #[validate(range(min = 0.0, max = 5.0))]
    rating: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    discount: Option<f64>,
}

pub struct ValidateProduct;

#[async_trait]
impl BeforeHook<Value, AdminParams> for ValidateProduct {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(data) = ctx.data.as_mut() else {
            return Ok(());
        };
        if let Some(Value::String(name)) = data.get_mut("name") {
            *name = name.trim().to_string();
        }

        match ctx.method {
            ServiceMethodKind::Patch => {
                validate::<ProductPatch>(data, ERROR_MESSAGE)?;
            }
            _ => {
                validate::<ProductInput>(data, ERROR_MESSAGE)?;
            }
        }
        Ok(())
    }
}

/// The referenced category must exist in the tenant; its name is copied
/// into `catName` when the payload carries none.
pub struct ValidateProductCategory;

#[async_trait]
impl BeforeHook<Value, AdminParams> for ValidateProductCategory {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(category_id) = ctx
            .data
            .as_ref()
            .and_then(|d| d.get("category"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
        else {
            return Ok(());
        };

        let categories = ctx.services.service(CATEGORIES)?;
        let category = categories
            .get(ctx.context.clone(), &category_id, AdminParams::internal())
            .await
            .map_err(|_| ShopError::not_found("Invalid Category!").into_anyhow())?;

        if let Some(obj) = ctx.data.as_mut().and_then(|d| d.as_object_mut()) {
            obj.insert("category".to_string(), Value::String(category_id));
            if !obj.contains_key("catName") {
                if let Some(name) = category.get("name") {
                    obj.insert("catName".to_string(), name.clone());
                }
            }
        }
        Ok(())
    }
}

fn should_expand_category(ctx: &HookContext<Value, AdminParams>) -> bool {
    ctx.params
        .query_str("expand")
        .map(|expand| expand.split(',').map(str::trim).any(|s| s == "category"))
        .unwrap_or(false)
}

async fn expand_one(ctx: &HookContext<Value, AdminParams>, mut v: Value) -> Result<Value> {
    let Some(category_id) = v.get("category").and_then(|c| c.as_str()).map(|s| s.to_string()) else {
        return Ok(v);
    };

    let categories = ctx.services.service(CATEGORIES)?;
    if let Ok(category) = categories
        .get(ctx.context.clone(), &category_id, AdminParams::internal())
        .await
    {
        if let Some(obj) = v.as_object_mut() {
            obj.insert(
                "categoryDetails".to_string(),
                json!({
                    "id": category.get("id"),
                    "name": category.get("name"),
                    "slug": category.get("slug"),
                    "images": category.get("images"),
                }),
            );
        }
    }
    Ok(v)
}

/// `?expand=category` embeds the referenced category as `categoryDetails`.
pub struct ExpandProductCategory;

#[async_trait]
impl AfterHook<Value, AdminParams> for ExpandProductCategory {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        if !should_expand_category(ctx) {
            return Ok(());
        }

        let Some(res) = ctx.result.take() else {
            return Ok(());
        };

        ctx.result = Some(match res {
            HookResult::One(v) => HookResult::One(expand_one(ctx, v).await?),
            HookResult::Many(vs) => {
                let mut out = Vec::with_capacity(vs.len());
                for v in vs {
                    out.push(expand_one(ctx, v).await?);
                }
                HookResult::Many(out)
            }
            other => other,
        });

        Ok(())
    }
}
