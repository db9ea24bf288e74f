use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use shop_core::errors::ShopError;
use shop_core::{BeforeHook, HookContext};

use crate::services::categories::categories_shared::SERVICE as CATEGORIES;
use crate::services::AdminParams;

const ERROR_MESSAGE: &str = "Banner validation failed";

/// A banner may point at a category (`catId`) and a sub category
/// (`subCatId`); both must exist, and their names are copied alongside.
pub struct ValidateBannerCategory;

#[async_trait]
impl BeforeHook<Value, AdminParams> for ValidateBannerCategory {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(data) = ctx.data.as_ref() else {
            return Ok(());
        };
        if !data.is_object() {
            return Err(ShopError::unprocessable(ERROR_MESSAGE)
                .with_errors(json!({"_schema": ["expected an object"]}))
                .into_anyhow());
        }

        let categories = ctx.services.service(CATEGORIES)?;
        let mut names = Vec::new();

        for (id_field, name_field) in [("catId", "catName"), ("subCatId", "subCatName")] {
            let Some(id) = data.get(id_field).and_then(|v| v.as_str()).map(str::trim) else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            match categories
                .get(ctx.context.clone(), id, AdminParams::internal())
                .await
            {
                Ok(category) => names.push((name_field, category.get("name").cloned())),
                Err(_) => {
                    return Err(ShopError::unprocessable(ERROR_MESSAGE)
                        .with_errors(json!({ id_field: ["category not found"] }))
                        .into_anyhow())
                }
            }
        }

        if let Some(obj) = ctx.data.as_mut().and_then(|d| d.as_object_mut()) {
            for (field, name) in names {
                if let (false, Some(name)) = (obj.contains_key(field), name) {
                    obj.insert(field.to_string(), name);
                }
            }
        }
        Ok(())
    }
}
