use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use shop_core::errors::ShopError;
use shop_core::{BeforeHook, HookContext, ServiceMethodKind};
use validator::Validate;

use crate::services::AdminParams;
use crate::validation::validate;

use super::categories_shared::{slugify, SERVICE};
use super::category_tree::{creates_cycle, CategoryRecord};

const ERROR_MESSAGE: &str = "Category validation failed";

#[derive(Debug, Deserialize, Validate)]
struct CategoryInput {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[serde(rename = "parentId", default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct CategoryPatch {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: Option<String>,
    #[serde(rename = "parentId", default)]
    parent_id: Option<String>,
}

fn invalid_parent(message: &str) -> anyhow::Error {
    ShopError::unprocessable(ERROR_MESSAGE)
        .with_errors(json!({"parentId": [message]}))
        .into_anyhow()
}

/// The parent must exist and must not be the category or one of its
/// descendants.
async fn check_parent(ctx: &HookContext<Value, AdminParams>, id: Option<&str>, parent: &str) -> Result<()> {
    if id == Some(parent) {
        return Err(invalid_parent("a category cannot be its own parent"));
    }

    let categories = ctx.services.service(SERVICE)?;
    let flat = categories
        .find(
            ctx.context.clone(),
            AdminParams::internal().with_query("flat", "true"),
        )
        .await?;
    let records: Vec<CategoryRecord> = flat.iter().filter_map(CategoryRecord::from_value).collect();

    if !records.iter().any(|r| r.id == parent) {
        return Err(invalid_parent("parent category not found"));
    }
    if let Some(id) = id {
        if creates_cycle(&records, id, parent) {
            return Err(invalid_parent("a category cannot be moved under its own descendant"));
        }
    }

    Ok(())
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Validates the payload, trims the name, derives the slug and guards the
/// parent reference.
pub struct ValidateCategory;

#[async_trait]
impl BeforeHook<Value, AdminParams> for ValidateCategory {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(data) = ctx.data.as_mut() else {
            return Ok(());
        };
        let Some(obj) = data.as_object_mut() else {
            return Err(ShopError::unprocessable(ERROR_MESSAGE)
                .with_errors(json!({"_schema": ["expected an object"]}))
                .into_anyhow());
        };

        if let Some(Value::String(name)) = obj.get_mut("name") {
            *name = name.trim().to_string();
        }
        let snapshot = Value::Object(obj.clone());

        let (name, parent) = match ctx.method {
            ServiceMethodKind::Patch => {
                let input: CategoryPatch = validate(&snapshot, ERROR_MESSAGE)?;
                (input.name, non_empty(input.parent_id))
            }
            _ => {
                let input: CategoryInput = validate(&snapshot, ERROR_MESSAGE)?;
                (Some(input.name), non_empty(input.parent_id))
            }
        };

        if let Some(name) = name {
            obj.insert("slug".to_string(), Value::String(slugify(&name)));
        }

        let own_id = match ctx.method {
            ServiceMethodKind::Create => obj.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()),
            _ => ctx.id.clone(),
        };

        if let Some(parent) = parent {
            obj.insert("parentId".to_string(), Value::String(parent.clone()));
            check_parent(ctx, own_id.as_deref(), &parent).await?;
        }

        Ok(())
    }
}
