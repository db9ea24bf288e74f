//! Record bookkeeping shared by the resource services.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use shop_blob::{ImageAdapter, ObjectIdStrategy};
use shop_core::errors::ShopError;
use shop_core::ShopContext;

use super::adapters::document_store::TenantCollection;
use super::images::images_of;

pub fn now_ts() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn object(data: Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(obj) => Ok(obj),
        _ => Err(ShopError::bad_request("Request body must be a JSON object").into_anyhow()),
    }
}

/// New record with `createdAt` set.
pub fn for_create(data: Value) -> Result<Value> {
    let mut obj = object(data)?;
    obj.insert("createdAt".to_string(), now_ts());
    Ok(Value::Object(obj))
}

/// Full replacement of `existing`: `keep` fields absent from `data` carry
/// over, `createdAt` always does.
pub fn for_update(existing: &Value, data: Value, keep: &[&str]) -> Result<Value> {
    let mut obj = object(data)?;
    obj.remove("id");

    for field in keep {
        if obj.contains_key(*field) {
            continue;
        }
        if let Some(v) = existing.get(*field) {
            obj.insert(field.to_string(), v.clone());
        }
    }
    if let Some(v) = existing.get("createdAt") {
        obj.insert("createdAt".to_string(), v.clone());
    }
    obj.insert("updatedAt".to_string(), now_ts());
    Ok(Value::Object(obj))
}

pub fn for_patch(data: Value) -> Result<Value> {
    let mut obj = object(data)?;
    obj.remove("id");
    obj.remove("createdAt");
    obj.insert("updatedAt".to_string(), now_ts());
    Ok(Value::Object(obj))
}

/// Release the record's images, then delete it.
///
/// Answers the removed record with one `imageReleases` entry per image.
/// Image failures are reported there and never stop the delete.
pub async fn release_and_remove(
    adapter: &TenantCollection,
    images: &ImageAdapter,
    strategy: ObjectIdStrategy,
    ctx: &ShopContext,
    id: &str,
) -> Result<Value> {
    let existing = adapter._get(ctx, id).await?;
    let releases = images.release_images(images_of(&existing), strategy).await;

    let failed = releases.iter().filter(|r| r.is_failed()).count();
    if failed > 0 {
        tracing::warn!(
            collection = adapter.collection,
            id,
            failed,
            "record removed with images left on host"
        );
    }

    let mut removed = adapter._remove(ctx, id).await?;
    if let Some(obj) = removed.as_object_mut() {
        obj.insert("imageReleases".to_string(), json!(releases));
    }
    Ok(removed)
}
