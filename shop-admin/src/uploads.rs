//! Image routes mounted next to every image-bearing service:
//!
//! | route                            | effect                                   |
//! |----------------------------------|------------------------------------------|
//! | `POST /upload`                   | stage a batch for the caller's session   |
//! | `DELETE /deleteImage?img=<url>`  | delete one remote image                  |
//! | `DELETE /{id}/images?imageId=`   | delete one image and drop it from record |

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shop_axum::{context_from_headers, read_multipart, MultipartConfig, ShopAxumError};
use shop_blob::{ImageAdapter, ImageFile, RemoteDeletion};
use shop_core::errors::ShopError;

use crate::routes::AdminApp;
use crate::services::images::{blob_error, images_of, staging_key, ImageResource};
use crate::services::AdminParams;

/// Multipart field carrying the files of an upload batch.
pub const FILE_FIELD: &str = "images";

#[derive(Clone)]
pub struct ImageRoutes {
    pub app: AdminApp,
    pub images: Arc<ImageAdapter>,
    pub resource: ImageResource,
    pub multipart: MultipartConfig,
}

async fn upload(
    State(routes): State<ImageRoutes>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Vec<String>>, ShopAxumError> {
    let ctx = context_from_headers(&headers);
    let form = read_multipart(&headers, body, &routes.multipart).await?;

    let files: Vec<ImageFile> = form
        .files_named(FILE_FIELD)
        .map(|f| {
            let mut file = ImageFile::new(f.data.clone());
            if let Some(name) = &f.filename {
                file = file.with_filename(name.clone());
            }
            if let Some(ct) = &f.content_type {
                file = file.with_content_type(ct.clone());
            }
            file
        })
        .collect();

    let urls = routes
        .images
        .stage_upload_batch(&staging_key(&ctx), &routes.resource.target(), files)
        .await
        .map_err(blob_error)?;
    Ok(Json(urls))
}

fn required<'a>(query: &'a HashMap<String, String>, key: &str) -> Result<&'a str, ShopAxumError> {
    query
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ShopError::bad_request(format!("Missing query parameter '{key}'")).into())
}

/// Remote delete only; no record is touched.
async fn delete_image(
    State(routes): State<ImageRoutes>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ShopAxumError> {
    let url = required(&query, "img")?;

    let object_id = routes
        .images
        .resolve_object_id(url, routes.resource.release)
        .map_err(blob_error)?;
    let result = match routes
        .images
        .delete_remote_image(&object_id)
        .await
        .map_err(blob_error)?
    {
        RemoteDeletion::Deleted => "ok",
        RemoteDeletion::NotFound => "not found",
    };

    Ok(Json(json!({ "result": result })))
}

/// The remote object goes first; the record keeps the URL when that fails.
async fn detach_image(
    State(routes): State<ImageRoutes>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ShopAxumError> {
    let ctx = context_from_headers(&headers);
    let image_id = required(&query, "imageId")?;
    let Some(strategy) = routes.resource.detach else {
        return Err(ShopError::method_not_allowed("Image removal is not supported here").into());
    };

    let svc = routes.app.service(routes.resource.service)?;
    let record = svc.get(ctx.clone(), &id, AdminParams::internal()).await?;

    let images = images_of(&record);
    let Some(url) = images.iter().find(|u| u.contains(image_id)).cloned() else {
        return Err(ShopError::not_found(format!("Image '{image_id}' not found on '{id}'")).into());
    };

    let object_id = routes
        .images
        .detach_image(&url, strategy)
        .await
        .map_err(blob_error)?;

    let remaining: Vec<String> = images.into_iter().filter(|u| *u != url).collect();
    svc.patch(
        ctx,
        &id,
        json!({ "images": remaining.clone() }),
        AdminParams::internal(),
    )
    .await?;

    tracing::info!(service = routes.resource.service, id = %id, object_id = %object_id, "image detached");
    Ok(Json(json!({
        "id": id,
        "images": remaining,
        "objectId": object_id,
    })))
}

impl ImageRoutes {
    pub fn router(self) -> Router<()> {
        let mut router = Router::new()
            .route("/upload", post(upload))
            .route("/deleteImage", delete(delete_image));
        if self.resource.detach.is_some() {
            router = router.route("/{id}/images", delete(detach_image));
        }
        router.with_state(self)
    }
}
