use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::put;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use shop_axum::{context_from_headers, ShopAxumError};
use shop_core::errors::ShopError;

use super::users_password::verify_password;
use super::users_shared::SERVICE;
use crate::routes::{json_body, AdminApp};
use crate::services::AdminParams;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePassword {
    /// Current password.
    password: String,
    new_pass: Option<String>,
}

/// `PUT /users/changePassword/{id}`: the current password must match
/// before `newPass` replaces it.
async fn change_password(
    State(app): State<AdminApp>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<ChangePassword>, JsonRejection>,
) -> Result<Json<Value>, ShopAxumError> {
    let body = json_body(body)?;
    let ctx = context_from_headers(&headers);
    let users = app.service(SERVICE)?;

    let user = users.get(ctx.clone(), &id, AdminParams::internal()).await?;
    let stored = user
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if !verify_password(body.password, stored).await? {
        return Err(ShopError::bad_request("Current password is wrong").into());
    }

    let mut updated = match body.new_pass.filter(|p| !p.is_empty()) {
        Some(new_pass) => {
            users
                .patch(ctx, &id, json!({ "password": new_pass }), AdminParams::internal())
                .await?
        }
        None => user,
    };
    if let Some(obj) = updated.as_object_mut() {
        obj.remove("password");
    }

    tracing::info!(id = %id, "password changed");
    Ok(Json(updated))
}

pub fn router(app: AdminApp) -> Router<()> {
    Router::new()
        .route("/changePassword/{id}", put(change_password))
        .with_state(app)
}
