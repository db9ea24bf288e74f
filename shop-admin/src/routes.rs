//! Listing and counting routes that wrap service calls in the response
//! envelopes the admin client expects.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shop_axum::{context_from_headers, RestParams, ShopAxumError};
use shop_core::errors::ShopError;
use shop_core::ShopApp;

use crate::services::query::{with_page, PageRequest};
use crate::services::AdminParams;

pub type AdminApp = Arc<ShopApp<Value, AdminParams>>;

/// JSON body or a Feathers-style 400.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ShopAxumError> {
    body.map(|Json(v)| v).map_err(|rejection| {
        ShopError::bad_request("Failed to parse the request body as JSON")
            .with_errors(json!({"_schema": [rejection.to_string()]}))
            .into()
    })
}

fn rest_params(headers: &HeaderMap, query: HashMap<String, String>, uri: &axum::http::Uri) -> AdminParams {
    RestParams::from_parts("rest", headers, query, "GET", uri)
}

/// `GET /` answering `{<key>: [...], totalPages, page}`.
#[derive(Clone)]
pub struct PagedList {
    pub app: AdminApp,
    pub service: &'static str,
    pub key: &'static str,
    pub not_found: &'static str,
    /// Config key holding a fixed page size; otherwise `perPage` decides.
    pub per_page_config: Option<&'static str>,
}

async fn paged_list(
    State(list): State<PagedList>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, ShopAxumError> {
    let ctx = context_from_headers(&headers);
    let params = rest_params(&headers, query, &uri);

    let default_per_page = list
        .per_page_config
        .and_then(|key| list.app.config_snapshot().get_usize(key));
    let request = match list.per_page_config {
        // fixed page size; the client only picks the page
        Some(_) => PageRequest {
            per_page: default_per_page,
            ..PageRequest::from_query(&params, default_per_page)
        },
        None => PageRequest::from_query(&params, None),
    };

    let svc = list.app.service(list.service)?;
    let total = svc.count(ctx.clone(), params.clone()).await?;
    if request.is_beyond(total) {
        return Err(ShopError::not_found(list.not_found).into());
    }

    let items = svc.find(ctx, with_page(&params, request.window())).await?;
    Ok(Json(json!({
        list.key: items,
        "totalPages": request.total_pages(total),
        "page": request.page,
    })))
}

impl PagedList {
    pub fn router(self) -> Router<()> {
        Router::new().route("/", get(paged_list)).with_state(self)
    }
}

/// `GET <path>` answering `{<key>: n}` for a fixed query.
#[derive(Clone)]
pub struct CountRoute {
    pub app: AdminApp,
    pub service: &'static str,
    pub key: &'static str,
    pub query: &'static [(&'static str, &'static str)],
}

async fn count(
    State(route): State<CountRoute>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, ShopAxumError> {
    let ctx = context_from_headers(&headers);
    let query = route
        .query
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let params = rest_params(&headers, query, &uri);

    let n = route.app.service(route.service)?.count(ctx, params).await?;
    Ok(Json(json!({ route.key: n })))
}

impl CountRoute {
    pub fn router(self, path: &str) -> Router<()> {
        Router::new().route(path, get(count)).with_state(self)
    }
}

/// `GET <path>` answering the records matching a fixed query, bare or
/// as `{<envelope>: [...]}`.
#[derive(Clone)]
pub struct FixedList {
    pub app: AdminApp,
    pub service: &'static str,
    pub query: &'static [(&'static str, &'static str)],
    pub envelope: Option<&'static str>,
}

async fn fixed_list(
    State(route): State<FixedList>,
    headers: HeaderMap,
    Query(mut query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, ShopAxumError> {
    let ctx = context_from_headers(&headers);
    for (k, v) in route.query {
        query.insert(k.to_string(), v.to_string());
    }
    let params = rest_params(&headers, query, &uri);

    let items = Value::Array(route.app.service(route.service)?.find(ctx, params).await?);
    Ok(Json(match route.envelope {
        Some(key) => json!({ key: items }),
        None => items,
    }))
}

impl FixedList {
    pub fn router(self, path: &str) -> Router<()> {
        Router::new().route(path, get(fixed_list)).with_state(self)
    }
}

/// `POST /create`, the path older admin clients post new records to.
#[derive(Clone)]
pub struct CreateAlias {
    pub app: AdminApp,
    pub service: &'static str,
}

async fn create_alias(
    State(route): State<CreateAlias>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ShopAxumError> {
    let data = json_body(body)?;
    let ctx = context_from_headers(&headers);
    let params = RestParams::from_parts("rest", &headers, HashMap::new(), "POST", &uri);

    let created = route.app.service(route.service)?.create(ctx, data, params).await?;
    Ok(Json(created))
}

impl CreateAlias {
    pub fn router(self) -> Router<()> {
        Router::new().route("/create", post(create_alias)).with_state(self)
    }
}
