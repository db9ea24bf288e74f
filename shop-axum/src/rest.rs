use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::{OriginalUri, Path, Query, State},
    http::HeaderMap,
    routing::MethodRouter,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use shop_core::errors::ShopError;
use shop_core::{ServiceCapabilities, ServiceMethodKind, ShopApp, ShopContext};

use crate::{
    params::{FromRestParams, RestParams},
    ShopAxumError,
};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const SESSION_HEADER: &str = "x-session-id";

pub(crate) fn map_json_rejection(rejection: JsonRejection) -> ShopAxumError {
    ShopError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.to_string()]}))
        .into()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Tenant from `x-tenant-id` (default "default"), session from `x-session-id`.
pub fn context_from_headers(headers: &HeaderMap) -> ShopContext {
    let ctx = ShopContext::new(header(headers, TENANT_HEADER).unwrap_or("default"));
    match header(headers, SESSION_HEADER) {
        Some(session) => ctx.with_session(session),
        None => ctx,
    }
}

/// Router state for one mounted service.
pub struct ServiceRoute<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub app: Arc<ShopApp<R, P>>,
    pub name: Arc<String>,
}

impl<R, P> Clone for ServiceRoute<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            name: Arc::clone(&self.name),
        }
    }
}

fn params<P: FromRestParams>(
    headers: &HeaderMap,
    query: HashMap<String, String>,
    method: &str,
    uri: &axum::http::Uri,
) -> P {
    P::from_rest_params(RestParams::from_parts("rest", headers, query, method, uri))
}

async fn find<R, P>(
    State(route): State<ServiceRoute<R, P>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<R>>, ShopAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let ctx = context_from_headers(&headers);
    let svc = route.app.service(&route.name)?;
    let res = svc.find(ctx, params(&headers, query, "GET", &uri)).await?;
    Ok(Json(res))
}

async fn get<R, P>(
    State(route): State<ServiceRoute<R, P>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Json<R>, ShopAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let ctx = context_from_headers(&headers);
    let svc = route.app.service(&route.name)?;
    let res = svc.get(ctx, &id, params(&headers, query, "GET", &uri)).await?;
    Ok(Json(res))
}

async fn create<R, P>(
    State(route): State<ServiceRoute<R, P>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    data: Result<Json<R>, JsonRejection>,
) -> Result<Json<R>, ShopAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let ctx = context_from_headers(&headers);
    let Json(data) = data.map_err(map_json_rejection)?;
    let svc = route.app.service(&route.name)?;
    let res = svc
        .create(ctx, data, params(&headers, query, "POST", &uri))
        .await?;
    Ok(Json(res))
}

async fn update<R, P>(
    State(route): State<ServiceRoute<R, P>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    data: Result<Json<R>, JsonRejection>,
) -> Result<Json<R>, ShopAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let ctx = context_from_headers(&headers);
    let Json(data) = data.map_err(map_json_rejection)?;
    let svc = route.app.service(&route.name)?;
    let res = svc
        .update(ctx, &id, data, params(&headers, query, "PUT", &uri))
        .await?;
    Ok(Json(res))
}

async fn patch<R, P>(
    State(route): State<ServiceRoute<R, P>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    data: Result<Json<R>, JsonRejection>,
) -> Result<Json<R>, ShopAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let ctx = context_from_headers(&headers);
    let Json(data) = data.map_err(map_json_rejection)?;
    let svc = route.app.service(&route.name)?;
    let res = svc
        .patch(ctx, &id, data, params(&headers, query, "PATCH", &uri))
        .await?;
    Ok(Json(res))
}

async fn remove<R, P>(
    State(route): State<ServiceRoute<R, P>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Json<R>, ShopAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let ctx = context_from_headers(&headers);
    let svc = route.app.service(&route.name)?;
    let res = svc
        .remove(ctx, &id, params(&headers, query, "DELETE", &uri))
        .await?;
    Ok(Json(res))
}

/// REST routes for the methods listed in `capabilities`:
///
/// | method | route         |
/// |--------|---------------|
/// | find   | `GET /`       |
/// | create | `POST /`      |
/// | get    | `GET /{id}`   |
/// | update | `PUT /{id}`   |
/// | patch  | `PATCH /{id}` |
/// | remove | `DELETE /{id}`|
pub fn service_router<R, P>(
    service_name: Arc<String>,
    app: Arc<ShopApp<R, P>>,
    capabilities: &ServiceCapabilities,
) -> Router<()>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    use ServiceMethodKind::*;

    let state = ServiceRoute {
        app,
        name: service_name,
    };

    let mut collection: Option<MethodRouter<ServiceRoute<R, P>>> = None;
    let mut item: Option<MethodRouter<ServiceRoute<R, P>>> = None;

    fn add<S: Clone + Send + Sync + 'static>(
        slot: &mut Option<MethodRouter<S>>,
        f: impl FnOnce(MethodRouter<S>) -> MethodRouter<S>,
    ) {
        let current = slot.take().unwrap_or_else(MethodRouter::new);
        *slot = Some(f(current));
    }

    if capabilities.allows(&Find) {
        add(&mut collection, |m| m.get(find::<R, P>));
    }
    if capabilities.allows(&Create) {
        add(&mut collection, |m| m.post(create::<R, P>));
    }
    if capabilities.allows(&Get) {
        add(&mut item, |m| m.get(get::<R, P>));
    }
    if capabilities.allows(&Update) {
        add(&mut item, |m| m.put(update::<R, P>));
    }
    if capabilities.allows(&Patch) {
        add(&mut item, |m| m.patch(patch::<R, P>));
    }
    if capabilities.allows(&Remove) {
        add(&mut item, |m| m.delete(remove::<R, P>));
    }

    let mut router: Router<ServiceRoute<R, P>> = Router::new();
    if let Some(m) = collection {
        router = router.route("/", m);
    }
    if let Some(m) = item {
        router = router.route("/{id}", m);
    }

    router.with_state(state)
}
