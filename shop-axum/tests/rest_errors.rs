use std::sync::Arc;

use axum::body::Body;
use axum::http::HeaderValue;
use axum::http::Request;
use serde_json::{json, Value};
use shop_axum::axum;
use shop_core::errors::ShopError;
use shop_core::{ServiceCapabilities, ServiceMethodKind, ShopApp, ShopContext, ShopService};
use http_body_util::BodyExt;
use tower::ServiceExt;

struct UnprocessableOnCreate;

#[async_trait::async_trait]
impl ShopService<Value, ()> for UnprocessableOnCreate {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Create])
    }

    async fn create(&self, _ctx: &ShopContext, _data: Value, _params: ()) -> anyhow::Result<Value> {
        Err(ShopError::unprocessable("Invalid")
            .with_errors(json!({"name": ["required"]}))
            .into_anyhow())
    }
}

struct BoomOnCreate;

#[async_trait::async_trait]
impl ShopService<Value, ()> for BoomOnCreate {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Create])
    }

    async fn create(&self, _ctx: &ShopContext, _data: Value, _params: ()) -> anyhow::Result<Value> {
        Err(anyhow::anyhow!("boom"))
    }
}

/// Echoes the tenant and session the REST layer derived from headers.
struct WhoAmI;

#[async_trait::async_trait]
impl ShopService<Value, ()> for WhoAmI {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Get])
    }

    async fn get(&self, ctx: &ShopContext, id: &str, _params: ()) -> anyhow::Result<Value> {
        Ok(json!({
            "id": id,
            "tenant": ctx.tenant(),
            "session": ctx.session_key(),
        }))
    }
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn malformed_json_returns_bad_request() {
    let app: ShopApp<Value, ()> = ShopApp::new();
    let ax = axum(app).use_service("/categories", Arc::new(BoomOnCreate));

    let res = ax
        .router
        .oneshot(post_json("/categories", "{\"name\":\"x\""))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
    assert_eq!(body["code"], 400);
    assert_eq!(body["className"], "bad-request");
    assert!(body.get("errors").is_some());
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let app: ShopApp<Value, ()> = ShopApp::new();
    let ax = axum(app).use_service("/categories", Arc::new(BoomOnCreate));

    let provided = HeaderValue::from_static("req-test-123");
    let res = ax
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/categories")
                .header("content-type", "application/json")
                .header("x-request-id", provided.clone())
                .body(Body::from("{\"name\":\"ok\"}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn unprocessable_preserves_422_and_shape() {
    let app: ShopApp<Value, ()> = ShopApp::new();
    let ax = axum(app).use_service("/categories", Arc::new(UnprocessableOnCreate));

    let res = ax
        .router
        .oneshot(post_json("/categories", "{\"name\":\"ok\"}"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 422);
    let body = json_body(res).await;
    assert_eq!(body["name"], "Unprocessable");
    assert_eq!(body["code"], 422);
    assert_eq!(body["className"], "unprocessable");
    assert_eq!(body["errors"], json!({"name": ["required"]}));
}

#[tokio::test]
async fn plain_errors_map_to_general_error_shape() {
    let app: ShopApp<Value, ()> = ShopApp::new();
    let ax = axum(app).use_service("/categories", Arc::new(BoomOnCreate));

    let res = ax
        .router
        .oneshot(post_json("/categories", "{\"name\":\"ok\"}"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["name"], "GeneralError");
    assert_eq!(body["code"], 500);
    assert_eq!(body["className"], "general-error");
    assert!(body["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn only_declared_methods_are_routed() {
    let app: ShopApp<Value, ()> = ShopApp::new();
    let ax = axum(app).use_service("/categories", Arc::new(BoomOnCreate));

    let res = ax
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/categories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 405);

    let res = ax
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/categories/abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn tenant_and_session_come_from_headers() {
    let app: ShopApp<Value, ()> = ShopApp::new();
    let ax = axum(app).use_service("/whoami", Arc::new(WhoAmI));

    let res = ax
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/whoami/7")
                .header("x-tenant-id", "acme")
                .header("x-session-id", "s-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body, json!({"id": "7", "tenant": "acme", "session": "acme:s-1"}));

    let res = ax
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/whoami/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["tenant"], "default");
    assert_eq!(body["session"], "default:anonymous");
}
