use std::sync::Arc;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::handler::Handler;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shop_core::ShopApp;
use shop_core::ShopService;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::params::FromRestParams;
use crate::rest;

pub struct AxumApp<R, P = ()>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub app: Arc<ShopApp<R, P>>,
    pub router: Router<()>,
}

impl<R, P> Clone for AxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            router: self.router.clone(),
        }
    }
}

/// Every mounted router gets an `x-request-id` (kept when the client sent
/// one) and a request span carrying it.
fn with_request_layers(router: Router<()>) -> Router<()> {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str());
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    uri = %req.uri(),
                    matched_path,
                    request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

impl<R, P> AxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub fn new(app: ShopApp<R, P>) -> Self {
        Self {
            app: Arc::new(app),
            router: Router::new(),
        }
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, with_request_layers(router));
        self
    }

    /// Mount a single GET handler at `path`.
    pub fn service<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        let router = Router::new().route("/", get(handler));
        self.use_router(path, router)
    }

    /// Register `service` under `path` (without the leading slash) and mount
    /// REST routes for the methods it declares.
    pub fn use_service(self, path: &'static str, service: Arc<dyn ShopService<R, P>>) -> Self
    where
        R: Serialize + DeserializeOwned,
        P: FromRestParams,
    {
        self.use_service_with(path, service, Router::new())
    }

    /// Like [`use_service`](Self::use_service), with extra routes mounted under
    /// the same path (e.g. `/upload`, `/{id}/images`).
    pub fn use_service_with(
        mut self,
        path: &'static str,
        service: Arc<dyn ShopService<R, P>>,
        extra: Router<()>,
    ) -> Self
    where
        R: Serialize + DeserializeOwned,
        P: FromRestParams,
    {
        let name = path.trim_start_matches('/');
        let capabilities = service.capabilities();
        self.app.register_service(name, service);

        let router = rest::service_router(
            Arc::new(name.to_string()),
            Arc::clone(&self.app),
            &capabilities,
        )
        .merge(extra);

        tracing::debug!(service = name, "mounted REST routes");
        self.router = self.router.nest(path, with_request_layers(router));
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = ?listener.local_addr().ok(), "listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

pub fn axum<R, P>(app: ShopApp<R, P>) -> AxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    AxumApp::new(app)
}
