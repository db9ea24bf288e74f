mod app;
mod config;
mod hooks;
mod routes;
mod services;
mod uploads;
mod validation;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use serde_json::Value;
use shop_axum::AxumApp;
use shop_blob::{ImageAdapter, ImageHost, MemoryImageHost, S3ImageHost};

use crate::routes::{AdminApp, CountRoute, CreateAlias, FixedList, PagedList};
use crate::services::adapters::DocumentStore;
use crate::services::images::ImageResource;
use crate::uploads::ImageRoutes;

pub use services::AdminParams;

/// Build the admin API with the image host named by `images.host`.
pub async fn build() -> Result<AxumApp<Value, AdminParams>> {
    let ax = app::admin_app()?;
    let snapshot = ax.app.config_snapshot();

    let host: Arc<dyn ImageHost> = match snapshot.get("images.host") {
        Some("s3") => Arc::new(S3ImageHost::from_env().await?),
        _ => Arc::new(MemoryImageHost::new(
            snapshot
                .get_string("images.publicBase")
                .unwrap_or_default(),
        )),
    };
    tracing::info!(host = host.name(), "image host ready");

    mount(ax, host)
}

/// Build the admin API on a given image host.
pub fn build_with(host: Arc<dyn ImageHost>) -> Result<AxumApp<Value, AdminParams>> {
    mount(app::admin_app()?, host)
}

fn mount(ax: AxumApp<Value, AdminParams>, host: Arc<dyn ImageHost>) -> Result<AxumApp<Value, AdminParams>> {
    let image_config = config::image_config(&ax.app.config_snapshot());
    let multipart = config::multipart_config(&image_config);
    let body_limit = config::body_limit(&image_config);

    let store = Arc::new(DocumentStore::new());
    let images = Arc::new(ImageAdapter::new(host, image_config).with_batch_log(store.clone()));
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            images.spawn_staging_purge(&handle);
        }
        Err(_) => tracing::warn!("no tokio runtime, expired staging slots are only dropped on access"),
    }
    let state = Arc::new(services::AdminState::new(store, Arc::clone(&images)));

    let svcs = services::configure(ax.app.as_ref(), Arc::clone(&state))?;
    let app: AdminApp = Arc::clone(&ax.app);

    let image_routes = |resource: ImageResource| -> Router<()> {
        ImageRoutes {
            app: Arc::clone(&app),
            images: Arc::clone(&images),
            resource,
            multipart: multipart.clone(),
        }
        .router()
    };
    let create_alias = |service: &'static str| CreateAlias {
        app: Arc::clone(&app),
        service,
    };
    let count = |service: &'static str, key: &'static str, query: &'static [(&'static str, &'static str)]| {
        CountRoute {
            app: Arc::clone(&app),
            service,
            key,
            query,
        }
    };

    let categories = image_routes(ImageResource::categories())
        .merge(
            FixedList {
                app: Arc::clone(&app),
                service: "categories",
                query: &[],
                envelope: Some("categoryList"),
            }
            .router("/"),
        )
        .merge(create_alias("categories").router())
        .merge(count("categories", "categoryCount", &[("parentId[$exists]", "false")]).router("/get/count"))
        .merge(count("categories", "categoryCount", &[("parentId[$exists]", "true")]).router("/subCat/get/count"));

    let products = image_routes(ImageResource::products())
        .merge(create_alias("products").router())
        .merge(
            PagedList {
                app: Arc::clone(&app),
                service: "products",
                key: "products",
                not_found: "Page not found",
                per_page_config: None,
            }
            .router(),
        )
        .merge(
            FixedList {
                app: Arc::clone(&app),
                service: "products",
                query: &[("isFeatured", "true")],
                envelope: None,
            }
            .router("/featured"),
        )
        .merge(count("products", "productsCount", &[]).router("/get/count"))
        .merge(count("products", "subCatCount", &[("subCatId[$exists]", "true")]).router("/subCat/get/count"));

    let orders = Router::new()
        .merge(create_alias("orders").router())
        .merge(
            PagedList {
                app: Arc::clone(&app),
                service: "orders",
                key: "ordersList",
                not_found: "No data found!",
                per_page_config: Some("orders.perPage"),
            }
            .router(),
        )
        .merge(count("orders", "ordersCount", &[]).router("/get/count"))
        .merge(services::orders::orders_summary::router(Arc::clone(&app)));

    let banners = image_routes(ImageResource::banners()).merge(create_alias("banners").router());

    let users = image_routes(ImageResource::users())
        .merge(create_alias("users").router())
        .merge(count("users", "userCount", &[]).router("/get/count"))
        .merge(services::users::users_routes::router(Arc::clone(&app)));

    let mut ax = ax
        .use_service_with("/categories", svcs.categories, categories)
        .use_service_with("/products", svcs.products, products)
        .use_service_with("/orders", svcs.orders, orders)
        .use_service_with("/banners", svcs.banners, banners)
        .use_service_with("/users", svcs.users, users)
        .service("/health", || async { "ok" });

    ax.router = ax
        .router
        .layer(axum::extract::DefaultBodyLimit::max(body_limit));

    Ok(ax)
}
