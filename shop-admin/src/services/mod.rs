use std::sync::Arc;

use serde_json::Value;
use shop_core::{ShopApp, ShopService};

pub mod types;
pub use types::{AdminParams, AdminState};

pub mod adapters;
pub mod image_hooks;
pub mod images;
pub mod query;
pub mod records;

pub mod banners;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

type AdminService = Arc<dyn ShopService<Value, AdminParams>>;

pub struct AdminServices {
    pub categories: AdminService,
    pub products: AdminService,
    pub orders: AdminService,
    pub banners: AdminService,
    pub users: AdminService,
}

pub fn configure(app: &ShopApp<Value, AdminParams>, state: Arc<AdminState>) -> anyhow::Result<AdminServices> {
    let categories: AdminService = Arc::new(categories::CategoriesService::new(&state));
    let products: AdminService = Arc::new(products::ProductsService::new(&state));
    let orders: AdminService = Arc::new(orders::OrdersService::new(&state));
    let banners: AdminService = Arc::new(banners::BannersService::new(&state));
    let users: AdminService = Arc::new(users::UsersService::new(&state));

    app.register_service(categories::categories_shared::SERVICE, Arc::clone(&categories));
    app.register_service(products::products_shared::SERVICE, Arc::clone(&products));
    app.register_service(orders::orders_shared::SERVICE, Arc::clone(&orders));
    app.register_service(banners::banners_shared::SERVICE, Arc::clone(&banners));
    app.register_service(users::users_shared::SERVICE, Arc::clone(&users));

    categories::categories_shared::register_hooks(app, Arc::clone(&state.images))?;
    products::products_shared::register_hooks(app, Arc::clone(&state.images))?;
    orders::orders_shared::register_hooks(app)?;
    banners::banners_shared::register_hooks(app, Arc::clone(&state.images))?;
    users::users_shared::register_hooks(app, Arc::clone(&state.images))?;

    Ok(AdminServices {
        categories,
        products,
        orders,
        banners,
        users,
    })
}
