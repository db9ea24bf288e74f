pub mod orders_hooks;
pub mod orders_service;
pub mod orders_shared;
pub mod orders_summary;

pub use orders_service::OrdersService;
