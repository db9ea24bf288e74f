pub mod users_hooks;
pub mod users_password;
pub mod users_routes;
pub mod users_service;
pub mod users_shared;

pub use users_service::UsersService;
