pub mod banners_hooks;
pub mod banners_service;
pub mod banners_shared;

pub use banners_service::BannersService;
