pub mod categories_hooks;
pub mod categories_service;
pub mod categories_shared;
pub mod category_tree;

pub use categories_service::CategoriesService;
