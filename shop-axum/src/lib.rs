//! shop-axum: Axum adapter for the shop admin API.
//!
//! Builds REST routers from `shop-core` services, renders errors as
//! Feathers-style JSON and reads multipart image uploads.

pub mod app;
pub mod middlewares;
pub mod params;
pub mod rest;
mod error;
pub use error::ShopAxumError;

pub use app::{axum, AxumApp};
pub use middlewares::multipart::{read_multipart, MultipartConfig, MultipartFile, MultipartForm};
pub use params::{FromRestParams, RestParams};
pub use rest::context_from_headers;
