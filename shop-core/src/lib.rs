//! shop-core: framework-agnostic core for the shop admin API.
//!
//! Services expose Feathers-style methods (`find`, `get`, `create`,
//! `update`, `patch`, `remove`, plus `count`), run through a hook
//! pipeline, and report failures as structured [`ShopError`]s carried
//! inside `anyhow::Error`.

pub mod app;
pub mod config;
pub mod context;
pub mod errors;
pub mod hooks;
pub mod registry;
pub mod service;

pub use app::{ServiceCaller, ServiceHandle, ShopApp};
pub use config::{ShopConfig, ShopConfigSnapshot};
pub use context::{ShopContext, TenantId};
pub use errors::{ErrorKind, ShopError};
pub use hooks::{AfterHook, BeforeHook, ErrorHook, HookContext, HookResult, ServiceHooks};
pub use registry::ServiceRegistry;
pub use service::{ServiceCapabilities, ServiceMethodKind, ShopService};
