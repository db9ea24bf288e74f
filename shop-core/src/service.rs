use anyhow::Result;
use async_trait::async_trait;

use crate::context::ShopContext;
use crate::errors::ShopError;

/// Standard service methods, Feathers-style, plus `count`.
///
/// Custom methods are declared via `Custom("methodName")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Update,
    Patch,
    Remove,
    Count,
    Custom(&'static str),
}

impl ServiceMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMethodKind::Find => "find",
            ServiceMethodKind::Get => "get",
            ServiceMethodKind::Create => "create",
            ServiceMethodKind::Update => "update",
            ServiceMethodKind::Patch => "patch",
            ServiceMethodKind::Remove => "remove",
            ServiceMethodKind::Count => "count",
            ServiceMethodKind::Custom(name) => name,
        }
    }
}

/// Which methods a service exposes to the outside world.
///
/// The HTTP layer mounts only the routes listed here.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    /// find, get, create, update, patch, remove
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Create, Update, Patch, Remove],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    pub fn allows(&self, method: &ServiceMethodKind) -> bool {
        self.allowed_methods.contains(method)
    }
}

fn not_implemented(method: &str) -> anyhow::Error {
    ShopError::not_implemented(format!("Method not implemented: {method}")).into_anyhow()
}

/// Core service trait.
///
/// - `find`   → list/query many
/// - `get`    → fetch one by id
/// - `create` → create one
/// - `update` → full replace
/// - `patch`  → partial update
/// - `remove` → delete one, returning the removed record
/// - `count`  → number of records matching params
///
/// Every method defaults to `NotImplemented`, so a service overrides only
/// what it supports.
#[async_trait]
pub trait ShopService<R, P = ()>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _ctx: &ShopContext, _params: P) -> Result<Vec<R>> {
        Err(not_implemented("find"))
    }

    async fn get(&self, _ctx: &ShopContext, _id: &str, _params: P) -> Result<R> {
        Err(not_implemented("get"))
    }

    async fn create(&self, _ctx: &ShopContext, _data: R, _params: P) -> Result<R> {
        Err(not_implemented("create"))
    }

    async fn update(&self, _ctx: &ShopContext, _id: &str, _data: R, _params: P) -> Result<R> {
        Err(not_implemented("update"))
    }

    async fn patch(&self, _ctx: &ShopContext, _id: &str, _data: R, _params: P) -> Result<R> {
        Err(not_implemented("patch"))
    }

    async fn remove(&self, _ctx: &ShopContext, _id: &str, _params: P) -> Result<R> {
        Err(not_implemented("remove"))
    }

    async fn count(&self, _ctx: &ShopContext, _params: P) -> Result<u64> {
        Err(not_implemented("count"))
    }
}
