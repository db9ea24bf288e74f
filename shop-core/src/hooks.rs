//! # Hooks
//!
//! Feathers-style `before` / `after` / `error` hooks around every service
//! call. Global hooks (registered on the app) run before service hooks.
//!
//! A `before` hook may set `ctx.result`; the service call is then skipped.
//! An `error` hook may clear `ctx.error` to recover.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::app::ServiceCaller;
use crate::config::ShopConfigSnapshot;
use crate::context::ShopContext;
use crate::ServiceMethodKind;

/// Output of a service call.
#[derive(Debug, Clone)]
pub enum HookResult<R> {
    One(R),
    Many(Vec<R>),
    Count(u64),
}

/// Context passed to hooks.
///
/// R = record type
/// P = params type
pub struct HookContext<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub context: ShopContext,
    pub service: String,
    pub method: ServiceMethodKind,
    pub id: Option<String>,
    pub params: P,
    pub data: Option<R>,
    pub result: Option<HookResult<R>>,
    pub error: Option<anyhow::Error>,
    pub services: ServiceCaller<R, P>,
    pub config: ShopConfigSnapshot,
}

impl<R, P> HookContext<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new(
        context: ShopContext,
        service: impl Into<String>,
        method: ServiceMethodKind,
        params: P,
        services: ServiceCaller<R, P>,
        config: ShopConfigSnapshot,
    ) -> Self {
        Self {
            context,
            service: service.into(),
            method,
            id: None,
            params,
            data: None,
            result: None,
            error: None,
            services,
            config,
        }
    }
}

#[async_trait]
pub trait BeforeHook<R, P>: Send + Sync
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

#[async_trait]
pub trait AfterHook<R, P>: Send + Sync
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

#[async_trait]
pub trait ErrorHook<R, P>: Send + Sync
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

/// Hook registrations for one scope (the app, or a single service).
pub struct ServiceHooks<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub(crate) before_all: Vec<Arc<dyn BeforeHook<R, P>>>,
    pub(crate) before_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn BeforeHook<R, P>>>>,
    pub(crate) after_all: Vec<Arc<dyn AfterHook<R, P>>>,
    pub(crate) after_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn AfterHook<R, P>>>>,
    pub(crate) error_all: Vec<Arc<dyn ErrorHook<R, P>>>,
    pub(crate) error_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn ErrorHook<R, P>>>>,
}

impl<R, P> Default for ServiceHooks<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> ServiceHooks<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            before_all: Vec::new(),
            before_by_method: HashMap::new(),
            after_all: Vec::new(),
            after_by_method: HashMap::new(),
            error_all: Vec::new(),
            error_by_method: HashMap::new(),
        }
    }

    pub fn before_all(&mut self, hook: Arc<dyn BeforeHook<R, P>>) -> &mut Self {
        self.before_all.push(hook);
        self
    }

    pub fn before(&mut self, method: ServiceMethodKind, hook: Arc<dyn BeforeHook<R, P>>) -> &mut Self {
        self.before_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn after_all(&mut self, hook: Arc<dyn AfterHook<R, P>>) -> &mut Self {
        self.after_all.push(hook);
        self
    }

    pub fn after(&mut self, method: ServiceMethodKind, hook: Arc<dyn AfterHook<R, P>>) -> &mut Self {
        self.after_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn error_all(&mut self, hook: Arc<dyn ErrorHook<R, P>>) -> &mut Self {
        self.error_all.push(hook);
        self
    }

    pub fn error(&mut self, method: ServiceMethodKind, hook: Arc<dyn ErrorHook<R, P>>) -> &mut Self {
        self.error_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn before_create(&mut self, hook: Arc<dyn BeforeHook<R, P>>) -> &mut Self {
        self.before(ServiceMethodKind::Create, hook)
    }

    pub fn before_update(&mut self, hook: Arc<dyn BeforeHook<R, P>>) -> &mut Self {
        self.before(ServiceMethodKind::Update, hook)
    }

    pub fn before_patch(&mut self, hook: Arc<dyn BeforeHook<R, P>>) -> &mut Self {
        self.before(ServiceMethodKind::Patch, hook)
    }

    pub fn after_create(&mut self, hook: Arc<dyn AfterHook<R, P>>) -> &mut Self {
        self.after(ServiceMethodKind::Create, hook)
    }

    pub fn error_create(&mut self, hook: Arc<dyn ErrorHook<R, P>>) -> &mut Self {
        self.error(ServiceMethodKind::Create, hook)
    }
}

/// `*_all` hooks first, then the method-specific ones.
pub(crate) fn collect_method_hooks<H: ?Sized>(
    all: &[Arc<H>],
    by_method: &HashMap<ServiceMethodKind, Vec<Arc<H>>>,
    method: &ServiceMethodKind,
) -> Vec<Arc<H>> {
    let mut out: Vec<Arc<H>> = all.to_vec();
    if let Some(v) = by_method.get(method) {
        out.extend(v.iter().cloned());
    }
    out
}
