use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;

use crate::hooks::collect_method_hooks;
use crate::{
    AfterHook, BeforeHook, ErrorHook, HookContext, HookResult, ServiceHooks, ServiceMethodKind,
    ServiceRegistry, ShopConfig, ShopConfigSnapshot, ShopContext, ShopError, ShopService,
};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct ShopAppInner<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    registry: RwLock<ServiceRegistry<R, P>>,
    global_hooks: RwLock<ServiceHooks<R, P>>,
    service_hooks: RwLock<HashMap<String, ServiceHooks<R, P>>>,
    config: RwLock<ShopConfig>,
}

/// Central application container.
///
/// Framework-agnostic. Holds:
/// - service registry
/// - app hooks
/// - per-service hooks
/// - config
pub struct ShopApp<R, P = ()>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    inner: Arc<ShopAppInner<R, P>>,
}

type HooksForMethod<R, P> = (
    Vec<Arc<dyn BeforeHook<R, P>>>,
    Vec<Arc<dyn AfterHook<R, P>>>,
    Vec<Arc<dyn ErrorHook<R, P>>>,
);

impl<R, P> Default for ShopApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> Clone for ShopApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, P> ShopApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShopAppInner {
                registry: RwLock::new(ServiceRegistry::new()),
                global_hooks: RwLock::new(ServiceHooks::new()),
                service_hooks: RwLock::new(HashMap::new()),
                config: RwLock::new(ShopConfig::new()),
            }),
        }
    }

    pub fn register_service<S>(&self, name: S, service: Arc<dyn ShopService<R, P>>)
    where
        S: Into<String>,
    {
        let name = name.into();
        tracing::debug!(service = %name, "registering service");
        write(&self.inner.registry).register(name, service);
    }

    /// Feathers: `app.hooks({ ... })`
    pub fn hooks<F>(&self, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut g = write(&self.inner.global_hooks);
        f(&mut g);
    }

    pub(crate) fn configure_service_hooks<F>(&self, service_name: &str, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut map = write(&self.inner.service_hooks);
        let hooks = map.entry(service_name.to_string()).or_default();
        f(hooks);
    }

    /// Feathers: `app.service("name")`
    pub fn service(&self, name: &str) -> Result<ServiceHandle<R, P>> {
        let svc = read(&self.inner.registry)
            .get(name)
            .cloned()
            .ok_or_else(|| {
                ShopError::not_found(format!("Service not found: {name}")).into_anyhow()
            })?;

        Ok(ServiceHandle {
            app: self.clone(),
            name: name.to_string(),
            service: svc,
        })
    }

    /// Feathers: `app.set(key, value)`
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        write(&self.inner.config).set(key, value);
    }

    /// Feathers: `app.get(key)`
    pub fn get(&self, key: &str) -> Option<String> {
        read(&self.inner.config).get(key).map(|v| v.to_string())
    }

    /// Mutate the config in place, e.g. to apply environment overrides.
    pub fn configure<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut ShopConfig) -> T,
    {
        let mut cfg = write(&self.inner.config);
        f(&mut cfg)
    }

    pub fn config_snapshot(&self) -> ShopConfigSnapshot {
        read(&self.inner.config).snapshot()
    }
}

/// A named service bound to its app, so calls run through the hook pipeline.
pub struct ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    app: ShopApp<R, P>,
    name: String,
    service: Arc<dyn ShopService<R, P>>,
}

impl<R, P> Clone for ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            name: self.name.clone(),
            service: Arc::clone(&self.service),
        }
    }
}

impl<R, P> ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn hooks<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        self.app.configure_service_hooks(&self.name, f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &Arc<dyn ShopService<R, P>> {
        &self.service
    }

    /// Global hooks first, then service hooks.
    fn collect_hooks_for_method(&self, method: &ServiceMethodKind) -> HooksForMethod<R, P> {
        let g = read(&self.app.inner.global_hooks);
        let map = read(&self.app.inner.service_hooks);

        let mut before = collect_method_hooks(&g.before_all, &g.before_by_method, method);
        let mut after = collect_method_hooks(&g.after_all, &g.after_by_method, method);
        let mut error = collect_method_hooks(&g.error_all, &g.error_by_method, method);

        if let Some(h) = map.get(&self.name) {
            before.extend(collect_method_hooks(&h.before_all, &h.before_by_method, method));
            after.extend(collect_method_hooks(&h.after_all, &h.after_by_method, method));
            error.extend(collect_method_hooks(&h.error_all, &h.error_by_method, method));
        }

        (before, after, error)
    }

    fn new_context(&self, context: ShopContext, method: ServiceMethodKind, params: P) -> HookContext<R, P> {
        HookContext::new(
            context,
            self.name.clone(),
            method,
            params,
            ServiceCaller::new(self.app.clone()),
            self.app.config_snapshot(),
        )
    }

    /// before → service call → after, then error hooks on failure.
    async fn run_pipeline(&self, mut ctx: HookContext<R, P>) -> Result<HookContext<R, P>> {
        let (before, after, error) = self.collect_hooks_for_method(&ctx.method);

        tracing::debug!(
            service = %self.name,
            method = ctx.method.as_str(),
            tenant = ctx.context.tenant(),
            "service call"
        );

        let res = self.run_inner(&before, &after, &mut ctx).await;

        if let Err(e) = res {
            ctx.error = Some(e);

            for h in &error {
                if let Err(hook_err) = h.run(&mut ctx).await {
                    tracing::warn!(
                        service = %self.name,
                        method = ctx.method.as_str(),
                        error = %hook_err,
                        "error hook failed"
                    );
                }
            }

            if let Some(err) = ctx.error.take() {
                return Err(err);
            }
        }

        Ok(ctx)
    }

    async fn run_inner(
        &self,
        before: &[Arc<dyn BeforeHook<R, P>>],
        after: &[Arc<dyn AfterHook<R, P>>],
        ctx: &mut HookContext<R, P>,
    ) -> Result<()> {
        for h in before {
            h.run(ctx).await?;
        }

        if ctx.result.is_none() {
            dispatch(&self.service, ctx).await?;
        }

        for h in after {
            h.run(ctx).await?;
        }

        Ok(())
    }

    pub async fn find(&self, context: ShopContext, params: P) -> Result<Vec<R>> {
        let ctx = self.new_context(context, ServiceMethodKind::Find, params);
        let ctx = self.run_pipeline(ctx).await?;

        match ctx.result {
            Some(HookResult::Many(v)) => Ok(v),
            Some(HookResult::One(v)) => Ok(vec![v]),
            Some(HookResult::Count(_)) => Err(unexpected("find", "a count")),
            None => Ok(vec![]),
        }
    }

    pub async fn get(&self, context: ShopContext, id: &str, params: P) -> Result<R> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Get, params);
        ctx.id = Some(id.to_string());
        let ctx = self.run_pipeline(ctx).await?;
        into_one(ctx.result, "get")
    }

    pub async fn create(&self, context: ShopContext, data: R, params: P) -> Result<R> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Create, params);
        ctx.data = Some(data);
        let ctx = self.run_pipeline(ctx).await?;
        into_one(ctx.result, "create")
    }

    pub async fn update(&self, context: ShopContext, id: &str, data: R, params: P) -> Result<R> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Update, params);
        ctx.id = Some(id.to_string());
        ctx.data = Some(data);
        let ctx = self.run_pipeline(ctx).await?;
        into_one(ctx.result, "update")
    }

    pub async fn patch(&self, context: ShopContext, id: &str, data: R, params: P) -> Result<R> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Patch, params);
        ctx.id = Some(id.to_string());
        ctx.data = Some(data);
        let ctx = self.run_pipeline(ctx).await?;
        into_one(ctx.result, "patch")
    }

    pub async fn remove(&self, context: ShopContext, id: &str, params: P) -> Result<R> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Remove, params);
        ctx.id = Some(id.to_string());
        let ctx = self.run_pipeline(ctx).await?;
        into_one(ctx.result, "remove")
    }

    pub async fn count(&self, context: ShopContext, params: P) -> Result<u64> {
        let ctx = self.new_context(context, ServiceMethodKind::Count, params);
        let ctx = self.run_pipeline(ctx).await?;

        match ctx.result {
            Some(HookResult::Count(n)) => Ok(n),
            Some(HookResult::Many(v)) => Ok(v.len() as u64),
            Some(HookResult::One(_)) => Err(unexpected("count", "a single record")),
            None => Ok(0),
        }
    }
}

async fn dispatch<R, P>(service: &Arc<dyn ShopService<R, P>>, ctx: &mut HookContext<R, P>) -> Result<()>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    let params = ctx.params.clone();

    let result = match ctx.method.clone() {
        ServiceMethodKind::Find => HookResult::Many(service.find(&ctx.context, params).await?),
        ServiceMethodKind::Get => {
            let id = require_id(ctx)?;
            HookResult::One(service.get(&ctx.context, &id, params).await?)
        }
        ServiceMethodKind::Create => {
            let data = take_data(ctx)?;
            HookResult::One(service.create(&ctx.context, data, params).await?)
        }
        ServiceMethodKind::Update => {
            let id = require_id(ctx)?;
            let data = take_data(ctx)?;
            HookResult::One(service.update(&ctx.context, &id, data, params).await?)
        }
        ServiceMethodKind::Patch => {
            let id = require_id(ctx)?;
            let data = take_data(ctx)?;
            HookResult::One(service.patch(&ctx.context, &id, data, params).await?)
        }
        ServiceMethodKind::Remove => {
            let id = require_id(ctx)?;
            HookResult::One(service.remove(&ctx.context, &id, params).await?)
        }
        ServiceMethodKind::Count => HookResult::Count(service.count(&ctx.context, params).await?),
        ServiceMethodKind::Custom(name) => {
            return Err(ShopError::method_not_allowed(format!(
                "Custom method '{name}' cannot be dispatched"
            ))
            .into_anyhow())
        }
    };

    ctx.result = Some(result);
    Ok(())
}

fn require_id<R, P>(ctx: &HookContext<R, P>) -> Result<String>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    ctx.id.clone().ok_or_else(|| {
        ShopError::bad_request(format!("{}() requires an id", ctx.method.as_str())).into_anyhow()
    })
}

fn take_data<R, P>(ctx: &mut HookContext<R, P>) -> Result<R>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    let method = ctx.method.as_str();
    ctx.data.take().ok_or_else(|| {
        ShopError::bad_request(format!("{method}() requires data")).into_anyhow()
    })
}

fn unexpected(method: &str, what: &str) -> anyhow::Error {
    ShopError::general_error(format!("{method}() produced {what} unexpectedly")).into_anyhow()
}

fn into_one<R>(result: Option<HookResult<R>>, method: &str) -> Result<R> {
    match result {
        Some(HookResult::One(v)) => Ok(v),
        Some(HookResult::Many(_)) => Err(unexpected(method, "many records")),
        Some(HookResult::Count(_)) => Err(unexpected(method, "a count")),
        None => Err(unexpected(method, "no result")),
    }
}

/// Lets hooks call sibling services through the same pipeline.
pub struct ServiceCaller<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    app: ShopApp<R, P>,
}

impl<R, P> Clone for ServiceCaller<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
        }
    }
}

impl<R, P> ServiceCaller<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new(app: ShopApp<R, P>) -> Self {
        Self { app }
    }

    pub fn service(&self, name: &str) -> Result<ServiceHandle<R, P>> {
        self.app.service(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Notes {
        items: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl ShopService<Value, ()> for Notes {
        async fn find(&self, _ctx: &ShopContext, _params: ()) -> Result<Vec<Value>> {
            Ok(self.items.lock().unwrap().clone())
        }

        async fn create(&self, _ctx: &ShopContext, data: Value, _params: ()) -> Result<Value> {
            if data.get("fail").is_some() {
                return Err(ShopError::unprocessable("rejected").into_anyhow());
            }
            self.items.lock().unwrap().push(data.clone());
            Ok(data)
        }

        async fn count(&self, _ctx: &ShopContext, _params: ()) -> Result<u64> {
            Ok(self.items.lock().unwrap().len() as u64)
        }
    }

    struct Stamp(&'static str);

    #[async_trait]
    impl BeforeHook<Value, ()> for Stamp {
        async fn run(&self, ctx: &mut HookContext<Value, ()>) -> Result<()> {
            if let Some(Value::Object(map)) = ctx.data.as_mut() {
                let trail = map
                    .get("trail")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                map.insert("trail".into(), json!(format!("{trail}{}", self.0)));
            }
            Ok(())
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl BeforeHook<Value, ()> for ShortCircuit {
        async fn run(&self, ctx: &mut HookContext<Value, ()>) -> Result<()> {
            ctx.result = Some(HookResult::Many(vec![json!({"cached": true})]));
            Ok(())
        }
    }

    struct Recover;

    #[async_trait]
    impl ErrorHook<Value, ()> for Recover {
        async fn run(&self, ctx: &mut HookContext<Value, ()>) -> Result<()> {
            ctx.error = None;
            ctx.result = Some(HookResult::One(json!({"recovered": true})));
            Ok(())
        }
    }

    fn app() -> ShopApp<Value, ()> {
        let app = ShopApp::new();
        app.register_service("notes", Arc::new(Notes::default()));
        app
    }

    #[tokio::test]
    async fn global_hooks_run_before_service_hooks() {
        let app = app();
        app.hooks(|h| {
            h.before_all(Arc::new(Stamp("g")));
        });
        let notes = app.service("notes").unwrap().hooks(|h| {
            h.before_create(Arc::new(Stamp("s")));
        });

        let created = notes
            .create(ShopContext::new("t"), json!({"title": "a"}), ())
            .await
            .unwrap();
        assert_eq!(created["trail"], "gs");
        assert_eq!(notes.count(ShopContext::new("t"), ()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn before_hook_result_skips_the_service() {
        let app = app();
        let notes = app.service("notes").unwrap().hooks(|h| {
            h.before(ServiceMethodKind::Find, Arc::new(ShortCircuit));
        });

        let found = notes.find(ShopContext::new("t"), ()).await.unwrap();
        assert_eq!(found, vec![json!({"cached": true})]);
    }

    #[tokio::test]
    async fn error_hooks_can_recover() {
        let app = app();
        let notes = app.service("notes").unwrap();

        let err = notes
            .create(ShopContext::new("t"), json!({"fail": 1}), ())
            .await
            .unwrap_err();
        assert_eq!(
            ShopError::from_anyhow(&err).map(|e| e.kind),
            Some(ErrorKind::Unprocessable)
        );

        let notes = notes.hooks(|h| {
            h.error_create(Arc::new(Recover));
        });
        let out = notes
            .create(ShopContext::new("t"), json!({"fail": 1}), ())
            .await
            .unwrap();
        assert_eq!(out["recovered"], true);
    }

    #[tokio::test]
    async fn unimplemented_methods_report_not_implemented() {
        let app = app();
        let err = app
            .service("notes")
            .unwrap()
            .get(ShopContext::new("t"), "x", ())
            .await
            .unwrap_err();
        assert_eq!(ShopError::from_anyhow(&err).map(|e| e.code()), Some(501));

        assert!(app.service("missing").is_err());
    }
}
