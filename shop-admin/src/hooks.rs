use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shop_core::errors::ShopError;
use shop_core::{AfterHook, ErrorHook, HookContext, ShopApp};

use crate::services::AdminParams;

pub struct LogAfter;

#[async_trait]
impl AfterHook<Value, AdminParams> for LogAfter {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        tracing::debug!(
            service = %ctx.service,
            method = ctx.method.as_str(),
            id = ctx.id.as_deref().unwrap_or(""),
            tenant = ctx.context.tenant(),
            provider = %ctx.params.provider,
            "service call"
        );
        Ok(())
    }
}

pub struct LogError;

#[async_trait]
impl ErrorHook<Value, AdminParams> for LogError {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(err) = ctx.error.as_ref() else {
            return Ok(());
        };
        let code = ShopError::from_anyhow(err).map(|e| e.code()).unwrap_or(500);

        if code >= 500 {
            tracing::error!(service = %ctx.service, method = ctx.method.as_str(), code, error = %err, "service call failed");
        } else {
            tracing::info!(service = %ctx.service, method = ctx.method.as_str(), code, error = %err, "service call rejected");
        }
        Ok(())
    }
}

pub fn global_hooks(app: &ShopApp<Value, AdminParams>) {
    app.hooks(|h| {
        h.after_all(Arc::new(LogAfter));
        h.error_all(Arc::new(LogError));
    });
}
