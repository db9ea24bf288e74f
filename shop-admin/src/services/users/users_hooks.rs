use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use shop_core::errors::ShopError;
use shop_core::{AfterHook, BeforeHook, HookContext, HookResult, ServiceMethodKind};
use validator::Validate;

use super::users_password::{bcrypt_cost, hash_password};
use super::users_shared::SERVICE;
use crate::services::AdminParams;
use crate::validation::validate;

const ERROR_MESSAGE: &str = "User validation failed";

#[derive(Debug, Deserialize, Validate)]
struct UserInput {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(email(message = "must be a valid email"))]
    email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    password: Option<String>,
    #[validate(length(min = 7, max = 20, message = "has invalid length"))]
    phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UserPatch {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: Option<String>,
    #[validate(email(message = "must be a valid email"))]
    email: Option<String>,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    password: Option<String>,
    #[validate(length(min = 7, max = 20, message = "has invalid length"))]
    phone: Option<String>,
}

pub struct ValidateUser;

#[async_trait]
impl BeforeHook<Value, AdminParams> for ValidateUser {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(obj) = ctx.data.as_mut().and_then(|d| d.as_object_mut()) else {
            return Ok(());
        };
        if let Some(Value::String(email)) = obj.get_mut("email") {
            *email = email.trim().to_ascii_lowercase();
        }
        if let Some(Value::String(name)) = obj.get_mut("name") {
            *name = name.trim().to_string();
        }

        let snapshot = Value::Object(obj.clone());
        match ctx.method {
            ServiceMethodKind::Create => {
                let input: UserInput = validate(&snapshot, ERROR_MESSAGE)?;
                if input.password.is_none() {
                    return Err(ShopError::unprocessable(ERROR_MESSAGE)
                        .with_errors(json!({"password": ["password is required"]}))
                        .into_anyhow());
                }
            }
            ServiceMethodKind::Patch => {
                validate::<UserPatch>(&snapshot, ERROR_MESSAGE)?;
            }
            _ => {
                validate::<UserInput>(&snapshot, ERROR_MESSAGE)?;
            }
        }
        Ok(())
    }
}

/// One account per email within a tenant.
pub struct UniqueEmail;

#[async_trait]
impl BeforeHook<Value, AdminParams> for UniqueEmail {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let Some(email) = ctx
            .data
            .as_ref()
            .and_then(|d| d.get("email"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
        else {
            return Ok(());
        };

        let users = ctx.services.service(SERVICE)?;
        let existing = users
            .find(
                ctx.context.clone(),
                AdminParams::internal().with_query("email", email.as_str()),
            )
            .await?;

        let taken = existing
            .iter()
            .any(|u| u.get("id").and_then(|v| v.as_str()) != ctx.id.as_deref());
        if taken {
            return Err(ShopError::conflict("User already exists with this email")
                .with_data(json!({ "email": email }))
                .into_anyhow());
        }
        Ok(())
    }
}

/// Replaces a plain `password` with its bcrypt hash.
pub struct HashPassword;

#[async_trait]
impl BeforeHook<Value, AdminParams> for HashPassword {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let cost = bcrypt_cost(&ctx.config);
        let Some(obj) = ctx.data.as_mut().and_then(|d| d.as_object_mut()) else {
            return Ok(());
        };
        let Some(password) = obj.get("password").and_then(|v| v.as_str()).map(|s| s.to_string()) else {
            return Ok(());
        };

        let hashed = hash_password(password, cost).await?;
        obj.insert("password".to_string(), Value::String(hashed));
        Ok(())
    }
}

fn strip_password(mut user: Value) -> Value {
    if let Some(obj) = user.as_object_mut() {
        obj.remove("password");
    }
    user
}

/// Drops `password` from everything returned to HTTP clients.
pub struct ProtectPassword;

#[async_trait]
impl AfterHook<Value, AdminParams> for ProtectPassword {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        if ctx.params.provider == "internal" {
            return Ok(());
        }

        ctx.result = match ctx.result.take() {
            Some(HookResult::One(v)) => Some(HookResult::One(strip_password(v))),
            Some(HookResult::Many(vs)) => {
                Some(HookResult::Many(vs.into_iter().map(strip_password).collect()))
            }
            other => other,
        };
        Ok(())
    }
}
