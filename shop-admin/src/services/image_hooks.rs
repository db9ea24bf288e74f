use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use shop_blob::ImageAdapter;
use shop_core::errors::ShopError;
use shop_core::{AfterHook, BeforeHook, ErrorHook, HookContext, ServiceMethodKind, ShopApp};

use super::images::staging_key;
use super::AdminParams;

/// Fills `images` on create: a non-empty `images` array in the payload
/// wins, otherwise the session's staged batch is used (possibly empty).
pub struct AttachStagedImages {
    images: Arc<ImageAdapter>,
}

impl AttachStagedImages {
    pub fn new(images: Arc<ImageAdapter>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl BeforeHook<Value, AdminParams> for AttachStagedImages {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        let key = staging_key(&ctx.context);
        let Some(obj) = ctx.data.as_mut().and_then(|d| d.as_object_mut()) else {
            return Ok(());
        };

        let explicit = match obj.get("images") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(Value::Array(items)) => {
                if !items.iter().all(|v| v.is_string()) {
                    return Err(ShopError::unprocessable("Invalid images")
                        .with_errors(json!({"images": ["must be a list of URLs"]}))
                        .into_anyhow());
                }
                Some(items.len())
            }
            Some(_) => {
                return Err(ShopError::unprocessable("Invalid images")
                    .with_errors(json!({"images": ["must be a list of URLs"]}))
                    .into_anyhow())
            }
        };

        match explicit {
            Some(n) => {
                tracing::debug!(slot = %key.slot(), images = n, "using images from payload");
            }
            None => {
                let staged = self.images.consume_staged_images(&key);
                tracing::debug!(slot = %key.slot(), images = staged.len(), "attaching staged images");
                obj.insert("images".to_string(), json!(staged));
            }
        }

        Ok(())
    }
}

/// Empties the session's staging slot once a create (successful or not),
/// update or patch has run. Calls made internally leave the slot alone.
pub struct ClearStagedImages {
    images: Arc<ImageAdapter>,
}

impl ClearStagedImages {
    pub fn new(images: Arc<ImageAdapter>) -> Self {
        Self { images }
    }

    fn clear(&self, ctx: &HookContext<Value, AdminParams>) {
        if ctx.params.provider == "internal" {
            return;
        }
        let key = staging_key(&ctx.context);
        self.images.clear_staged(&key);
        tracing::debug!(
            slot = %key.slot(),
            method = ctx.method.as_str(),
            failed = ctx.error.is_some(),
            "cleared staged images"
        );
    }
}

#[async_trait]
impl AfterHook<Value, AdminParams> for ClearStagedImages {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        self.clear(ctx);
        Ok(())
    }
}

#[async_trait]
impl ErrorHook<Value, AdminParams> for ClearStagedImages {
    async fn run(&self, ctx: &mut HookContext<Value, AdminParams>) -> Result<()> {
        self.clear(ctx);
        Ok(())
    }
}

/// Staged-image hooks for one image-bearing service.
pub fn register_image_hooks(
    app: &ShopApp<Value, AdminParams>,
    service: &str,
    images: Arc<ImageAdapter>,
) -> Result<()> {
    let clear = Arc::new(ClearStagedImages::new(Arc::clone(&images)));

    app.service(service)?.hooks(|h| {
        h.before_create(Arc::new(AttachStagedImages::new(images)));
        h.after_create(clear.clone());
        h.error_create(clear.clone());
        h.after(ServiceMethodKind::Update, clear.clone());
        h.after(ServiceMethodKind::Patch, clear);
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_blob::{FlatKeyStrategy, ImageConfig, ImageFile, MemoryImageHost, UploadTarget};
    use shop_core::{ServiceCapabilities, ShopContext, ShopService};

    struct Echo;

    #[async_trait]
    impl ShopService<Value, AdminParams> for Echo {
        fn capabilities(&self) -> ServiceCapabilities {
            ServiceCapabilities::standard_crud()
        }

        async fn create(&self, _ctx: &ShopContext, data: Value, _params: AdminParams) -> Result<Value> {
            if data["name"] == "fail" {
                anyhow::bail!("store unavailable");
            }
            Ok(data)
        }
    }

    async fn setup() -> (ShopApp<Value, AdminParams>, Arc<ImageAdapter>, ShopContext) {
        let host = Arc::new(MemoryImageHost::new("https://cdn.test"));
        let images = Arc::new(ImageAdapter::new(host, ImageConfig::default()));
        let app: ShopApp<Value, AdminParams> = ShopApp::new();
        app.register_service("things", Arc::new(Echo));
        register_image_hooks(&app, "things", Arc::clone(&images)).unwrap();

        let ctx = ShopContext::new("acme").with_session("s1");
        let target = UploadTarget::new("things", Arc::new(FlatKeyStrategy));
        let file = ImageFile::new(vec![1u8, 2]).with_content_type("image/png");
        images
            .stage_upload_batch(&staging_key(&ctx), &target, vec![file])
            .await
            .unwrap();

        (app, images, ctx)
    }

    #[tokio::test]
    async fn create_consumes_then_clears_the_slot() {
        let (app, images, ctx) = setup().await;
        let staged = images.consume_staged_images(&staging_key(&ctx));

        let created = app
            .service("things")
            .unwrap()
            .create(ctx.clone(), json!({"name": "a"}), AdminParams::default())
            .await
            .unwrap();

        assert_eq!(created["images"], json!(staged));
        assert!(images.consume_staged_images(&staging_key(&ctx)).is_empty());
    }

    #[tokio::test]
    async fn explicit_images_win_over_the_slot() {
        let (app, images, ctx) = setup().await;

        let created = app
            .service("things")
            .unwrap()
            .create(
                ctx.clone(),
                json!({"name": "a", "images": ["https://cdn.test/upload/x.png"]}),
                AdminParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(created["images"], json!(["https://cdn.test/upload/x.png"]));
        assert!(images.consume_staged_images(&staging_key(&ctx)).is_empty());
    }

    #[tokio::test]
    async fn failed_create_still_clears_the_slot() {
        let (app, images, ctx) = setup().await;

        let res = app
            .service("things")
            .unwrap()
            .create(ctx.clone(), json!({"name": "fail"}), AdminParams::default())
            .await;

        assert!(res.is_err());
        assert!(images.consume_staged_images(&staging_key(&ctx)).is_empty());
    }

    #[tokio::test]
    async fn other_sessions_keep_their_slot() {
        let (app, images, ctx) = setup().await;
        let other = ShopContext::new("acme").with_session("s2");

        let created = app
            .service("things")
            .unwrap()
            .create(other, json!({"name": "b"}), AdminParams::default())
            .await
            .unwrap();

        assert_eq!(created["images"], json!([]));
        assert_eq!(images.consume_staged_images(&staging_key(&ctx)).len(), 1);
    }
}
