use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::Value;
use shop_axum::MultipartConfig;
use shop_blob::ImageConfig;
use shop_core::{ShopApp, ShopConfigSnapshot};

use crate::services::orders::orders_shared::DEFAULT_PER_PAGE;
use crate::services::users::users_password::DEFAULT_COST;
use crate::services::AdminParams;
use crate::uploads::FILE_FIELD;

/// `SHOP__ORDERS__PERPAGE=10` overrides `orders.perPage`.
pub const ENV_PREFIX: &str = "SHOP__";

const MAX_FILES_PER_BATCH: u64 = 10;

/// Defaults, then environment overrides.
pub fn config(app: &ShopApp<Value, AdminParams>) -> Result<()> {
    configure_defaults(app);
    let applied = app.configure(|c| c.load_env(ENV_PREFIX));
    tracing::debug!(applied, "configuration loaded");
    check(&app.config_snapshot())
}

fn configure_defaults(app: &ShopApp<Value, AdminParams>) {
    let images = ImageConfig::default();

    app.set("http.host", "127.0.0.1");
    app.set("http.port", "3030");

    app.set("images.host", "memory");
    app.set("images.publicBase", "http://127.0.0.1:3030/media");
    app.set("images.maxBytes", images.max_image_bytes.to_string());
    app.set("images.remoteTimeoutSecs", images.remote_timeout.as_secs().to_string());
    app.set("images.stagingTtlSecs", images.staging_ttl.as_secs().to_string());

    app.set("orders.perPage", DEFAULT_PER_PAGE.to_string());
    app.set("users.bcryptCost", DEFAULT_COST.to_string());
}

fn check(snapshot: &ShopConfigSnapshot) -> Result<()> {
    match snapshot.get_usize("orders.perPage") {
        Some(n) if n > 0 => {}
        _ => return Err(anyhow!("orders.perPage must be a positive integer")),
    }
    match snapshot.get("images.host") {
        Some("memory") | Some("s3") => {}
        other => return Err(anyhow!("images.host must be 'memory' or 's3', got {other:?}")),
    }
    Ok(())
}

pub fn image_config(snapshot: &ShopConfigSnapshot) -> ImageConfig {
    let defaults = ImageConfig::default();
    ImageConfig::new()
        .with_max_image_bytes(
            snapshot
                .get_usize("images.maxBytes")
                .unwrap_or(defaults.max_image_bytes),
        )
        .with_remote_timeout(
            snapshot
                .get_u64("images.remoteTimeoutSecs")
                .map(Duration::from_secs)
                .unwrap_or(defaults.remote_timeout),
        )
        .with_staging_ttl(
            snapshot
                .get_u64("images.stagingTtlSecs")
                .map(Duration::from_secs)
                .unwrap_or(defaults.staging_ttl),
        )
}

/// Per-file limit follows `images.maxBytes`; the whole body allows a full batch.
pub fn multipart_config(images: &ImageConfig) -> MultipartConfig {
    let per_file = images.max_image_bytes as u64;
    MultipartConfig::new()
        .max_file_size(per_file)
        .max_total_size(per_file * MAX_FILES_PER_BATCH)
        .file_field(FILE_FIELD)
}

/// Request body cap for the whole router.
pub fn body_limit(images: &ImageConfig) -> usize {
    images.max_image_bytes * MAX_FILES_PER_BATCH as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_defaults() {
        let app: ShopApp<Value, AdminParams> = ShopApp::new();
        configure_defaults(&app);
        app.configure(|c| {
            c.load_vars(
                ENV_PREFIX,
                vec![("SHOP__ORDERS__PERPAGE".to_string(), "10".to_string())],
            )
        });

        let snapshot = app.config_snapshot();
        assert_eq!(snapshot.get_usize("orders.perPage"), Some(10));
        assert_eq!(snapshot.get_usize("orders.perpage"), Some(10));
        assert!(check(&snapshot).is_ok());
    }

    #[test]
    fn dotenv_entries_override_defaults() {
        let file = "# local overrides\nSHOP__HTTP__PORT=8080\nSHOP__IMAGES__HOST=\"s3\"\nRUST_LOG=debug\n";
        let vars = dotenvy::from_read_iter(file.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let app: ShopApp<Value, AdminParams> = ShopApp::new();
        configure_defaults(&app);
        let applied = app.configure(|c| c.load_vars(ENV_PREFIX, vars));

        assert_eq!(applied, 2);
        let snapshot = app.config_snapshot();
        assert_eq!(snapshot.get("http.port"), Some("8080"));
        assert_eq!(snapshot.get("images.host"), Some("s3"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let app: ShopApp<Value, AdminParams> = ShopApp::new();
        configure_defaults(&app);
        app.set("orders.perPage", "0");
        assert!(check(&app.config_snapshot()).is_err());
    }

    #[test]
    fn image_settings_flow_into_the_adapter_config() {
        let app: ShopApp<Value, AdminParams> = ShopApp::new();
        configure_defaults(&app);
        app.set("images.remoteTimeoutSecs", "5");
        app.set("images.maxBytes", "1024");

        let images = image_config(&app.config_snapshot());
        assert_eq!(images.remote_timeout, Duration::from_secs(5));
        assert_eq!(images.max_image_bytes, 1024);
        assert_eq!(multipart_config(&images).max_file_size, Some(1024));
    }
}
