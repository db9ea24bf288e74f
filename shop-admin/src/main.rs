use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // `SHOP__*` overrides may live in .env
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ax = shop_admin::build().await?;

    let host = ax
        .app
        .get("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());

    let port = ax
        .app
        .get("http.port")
        .unwrap_or_else(|| "3030".to_string());

    let addr = format!("{host}:{port}");

    tracing::info!(%addr, "shop admin listening");

    ax.listen(addr).await?;

    Ok(())
}
