use anyhow::{Context, Result};
use tracing::info;
use translation_graph::config::Config;
use translation_graph::retry::{with_retry, RetryConfig};
use translation_graph::server::{router, AppState};
use translation_graph::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_graph=info".parse()?),
        )
        .init();

    info!("Starting translation graph service");

    let config = Config::from_env()?;
    info!(
        "Locales: {} (default: {}), delete cascade: {}",
        config
            .locales
            .iter()
            .map(|l| l.language_code())
            .collect::<Vec<_>>()
            .join(", "),
        config.default_locale,
        config.delete_cascade
    );

    let store = with_retry(&RetryConfig::db_connect(), "Database connect", || {
        PgStore::new(&config.database_url)
    })
    .await?;
    store
        .sync_locales(&config.locales, &config.default_locale)
        .await?;

    let addr = format!("0.0.0.0:{}", config.port);
    let app = router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
