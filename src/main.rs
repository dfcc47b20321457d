use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blog_recommender::{
    api::{create_router, AppState},
    config::Config,
    db::open_store,
    services::{spawn_refresh_loop, HttpLikeClient},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("blog_recommender=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let store = open_store(&config).context("Failed to open history store")?;
    let likes = Arc::new(HttpLikeClient::new(
        config.blog_base_url.clone(),
        config.csrf_token.clone(),
    ));

    let state = AppState::new(store, config.recommender_settings(), likes);
    let refresher = spawn_refresh_loop(state.recommender.clone(), config.refresh_interval());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Recommendation service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    refresher.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
