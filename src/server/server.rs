use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::token_routes::TokenRoutesState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub tokens: TokenRoutesState,
}

impl AppState {
    pub fn new(metrics: &Metrics, tokens: TokenRoutesState) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            tokens,
        }
    }
}

/// All routes: token, health and (when enabled) metrics.
pub async fn router(settings_config: &SettingsConfig, tokens: TokenRoutesState) -> Router {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, tokens);

    Router::new()
        .route("/health", get(health))
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(state.tokens.router())
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn start(settings_config: &SettingsConfig, tokens: TokenRoutesState) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, tokens).await;

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);
    metrics.up.set(1);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    metrics.up.set(0);
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
