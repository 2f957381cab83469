use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::cache::token_cache::TokenCache;
use crate::error::AuthError;
use crate::server::server::AppState;

pub const TOKEN_PATH: &str = "/api/token";

/// Token caches served over HTTP, by source id.
#[derive(Clone)]
pub struct TokenRoutesState {
    caches: Arc<HashMap<String, Arc<TokenCache>>>,
    default_source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// seconds left before the token expires
    pub expires_in: u64,
    pub token_type: String,
}

impl TokenRoutesState {
    pub fn new(caches: HashMap<String, Arc<TokenCache>>, default_source: Option<String>) -> Self {
        Self { caches: Arc::new(caches), default_source }
    }

    pub fn router(&self) -> Router<AppState> {
        if let Some(source) = &self.default_source {
            info!("served path: {} -> source '{}'", TOKEN_PATH, source);
        }
        Router::new()
            .route(TOKEN_PATH, get(get_default_token))
            .route(&format!("{}/invalidate", TOKEN_PATH), post(invalidate_default_token))
            .route(&format!("{}/{{source}}", TOKEN_PATH), get(get_source_token))
            .route(&format!("{}/{{source}}/invalidate", TOKEN_PATH), post(invalidate_source_token))
    }

    fn cache(&self, source: Option<&str>) -> Option<&Arc<TokenCache>> {
        source.or(self.default_source.as_deref()).and_then(|id| self.caches.get(id))
    }
}

async fn get_default_token(State(state): State<AppState>) -> Response {
    serve_token(&state.tokens, None).await
}

async fn get_source_token(State(state): State<AppState>, Path(source): Path<String>) -> Response {
    serve_token(&state.tokens, Some(&source)).await
}

async fn invalidate_default_token(State(state): State<AppState>) -> Response {
    invalidate(&state.tokens, None).await
}

async fn invalidate_source_token(State(state): State<AppState>, Path(source): Path<String>) -> Response {
    invalidate(&state.tokens, Some(&source)).await
}

async fn serve_token(tokens: &TokenRoutesState, source: Option<&str>) -> Response {
    let Some(cache) = tokens.cache(source) else {
        return not_found(source);
    };

    match cache.get_cached_token().await {
        Ok(token) => {
            let expires_in = token.expires_in(cache.clock().now()).as_secs();
            Json(TokenResponse {
                access_token: token.value,
                expires_in,
                token_type: token.token_type,
            })
            .into_response()
        }
        Err(err @ AuthError::Missing { .. }) => {
            warn!("{}", err);
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Not authenticated" }))).into_response()
        }
        Err(err) => {
            error!("error fetching API token: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Internal server error" }))).into_response()
        }
    }
}

async fn invalidate(tokens: &TokenRoutesState, source: Option<&str>) -> Response {
    match tokens.cache(source) {
        Some(cache) => {
            cache.invalidate().await;
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(source),
    }
}

fn not_found(source: Option<&str>) -> Response {
    let message = match source {
        Some(source) => format!("unknown token source '{}'", source),
        None => "no default token source configured".to_owned(),
    };
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}
