//! Single bearer-token cache with proactive, expiry-based refresh.
//!
//! A [`TokenCache`] serves its token while `now < expires_at - refresh_buffer`
//! and fetches a new one from its [`FetchToken`] source otherwise. Fetches are
//! single-flight: callers that find the token stale while another caller is
//! already fetching wait for that fetch and reuse its result. A failed fetch
//! leaves the cached token in place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::token::CachedToken;
use crate::error::AuthError;
use crate::config::sources::ServiceConfig;
use crate::helpers::time::{get_instant, get_token_safety_margin_seconds, Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::sources::{build_sources, FetchToken, Source};

#[derive(Debug)]
pub struct TokenCache<S = Source> {
    source: S,
    refresh_buffer: Duration,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<CachedToken>>,
    // held for the duration of a fetch
    fetching: Mutex<()>,
}

impl<S: FetchToken> TokenCache<S> {
    pub fn new(source: S, refresh_buffer: Duration) -> Self {
        Self::with_clock(source, refresh_buffer, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, refresh_buffer: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            refresh_buffer,
            clock,
            current: RwLock::new(None),
            fetching: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Bearer token value, fetched only when the cached one is missing or stale.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        self.get_cached_token().await.map(|token| token.value)
    }

    /// Same as [`get_token`](Self::get_token) but with the expiry.
    pub async fn get_cached_token(&self) -> Result<CachedToken, AuthError> {
        let metrics = get_metrics().await;
        if let Some(token) = self.fresh().await {
            metrics.cache_hits.with_label_values(&[self.id()]).inc();
            return Ok(token);
        }

        let _fetching = self.fetching.lock().await;
        // the fetch we queued behind may have refreshed the token
        if let Some(token) = self.fresh().await {
            debug!(source = %self.id(), "token refreshed by concurrent caller");
            metrics.cache_hits.with_label_values(&[self.id()]).inc();
            return Ok(token);
        }

        metrics.cache_misses.with_label_values(&[self.id()]).inc();
        self.fetch_and_store().await
    }

    /// Fetch a new token regardless of the cached one.
    pub async fn refresh(&self) -> Result<CachedToken, AuthError> {
        let _fetching = self.fetching.lock().await;
        self.fetch_and_store().await
    }

    /// Drop the cached token so the next lookup fetches.
    pub async fn invalidate(&self) {
        let previous = self.current.write().await.take();
        let metrics = get_metrics().await;
        metrics.cache_invalidations.with_label_values(&[self.id()]).inc();
        metrics.token_expiry_unix.with_label_values(&[self.id()]).set(0);
        info!(source = %self.id(), had_token = previous.is_some(), "token cache invalidated");
    }

    /// Cached token, stale or not, without fetching.
    pub async fn peek(&self) -> Option<CachedToken> {
        self.current.read().await.clone()
    }

    async fn fresh(&self) -> Option<CachedToken> {
        let now = self.clock.now();
        self.current
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh(now, self.refresh_buffer))
            .cloned()
    }

    async fn fetch_and_store(&self) -> Result<CachedToken, AuthError> {
        let metrics = get_metrics().await;
        let id = self.id();
        let start = get_instant();
        let issued_at = self.clock.now();
        metrics.token_fetch_requests.with_label_values(&[id, self.source.kind(), "fetch"]).inc();

        let issued = self.source.fetch_token().await.inspect_err(|err| {
            metrics.token_fetch_duration.with_label_values(&[id]).observe(start.elapsed().as_secs_f64());
            metrics.token_fetch_failures.with_label_values(&[id, err.reason_label()]).inc();
            warn!(source = %id, "token fetch failed, keeping cached state: {}", err);
        })?;
        metrics.token_fetch_duration.with_label_values(&[id]).observe(start.elapsed().as_secs_f64());

        if issued.expires_in <= self.refresh_buffer {
            warn!(
                source = %id,
                "token lifetime {:?} is not longer than the refresh buffer {:?}, every lookup will refetch",
                issued.expires_in, self.refresh_buffer
            );
        }

        let token = CachedToken::from_issued(issued, issued_at);
        metrics.token_expiry_unix.with_label_values(&[id]).set(token.expires_at.timestamp());
        info!(source = %id, expires_at = %token.expires_at, "token fetched");

        *self.current.write().await = Some(token.clone());
        Ok(token)
    }
}

/// One cache per configured source, each with its own refresh buffer.
pub fn build_caches(config: &ServiceConfig, client: &Client) -> HashMap<String, Arc<TokenCache>> {
    build_sources(config, client)
        .into_iter()
        .map(|(id, source)| {
            let buffer = get_token_safety_margin_seconds(
                config.settings.safety_margin_seconds,
                source.config().safety_margin_seconds,
            );
            info!(source = %id, refresh_buffer_secs = buffer, "token cache ready");
            (id, Arc::new(TokenCache::new(source, Duration::from_secs(buffer))))
        })
        .collect()
}
