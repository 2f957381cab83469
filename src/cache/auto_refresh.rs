//! Background refresh of a [`TokenCache`] for consumers that watch the token
//! instead of asking for it.
//!
//! The task fetches on start, then again at `expires_at - refresh_buffer`.
//! Consumers read the latest [`TokenState`] through a `watch` channel. The task
//! is aborted when the [`AutoRefresh`] handle is dropped.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::token::CachedToken;
use crate::cache::token_cache::TokenCache;
use crate::error::AuthError;
use crate::helpers::time::until;
use crate::resilience::retry::RetrySettings;
use crate::sources::FetchToken;
use crate::utils::constants::DEFAULT_SAFETY_MARGIN_SECS;

/// Lower bound between two scheduled refreshes.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub loading: bool,
    pub error: Option<AuthError>,
}

#[derive(Debug, Clone)]
pub struct AutoRefreshOptions {
    /// when false only the initial fetch and `refresh_now` calls happen
    pub auto_refresh: bool,
    pub refresh_buffer: Duration,
    pub retry: RetrySettings,
    /// wait before trying again once all retries of a refresh failed,
    /// only with `auto_refresh`
    pub failure_backoff: Duration,
}

impl Default for AutoRefreshOptions {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_buffer: Duration::from_secs(DEFAULT_SAFETY_MARGIN_SECS),
            retry: RetrySettings::default(),
            failure_backoff: Duration::from_secs(30),
        }
    }
}

pub struct AutoRefresh {
    state: watch::Receiver<TokenState>,
    buffer: watch::Sender<Duration>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl AutoRefresh {
    /// Start refreshing `cache` in the background. Must be called inside a tokio runtime.
    pub fn spawn<S>(cache: Arc<TokenCache<S>>, options: AutoRefreshOptions) -> Self
    where
        S: FetchToken + 'static,
    {
        let (state_tx, state_rx) = watch::channel(TokenState { loading: true, ..Default::default() });
        let (buffer_tx, buffer_rx) = watch::channel(options.refresh_buffer);
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn(run(cache, options, state_tx, buffer_rx, refresh.clone()));

        Self { state: state_rx, buffer: buffer_tx, refresh, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.state.clone()
    }

    pub fn state(&self) -> TokenState {
        self.state.borrow().clone()
    }

    /// Change the buffer; the pending refresh is rescheduled.
    pub fn set_refresh_buffer(&self, buffer: Duration) {
        self.buffer.send_replace(buffer);
    }

    /// Refresh now instead of waiting for the schedule.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the background task.
    pub fn shutdown(self) {}
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<S: FetchToken>(
    cache: Arc<TokenCache<S>>,
    options: AutoRefreshOptions,
    state: watch::Sender<TokenState>,
    mut buffer: watch::Receiver<Duration>,
    refresh: Arc<Notify>,
) {
    loop {
        state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let outcome = options.retry.run_with_retry(|| cache.refresh()).await;
        let last_token = match outcome {
            Ok(token) => {
                state.send_modify(|s| {
                    s.token = Some(token.value.clone());
                    s.expires_at = Some(token.expires_at);
                    s.loading = false;
                    s.error = None;
                });
                Some(token)
            }
            Err(err) => {
                warn!(source = %cache.id(), "auto refresh failed: {}", err);
                state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(err);
                });
                None
            }
        };

        loop {
            let wait = match &last_token {
                Some(token) => options
                    .auto_refresh
                    .then(|| next_refresh_in(token, *buffer.borrow(), cache.clock().now())),
                None => options.auto_refresh.then_some(options.failure_backoff),
            };
            if let Some(wait) = wait {
                debug!(source = %cache.id(), "next token refresh in {:?}", wait);
            }

            tokio::select! {
                _ = sleep_or_pending(wait) => {
                    info!(source = %cache.id(), "auto refreshing token");
                    break;
                }
                _ = refresh.notified() => {
                    info!(source = %cache.id(), "manual token refresh");
                    break;
                }
                changed = buffer.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Delay until `expires_at - buffer`, never below [`MIN_REFRESH_INTERVAL`].
fn next_refresh_in(token: &CachedToken, buffer: Duration, now: DateTime<Utc>) -> Duration {
    until(token.refresh_at(buffer), now).max(MIN_REFRESH_INTERVAL)
}

async fn sleep_or_pending(wait: Option<Duration>) {
    match wait {
        Some(wait) => sleep(wait).await,
        None => pending().await,
    }
}
