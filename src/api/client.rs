use std::sync::Arc;

use http::{header, Method, StatusCode};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::token_cache::TokenCache;
use crate::config::api::ApiConfig;
use crate::error::ApiError;
use crate::observability::metrics::get_metrics;
use crate::sources::{FetchToken, Source};

/// REST client that authenticates every call with a token from a [`TokenCache`].
#[derive(Debug)]
pub struct ApiClient<S = Source> {
    base_url: String,
    client: Client,
    tokens: Arc<TokenCache<S>>,
    retry_on_unauthorized: bool,
}

impl<S: FetchToken> Clone for ApiClient<S> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            tokens: self.tokens.clone(),
            retry_on_unauthorized: self.retry_on_unauthorized,
        }
    }
}

impl<S: FetchToken> ApiClient<S> {
    pub fn new(base_url: impl Into<String>, client: Client, tokens: Arc<TokenCache<S>>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client,
            tokens,
            retry_on_unauthorized: true,
        }
    }

    pub fn from_config(config: &ApiConfig, client: Client, tokens: Arc<TokenCache<S>>) -> Self {
        Self::new(config.base_url.as_str(), client, tokens)
            .with_retry_on_unauthorized(config.retry_on_unauthorized)
    }

    pub fn with_retry_on_unauthorized(mut self, enabled: bool) -> Self {
        self.retry_on_unauthorized = enabled;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenCache<S>> {
        &self.tokens
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Send an authenticated request. `Ok(None)` when the gateway answers
    /// with an empty body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Option<T>, ApiError> {
        self.request_with_query(method, endpoint, &[], body).await
    }

    pub async fn request_with_query<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Option<T>, ApiError> {
        let mut response = self.send(method.clone(), endpoint, query, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.retry_on_unauthorized {
            warn!(%method, endpoint, "API answered 401, invalidating token and retrying once");
            get_metrics().await.api_unauthorized_retries.inc();
            self.tokens.invalidate().await;
            response = self.send(method.clone(), endpoint, query, body).await?;
        }

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body: text });
        }
        if text.trim().is_empty() {
            debug!(%method, endpoint, "empty API response");
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Like [`request`](Self::request) but an empty body is an error.
    pub async fn request_some<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.request(method, endpoint, body)
            .await?
            .ok_or_else(|| ApiError::EmptyResponse(endpoint.to_owned()))
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let token = self.tokens.get_token().await?;
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        get_metrics()
            .await
            .api_requests
            .with_label_values(&[method.as_str(), status.as_str()])
            .inc();
        info!(%method, endpoint, %status, "API request");
        Ok(response)
    }
}
