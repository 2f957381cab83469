/// Sources module
///
/// A source is one configured token-issuing endpoint. The cache only needs
/// [`FetchToken`]; [`fetch::Source`] is the HTTP implementation built from config.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::config::settings::SettingsConfig;
use crate::config::sources::ServiceConfig;
use crate::error::AuthError;
use crate::parser::token_response::IssuedToken;

pub mod fetch;

pub use fetch::Source;

pub trait FetchToken: Send + Sync {
    /// Source id used in logs, metrics and errors.
    fn id(&self) -> &str;

    /// Kind label for metrics (`client_credentials`, `session`, ...).
    fn kind(&self) -> &str;

    /// Ask the issuing endpoint for a new token.
    fn fetch_token(&self) -> impl Future<Output = Result<IssuedToken, AuthError>> + Send;
}

/// Shared HTTP client; every token fetch and API call inherits its timeout.
pub fn build_http_client(settings: &SettingsConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(settings.http_timeout_ms))
        .build()
}

pub fn build_sources(config: &ServiceConfig, client: &Client) -> HashMap<String, Source> {
    config
        .sources
        .iter()
        .map(|(id, cfg)| (id.to_owned(), Source::new(id.as_str(), cfg.clone(), client.clone())))
        .collect()
}
