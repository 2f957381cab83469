use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::sources::{GenericSourceValue, SourceConfig, SourceTypes};
use crate::error::AuthError;
use crate::parser::token_response::{IssuedToken, ResponseShape};
use crate::sources::FetchToken;
use crate::utils::constants::CLIENT_CREDENTIALS_GRANT;

/// HTTP token source built from a [`SourceConfig`].
#[derive(Debug, Clone)]
pub struct Source {
    id: String,
    config: Arc<SourceConfig>,
    shape: ResponseShape,
    client: Client,
}

impl Source {
    pub fn new(id: impl Into<String>, config: SourceConfig, client: Client) -> Self {
        let shape = ResponseShape::new(&config.response, config.source_type);
        Self {
            id: id.into(),
            config: Arc::new(config),
            shape,
            client,
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn fetch_error(&self, reason: impl Into<String>) -> AuthError {
        AuthError::fetch(self.id.as_str(), reason)
    }

    fn build_body(&self) -> Result<Option<HashMap<String, String>>, AuthError> {
        let mut body = HashMap::new();

        if let Some(creds) = &self.config.credentials {
            body.insert("grant_type".to_owned(), CLIENT_CREDENTIALS_GRANT.to_owned());
            body.insert("client_id".to_owned(), self.resolve(&creds.client_id)?);
            body.insert("client_secret".to_owned(), self.resolve(&creds.client_secret)?);
            if let Some(audience) = &creds.audience {
                body.insert("audience".to_owned(), self.resolve(audience)?);
            }
            if let Some(scope) = &creds.scope {
                body.insert("scope".to_owned(), self.resolve(scope)?);
            }
        }

        for (k, v) in self.config.request.body.iter().flatten() {
            body.insert(k.to_owned(), self.resolve(v)?);
        }

        Ok((!body.is_empty()).then_some(body))
    }

    fn resolve(&self, value: &GenericSourceValue) -> Result<String, AuthError> {
        prepare_generic_source_value(value).map_err(|reason| self.fetch_error(reason))
    }
}

impl FetchToken for Source {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        self.config.source_type.as_str()
    }

    async fn fetch_token(&self) -> Result<IssuedToken, AuthError> {
        let req_cfg = &self.config.request;
        let mut request = self.client.request(req_cfg.method.clone(), &req_cfg.url);

        // Build headers dynamically
        for (key, v) in req_cfg.headers.iter().flatten() {
            request = request.header(key, self.resolve(v)?);
        }
        if let Some(body) = self.build_body()? {
            request = request.json(&body);
        }

        debug!(source = %self.id, url = %req_cfg.url, "requesting token");
        let response = request
            .send()
            .await
            .map_err(|e| self.fetch_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED && self.config.source_type == SourceTypes::Session {
            return Err(AuthError::missing(self.id.as_str()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.fetch_error(format!("reading body failed: {}", e)))?;

        if !status.is_success() {
            warn!(source = %self.id, %status, "token endpoint rejected request: {}", body);
            return Err(self.fetch_error(format!("HTTP {}: {}", status, body)));
        }

        self.shape.parse(&body).map_err(|reason| self.fetch_error(reason))
    }
}

fn prepare_generic_source_value(value: &GenericSourceValue) -> Result<String, String> {
    match value {
        GenericSourceValue::Literal { value } => Ok(value.to_owned()),
        GenericSourceValue::FromEnv { from_env } => std::env::var(from_env)
            .map_err(|err| format!("env var '{}': {}", from_env, err)),
        GenericSourceValue::FromFile { path } => std::fs::read_to_string(path)
            .map(|res| res.trim().to_string())
            .map_err(|err| format!("file '{}': {}", path, err)),
    }
}
