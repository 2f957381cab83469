use http::Method;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::api::ApiConfig;
use crate::config::settings::SettingsConfig;
use crate::utils::constants::{DEFAULT_MACHINE_TOKEN_TTL_SECS, DEFAULT_SESSION_TOKEN_TTL_SECS};


/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub api: Option<ApiConfig>,
    pub sources: HashMap<String, SourceConfig>,
}

impl ServiceConfig {
    /// Source served on the bare token route: the API token source, else the
    /// only source, else the first client-credentials source by id.
    pub fn default_token_source(&self) -> Option<String> {
        if let Some(api) = &self.api {
            return Some(api.token_source.clone());
        }
        if self.sources.len() == 1 {
            return self.sources.keys().next().cloned();
        }
        let mut machine: Vec<&String> = self
            .sources
            .iter()
            .filter(|(_, cfg)| cfg.source_type == SourceTypes::ClientCredentials)
            .map(|(id, _)| id)
            .collect();
        machine.sort();
        machine.first().map(|id| id.to_string())
    }
}

/// ================================
/// Sources
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub source_type: SourceTypes,
    pub request: RequestConfig,
    /// required for `client_credentials`
    pub credentials: Option<ClientCredentials>,
    #[serde(default)]
    pub response: ResponseShapeConfig,
    pub safety_margin_seconds: Option<u64>,
}

/// HTTP request details
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub struct RequestConfig {
    pub url: String,
    #[serde(with = "http_serde::method", default = "default_method")]
    pub method: Method, // GET, POST
    pub headers: Option<HashMap<String, GenericSourceValue>>,
    pub body: Option<HashMap<String, GenericSourceValue>>,
}

/// Header, body and credential value sources
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum GenericSourceValue {
    Literal {
        value: String,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}

/// OAuth2 client-credentials grant parameters
#[derive(Debug, Deserialize, Clone)]
pub struct ClientCredentials {
    pub client_id: GenericSourceValue,
    pub client_secret: GenericSourceValue,
    pub audience: Option<GenericSourceValue>,
    pub scope: Option<GenericSourceValue>,
}

/// ================================
/// Response shape - where the token and its lifetime live
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResponseShapeConfig {
    /// top level field or JSON pointer (`/data/token`)
    pub token_pointer: Option<String>,
    pub expires_in_pointer: Option<String>,
    pub token_type_pointer: Option<String>,
    /// used when the endpoint omits `expires_in`
    pub default_expires_in: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceTypes {
    /// machine-to-machine token from the identity provider
    ClientCredentials,
    /// user token from an authenticated session route
    Session,
}

impl SourceTypes {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTypes::ClientCredentials => "client_credentials",
            SourceTypes::Session => "session",
        }
    }

    pub fn default_expires_in(&self) -> u64 {
        match self {
            SourceTypes::ClientCredentials => DEFAULT_MACHINE_TOKEN_TTL_SECS,
            SourceTypes::Session => DEFAULT_SESSION_TOKEN_TTL_SECS,
        }
    }
}

fn default_method() -> Method {
    Method::GET
}
