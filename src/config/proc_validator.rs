//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates:
//!   * settings: retry delays, logging level, server port, metrics path
//!   * sources: url scheme, credentials for client_credentials, response shape
//!   * api: base url and a token source that exists

use std::collections::HashMap;
use std::path::Path;

use tracing::{error, info};

use crate::config::api::ApiConfig;
use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::sources::{GenericSourceValue, ServiceConfig, SourceConfig, SourceTypes};
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);

    if cfg.sources.is_empty() {
        errors.push("config: 'sources' is empty; at least one source required".to_string());
    }

    for (src_name, src_cfg) in &cfg.sources {
        validate_source(src_name, src_cfg, &mut errors);
    }

    if let Some(api) = &cfg.api {
        validate_api(api, &cfg.sources, &mut errors);
    }

    if errors.is_empty() {
        info!("config validated, {} source(s)", cfg.sources.len());
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config validation: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry(retry, errors);
    }

    if settings.http_timeout_ms == 0 {
        errors.push("settings.http_timeout_ms must be > 0".to_string());
    }

    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' is invalid; allowed: {}",
                logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
    }

    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' is not a valid port",
            settings.server.port
        ));
    }

    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push("settings.retry.attempts must be >= 1".to_string());
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "settings.retry.max_delay_ms ({}) must be >= base_delay_ms ({})",
                max, base
            ));
        }
    }
}

fn validate_source(name: &str, src: &SourceConfig, errors: &mut Vec<String>) {
    if !is_http_url(&src.request.url) {
        errors.push(format!(
            "source['{}'].request.url '{}' must start with http:// or https://",
            name, src.request.url
        ));
    }

    match (src.source_type, &src.credentials) {
        (SourceTypes::ClientCredentials, None) => errors.push(format!(
            "source['{}'] of type client_credentials requires 'credentials'",
            name
        )),
        (SourceTypes::ClientCredentials, Some(creds)) => {
            validate_value(name, "credentials.client_id", &creds.client_id, errors);
            validate_value(name, "credentials.client_secret", &creds.client_secret, errors);
            if let Some(audience) = &creds.audience {
                validate_value(name, "credentials.audience", audience, errors);
            }
        }
        (SourceTypes::Session, Some(_)) => errors.push(format!(
            "source['{}'] of type session must not define 'credentials'",
            name
        )),
        (SourceTypes::Session, None) => {}
    }

    for (key, value) in src.request.headers.iter().flatten() {
        validate_value(name, &format!("request.headers.{}", key), value, errors);
    }
    for (key, value) in src.request.body.iter().flatten() {
        validate_value(name, &format!("request.body.{}", key), value, errors);
    }

    let shape = &src.response;
    for (field, pointer) in [
        ("token_pointer", &shape.token_pointer),
        ("expires_in_pointer", &shape.expires_in_pointer),
        ("token_type_pointer", &shape.token_type_pointer),
    ] {
        if pointer.as_deref().is_some_and(str::is_empty) {
            errors.push(format!("source['{}'].response.{} must not be empty", name, field));
        }
    }
    if shape.default_expires_in == Some(0) {
        errors.push(format!(
            "source['{}'].response.default_expires_in must be > 0",
            name
        ));
    }
}

fn validate_value(source: &str, field: &str, value: &GenericSourceValue, errors: &mut Vec<String>) {
    match value {
        GenericSourceValue::Literal { .. } => {}
        GenericSourceValue::FromEnv { from_env } => {
            if from_env.trim().is_empty() {
                errors.push(format!("source['{}'].{}.from_env is empty", source, field));
            }
        }
        GenericSourceValue::FromFile { path } => {
            if !Path::new(path).exists() {
                errors.push(format!(
                    "source['{}'].{}.path '{}' does not exist",
                    source, field, path
                ));
            }
        }
    }
}

fn validate_api(api: &ApiConfig, sources: &HashMap<String, SourceConfig>, errors: &mut Vec<String>) {
    if !is_http_url(&api.base_url) {
        errors.push(format!(
            "api.base_url '{}' must start with http:// or https://",
            api.base_url
        ));
    }
    if !sources.contains_key(&api.token_source) {
        errors.push(format!(
            "api.token_source references unknown source '{}'",
            api.token_source
        ));
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
