//! Maps a token endpoint response body onto an [`IssuedToken`].
//!
//! The default shape is the OAuth2 one:
//! `{ "access_token": "...", "expires_in": 3600, "token_type": "Bearer" }`.
//! Session routes may add a `user` object with the caller's claims.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::sources::{ResponseShapeConfig, SourceTypes};
use crate::utils::constants::DEFAULT_TOKEN_TYPE;

const TOKEN_FIELD: &str = "access_token";
const EXPIRES_IN_FIELD: &str = "expires_in";
const TOKEN_TYPE_FIELD: &str = "token_type";
const USER_FIELD: &str = "user";

/// Claims of the user a session token was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Token endpoint response after shape mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Duration,
    pub token_type: String,
    pub user: Option<UserClaims>,
}

/// Where to find the token fields in a response body.
#[derive(Debug, Clone)]
pub struct ResponseShape {
    token_pointer: String,
    expires_in_pointer: String,
    token_type_pointer: String,
    default_expires_in: Duration,
}

impl ResponseShape {
    pub fn new(config: &ResponseShapeConfig, source_type: SourceTypes) -> Self {
        Self {
            token_pointer: pointer(config.token_pointer.as_deref(), TOKEN_FIELD),
            expires_in_pointer: pointer(config.expires_in_pointer.as_deref(), EXPIRES_IN_FIELD),
            token_type_pointer: pointer(config.token_type_pointer.as_deref(), TOKEN_TYPE_FIELD),
            default_expires_in: Duration::from_secs(
                config
                    .default_expires_in
                    .unwrap_or_else(|| source_type.default_expires_in()),
            ),
        }
    }

    pub fn default_expires_in(&self) -> Duration {
        self.default_expires_in
    }

    /// Parse a response body. The error is a human readable reason.
    pub fn parse(&self, body: &str) -> Result<IssuedToken, String> {
        let json: Value =
            serde_json::from_str(body).map_err(|e| format!("body is not valid JSON: {}", e))?;

        let access_token = json
            .pointer(&self.token_pointer)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| format!("field '{}' missing or not a non-empty string", self.token_pointer))?
            .to_owned();

        let expires_in = match json.pointer(&self.expires_in_pointer) {
            None | Some(Value::Null) => self.default_expires_in,
            Some(value) => Duration::from_secs(seconds(value).ok_or_else(|| {
                format!("field '{}' is not a non-negative number", self.expires_in_pointer)
            })?),
        };

        let token_type = json
            .pointer(&self.token_type_pointer)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TOKEN_TYPE)
            .to_owned();

        let user = json
            .get(USER_FIELD)
            .and_then(|u| serde_json::from_value::<UserClaims>(u.clone()).ok());

        Ok(IssuedToken { access_token, expires_in, token_type, user })
    }
}

/// `access_token` -> `/access_token`, pointers are kept as is.
fn pointer(configured: Option<&str>, default_field: &str) -> String {
    let field = configured.unwrap_or(default_field);
    if field.starts_with('/') {
        field.to_owned()
    } else {
        format!("/{}", field)
    }
}

// some providers send the lifetime as a string
fn seconds(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
