//! Error types shared by token sources, the token cache and the API client.

use http::StatusCode;

/// Failure to obtain a bearer token.
///
/// `Clone` so that the auto-refresh task can publish the last error
/// alongside the token state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The issuing endpoint was unreachable, answered with a non-2xx status,
    /// or returned a payload without a usable token.
    #[error("token source '{source_name}' fetch failed: {reason}")]
    Fetch { source_name: String, reason: String },

    /// The session-token route answered 401: the caller has no session.
    #[error("token source '{source_name}': caller is not authenticated")]
    Missing { source_name: String },
}

impl AuthError {
    pub fn fetch(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(source_name: impl Into<String>) -> Self {
        Self::Missing {
            source_name: source_name.into(),
        }
    }

    pub fn source_name(&self) -> &str {
        match self {
            AuthError::Fetch { source_name, .. } => source_name,
            AuthError::Missing { source_name } => source_name,
        }
    }

    /// Label used for the fetch failure metric.
    pub fn reason_label(&self) -> &'static str {
        match self {
            AuthError::Fetch { .. } => "fetch",
            AuthError::Missing { .. } => "unauthenticated",
        }
    }
}

/// Failure of a call against the REST API gateway.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("API request failed: {status} {body}")]
    Status { status: StatusCode, body: String },

    #[error("API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// A call that must return a body got an empty one.
    #[error("API response for '{0}' was empty")]
    EmptyResponse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
