use serde::Deserialize;

/// ================================
/// REST API gateway
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// id of the source whose token is attached to API calls
    pub token_source: String,
    /// invalidate the token and retry once on 401
    #[serde(default = "default_retry_on_unauthorized")]
    pub retry_on_unauthorized: bool,
}

fn default_retry_on_unauthorized() -> bool {
    true
}
