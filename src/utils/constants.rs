//! Shared constants and invariants

/// Refresh buffer when neither the source nor the settings define one.
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

/// Lifetimes assumed when a token endpoint omits `expires_in`.
pub const DEFAULT_MACHINE_TOKEN_TTL_SECS: u64 = 86_400;
pub const DEFAULT_SESSION_TOKEN_TTL_SECS: u64 = 3_600;

pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
