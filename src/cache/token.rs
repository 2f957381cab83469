use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::helpers::time::{to_delta, until};
use crate::parser::token_response::IssuedToken;

/// A bearer token and the instant it stops being usable.
///
/// Replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
}

impl CachedToken {
    pub fn new(value: String, expires_at: DateTime<Utc>, token_type: String) -> Self {
        Self { value, expires_at, token_type }
    }

    /// `issued_at + expires_in`
    pub fn from_issued(issued: IssuedToken, issued_at: DateTime<Utc>) -> Self {
        let expires_at = issued_at
            .checked_add_signed(to_delta(issued.expires_in))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(issued.access_token, expires_at, issued.token_type)
    }

    /// Instant from which the token must be refreshed.
    pub fn refresh_at(&self, buffer: Duration) -> DateTime<Utc> {
        self.expires_at
            .checked_sub_signed(to_delta(buffer))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Servable from cache: `now < expires_at - buffer`.
    pub fn is_fresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now < self.refresh_at(buffer)
    }

    /// Remaining nominal lifetime.
    pub fn expires_in(&self, now: DateTime<Utc>) -> Duration {
        until(self.expires_at, now)
    }
}
