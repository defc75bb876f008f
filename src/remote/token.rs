/// Bearer token cache owned by a remote client instance
///
/// Tokens are reused until five minutes before the expiry the API reported,
/// then refreshed lazily on the next call.

use chrono::{DateTime, Duration, Utc};

/// Safety margin subtracted from the reported token lifetime
pub const EXPIRY_MARGIN_SECS: i64 = 300;

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Cached bearer token with its local expiry
#[derive(Default)]
pub struct TokenCache {
    entry: Option<CachedToken>,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("expires_at", &self.entry.as_ref().map(|e| e.expires_at))
            .finish()
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token if `now` is still before its expiry
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        self.entry
            .as_ref()
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.token.as_str())
    }

    /// Store a fresh token that the API says lives for `expires_in_secs`
    ///
    /// Returns the computed expiry. Lifetimes at or below the margin expire
    /// immediately, so the next call authenticates again. Lifetimes past what
    /// chrono can represent are clamped to the latest representable instant.
    pub fn store(&mut self, token: String, expires_in_secs: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        let lifetime = expires_in_secs.saturating_sub(EXPIRY_MARGIN_SECS).max(0);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entry = Some(CachedToken { token, expires_at });
        expires_at
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
