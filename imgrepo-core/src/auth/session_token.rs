use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{TryRngCore, rngs::OsRng};
use std::fmt;
use thiserror::Error;

use crate::error::RepoError;

#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("token generation failed")]
    GenerationFailed,
}

impl From<SessionTokenError> for RepoError {
    fn from(err: SessionTokenError) -> Self {
        RepoError::Internal(err.to_string())
    }
}

/// Opaque bearer token proving a prior successful login.
///
/// 256 bits from the OS RNG, URL-safe base64 without padding.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn generate(lifetime: Duration) -> Result<Self, SessionTokenError> {
        let mut token_bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut token_bytes)
            .map_err(|_| SessionTokenError::GenerationFailed)?;

        Ok(Self {
            value: URL_SAFE_NO_PAD.encode(token_bytes),
            expires_at: Utc::now() + lifetime,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whole seconds until expiry, zero once expired.
    pub fn expires_in(&self) -> u64 {
        let remaining = self.expires_at.signed_duration_since(Utc::now());
        u64::try_from(remaining.num_seconds()).unwrap_or(0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = SessionToken::generate(Duration::minutes(30)).unwrap();
        let b = SessionToken::generate(Duration::minutes(30)).unwrap();
        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(a.as_str().len(), 43);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn expires_in_tracks_lifetime() {
        let token = SessionToken::generate(Duration::minutes(30)).unwrap();
        let secs = token.expires_in();
        assert!(secs > 29 * 60 && secs <= 30 * 60);
        assert!(!format!("{token:?}").contains(token.as_str()));
    }
}
