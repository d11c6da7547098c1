//! Provider error kinds and error value helpers.
//!
//! ```rust
//! use rprovider::{ProviderError, ProviderErrorKind};
//!
//! let auth = ProviderError::authentication("bad key");
//! assert!(!auth.retryable);
//!
//! let throttled = ProviderError::from_status(429, "slow down");
//! assert_eq!(throttled.kind, ProviderErrorKind::RateLimited);
//! assert!(throttled.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Classifies a non-success HTTP status from a chat-completions endpoint.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::authentication(message),
            429 => Self::rate_limited(message),
            408 | 504 => Self::timeout(message),
            400 | 404 | 422 => Self::invalid_request(message),
            502 | 503 => Self::unavailable(message),
            _ => Self::transport(message),
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_classifies_common_http_failures() {
        assert_eq!(
            ProviderError::from_status(401, "x").kind,
            ProviderErrorKind::Authentication
        );
        assert_eq!(
            ProviderError::from_status(504, "x").kind,
            ProviderErrorKind::Timeout
        );
        assert_eq!(
            ProviderError::from_status(422, "x").kind,
            ProviderErrorKind::InvalidRequest
        );
        assert_eq!(
            ProviderError::from_status(503, "x").kind,
            ProviderErrorKind::Unavailable
        );

        let fallback = ProviderError::from_status(500, "boom");
        assert_eq!(fallback.kind, ProviderErrorKind::Transport);
        assert!(fallback.retryable);
        assert_eq!(fallback.to_string(), "Transport: boom");
    }
}
