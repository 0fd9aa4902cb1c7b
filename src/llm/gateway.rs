//! Completion gateway abstraction.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::conversation::turn::Turn;

/// Boxed future type for gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Completion gateway error type.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No usable provider credential is configured.
    #[error("completion provider is not configured")]
    Unavailable,
    /// The provider call failed (network, timeout, provider-side error).
    #[error("completion call failed: {0}")]
    Call(String),
}

impl GatewayError {
    /// Check if this error may succeed on a later attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Call(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Call("request timed out".to_string())
        } else {
            Self::Call(value.to_string())
        }
    }
}

/// Convenience result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Trait abstraction over text-completion providers.
pub trait CompletionGateway: Send + Sync {
    /// Whether a provider credential is available.
    fn is_configured(&self) -> bool;

    /// Generate an assistant reply for the ordered turns (system first, latest user turn last).
    ///
    /// # Errors
    /// Returns [`GatewayError::Unavailable`] when unconfigured, [`GatewayError::Call`] otherwise.
    fn complete(&self, turns: Vec<Turn>) -> GatewayFuture<'_, GatewayResult<String>>;
}
