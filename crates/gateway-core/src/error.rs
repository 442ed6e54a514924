//! Error types for the gateway.
//!
//! Every adapter reports failures through [`GatewayError`]. The variants map
//! onto the failure classes callers need to tell apart: configuration
//! problems, upstream API errors, network failures and unsupported operations.
//! Payloads that arrive but do not match the expected shape are not errors;
//! adapters log them and fall back to empty values.

use std::time::Duration;
use thiserror::Error;

/// Result alias used across the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Unified gateway error
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Missing credentials or required connection fields
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Canonical request rejected before anything was sent
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
        /// Offending field, if known
        field: Option<String>,
        /// Machine-readable code
        code: String,
    },

    /// The provider answered with a documented error
    #[error("{provider} API error: {message}")]
    Provider {
        /// Provider display name used as the error tag
        provider: String,
        /// Error message reported by the provider
        message: String,
        /// HTTP status, when there was one
        status_code: Option<u16>,
        /// Whether the transport may retry the call
        retryable: bool,
    },

    /// Connection could not be established or broke mid-flight
    #[error("Network error: {message}")]
    Network {
        /// Error message
        message: String,
    },

    /// Transport timed out
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// Configured timeout that elapsed
        duration: Duration,
    },

    /// Operation explicitly rejected by the provider adapter
    #[error("{operation} is not supported by {provider}")]
    Unsupported {
        /// Provider display name
        provider: String,
        /// Rejected operation
        operation: String,
    },

    /// Streaming protocol failure after the stream was opened
    #[error("Streaming error: {message}")]
    Streaming {
        /// Error message
        message: String,
    },

    /// Invariant broken inside the gateway itself
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

/// Coarse classification of a [`GatewayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid connection parameters
    Configuration,
    /// Malformed canonical input
    Validation,
    /// Documented provider error, including throttling
    UpstreamApi,
    /// Timeout or connection failure
    Network,
    /// Operation the adapter refuses to perform
    UnsupportedOperation,
    /// Stream broke after it was opened
    Streaming,
    /// Gateway bug
    Internal,
}

impl GatewayError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(
        message: impl Into<String>,
        field: Option<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field,
            code: code.into(),
        }
    }

    /// Create a provider error tagged with the provider name
    pub fn provider(
        provider: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
        retryable: bool,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Create a provider error from an HTTP status, deriving retryability
    pub fn from_status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::provider(provider, message, Some(status), is_retryable_status(status))
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub const fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            provider: provider.into(),
            operation: operation.into(),
        }
    }

    /// Create a streaming error
    pub fn streaming(message: impl Into<String>) -> Self {
        Self::Streaming {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify the error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Provider { .. } => ErrorKind::UpstreamApi,
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::Unsupported { .. } => ErrorKind::UnsupportedOperation,
            Self::Streaming { .. } => ErrorKind::Streaming,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether a transport-level retry may succeed
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Network { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// HTTP status attached to the error, if any
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Statuses an OpenAI-style client retries: request timeout, conflict,
/// throttling and server errors.
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429) || status >= 500
}
