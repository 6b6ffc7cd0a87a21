//! Error types for the provider adapters.

use thiserror::Error;

/// Errors that can occur when calling a vendor API.
///
/// The pipeline treats every variant as a single uniform transport-failure
/// kind; the distinctions exist for logging and for the adapter constructors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Invalid request - permanent error, caller bug.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Vendor-reported error (API error body, bad status, refusal).
    #[error("{vendor} error: {message}")]
    Provider {
        vendor: &'static str,
        message: String,
        /// HTTP status, when the error came with one.
        status: Option<u16>,
    },

    /// HTTP/network error, including client-side timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error (missing API key, bad base URL, etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn provider(vendor: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            vendor,
            message: message.into(),
            status: None,
        }
    }

    pub fn provider_with_status(
        vendor: &'static str,
        message: impl Into<String>,
        status: u16,
    ) -> Self {
        Self::Provider {
            vendor,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Provider { .. } => "provider_error",
            Self::Http(e) if e.is_timeout() => "timeout",
            Self::Http(_) => "http_error",
            Self::Config(_) => "config_error",
        }
    }
}
