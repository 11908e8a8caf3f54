//! Error Types

use thiserror::Error;

/// Result type alias for donation operations
pub type Result<T> = std::result::Result<T, FundError>;

/// Donation flow error taxonomy
#[derive(Error, Debug)]
pub enum FundError {
    /// Malformed or missing input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No session, or the session was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Webhook signature verification failed
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Remote call (database, RPC, auth service) failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FundError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::Serialization(_) => "INVALID_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::Upstream(_) => "UPSTREAM_FAILURE",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => format!("Invalid donation request: {msg}"),
            Self::Unauthorized(_) => "Please sign in as a donor to continue.".into(),
            Self::NotFound(what) => format!("{what} not found."),
            Self::InvalidSignature(_) => "Invalid signature".into(),
            Self::Serialization(_) => "Malformed request body.".into(),
            Self::Upstream(_) | Self::Config(_) => {
                "Something went wrong processing your donation. Please try again.".into()
            }
        }
    }
}
