//! Payment Error Types

use edufund_core::FundError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Donation flow error (validation, auth, storage, signature)
    #[error(transparent)]
    Fund(#[from] FundError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Stripe(_) => true,
            Self::Fund(e) => e.is_retryable(),
            Self::Config(_) => false,
        }
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Stripe(_) => "UPSTREAM_FAILURE",
            Self::Fund(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Stripe(_) => "Payment processing failed. Please try again.".into(),
            Self::Fund(e) => e.user_message(),
            Self::Config(_) => "Service configuration error.".into(),
        }
    }
}

/// Shorthand for the invalid-request variant
pub(crate) fn invalid(msg: impl Into<String>) -> PaymentError {
    PaymentError::Fund(FundError::InvalidRequest(msg.into()))
}
