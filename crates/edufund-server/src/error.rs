//! HTTP Error Mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use edufund_core::FundError;
use edufund_payments::PaymentError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Stripe keys are not configured
    #[error("Payments not configured")]
    PaymentsDisabled,
}

impl From<FundError> for ApiError {
    fn from(err: FundError) -> Self {
        Self::Payment(err.into())
    }
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::PaymentsDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Payment(PaymentError::Fund(err)) => match err {
                FundError::InvalidRequest(_)
                | FundError::Serialization(_)
                | FundError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
                FundError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                FundError::NotFound(_) => StatusCode::NOT_FOUND,
                FundError::Upstream(_) | FundError::Config(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Payment(PaymentError::Stripe(_) | PaymentError::Config(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::PaymentsDisabled => ErrorResponse {
                error: "Payments not configured".into(),
                code: "PAYMENTS_DISABLED".into(),
            },
            Self::Payment(err) => ErrorResponse {
                error: err.user_message(),
                code: err.code().into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "Request failed: {}", self);
        } else {
            tracing::warn!(status = %status, "Request rejected: {}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
