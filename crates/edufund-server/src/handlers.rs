//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use edufund_core::{bearer_token, FeeBreakdown, FundError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use edufund_payments::DonationRequest;

use crate::error::ApiError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
    pub store: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub amount: Decimal,
    #[serde(default)]
    pub cover_fees: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.checkout.is_some(),
        store: state.store.name().to_string(),
    })
}

/// Create a hosted checkout session for a donation
pub async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DonationRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let checkout = state.checkout.as_ref().ok_or(ApiError::PaymentsDisabled)?;
    let Json(request) = payload.map_err(|e| FundError::InvalidRequest(e.body_text()))?;

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let session = checkout.initiate(token, request).await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Price a donation without starting checkout
pub async fn fee_quote(
    State(state): State<AppState>,
    params: Result<Query<QuoteParams>, QueryRejection>,
) -> Result<Json<FeeBreakdown>, ApiError> {
    let Query(params) = params.map_err(|e| FundError::InvalidRequest(e.body_text()))?;
    Ok(Json(state.fees.quote(params.amount, params.cover_fees)?))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let webhooks = state.webhooks.as_ref().ok_or(ApiError::PaymentsDisabled)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| FundError::InvalidSignature("missing Stripe-Signature header".into()))?;

    let outcome = webhooks.process(&body, signature).await?;
    tracing::debug!(outcome = ?outcome, "Webhook processed");

    Ok(Json(WebhookAck { received: true }))
}
