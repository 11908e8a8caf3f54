//! Stripe Checkout Integration
//!
//! Creates hosted, one-off payment sessions for donations.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, Currency,
};
use tokio::sync::Mutex;

use crate::error::{PaymentError, Result};
use crate::metadata::DonationMetadata;

/// Everything needed to open a hosted checkout for one donation
#[derive(Clone, Debug)]
pub struct SessionRequest {
    /// Line item name shown on the hosted page
    pub product_name: String,

    /// Charged amount in cents (fees included when covered)
    pub unit_amount_cents: i64,

    pub customer_email: Option<String>,

    /// Our donor id, echoed back by Stripe
    pub client_reference_id: String,

    pub success_url: String,
    pub cancel_url: String,

    pub metadata: DonationMetadata,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedSession {
    /// Stripe session ID
    pub id: String,

    /// URL to redirect the donor to
    pub url: String,
}

/// Hosted checkout provider
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> Result<HostedSession>;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }
}

#[async_trait]
impl CheckoutGateway for StripeClient {
    /// Create a Stripe Checkout session in payment mode.
    ///
    /// Returns a URL to redirect the donor to Stripe's hosted checkout page.
    async fn create_session(&self, request: &SessionRequest) -> Result<HostedSession> {
        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.client_reference_id = Some(&request.client_reference_id);
        params.customer_email = request.customer_email.as_deref();
        params.metadata = Some(request.metadata.to_map());

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(request.unit_amount_cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.product_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        Ok(HostedSession {
            id: session.id.to_string(),
            url,
        })
    }
}

/// Recording gateway (for development and tests)
#[derive(Default)]
pub struct MockGateway {
    calls: AtomicUsize,
    requests: Mutex<Vec<SessionRequest>>,
    fail: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every call fails like an unreachable processor
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CheckoutGateway for MockGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<HostedSession> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(PaymentError::Stripe("mock gateway unavailable".into()));
        }
        self.requests.lock().await.push(request.clone());

        let id = format!("cs_test_{n}");
        Ok(HostedSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }
}
