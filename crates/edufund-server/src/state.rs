//! Application State

use std::sync::Arc;

use edufund_core::{DonationStore, FeeSchedule};
use edufund_payments::{CheckoutService, WebhookProcessor};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Donation checkout (None if Stripe is not configured)
    pub checkout: Option<Arc<CheckoutService>>,

    /// Stripe webhook processor (None if Stripe is not configured)
    pub webhooks: Option<Arc<WebhookProcessor>>,

    /// Store backing projects, donations and escrow
    pub store: Arc<dyn DonationStore>,

    /// Fee schedule used for quotes
    pub fees: FeeSchedule,
}
