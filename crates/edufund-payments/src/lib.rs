//! # edufund-payments
//!
//! Stripe checkout and webhook processing for EduFund Connect donations.
//!
//! ## Money flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │   Donate    │────▶│  Stripe Hosted  │────▶│   Success   │
//! │    form     │     │  Checkout Page  │     │    page     │
//! └─────────────┘     └─────────────────┘     └─────────────┘
//!        │                     │
//!        ▼                     ▼ checkout.session.completed
//! CheckoutService       WebhookProcessor
//!  validate, auth,       verify signature, record donation,
//!  fees, session         fund increment, escrow update
//! ```
//!
//! The processor never trusts the redirect back to the success page; the
//! donation is only recorded from the signed webhook.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edufund_payments::{CheckoutService, DonationRequest, StripeClient};
//!
//! let service = CheckoutService::new(
//!     Arc::new(StripeClient::new("sk_test_xxx")),
//!     store,
//!     authenticator,
//!     FeeSchedule::standard(),
//!     "https://edufund.example",
//! );
//!
//! let session = service.initiate(Some(token), request).await?;
//! // Redirect donor to: session.url
//! ```

mod checkout;
mod error;
mod initiator;
mod metadata;
mod signature;
mod webhook;

pub use checkout::{CheckoutGateway, HostedSession, MockGateway, SessionRequest, StripeClient};
pub use error::{PaymentError, Result};
pub use initiator::{CheckoutService, DonationRequest, MAX_MESSAGE_CHARS};
pub use metadata::DonationMetadata;
pub use signature::{VerifiedPayload, WebhookVerifier, DEFAULT_TOLERANCE_SECS};
pub use webhook::{WebhookEvent, WebhookOutcome, WebhookProcessor};
