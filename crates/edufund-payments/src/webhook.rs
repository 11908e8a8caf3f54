//! Stripe Webhook Handling
//!
//! Verifies and processes Stripe events for the donation lifecycle:
//!
//! ```text
//! checkout.session.completed      → insert donation (completed, held)
//!                                   → increment project funds
//!                                   → update escrow ledger
//! payment_intent.payment_failed   → mark donations failed
//! charge.refunded                 → mark donations refunded
//! anything else                   → acknowledged, ignored
//! ```
//!
//! Verified events are decoded through the Stripe object model. A body
//! the pinned model cannot decode (newer API version) is still authentic,
//! and falls back to local serde types that read only the fields the flow
//! needs.

use std::collections::HashMap;
use std::sync::Arc;

use edufund_core::{DonationStatus, DonationStore, EscrowStatus, FollowUpFailure, NewDonation};
use serde::Deserialize;
use stripe::{Event, EventObject, EventType};
use uuid::Uuid;

use crate::error::{invalid, Result};
use crate::metadata::DonationMetadata;
use crate::signature::{VerifiedPayload, WebhookVerifier};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";
pub const CHARGE_REFUNDED: &str = "charge.refunded";

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletedSession {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    payment_method_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChargeObject {
    #[serde(default)]
    payment_intent: Option<String>,
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Hosted checkout finished and the payment was captured
    CheckoutCompleted {
        session_id: String,
        payment_intent_id: Option<String>,
        payment_method_types: Vec<String>,
        metadata: DonationMetadata,
    },

    /// A payment attempt failed
    PaymentFailed { payment_intent_id: String },

    /// A captured charge was refunded
    ChargeRefunded { payment_intent_id: String },

    /// Unhandled event type
    Other { event_type: String },
}

impl WebhookEvent {
    /// Map a typed Stripe event
    pub fn from_stripe(event: Event) -> Result<(String, Self)> {
        let event_id = event.id.to_string();

        let parsed = match (event.type_, event.data.object) {
            (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
                Self::CheckoutCompleted {
                    metadata: DonationMetadata::from_map(&session.metadata.unwrap_or_default())?,
                    session_id: session.id.to_string(),
                    payment_intent_id: session.payment_intent.map(|pi| pi.id().to_string()),
                    payment_method_types: session.payment_method_types,
                }
            }
            (EventType::PaymentIntentPaymentFailed, EventObject::PaymentIntent(intent)) => {
                Self::PaymentFailed {
                    payment_intent_id: intent.id.to_string(),
                }
            }
            (EventType::ChargeRefunded, EventObject::Charge(charge)) => {
                let payment_intent_id = charge
                    .payment_intent
                    .map(|pi| pi.id().to_string())
                    .ok_or_else(|| invalid("refunded charge has no payment intent"))?;
                Self::ChargeRefunded { payment_intent_id }
            }
            (
                event_type @ (EventType::CheckoutSessionCompleted
                | EventType::PaymentIntentPaymentFailed
                | EventType::ChargeRefunded),
                _,
            ) => {
                return Err(invalid(format!("unexpected object for {event_type}")));
            }
            (event_type, _) => Self::Other {
                event_type: event_type.to_string(),
            },
        };

        Ok((event_id, parsed))
    }

    /// Decode a verified event body with the local types
    pub fn parse(payload: &[u8]) -> Result<(String, Self)> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| invalid(format!("webhook body: {e}")))?;

        let event = match raw.event_type.as_str() {
            CHECKOUT_COMPLETED => {
                let session: CompletedSession = object(raw.data.object, "checkout session")?;
                Self::CheckoutCompleted {
                    metadata: DonationMetadata::from_map(&session.metadata)?,
                    session_id: session.id,
                    payment_intent_id: session.payment_intent,
                    payment_method_types: session.payment_method_types,
                }
            }
            PAYMENT_FAILED => {
                let intent: PaymentIntentObject = object(raw.data.object, "payment intent")?;
                Self::PaymentFailed {
                    payment_intent_id: intent.id,
                }
            }
            CHARGE_REFUNDED => {
                let charge: ChargeObject = object(raw.data.object, "charge")?;
                let payment_intent_id = charge
                    .payment_intent
                    .ok_or_else(|| invalid("refunded charge has no payment intent"))?;
                Self::ChargeRefunded { payment_intent_id }
            }
            _ => Self::Other {
                event_type: raw.event_type,
            },
        };

        Ok((raw.id, event))
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::CheckoutCompleted { .. } => CHECKOUT_COMPLETED,
            Self::PaymentFailed { .. } => PAYMENT_FAILED,
            Self::ChargeRefunded { .. } => CHARGE_REFUNDED,
            Self::Other { event_type } => event_type,
        }
    }
}

fn object<T: serde::de::DeserializeOwned>(value: serde_json::Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| invalid(format!("invalid {what} data: {e}")))
}

/// What a processed event did
#[derive(Clone, Debug)]
pub enum WebhookOutcome {
    /// A donation row was written; `failures` lists follow-ups that did not apply
    DonationRecorded {
        donation_id: Uuid,
        failures: Vec<FollowUpFailure>,
    },

    /// Donations paid through the intent changed status
    StatusUpdated {
        payment_intent_id: String,
        status: DonationStatus,
        updated: u64,
    },

    Ignored { event_type: String },
}

/// Webhook processor
pub struct WebhookProcessor {
    verifier: WebhookVerifier,
    store: Arc<dyn DonationStore>,
}

impl WebhookProcessor {
    pub fn new(verifier: WebhookVerifier, store: Arc<dyn DonationStore>) -> Self {
        Self { verifier, store }
    }

    /// Verify the signature, then process the event.
    ///
    /// Nothing is read from or written to the store unless the signature
    /// checks out.
    pub async fn process(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome> {
        let body =
            std::str::from_utf8(payload).map_err(|_| invalid("webhook body is not UTF-8"))?;

        let (event_id, event) = match self.verifier.verify(body, signature)? {
            VerifiedPayload::Event(event) => WebhookEvent::from_stripe(*event)?,
            VerifiedPayload::Undecoded { reason } => {
                tracing::debug!(reason = %reason, "Stripe model could not decode event, using local decoder");
                WebhookEvent::parse(payload)?
            }
        };

        tracing::info!(event_id = %event_id, event_type = %event.event_type(), "Processing Stripe webhook");

        self.handle(event).await
    }

    /// Process an already verified event
    pub async fn handle(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        match event {
            WebhookEvent::CheckoutCompleted {
                session_id,
                payment_intent_id,
                payment_method_types,
                metadata,
            } => {
                let donation = NewDonation {
                    project_id: metadata.project_id,
                    donor_id: metadata.donor_id,
                    amount: metadata.original_amount,
                    status: DonationStatus::Completed,
                    escrow_status: EscrowStatus::Held,
                    message: metadata.message,
                    anonymous: metadata.anonymous,
                    fee_covered: metadata.cover_fees,
                    payment_method_types,
                    stripe_session_id: Some(session_id),
                    stripe_payment_intent_id: payment_intent_id,
                };

                let settlement = self.store.record_completed_donation(donation).await?;

                tracing::info!(
                    donation_id = %settlement.donation.id,
                    project_id = %settlement.donation.project_id,
                    amount = %settlement.donation.amount,
                    complete = settlement.is_complete(),
                    "Recorded donation"
                );

                Ok(WebhookOutcome::DonationRecorded {
                    donation_id: settlement.donation.id,
                    failures: settlement.failures,
                })
            }

            WebhookEvent::PaymentFailed { payment_intent_id } => {
                self.set_status(payment_intent_id, DonationStatus::Failed).await
            }

            WebhookEvent::ChargeRefunded { payment_intent_id } => {
                self.set_status(payment_intent_id, DonationStatus::Refunded).await
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }

    async fn set_status(
        &self,
        payment_intent_id: String,
        status: DonationStatus,
    ) -> Result<WebhookOutcome> {
        let updated = self
            .store
            .set_status_by_payment_intent(&payment_intent_id, status)
            .await?;

        if updated == 0 {
            tracing::warn!(
                payment_intent_id = %payment_intent_id,
                status = status.as_str(),
                "No donation matches payment intent"
            );
        } else {
            tracing::info!(
                payment_intent_id = %payment_intent_id,
                status = status.as_str(),
                updated,
                "Updated donation status"
            );
        }

        Ok(WebhookOutcome::StatusUpdated {
            payment_intent_id,
            status,
            updated,
        })
    }
}
