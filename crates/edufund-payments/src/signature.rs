//! Stripe Webhook Signature Verification
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`. Several `v1`
//! entries appear while a signing secret is being rolled.
//!
//! The replay window is enforced here so it stays configurable; the HMAC
//! comparison and event decoding go through `stripe::Webhook`, once per
//! `v1` candidate.

use edufund_core::FundError;
use stripe::{Event, Webhook, WebhookError};

use crate::error::{PaymentError, Result};

/// Default replay window, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// A webhook body whose signature checked out
#[derive(Debug)]
pub enum VerifiedPayload {
    /// Decoded into the Stripe object model
    Event(Box<Event>),

    /// Authentic, but the pinned Stripe object model could not decode it
    /// (usually an account on a newer API version)
    Undecoded { reason: String },
}

/// Verifies webhook payloads against the endpoint signing secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify against the current clock
    pub fn verify(&self, payload: &str, header: &str) -> Result<VerifiedPayload> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify as of `now` (unix seconds)
    pub fn verify_at(&self, payload: &str, header: &str, now: i64) -> Result<VerifiedPayload> {
        let parsed = SignatureHeader::parse(header)?;

        let fresh = now
            .checked_sub(parsed.timestamp)
            .map(i64::unsigned_abs)
            .is_some_and(|age| age <= self.tolerance_secs.max(0).unsigned_abs());
        if !fresh {
            return Err(rejected("timestamp outside tolerance"));
        }

        for candidate in &parsed.signatures {
            let single = format!("t={},v1={candidate}", parsed.timestamp);
            // Freshness is settled above, so the library checks as of signing time
            match Webhook::construct_event_with_timestamp(
                payload,
                &single,
                &self.secret,
                parsed.timestamp,
            ) {
                Ok(event) => return Ok(VerifiedPayload::Event(Box::new(event))),
                Err(WebhookError::BadParse(e)) => {
                    return Ok(VerifiedPayload::Undecoded {
                        reason: e.to_string(),
                    });
                }
                Err(WebhookError::BadKey) => {
                    return Err(PaymentError::Config("webhook secret rejected".into()));
                }
                Err(_) => {}
            }
        }

        Err(rejected("no matching v1 signature"))
    }
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    if timestamp.is_some() {
                        return Err(rejected("duplicate timestamp"));
                    }
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| rejected("malformed timestamp"))?,
                    );
                }
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| rejected("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(rejected("missing v1 signature"));
        }
        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn rejected(reason: &str) -> PaymentError {
    PaymentError::Fund(FundError::InvalidSignature(reason.into()))
}

/// Build a `Stripe-Signature` value for a fixture payload
#[cfg(test)]
pub(crate) fn sign(secret: &str, payload: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};

    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
