//! Checkout Session Metadata
//!
//! Donation details travel through Stripe as string metadata on the
//! checkout session, and come back on the `checkout.session.completed`
//! event.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{invalid, Result};

const PROJECT_ID: &str = "project_id";
const DONOR_ID: &str = "donor_id";
const NGO_ID: &str = "ngo_id";
const MESSAGE: &str = "message";
const COVER_FEES: &str = "cover_fees";
const ANONYMOUS: &str = "anonymous";
const ORIGINAL_AMOUNT: &str = "original_amount";
const FEE_CENTS: &str = "fee_cents";

/// Donation details attached to a checkout session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonationMetadata {
    pub project_id: String,
    pub donor_id: String,
    pub ngo_id: String,
    pub message: Option<String>,
    pub cover_fees: bool,
    pub anonymous: bool,

    /// Donation before any covered fee, in currency units
    pub original_amount: Decimal,

    /// Covered fee, in cents
    pub fee_cents: i64,
}

impl DonationMetadata {
    /// Encode as Stripe metadata
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(PROJECT_ID.into(), self.project_id.clone());
        map.insert(DONOR_ID.into(), self.donor_id.clone());
        map.insert(NGO_ID.into(), self.ngo_id.clone());
        map.insert(MESSAGE.into(), self.message.clone().unwrap_or_default());
        map.insert(COVER_FEES.into(), self.cover_fees.to_string());
        map.insert(ANONYMOUS.into(), self.anonymous.to_string());
        map.insert(ORIGINAL_AMOUNT.into(), self.original_amount.to_string());
        map.insert(FEE_CENTS.into(), self.fee_cents.to_string());
        map
    }

    /// Decode from Stripe metadata
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            map.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| invalid(format!("checkout metadata missing {key}")))
        };
        let flag = |key: &str| map.get(key).is_some_and(|v| v == "true");

        let original_amount = Decimal::from_str(&required(ORIGINAL_AMOUNT)?)
            .map_err(|e| invalid(format!("checkout metadata {ORIGINAL_AMOUNT}: {e}")))?;

        let fee_cents = match map.get(FEE_CENTS) {
            Some(v) if !v.is_empty() => v
                .parse()
                .map_err(|e| invalid(format!("checkout metadata {FEE_CENTS}: {e}")))?,
            _ => 0,
        };

        Ok(Self {
            project_id: required(PROJECT_ID)?,
            donor_id: required(DONOR_ID)?,
            ngo_id: map.get(NGO_ID).cloned().unwrap_or_default(),
            message: map.get(MESSAGE).filter(|m| !m.is_empty()).cloned(),
            cover_fees: flag(COVER_FEES),
            anonymous: flag(ANONYMOUS),
            original_amount,
            fee_cents,
        })
    }
}
