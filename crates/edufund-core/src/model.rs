//! Domain Models
//!
//! Donations, projects and escrow aggregates as persisted by the hosted
//! database. Uses `rust_decimal` for all monetary values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Donation lifecycle status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl DonationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Where the donated money sits relative to the project
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    Held,
    Released,
    #[default]
    Pending,
}

impl EscrowStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Released => "released",
            Self::Pending => "pending",
        }
    }
}

/// Project lifecycle status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    #[default]
    Active,
    Funded,
    Completed,
    Cancelled,
}

/// A fundraising project owned by an NGO
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: String,

    /// Owning NGO
    pub ngo_id: String,

    pub title: String,

    /// Funding target
    pub budget: Decimal,

    /// Only ever grows, through fund increments
    #[serde(default)]
    pub amount_raised: Decimal,

    #[serde(default)]
    pub status: ProjectStatus,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        ngo_id: impl Into<String>,
        title: impl Into<String>,
        budget: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            ngo_id: ngo_id.into(),
            title: title.into(),
            budget,
            amount_raised: Decimal::ZERO,
            status: ProjectStatus::Active,
        }
    }
}

/// A recorded donation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub project_id: String,
    pub donor_id: String,

    /// Donated amount in currency units, excluding covered fees
    pub amount: Decimal,

    pub status: DonationStatus,
    pub escrow_status: EscrowStatus,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub anonymous: bool,

    #[serde(default)]
    pub fee_covered: bool,

    /// Payment method types reported by the processor (e.g. "card")
    #[serde(default)]
    pub payment_method_types: Vec<String>,

    #[serde(default)]
    pub stripe_session_id: Option<String>,

    #[serde(default)]
    pub stripe_payment_intent_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Insert payload for a donation row
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewDonation {
    pub project_id: String,
    pub donor_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: DonationStatus,
    pub escrow_status: EscrowStatus,
    pub message: Option<String>,
    pub anonymous: bool,
    pub fee_covered: bool,
    pub payment_method_types: Vec<String>,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
}

impl NewDonation {
    /// Materialize into a donation row (used by stores that assign ids locally)
    pub fn into_donation(self) -> Donation {
        Donation {
            id: Uuid::new_v4(),
            project_id: self.project_id,
            donor_id: self.donor_id,
            amount: self.amount,
            status: self.status,
            escrow_status: self.escrow_status,
            message: self.message,
            anonymous: self.anonymous,
            fee_covered: self.fee_covered,
            payment_method_types: self.payment_method_types,
            stripe_session_id: self.stripe_session_id,
            stripe_payment_intent_id: self.stripe_payment_intent_id,
            created_at: Utc::now(),
        }
    }
}

/// Per-project escrow aggregate
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub project_id: String,
    pub total_held: Decimal,
    pub total_released: Decimal,
}

impl Escrow {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }
}

/// An authenticated donor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donor {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Donor {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(DonationStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
        assert_eq!(
            serde_json::to_value(EscrowStatus::Held).unwrap(),
            serde_json::json!("held")
        );
        assert_eq!(DonationStatus::Refunded.as_str(), "refunded");
    }

    #[test]
    fn test_project_from_postgrest_row() {
        let row = serde_json::json!({
            "id": "proj-1",
            "ngo_id": "ngo-9",
            "title": "Solar classroom",
            "budget": 5000,
            "amount_raised": 1250.5,
            "status": "active"
        });
        let project: Project = serde_json::from_value(row).unwrap();
        assert_eq!(project.budget, dec!(5000));
        assert_eq!(project.amount_raised, dec!(1250.5));
    }

    #[test]
    fn test_new_donation_amount_is_numeric() {
        let new = NewDonation {
            project_id: "p".into(),
            donor_id: "d".into(),
            amount: dec!(12.5),
            status: DonationStatus::Completed,
            escrow_status: EscrowStatus::Held,
            message: None,
            anonymous: false,
            fee_covered: true,
            payment_method_types: vec!["card".into()],
            stripe_session_id: None,
            stripe_payment_intent_id: None,
        };
        let value = serde_json::to_value(&new).unwrap();
        assert_eq!(value["amount"], serde_json::json!(12.5));
        assert_eq!(value["escrow_status"], serde_json::json!("held"));
    }
}
