//! Donation Storage
//!
//! The `DonationStore` trait is the seam between the payment flow and the
//! database that owns projects, donations and the escrow ledger.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;
use crate::model::{Donation, DonationStatus, NewDonation, Project};

/// Bookkeeping step issued after a donation row is written
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    /// Increase the project's amount raised
    ProjectFunds,
    /// Move the amount into the project's held escrow balance
    EscrowLedger,
}

impl std::fmt::Display for FollowUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectFunds => write!(f, "increment_project_funds"),
            Self::EscrowLedger => write!(f, "update_escrow_on_donation"),
        }
    }
}

/// A follow-up that did not apply
#[derive(Clone, Debug, Serialize)]
pub struct FollowUpFailure {
    pub step: FollowUp,
    pub error: String,
}

/// Outcome of recording a completed donation
#[derive(Clone, Debug)]
pub struct Settlement {
    pub donation: Donation,

    /// Empty when every follow-up applied
    pub failures: Vec<FollowUpFailure>,
}

impl Settlement {
    pub const fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Storage trait for the donation flow
#[async_trait]
pub trait DonationStore: Send + Sync {
    /// Look up a project by id
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>>;

    /// Insert a donation row
    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation>;

    /// Increase a project's amount raised
    async fn increment_project_funds(&self, project_id: &str, amount: Decimal) -> Result<()>;

    /// Add an amount to a project's held escrow balance
    async fn update_escrow(&self, project_id: &str, amount: Decimal) -> Result<()>;

    /// Set the status of every donation paid through `payment_intent_id`.
    /// Returns the number of rows changed.
    async fn set_status_by_payment_intent(
        &self,
        payment_intent_id: &str,
        status: DonationStatus,
    ) -> Result<u64>;

    /// Backend name for logs and health output
    fn name(&self) -> &str;

    /// Record a completed donation and apply its follow-ups.
    ///
    /// The insert must succeed; follow-up failures are logged and reported
    /// in the settlement without undoing the insert. Stores that can apply
    /// all three writes in one transaction should override this.
    async fn record_completed_donation(&self, donation: NewDonation) -> Result<Settlement> {
        let donation = self.insert_donation(donation).await?;
        let mut failures = Vec::new();

        if let Err(e) = self
            .increment_project_funds(&donation.project_id, donation.amount)
            .await
        {
            failures.push(FollowUpFailure {
                step: FollowUp::ProjectFunds,
                error: e.to_string(),
            });
        }

        if let Err(e) = self.update_escrow(&donation.project_id, donation.amount).await {
            failures.push(FollowUpFailure {
                step: FollowUp::EscrowLedger,
                error: e.to_string(),
            });
        }

        for failure in &failures {
            tracing::error!(
                donation_id = %donation.id,
                project_id = %donation.project_id,
                amount = %donation.amount,
                step = %failure.step,
                error = %failure.error,
                "Donation recorded but follow-up failed; needs reconciliation"
            );
        }

        Ok(Settlement { donation, failures })
    }
}
