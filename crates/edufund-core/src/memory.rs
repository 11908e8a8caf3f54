//! In-memory implementations (for development and tests)

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::auth::Authenticator;
use crate::error::{FundError, Result};
use crate::model::{Donation, DonationStatus, Donor, Escrow, NewDonation, Project};
use crate::store::{DonationStore, Settlement};

#[derive(Default)]
struct Tables {
    projects: HashMap<String, Project>,
    donations: Vec<Donation>,
    escrows: HashMap<String, Escrow>,
}

impl Tables {
    fn increment_funds(&mut self, project_id: &str, amount: Decimal) -> Result<()> {
        let project = self
            .projects
            .get_mut(project_id)
            .ok_or_else(|| FundError::NotFound(format!("Project {project_id}")))?;
        project.amount_raised += amount;
        Ok(())
    }

    fn hold_in_escrow(&mut self, project_id: &str, amount: Decimal) {
        self.escrows
            .entry(project_id.to_string())
            .or_insert_with(|| Escrow::new(project_id))
            .total_held += amount;
    }
}

/// In-memory donation store. All tables live behind one lock, so a
/// completed donation and its follow-ups apply together or not at all.
#[derive(Default)]
pub struct MemoryDonationStore {
    tables: RwLock<Tables>,
}

impl MemoryDonationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with projects
    pub fn with_projects(projects: impl IntoIterator<Item = Project>) -> Self {
        let tables = Tables {
            projects: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..Default::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn donations(&self) -> Vec<Donation> {
        self.tables.read().await.donations.clone()
    }

    pub async fn escrow(&self, project_id: &str) -> Option<Escrow> {
        self.tables.read().await.escrows.get(project_id).cloned()
    }
}

#[async_trait]
impl DonationStore for MemoryDonationStore {
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(self.tables.read().await.projects.get(project_id).cloned())
    }

    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation> {
        let donation = donation.into_donation();
        self.tables.write().await.donations.push(donation.clone());
        Ok(donation)
    }

    async fn increment_project_funds(&self, project_id: &str, amount: Decimal) -> Result<()> {
        self.tables.write().await.increment_funds(project_id, amount)
    }

    async fn update_escrow(&self, project_id: &str, amount: Decimal) -> Result<()> {
        self.tables.write().await.hold_in_escrow(project_id, amount);
        Ok(())
    }

    async fn set_status_by_payment_intent(
        &self,
        payment_intent_id: &str,
        status: DonationStatus,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for donation in tables
            .donations
            .iter_mut()
            .filter(|d| d.stripe_payment_intent_id.as_deref() == Some(payment_intent_id))
        {
            donation.status = status;
            changed += 1;
        }
        Ok(changed)
    }

    fn name(&self) -> &str {
        "memory"
    }

    async fn record_completed_donation(&self, donation: NewDonation) -> Result<Settlement> {
        let mut tables = self.tables.write().await;

        // Check before writing anything so a missing project leaves no trace
        if !tables.projects.contains_key(&donation.project_id) {
            return Err(FundError::InvalidRequest(format!(
                "donation references unknown project {}",
                donation.project_id
            )));
        }

        let donation = donation.into_donation();
        tables.increment_funds(&donation.project_id, donation.amount)?;
        tables.hold_in_escrow(&donation.project_id, donation.amount);
        tables.donations.push(donation.clone());

        Ok(Settlement {
            donation,
            failures: Vec::new(),
        })
    }
}

/// Static token table authenticator
#[derive(Default)]
pub struct MemoryAuthenticator {
    tokens: RwLock<HashMap<String, Donor>>,
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>, donor: Donor) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(token.into(), donor);
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

#[async_trait]
impl Authenticator for MemoryAuthenticator {
    async fn authenticate(&self, access_token: &str) -> Result<Option<Donor>> {
        Ok(self.tokens.read().await.get(access_token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EscrowStatus;
    use rust_decimal_macros::dec;

    fn completed(project_id: &str, amount: Decimal, intent: &str) -> NewDonation {
        NewDonation {
            project_id: project_id.into(),
            donor_id: "donor-1".into(),
            amount,
            status: DonationStatus::Completed,
            escrow_status: EscrowStatus::Held,
            message: Some("Keep going".into()),
            anonymous: false,
            fee_covered: false,
            payment_method_types: vec!["card".into()],
            stripe_session_id: Some("cs_test_1".into()),
            stripe_payment_intent_id: Some(intent.into()),
        }
    }

    fn store() -> MemoryDonationStore {
        MemoryDonationStore::with_projects([Project::new("proj-1", "ngo-1", "Books", dec!(1000))])
    }

    #[tokio::test]
    async fn test_record_completed_donation_applies_follow_ups() {
        let store = store();

        let settlement = store
            .record_completed_donation(completed("proj-1", dec!(40), "pi_1"))
            .await
            .unwrap();
        assert!(settlement.is_complete());

        let project = store.get_project("proj-1").await.unwrap().unwrap();
        assert_eq!(project.amount_raised, dec!(40));

        let escrow = store.escrow("proj-1").await.unwrap();
        assert_eq!(escrow.total_held, dec!(40));
        assert_eq!(escrow.total_released, Decimal::ZERO);
        assert_eq!(store.donations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_record_for_missing_project_writes_nothing() {
        let store = store();

        let result = store
            .record_completed_donation(completed("nope", dec!(40), "pi_1"))
            .await;
        assert!(matches!(result, Err(FundError::InvalidRequest(_))));
        assert!(store.donations().await.is_empty());
        assert!(store.escrow("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_set_status_by_payment_intent() {
        let store = store();
        store.insert_donation(completed("proj-1", dec!(5), "pi_a")).await.unwrap();
        store.insert_donation(completed("proj-1", dec!(6), "pi_b")).await.unwrap();

        let changed = store
            .set_status_by_payment_intent("pi_a", DonationStatus::Failed)
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let donations = store.donations().await;
        assert_eq!(donations.len(), 2);
        assert_eq!(donations[0].status, DonationStatus::Failed);
        assert_eq!(donations[1].status, DonationStatus::Completed);

        let changed = store
            .set_status_by_payment_intent("pi_missing", DonationStatus::Failed)
            .await
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[tokio::test]
    async fn test_memory_authenticator() {
        let auth = MemoryAuthenticator::with_token("tok", Donor::new("donor-1", None));
        assert_eq!(auth.authenticate("tok").await.unwrap().unwrap().id, "donor-1");
        assert!(auth.authenticate("other").await.unwrap().is_none());
    }
}
