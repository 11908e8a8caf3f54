//! Donation Checkout
//!
//! Turns a donor's request into a hosted checkout session:
//! validate → authenticate → load project → apply fees → create session.

use std::sync::Arc;

use edufund_core::{validate_amount, Authenticator, DonationStore, FeeSchedule, FundError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::checkout::{CheckoutGateway, HostedSession, SessionRequest};
use crate::error::Result;
use crate::metadata::DonationMetadata;

/// Longest message that fits in a Stripe metadata value
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Donation request as submitted by the donate form
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    pub project_id: String,

    /// Amount in currency units
    pub amount: Decimal,

    #[serde(default)]
    pub message: Option<String>,

    /// Gross the charge up so the project nets the full amount
    #[serde(default)]
    pub cover_fees: bool,

    #[serde(default)]
    pub anonymous: bool,
}

impl DonationRequest {
    /// Pure input checks; runs before any remote call
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(FundError::InvalidRequest("projectId is required".into()).into());
        }
        validate_amount(self.amount)?;
        if let Some(message) = &self.message {
            if message.chars().count() > MAX_MESSAGE_CHARS {
                return Err(FundError::InvalidRequest(format!(
                    "message must be at most {MAX_MESSAGE_CHARS} characters"
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Creates checkout sessions for donations
pub struct CheckoutService {
    gateway: Arc<dyn CheckoutGateway>,
    store: Arc<dyn DonationStore>,
    auth: Arc<dyn Authenticator>,
    fees: FeeSchedule,
    app_url: String,
}

impl CheckoutService {
    pub fn new(
        gateway: Arc<dyn CheckoutGateway>,
        store: Arc<dyn DonationStore>,
        auth: Arc<dyn Authenticator>,
        fees: FeeSchedule,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            auth,
            fees,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Start a hosted checkout for `request` on behalf of the bearer of
    /// `access_token`
    pub async fn initiate(
        &self,
        access_token: Option<&str>,
        request: DonationRequest,
    ) -> Result<HostedSession> {
        request.validate()?;

        let token = access_token
            .ok_or_else(|| FundError::Unauthorized("missing access token".into()))?;
        let donor = self
            .auth
            .authenticate(token)
            .await?
            .ok_or_else(|| FundError::Unauthorized("access token rejected".into()))?;

        let project = self
            .store
            .get_project(&request.project_id)
            .await?
            .ok_or_else(|| FundError::NotFound("Project".into()))?;

        let charge = self.fees.charge_for(request.amount, request.cover_fees)?;

        let session_request = SessionRequest {
            product_name: format!("Donation to {}", project.title),
            unit_amount_cents: charge.total_cents,
            customer_email: donor.email.clone(),
            client_reference_id: donor.id.clone(),
            success_url: format!(
                "{}/donate/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.app_url
            ),
            cancel_url: format!("{}/projects/{}", self.app_url, project.id),
            metadata: DonationMetadata {
                project_id: project.id.clone(),
                donor_id: donor.id.clone(),
                ngo_id: project.ngo_id.clone(),
                message: request.message.filter(|m| !m.trim().is_empty()),
                cover_fees: request.cover_fees,
                anonymous: request.anonymous,
                // What the project nets, at the precision actually charged
                original_amount: Decimal::new(charge.donation_cents, 2),
                fee_cents: charge.fee_cents,
            },
        };

        let session = self.gateway.create_session(&session_request).await?;

        tracing::info!(
            session_id = %session.id,
            project_id = %project.id,
            donor_id = %donor.id,
            unit_amount = charge.total_cents,
            cover_fees = request.cover_fees,
            "Created donation checkout session"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edufund_core::{Donor, MemoryAuthenticator, MemoryDonationStore, Project};
    use rust_decimal_macros::dec;

    use crate::checkout::MockGateway;
    use crate::error::PaymentError;

    const TOKEN: &str = "token-donor-1";

    fn setup_with(gateway: Arc<MockGateway>) -> CheckoutService {
        let store = Arc::new(MemoryDonationStore::with_projects([Project::new(
            "proj-1",
            "ngo-7",
            "Rural Science Lab",
            dec!(2000),
        )]));
        let auth = Arc::new(MemoryAuthenticator::with_token(
            TOKEN,
            Donor::new("donor-1", Some("donor@example.com".into())),
        ));
        CheckoutService::new(
            gateway,
            store,
            auth,
            FeeSchedule::standard(),
            "https://edufund.example/",
        )
    }

    fn request(amount: Decimal, cover_fees: bool) -> DonationRequest {
        DonationRequest {
            project_id: "proj-1".into(),
            amount,
            message: Some("Good luck!".into()),
            cover_fees,
            anonymous: true,
        }
    }

    #[tokio::test]
    async fn test_plain_donation_charges_exact_cents() {
        let gateway = Arc::new(MockGateway::new());
        let service = setup_with(gateway.clone());

        let session = service
            .initiate(Some(TOKEN), request(dec!(25.50), false))
            .await
            .unwrap();
        assert!(session.url.contains(&session.id));

        let sent = &gateway.requests().await[0];
        assert_eq!(sent.unit_amount_cents, 2550);
        assert_eq!(sent.metadata.fee_cents, 0);
        assert_eq!(sent.metadata.original_amount, dec!(25.50));
    }

    #[tokio::test]
    async fn test_covered_fees_gross_up() {
        let gateway = Arc::new(MockGateway::new());
        let service = setup_with(gateway.clone());

        service
            .initiate(Some(TOKEN), request(dec!(10.00), true))
            .await
            .unwrap();

        let sent = &gateway.requests().await[0];
        assert_eq!(sent.unit_amount_cents, 1064);
        assert_eq!(sent.metadata.fee_cents, 64);
        assert_eq!(sent.metadata.ngo_id, "ngo-7");
        assert_eq!(sent.metadata.donor_id, "donor-1");
        assert!(sent.metadata.anonymous);
        assert_eq!(sent.customer_email.as_deref(), Some("donor@example.com"));
        assert_eq!(
            sent.success_url,
            "https://edufund.example/donate/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(sent.cancel_url, "https://edufund.example/projects/proj-1");
    }

    #[tokio::test]
    async fn test_sub_cent_amount_rounds_to_charged_cents() {
        let gateway = Arc::new(MockGateway::new());
        let service = setup_with(gateway.clone());

        service
            .initiate(Some(TOKEN), request(dec!(10.555), false))
            .await
            .unwrap();

        let sent = &gateway.requests().await[0];
        assert_eq!(sent.unit_amount_cents, 1056);
        assert_eq!(sent.metadata.original_amount, dec!(10.56));
    }

    #[tokio::test]
    async fn test_covered_total_over_ceiling_rejected_before_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let service = setup_with(gateway.clone());

        let err = service
            .initiate(Some(TOKEN), request(dec!(999999.99), true))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Fund(FundError::InvalidRequest(_))));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_small_amount_rejected_before_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let service = setup_with(gateway.clone());

        let err = service
            .initiate(Some(TOKEN), request(dec!(0.50), false))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Fund(FundError::InvalidRequest(_))));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_never_reaches_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let service = setup_with(gateway.clone());

        let missing = service.initiate(None, request(dec!(10), false)).await;
        assert!(matches!(missing, Err(PaymentError::Fund(FundError::Unauthorized(_)))));

        let rejected = service
            .initiate(Some("stolen-token"), request(dec!(10), false))
            .await;
        assert!(matches!(rejected, Err(PaymentError::Fund(FundError::Unauthorized(_)))));

        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_project_not_found() {
        let gateway = Arc::new(MockGateway::new());
        let service = setup_with(gateway.clone());

        let mut req = request(dec!(10), false);
        req.project_id = "proj-404".into();
        let err = service.initiate(Some(TOKEN), req).await.unwrap_err();
        assert!(matches!(err, PaymentError::Fund(FundError::NotFound(_))));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_retryable_stripe_error() {
        let service = setup_with(Arc::new(MockGateway::failing()));
        let err = service
            .initiate(Some(TOKEN), request(dec!(10), false))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Stripe(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_request_wire_format() {
        let req: DonationRequest = serde_json::from_value(serde_json::json!({
            "projectId": "proj-1",
            "amount": 15,
            "coverFees": true
        }))
        .unwrap();
        assert_eq!(req.amount, dec!(15));
        assert!(req.cover_fees);
        assert!(!req.anonymous);
        assert!(req.message.is_none());
    }

    #[test]
    fn test_long_message_rejected() {
        let mut req = request(dec!(10), false);
        req.message = Some("x".repeat(MAX_MESSAGE_CHARS + 1));
        assert!(req.validate().is_err());
    }
}
