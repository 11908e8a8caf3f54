//! Supabase Store
//!
//! Implementation of `DonationStore` and `Authenticator` over the Supabase
//! REST (PostgREST), RPC and auth endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edufund_core::{
    Authenticator, Donation, DonationStatus, DonationStore, Donor, FundError, NewDonation,
    Project, Result,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PROJECT_COLUMNS: &str = "id,ngo_id,title,budget,amount_raised,status";
const INCREMENT_FUNDS_RPC: &str = "increment_project_funds";
const ESCROW_RPC: &str = "update_escrow_on_donation";

/// Supabase connection configuration
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`
    pub url: String,

    /// Service-role key for table and RPC access
    pub service_key: String,

    /// Key sent alongside user tokens to the auth endpoint
    pub anon_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        let service_key = service_key.into();
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: service_key.clone(),
            service_key,
            timeout_secs: 10,
        }
    }

    /// Read `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY` and optionally
    /// `SUPABASE_ANON_KEY`. Returns `None` when no URL is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(url) = std::env::var("SUPABASE_URL") else {
            return Ok(None);
        };
        let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| FundError::Config("SUPABASE_SERVICE_ROLE_KEY not set".into()))?;

        let mut config = Self::new(url, service_key);
        if let Ok(anon_key) = std::env::var("SUPABASE_ANON_KEY") {
            config.anon_key = anon_key;
        }
        Ok(Some(config))
    }
}

#[derive(Serialize)]
struct AmountArgs<'a> {
    project_id: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Serialize)]
struct StatusPatch {
    status: DonationStatus,
}

/// Columns echoed back by an insert
#[derive(Deserialize)]
struct InsertedRow {
    id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Supabase client
pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FundError::Config(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Create from environment variables, `None` when Supabase is not configured
    pub fn from_env() -> Result<Option<Self>> {
        SupabaseConfig::from_env()?.map(Self::new).transpose()
    }

    pub const fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// Check that the REST endpoint answers
    pub async fn health_check(&self) -> bool {
        let request = self
            .service(self.http.get(self.rest_url("projects")))
            .query(&[("select", "id"), ("limit", "1")]);

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Supabase health check failed: {}", e);
                false
            }
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.config.url)
    }

    /// Authenticate a request with the service-role key
    fn service(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| FundError::Upstream(format!("{what}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(FundError::Upstream(format!("{what}: HTTP {status}: {body}")))
    }

    async fn json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| FundError::Upstream(format!("{what}: invalid response: {e}")))
    }

    async fn call_amount_rpc(&self, function: &str, project_id: &str, amount: Decimal) -> Result<()> {
        let request = self
            .service(self.http.post(self.rpc_url(function)))
            .json(&AmountArgs { project_id, amount });
        Self::send(request, function).await?;
        tracing::debug!(rpc = function, project_id, amount = %amount, "RPC applied");
        Ok(())
    }
}

#[async_trait]
impl DonationStore for SupabaseClient {
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let request = self
            .service(self.http.get(self.rest_url("projects")))
            .query(&[("id", format!("eq.{project_id}").as_str()), ("select", PROJECT_COLUMNS)]);

        let response = Self::send(request, "get project").await?;
        let rows: Vec<Project> = Self::json(response, "get project").await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation> {
        let request = self
            .service(self.http.post(self.rest_url("donations")))
            .query(&[("select", "id,created_at")])
            .header("Prefer", "return=representation")
            .json(&donation);

        let response = Self::send(request, "insert donation").await?;

        // The row is committed once PostgREST answers 2xx. An unreadable echo
        // must not turn into an error, or the processor retries and inserts again.
        let echoed = response
            .json::<Vec<InsertedRow>>()
            .await
            .map_err(|e| e.to_string())
            .and_then(|rows| rows.into_iter().next().ok_or_else(|| "no row returned".to_string()));

        let mut recorded = donation.into_donation();
        match echoed {
            Ok(row) => {
                recorded.id = row.id;
                recorded.created_at = row.created_at;
            }
            Err(reason) => {
                tracing::warn!(
                    project_id = %recorded.project_id,
                    session_id = ?recorded.stripe_session_id,
                    reason = %reason,
                    "Donation inserted but row could not be read back; using local id"
                );
            }
        }
        Ok(recorded)
    }

    async fn increment_project_funds(&self, project_id: &str, amount: Decimal) -> Result<()> {
        self.call_amount_rpc(INCREMENT_FUNDS_RPC, project_id, amount).await
    }

    async fn update_escrow(&self, project_id: &str, amount: Decimal) -> Result<()> {
        self.call_amount_rpc(ESCROW_RPC, project_id, amount).await
    }

    async fn set_status_by_payment_intent(
        &self,
        payment_intent_id: &str,
        status: DonationStatus,
    ) -> Result<u64> {
        let request = self
            .service(self.http.patch(self.rest_url("donations")))
            .query(&[
                ("stripe_payment_intent_id", format!("eq.{payment_intent_id}").as_str()),
                ("select", "id"),
            ])
            .header("Prefer", "return=representation")
            .json(&StatusPatch { status });

        let response = Self::send(request, "update donation status").await?;
        let rows: Vec<serde_json::Value> = Self::json(response, "update donation status").await?;
        Ok(u64::try_from(rows.len()).unwrap_or(u64::MAX))
    }

    fn name(&self) -> &str {
        "supabase"
    }
}

#[async_trait]
impl Authenticator for SupabaseClient {
    async fn authenticate(&self, access_token: &str) -> Result<Option<Donor>> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.config.url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| FundError::Upstream(format!("auth: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => {
                return Err(FundError::Upstream(format!("auth: HTTP {status}")));
            }
            _ => {}
        }

        let user: AuthUser = Self::json(response, "auth").await?;
        Ok(Some(Donor::new(user.id, user.email)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edufund_core::EscrowStatus;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn new_donation() -> NewDonation {
        NewDonation {
            project_id: "proj-1".into(),
            donor_id: "donor-1".into(),
            amount: dec!(10),
            status: DonationStatus::Completed,
            escrow_status: EscrowStatus::Held,
            message: None,
            anonymous: false,
            fee_covered: false,
            payment_method_types: vec!["card".into()],
            stripe_session_id: Some("cs_1".into()),
            stripe_payment_intent_id: Some("pi_1".into()),
        }
    }

    fn client(server: &mockito::ServerGuard) -> SupabaseClient {
        let mut config = SupabaseConfig::new(server.url(), "service-key");
        config.anon_key = "anon-key".into();
        SupabaseClient::new(config).unwrap()
    }

    #[test]
    fn test_config_trims_url_and_hides_keys() {
        let config = SupabaseConfig::new("https://abcd.supabase.co/", "secret-service-key");
        assert_eq!(config.url, "https://abcd.supabase.co");
        assert_eq!(config.anon_key, "secret-service-key");
        assert!(!format!("{config:?}").contains("secret-service-key"));
    }

    #[tokio::test]
    async fn test_get_project() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "eq.proj-1".into()),
                Matcher::UrlEncoded("select".into(), PROJECT_COLUMNS.into()),
            ]))
            .match_header("apikey", "service-key")
            .match_header("authorization", "Bearer service-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id":"proj-1","ngo_id":"ngo-1","title":"Books","budget":800,"amount_raised":120.5,"status":"active"}]"#,
            )
            .create_async()
            .await;

        let project = client(&server).get_project("proj-1").await.unwrap().unwrap();
        assert_eq!(project.ngo_id, "ngo-1");
        assert_eq!(project.amount_raised, dec!(120.5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_missing_project() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/projects")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert!(client(&server).get_project("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_donation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/donations")
            .match_query(Matcher::UrlEncoded("select".into(), "id,created_at".into()))
            .match_header("prefer", "return=representation")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "project_id": "proj-1",
                "amount": 10.0,
                "status": "completed",
                "escrow_status": "held"
            })))
            .with_status(201)
            .with_body(
                r#"[{"id":"2f0c7a4e-0c7f-4a43-9d0c-8e0b6a3b8f11","created_at":"2026-03-01T12:00:00.123456+00:00"}]"#,
            )
            .create_async()
            .await;

        let donation = client(&server)
            .insert_donation(new_donation())
            .await
            .unwrap();

        assert_eq!(donation.id.to_string(), "2f0c7a4e-0c7f-4a43-9d0c-8e0b6a3b8f11");
        assert_eq!(donation.status, DonationStatus::Completed);
        assert_eq!(donation.escrow_status, EscrowStatus::Held);
        assert_eq!(donation.amount, dec!(10));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_insert_with_unreadable_echo_still_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/donations")
            .match_query(Matcher::Any)
            .with_status(201)
            .with_body(
                r#"[{"id":"row-1","created_at":null,"anonymous":null,"payment_method_types":null}]"#,
            )
            .create_async()
            .await;

        let donation = client(&server)
            .insert_donation(new_donation())
            .await
            .unwrap();

        assert_eq!(donation.project_id, "proj-1");
        assert_eq!(donation.stripe_session_id.as_deref(), Some("cs_1"));
        assert_eq!(donation.payment_method_types, vec!["card".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_insert_rejected_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/donations")
            .match_query(Matcher::Any)
            .with_status(409)
            .with_body(r#"{"message":"duplicate key"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .insert_donation(new_donation())
            .await
            .unwrap_err();
        assert!(matches!(err, FundError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_rpc_calls() {
        let mut server = mockito::Server::new_async().await;
        let funds = server
            .mock("POST", "/rest/v1/rpc/increment_project_funds")
            .match_body(Matcher::Json(serde_json::json!({"project_id": "proj-1", "amount": 12.5})))
            .with_status(204)
            .create_async()
            .await;
        let escrow = server
            .mock("POST", "/rest/v1/rpc/update_escrow_on_donation")
            .match_body(Matcher::Json(serde_json::json!({"project_id": "proj-1", "amount": 12.5})))
            .with_status(500)
            .with_body(r#"{"message":"deadlock detected"}"#)
            .create_async()
            .await;

        let client = client(&server);
        client.increment_project_funds("proj-1", dec!(12.5)).await.unwrap();
        let err = client.update_escrow("proj-1", dec!(12.5)).await.unwrap_err();
        assert!(matches!(err, FundError::Upstream(ref msg) if msg.contains("deadlock")));

        funds.assert_async().await;
        escrow.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_status_counts_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/rest/v1/donations")
            .match_query(Matcher::UrlEncoded(
                "stripe_payment_intent_id".into(),
                "eq.pi_9".into(),
            ))
            .match_body(Matcher::Json(serde_json::json!({"status": "failed"})))
            .with_status(200)
            .with_body(r#"[{"id":"a"},{"id":"b"}]"#)
            .create_async()
            .await;

        let updated = client(&server)
            .set_status_by_payment_intent("pi_9", DonationStatus::Failed)
            .await
            .unwrap();
        assert_eq!(updated, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer good-token")
            .with_status(200)
            .with_body(r#"{"id":"user-1","email":"donor@example.com","role":"authenticated"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/auth/v1/user")
            .match_header("authorization", "Bearer expired-token")
            .with_status(401)
            .with_body(r#"{"msg":"invalid JWT"}"#)
            .create_async()
            .await;

        let client = client(&server);
        let donor = client.authenticate("good-token").await.unwrap().unwrap();
        assert_eq!(donor.id, "user-1");
        assert_eq!(donor.email.as_deref(), Some("donor@example.com"));

        assert!(client.authenticate("expired-token").await.unwrap().is_none());
    }
}
