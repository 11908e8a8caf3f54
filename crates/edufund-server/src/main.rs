//! EduFund Connect HTTP Server
//!
//! Axum-based server for donation checkout and Stripe webhooks.
//!
//! Every client (Stripe, Supabase) is constructed once here and passed to
//! the handlers through `AppState`.

mod config;
mod error;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edufund_core::{Authenticator, DonationStore, MemoryAuthenticator, MemoryDonationStore};
use edufund_payments::{CheckoutService, StripeClient, WebhookProcessor, WebhookVerifier};
use edufund_supabase::SupabaseClient;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Initialize storage and auth
    let (store, auth): (Arc<dyn DonationStore>, Arc<dyn Authenticator>) =
        match SupabaseClient::from_env()? {
            Some(client) => {
                let client = Arc::new(client);
                if client.health_check().await {
                    tracing::info!("✓ Connected to Supabase at {}", client.config().url);
                } else {
                    tracing::warn!("⚠ Supabase not reachable at {}", client.config().url);
                }
                let store: Arc<dyn DonationStore> = client.clone();
                let auth: Arc<dyn Authenticator> = client;
                (store, auth)
            }
            None => {
                tracing::warn!("⚠ Supabase not configured - using in-memory store");
                tracing::warn!("  Set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY in .env");
                let store: Arc<dyn DonationStore> = Arc::new(MemoryDonationStore::new());
                let auth: Arc<dyn Authenticator> = Arc::new(MemoryAuthenticator::new());
                (store, auth)
            }
        };

    // Initialize payments
    let (checkout, webhooks) = match &config.stripe {
        Some(keys) => {
            tracing::info!("✓ Stripe configured");
            let checkout = CheckoutService::new(
                Arc::new(StripeClient::new(&keys.secret_key)),
                store.clone(),
                auth,
                config.fees,
                config.app_url.clone(),
            );
            let verifier = WebhookVerifier::new(keys.webhook_secret.clone())
                .with_tolerance(config.webhook_tolerance_secs);
            let webhooks = WebhookProcessor::new(verifier, store.clone());
            (Some(Arc::new(checkout)), Some(Arc::new(webhooks)))
        }
        None => {
            tracing::warn!("⚠ Stripe not configured - payments disabled");
            tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET in .env");
            (None, None)
        }
    };

    tracing::info!(
        percent = %config.fees.percent,
        fixed_cents = config.fees.fixed_cents,
        "Fee schedule"
    );

    // Build application state
    let state = AppState {
        checkout,
        webhooks,
        store,
        fees: config.fees,
    };

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 EduFund Connect server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  POST /api/checkout         - Create donation checkout");
    tracing::info!("  GET  /api/fees/quote       - Price a donation");
    tracing::info!("  POST /api/webhooks/stripe  - Stripe webhook");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
