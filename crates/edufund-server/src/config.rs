//! Server Configuration
//!
//! Everything is read from the environment (after `.env` is loaded).

use std::str::FromStr;

use anyhow::Context;
use edufund_core::FeeSchedule;
use edufund_payments::DEFAULT_TOLERANCE_SECS;
use rust_decimal::Decimal;

/// Stripe credentials; both keys are needed for payments to be enabled
#[derive(Clone)]
pub struct StripeKeys {
    pub secret_key: String,
    pub webhook_secret: String,
}

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Public application URL, used for checkout redirects
    pub app_url: String,

    /// `None` disables the payment endpoints
    pub stripe: Option<StripeKeys>,

    pub fees: FeeSchedule,

    pub webhook_tolerance_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            app_url: "http://localhost:3000".into(),
            stripe: None,
            fees: FeeSchedule::standard(),
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let stripe = match (lookup("STRIPE_SECRET_KEY"), lookup("STRIPE_WEBHOOK_SECRET")) {
            (Some(secret_key), Some(webhook_secret)) => Some(StripeKeys {
                secret_key,
                webhook_secret,
            }),
            _ => None,
        };

        let percent = lookup("STRIPE_FEE_PERCENT")
            .map(|v| Decimal::from_str(&v).context("STRIPE_FEE_PERCENT must be a decimal fraction"))
            .transpose()?
            .unwrap_or(defaults.fees.percent);
        let fixed_cents = lookup("STRIPE_FEE_FIXED_CENTS")
            .map(|v| v.parse::<i64>().context("STRIPE_FEE_FIXED_CENTS must be an integer"))
            .transpose()?
            .unwrap_or(defaults.fees.fixed_cents);
        let fees = FeeSchedule::new(percent, fixed_cents)?;

        let webhook_tolerance_secs = lookup("WEBHOOK_TOLERANCE_SECS")
            .map(|v| v.parse::<i64>().context("WEBHOOK_TOLERANCE_SECS must be an integer"))
            .transpose()?
            .unwrap_or(defaults.webhook_tolerance_secs);

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            app_url: lookup("NEXT_PUBLIC_APP_URL").unwrap_or(defaults.app_url),
            stripe,
            fees,
            webhook_tolerance_secs,
        })
    }
}
