//! Processor Fee Arithmetic
//!
//! Converts a donation amount into the amount charged by the processor,
//! optionally grossed up so the project receives the full donation after
//! the percentage + fixed fee is deducted.
//!
//! ```text
//! cover_fees = false   total = round(amount × 100)
//! cover_fees = true    total = round((amount × 100 + fixed) / (1 − percent))
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FundError, Result};

/// Smallest accepted donation, in currency units
pub const MIN_DONATION: Decimal = dec!(1);

/// Largest donation accepted before fees
pub const MAX_DONATION: Decimal = dec!(999999.99);

/// Largest USD charge the processor accepts, in cents
pub const MAX_CHARGE_CENTS: i64 = 99_999_999;

/// Percentage + fixed processor fee
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fraction of the gross charge (0.032 = 3.2%)
    pub percent: Decimal,

    /// Flat fee per charge, in cents
    pub fixed_cents: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl FeeSchedule {
    /// Card fee model: 2.9% + 30¢ with a 0.3 point buffer for international cards
    pub const fn standard() -> Self {
        Self {
            percent: dec!(0.032),
            fixed_cents: 30,
        }
    }

    pub fn new(percent: Decimal, fixed_cents: i64) -> Result<Self> {
        if percent < Decimal::ZERO || percent >= Decimal::ONE {
            return Err(FundError::Config(format!(
                "fee percent must be in [0, 1), got {percent}"
            )));
        }
        if fixed_cents < 0 {
            return Err(FundError::Config(format!(
                "fixed fee must not be negative, got {fixed_cents}"
            )));
        }
        Ok(Self {
            percent,
            fixed_cents,
        })
    }

    /// Validate `amount`, then price it
    pub fn quote(&self, amount: Decimal, cover_fees: bool) -> Result<FeeBreakdown> {
        validate_amount(amount)?;
        self.charge_for(amount, cover_fees)
    }

    /// Compute what the payer is charged for `amount` currency units
    pub fn charge_for(&self, amount: Decimal, cover_fees: bool) -> Result<FeeBreakdown> {
        let donation_cents = round_cents(amount * Decimal::ONE_HUNDRED)?;

        let total_cents = if cover_fees {
            let gross = (Decimal::from(donation_cents) + Decimal::from(self.fixed_cents))
                / (Decimal::ONE - self.percent);
            round_cents(gross)?
        } else {
            donation_cents
        };

        if total_cents > MAX_CHARGE_CENTS {
            return Err(FundError::InvalidRequest(format!(
                "charge of {total_cents} cents exceeds the {MAX_CHARGE_CENTS} cent limit"
            )));
        }

        Ok(FeeBreakdown {
            donation_cents,
            fee_cents: total_cents - donation_cents,
            total_cents,
        })
    }
}

/// Result of applying a fee schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    /// What the project should receive
    pub donation_cents: i64,

    /// What the donor pays on top (zero unless fees are covered)
    pub fee_cents: i64,

    /// Unit amount sent to the processor
    pub total_cents: i64,
}

/// Validate a donation amount in currency units.
///
/// Sub-cent precision is accepted; `charge_for` rounds to whole cents.
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount < MIN_DONATION {
        return Err(FundError::InvalidRequest(format!(
            "amount must be at least {MIN_DONATION}"
        )));
    }
    if amount > MAX_DONATION {
        return Err(FundError::InvalidRequest(format!(
            "amount must not exceed {MAX_DONATION}"
        )));
    }
    Ok(())
}

fn round_cents(value: Decimal) -> Result<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| FundError::InvalidRequest(format!("amount out of range: {value}")))
}
