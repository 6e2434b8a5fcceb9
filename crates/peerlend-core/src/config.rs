use chrono::Duration;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::types::{BasisPoints, Money};
use crate::LendingResult;

/// One step of the risk-tiered interest rate model. `up_to` is the inclusive
/// principal ceiling of the tier; `None` marks the open-ended final tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_to: Option<Money>,
    pub rate_bps: BasisPoints,
}

/// All tunable constants of the lending engine.
///
/// Defaults are the observed production values. Principal bounds and tier
/// boundaries are illustrative defaults, not protocol law; deployments
/// override them here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Inclusive principal window, in settlement-asset units.
    pub min_principal: Money,
    pub max_principal: Money,
    /// Inclusive term window, in whole periods.
    pub min_duration_months: u32,
    pub max_duration_months: u32,
    /// One-time charge to the borrower at confirmation, on the principal.
    pub origination_fee_bps: BasisPoints,
    /// One-time charge deducted from the principal at funding.
    pub matching_fee_bps: BasisPoints,
    /// Per-payment charge on each period's due amount (EMI plus late fee).
    pub insurance_fee_bps: BasisPoints,
    /// Flat penalty on the EMI of each period settled past due.
    pub late_penalty_bps: BasisPoints,
    /// Penalty APR = loan APR x this multiplier.
    pub overdue_rate_multiplier: u32,
    /// Fixed period length in days. Never a calendar month.
    pub period_days: i64,
    /// Principal -> annual rate step function, ascending, last tier open.
    pub rate_tiers: Vec<RateTier>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_principal: dec!(100),
            max_principal: dec!(100_000),
            min_duration_months: 1,
            max_duration_months: 36,
            origination_fee_bps: 50,
            matching_fee_bps: 10,
            insurance_fee_bps: 200,
            late_penalty_bps: 500,
            overdue_rate_multiplier: 2,
            period_days: 30,
            rate_tiers: vec![
                RateTier {
                    up_to: Some(dec!(1_000)),
                    rate_bps: 600,
                },
                RateTier {
                    up_to: Some(dec!(10_000)),
                    rate_bps: 900,
                },
                RateTier {
                    up_to: Some(dec!(50_000)),
                    rate_bps: 1800,
                },
                RateTier {
                    up_to: None,
                    rate_bps: 2250,
                },
            ],
        }
    }
}

impl LedgerConfig {
    /// The fixed payment cadence.
    pub fn period(&self) -> Duration {
        Duration::days(self.period_days)
    }

    pub fn in_principal_window(&self, amount: Money) -> bool {
        amount >= self.min_principal && amount <= self.max_principal
    }

    pub fn in_duration_window(&self, months: u32) -> bool {
        months >= self.min_duration_months && months <= self.max_duration_months
    }

    pub fn validate(&self) -> LendingResult<()> {
        if self.min_principal <= Money::ZERO || self.min_principal > self.max_principal {
            return Err(LendingError::InvalidConfig(format!(
                "principal window [{}, {}] is empty or non-positive",
                self.min_principal, self.max_principal
            )));
        }
        if self.min_duration_months == 0 || self.min_duration_months > self.max_duration_months {
            return Err(LendingError::InvalidConfig(format!(
                "duration window [{}, {}] is empty or starts at zero",
                self.min_duration_months, self.max_duration_months
            )));
        }
        if self.period_days <= 0 {
            return Err(LendingError::InvalidConfig(
                "period length must be positive".into(),
            ));
        }
        if self.rate_tiers.is_empty() {
            return Err(LendingError::InvalidConfig("no rate tiers".into()));
        }
        let mut previous: Option<Money> = None;
        for tier in &self.rate_tiers[..self.rate_tiers.len() - 1] {
            let Some(bound) = tier.up_to else {
                return Err(LendingError::InvalidConfig(
                    "only the last rate tier may be open-ended".into(),
                ));
            };
            if previous.is_some_and(|p| bound <= p) {
                return Err(LendingError::InvalidConfig(
                    "rate tier boundaries must be strictly increasing".into(),
                ));
            }
            previous = Some(bound);
        }
        match self.rate_tiers[self.rate_tiers.len() - 1].up_to {
            None => Ok(()),
            Some(_) => Err(LendingError::InvalidConfig(
                "last rate tier must be open-ended".into(),
            )),
        }
    }
}
