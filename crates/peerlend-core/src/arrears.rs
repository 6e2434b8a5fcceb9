//! Late-penalty and overdue-interest accrual.
//!
//! Credit-card-style arrears: a flat penalty on the missed installment plus
//! hourly prorated interest at double the loan's own rate on the penalized
//! debt. Each missed period is assessed independently from its own lateness;
//! fees accumulate across periods but never feed back into a later period's
//! base.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::LedgerConfig;
use crate::types::{
    bps_rate, to_settlement_scale, with_metadata, BasisPoints, ComputationOutput, Money,
    BPS_DIVISOR,
};
use crate::LendingResult;

const HOURS_PER_YEAR: Decimal = dec!(8760);

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Fee components for one period settled past due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateFeeBreakdown {
    /// Flat percentage of the missed EMI, independent of lateness duration.
    pub late_penalty: Money,
    /// Hourly prorated penalty-rate interest on EMI + penalty.
    pub overdue_interest: Money,
    pub total: Money,
}

impl LateFeeBreakdown {
    pub fn zero() -> Self {
        Self {
            late_penalty: Money::ZERO,
            overdue_interest: Money::ZERO,
            total: Money::ZERO,
        }
    }
}

/// Input for a standalone cost-of-lateness projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateFeeInput {
    pub fixed_emi: Money,
    /// The loan's own annual rate; the overdue rate is a multiple of it.
    pub annual_rate_bps: BasisPoints,
    /// Whole hours past the due timestamp.
    pub hours_late: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateFeeOutput {
    pub breakdown: LateFeeBreakdown,
    /// EMI plus the late fee: what the period now costs before insurance.
    pub total_due: Money,
    pub insurance_fee: Money,
    pub grand_total: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Late fee for a single period settled `hours_late` whole hours past due.
///
/// `late_penalty = emi * late_penalty_bps / 10_000`
/// `overdue_interest = (emi + late_penalty) * rate_bps * multiplier * hours / (10_000 * 8_760)`
///
/// Zero hours is legal: a payment seconds past due owes the flat penalty and
/// no overdue interest yet.
pub fn late_fee(
    config: &LedgerConfig,
    fixed_emi: Money,
    loan_rate_bps: BasisPoints,
    hours_late: i64,
) -> LateFeeBreakdown {
    let late_penalty = to_settlement_scale(fixed_emi * bps_rate(config.late_penalty_bps));
    let base_debt = fixed_emi + late_penalty;
    let overdue_rate_bps = Decimal::from(loan_rate_bps) * Decimal::from(config.overdue_rate_multiplier);
    let overdue_interest = to_settlement_scale(
        base_debt * overdue_rate_bps * Decimal::from(hours_late.max(0))
            / (BPS_DIVISOR * HOURS_PER_YEAR),
    );
    LateFeeBreakdown {
        late_penalty,
        overdue_interest,
        total: late_penalty + overdue_interest,
    }
}

/// Cost-of-lateness projection with the standard output envelope, including
/// the insurance charge the payment would carry.
pub fn calculate_late_fee(input: &LateFeeInput) -> LendingResult<ComputationOutput<LateFeeOutput>> {
    let start = Instant::now();
    let config = LedgerConfig::default();

    let breakdown = late_fee(&config, input.fixed_emi, input.annual_rate_bps, input.hours_late);
    let total_due = input.fixed_emi + breakdown.total;
    let insurance_fee = to_settlement_scale(total_due * bps_rate(config.insurance_fee_bps));
    let output = LateFeeOutput {
        breakdown,
        total_due,
        insurance_fee,
        grand_total: total_due + insurance_fee,
    };

    Ok(with_metadata(
        "Flat late penalty plus hourly prorated overdue interest at 2x the loan rate",
        input,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        output,
    ))
}
