//! Fixed-installment (EMI) amortization.
//!
//! The EMI is computed once when a loan's terms are fixed and never again:
//! every regular installment over the life of the loan is identical. All math
//! uses `rust_decimal::Decimal` at the settlement asset's 18-digit scale and
//! is reproducible bit-for-bit across invocations. No floating point.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::LedgerConfig;
use crate::error::LendingError;
use crate::rates;
use crate::types::{
    bps_rate, to_settlement_scale, with_metadata, BasisPoints, ComputationOutput, Money,
    BPS_DIVISOR,
};
use crate::LendingResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a standalone amortization schedule computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    /// Annual rate in basis points. Derived from the rate tiers when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_rate_bps: Option<BasisPoints>,
    pub months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub fixed_emi: Money,
    pub annual_rate_bps: BasisPoints,
    pub periods: Vec<AmortizationPeriod>,
    pub total_interest: Money,
    pub total_paid: Money,
}

/// One row of the declining-balance split of the fixed installment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationPeriod {
    pub period: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The fixed periodic installment for a principal/rate/term triple.
///
/// `emi = P * r * (1+r)^n / ((1+r)^n - 1)` with `r` the monthly rate
/// `annual_rate_bps / (12 * 10_000)`. A zero rate degenerates to straight-line
/// `P / n`; the formula never divides by zero.
pub fn fixed_emi(
    config: &LedgerConfig,
    principal: Money,
    annual_rate_bps: BasisPoints,
    months: u32,
) -> LendingResult<Money> {
    validate_terms(config, principal, months)?;

    if annual_rate_bps == 0 {
        return Ok(to_settlement_scale(principal / Decimal::from(months)));
    }

    let monthly_rate = Decimal::from(annual_rate_bps) / (MONTHS_PER_YEAR * BPS_DIVISOR);
    let growth = compound(Decimal::ONE + monthly_rate, months);
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        // Unreachable for a positive rate, kept so the formula is total.
        return Ok(to_settlement_scale(principal / Decimal::from(months)));
    }

    Ok(to_settlement_scale(
        principal * monthly_rate * growth / denominator,
    ))
}

/// Full declining-balance schedule for the fixed installment.
///
/// Interest accrues on the outstanding balance at the monthly rate; the
/// remainder of each installment retires principal. The final period's
/// principal is capped to the remaining balance so the schedule lands on
/// exactly zero.
pub fn schedule(
    config: &LedgerConfig,
    principal: Money,
    annual_rate_bps: BasisPoints,
    months: u32,
) -> LendingResult<Vec<AmortizationPeriod>> {
    let emi = fixed_emi(config, principal, annual_rate_bps, months)?;
    let monthly_rate = bps_rate(annual_rate_bps) / MONTHS_PER_YEAR;

    let mut periods = Vec::with_capacity(months as usize);
    let mut balance = principal;
    for period in 1..=months {
        let interest = to_settlement_scale(balance * monthly_rate);
        let mut principal_part = to_settlement_scale(emi - interest);
        if period == months || principal_part > balance {
            principal_part = balance;
        }
        balance -= principal_part;
        periods.push(AmortizationPeriod {
            period,
            payment: interest + principal_part,
            interest,
            principal: principal_part,
            balance,
        });
        if balance.is_zero() {
            break;
        }
    }
    Ok(periods)
}

/// Schedule computation with the standard output envelope.
///
/// Rate defaults to the configured tier model when not supplied, mirroring
/// what loan confirmation does.
pub fn calculate_schedule(
    input: &ScheduleInput,
) -> LendingResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let config = LedgerConfig::default();

    let annual_rate_bps = input
        .annual_rate_bps
        .unwrap_or_else(|| rates::annual_rate_bps(&config, input.principal));
    let fixed = fixed_emi(&config, input.principal, annual_rate_bps, input.months)?;
    let periods = schedule(&config, input.principal, annual_rate_bps, input.months)?;

    let total_interest: Money = periods.iter().map(|p| p.interest).sum();
    let total_paid: Money = periods.iter().map(|p| p.payment).sum();

    let output = ScheduleOutput {
        fixed_emi: fixed,
        annual_rate_bps,
        periods,
        total_interest,
        total_paid,
    };

    Ok(with_metadata(
        "Fixed-installment (EMI) amortization, declining-balance interest split",
        input,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        output,
    ))
}

fn validate_terms(config: &LedgerConfig, principal: Money, months: u32) -> LendingResult<()> {
    if !config.in_principal_window(principal) {
        return Err(LendingError::InvalidAmount {
            amount: principal,
            min: config.min_principal,
            max: config.max_principal,
        });
    }
    if !config.in_duration_window(months) {
        return Err(LendingError::InvalidDuration {
            months,
            min: config.min_duration_months,
            max: config.max_duration_months,
        });
    }
    Ok(())
}

/// `base^n` by repeated multiplication. Deterministic for every input, unlike
/// a log/exp round-trip; `n` is bounded by the duration window.
fn compound(base: Decimal, n: u32) -> Decimal {
    let mut acc = Decimal::ONE;
    for _ in 0..n {
        acc *= base;
    }
    acc
}
