use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Annual or per-event rates expressed in integer basis points (1 bps = 0.01%).
pub type BasisPoints = u32;

/// Participant account identifier in the external settlement world.
pub type AccountId = String;

/// Sequential loan identifier, assigned once and never reused.
pub type LoanId = u64;

/// Divisor turning basis points into a plain rate.
pub const BPS_DIVISOR: Decimal = dec!(10000);

/// Fractional digits of the settlement asset.
pub const SETTLEMENT_SCALE: u32 = 18;

/// Normalize a monetary value to the settlement asset's scale.
///
/// Rounds toward zero, matching the truncating integer division the
/// settlement asset itself performs at 18 fractional digits.
pub fn to_settlement_scale(value: Decimal) -> Money {
    value.round_dp_with_strategy(SETTLEMENT_SCALE, RoundingStrategy::ToZero)
}

/// A basis-point figure as a plain multiplier (50 bps -> 0.005).
pub fn bps_rate(bps: BasisPoints) -> Decimal {
    Decimal::from(bps) / BPS_DIVISOR
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
