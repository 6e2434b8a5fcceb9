use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use peerlend_core::arrears::{self, LateFeeInput};

/// Arguments for a cost-of-lateness projection
#[derive(Args)]
pub struct LateFeeArgs {
    /// The loan's fixed EMI
    #[arg(long)]
    pub emi: Decimal,

    /// The loan's own annual rate in basis points
    #[arg(long, alias = "rate")]
    pub rate_bps: u32,

    /// Whole hours past the due timestamp
    #[arg(long)]
    pub hours_late: i64,
}

pub fn run_late_fee(args: LateFeeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = LateFeeInput {
        fixed_emi: args.emi,
        annual_rate_bps: args.rate_bps,
        hours_late: args.hours_late,
    };
    let output = arrears::calculate_late_fee(&input)?;
    Ok(serde_json::to_value(output)?)
}
