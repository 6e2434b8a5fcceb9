use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use peerlend_core::amortization::{self, ScheduleInput};

/// Arguments for a fixed EMI quote
#[derive(Args)]
pub struct EmiArgs {
    /// Principal in settlement-asset units
    #[arg(long)]
    pub principal: Decimal,

    /// Annual rate in basis points; derived from the rate tiers when omitted
    #[arg(long, alias = "rate")]
    pub rate_bps: Option<u32>,

    /// Term in whole months
    #[arg(long)]
    pub months: u32,
}

/// Arguments for a full amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Principal in settlement-asset units
    #[arg(long)]
    pub principal: Decimal,

    /// Annual rate in basis points; derived from the rate tiers when omitted
    #[arg(long, alias = "rate")]
    pub rate_bps: Option<u32>,

    /// Term in whole months
    #[arg(long)]
    pub months: u32,
}

pub fn run_emi(args: EmiArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = ScheduleInput {
        principal: args.principal,
        annual_rate_bps: args.rate_bps,
        months: args.months,
    };
    let output = amortization::calculate_schedule(&input)?;

    // summary view: the schedule command prints the per-period rows
    Ok(serde_json::json!({
        "result": {
            "fixed_emi": output.result.fixed_emi,
            "annual_rate_bps": output.result.annual_rate_bps,
            "total_interest": output.result.total_interest,
            "total_paid": output.result.total_paid,
        },
        "methodology": output.methodology,
        "warnings": output.warnings,
        "metadata": serde_json::to_value(&output.metadata)?,
    }))
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = ScheduleInput {
        principal: args.principal,
        annual_rate_bps: args.rate_bps,
        months: args.months,
    };
    let output = amortization::calculate_schedule(&input)?;
    Ok(serde_json::to_value(output)?)
}
