use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use peerlend_core::config::LedgerConfig;
use peerlend_core::rates;

/// Arguments for a rate-tier lookup
#[derive(Args)]
pub struct RateArgs {
    /// Principal in settlement-asset units
    #[arg(long)]
    pub amount: Decimal,
}

pub fn run_rate(args: RateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = LedgerConfig::default();
    let rate_bps = rates::annual_rate_bps(&config, args.amount);
    let rate_pct = Decimal::from(rate_bps) / Decimal::from(100);

    Ok(serde_json::json!({
        "result": {
            "amount": args.amount,
            "annual_rate_bps": rate_bps,
            "annual_rate_pct": rate_pct,
        },
    }))
}
