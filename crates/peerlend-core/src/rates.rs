//! Risk-tiered interest rate model.
//!
//! Maps a requested principal to an annual rate in basis points through the
//! step function configured in [`LedgerConfig::rate_tiers`]. Pure and total:
//! every principal lands in a tier because the last tier is open-ended.

use crate::config::LedgerConfig;
use crate::types::{BasisPoints, Money};

/// Annual rate for a principal of the given size.
pub fn annual_rate_bps(config: &LedgerConfig, amount: Money) -> BasisPoints {
    for tier in &config.rate_tiers {
        match tier.up_to {
            Some(ceiling) if amount <= ceiling => return tier.rate_bps,
            Some(_) => continue,
            None => return tier.rate_bps,
        }
    }
    // validate() guarantees an open-ended last tier; unreachable in practice
    // but total by construction.
    config.rate_tiers.last().map(|t| t.rate_bps).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tiers_step_up_with_principal() {
        let config = LedgerConfig::default();
        assert_eq!(annual_rate_bps(&config, dec!(500)), 600);
        assert_eq!(annual_rate_bps(&config, dec!(1_000)), 600);
        assert_eq!(annual_rate_bps(&config, dec!(5_000)), 900);
        assert_eq!(annual_rate_bps(&config, dec!(50_000)), 1800);
        assert_eq!(annual_rate_bps(&config, dec!(60_000)), 2250);
    }

    #[test]
    fn rate_is_monotonically_non_decreasing() {
        let config = LedgerConfig::default();
        let mut previous = 0;
        for amount in [100, 999, 1_000, 1_001, 10_000, 10_001, 50_000, 99_999] {
            let rate = annual_rate_bps(&config, Money::from(amount));
            assert!(rate >= previous, "rate dropped at principal {amount}");
            previous = rate;
        }
    }
}
