//! Settlement ledger: the value-transfer primitive of the single fungible
//! settlement asset. The engine only instructs movements; the asset's own
//! accounting lives behind this trait.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::types::{AccountId, Money};

/// One instructed movement of the settlement asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Money,
}

impl Transfer {
    pub fn new(from: &AccountId, to: &AccountId, amount: Money) -> Self {
        Self {
            from: from.clone(),
            to: to.clone(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    #[error("insufficient balance in {account}: needed {needed}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        needed: Money,
        available: Money,
    },

    #[error("insufficient authorization from {account}: needed {needed}, authorized {authorized}")]
    InsufficientAuthorization {
        account: AccountId,
        needed: Money,
        authorized: Money,
    },
}

/// Value-transfer primitive.
///
/// A batch is all-or-nothing: either every leg settles or none does. The
/// engine relies on this to keep multi-leg operations (funding, multi-period
/// catch-up payments) atomic.
pub trait SettlementLedger {
    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), SettlementError>;
}

/// Reference settlement ledger: balances plus per-account spending
/// authorizations granted to the engine, checked leg by leg against a
/// scratch state before anything is committed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySettlement {
    balances: BTreeMap<AccountId, Money>,
    authorizations: BTreeMap<AccountId, Money>,
}

impl InMemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&mut self, account: impl Into<AccountId>, amount: Money) {
        *self.balances.entry(account.into()).or_insert(Money::ZERO) += amount;
    }

    /// Grant the engine authority to move up to `limit` out of `account`.
    /// Debits consume the authorization.
    pub fn authorize(&mut self, account: impl Into<AccountId>, limit: Money) {
        self.authorizations.insert(account.into(), limit);
    }

    pub fn balance_of(&self, account: &AccountId) -> Money {
        self.balances.get(account).copied().unwrap_or(Money::ZERO)
    }

    pub fn authorization_of(&self, account: &AccountId) -> Money {
        self.authorizations
            .get(account)
            .copied()
            .unwrap_or(Money::ZERO)
    }
}

impl SettlementLedger for InMemorySettlement {
    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), SettlementError> {
        let mut balances = self.balances.clone();
        let mut authorizations = self.authorizations.clone();

        for transfer in transfers {
            if transfer.amount.is_zero() {
                continue;
            }
            let available = balances
                .get(&transfer.from)
                .copied()
                .unwrap_or(Money::ZERO);
            if available < transfer.amount {
                return Err(SettlementError::InsufficientBalance {
                    account: transfer.from.clone(),
                    needed: transfer.amount,
                    available,
                });
            }
            let authorized = authorizations
                .get(&transfer.from)
                .copied()
                .unwrap_or(Money::ZERO);
            if authorized < transfer.amount {
                return Err(SettlementError::InsufficientAuthorization {
                    account: transfer.from.clone(),
                    needed: transfer.amount,
                    authorized,
                });
            }
            balances.insert(transfer.from.clone(), available - transfer.amount);
            authorizations.insert(transfer.from.clone(), authorized - transfer.amount);
            *balances.entry(transfer.to.clone()).or_insert(Money::ZERO) += transfer.amount;
        }

        self.balances = balances;
        self.authorizations = authorizations;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn funded(account: &str, balance: Money, authorized: Money) -> InMemorySettlement {
        let mut ledger = InMemorySettlement::new();
        ledger.deposit(account, balance);
        ledger.authorize(account, authorized);
        ledger
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut ledger = funded("alice", dec!(100), dec!(100));
        let a = "alice".to_string();
        let b = "bob".to_string();
        let result = ledger.transfer_batch(&[
            Transfer::new(&a, &b, dec!(60)),
            Transfer::new(&a, &b, dec!(60)),
        ]);

        assert_eq!(
            result,
            Err(SettlementError::InsufficientBalance {
                account: a.clone(),
                needed: dec!(60),
                available: dec!(40),
            })
        );
        // nothing moved
        assert_eq!(ledger.balance_of(&a), dec!(100));
        assert_eq!(ledger.balance_of(&b), dec!(0));
        assert_eq!(ledger.authorization_of(&a), dec!(100));
    }

    #[test]
    fn debits_consume_authorization() {
        let mut ledger = funded("alice", dec!(100), dec!(50));
        let a = "alice".to_string();
        let b = "bob".to_string();

        ledger
            .transfer_batch(&[Transfer::new(&a, &b, dec!(30))])
            .unwrap();
        assert_eq!(ledger.authorization_of(&a), dec!(20));

        let result = ledger.transfer_batch(&[Transfer::new(&a, &b, dec!(30))]);
        assert_eq!(
            result,
            Err(SettlementError::InsufficientAuthorization {
                account: a,
                needed: dec!(30),
                authorized: dec!(20),
            })
        );
    }

    #[test]
    fn incoming_funds_are_spendable_within_a_batch() {
        let mut ledger = funded("alice", dec!(100), dec!(100));
        ledger.authorize("bob", dec!(100));
        let a = "alice".to_string();
        let b = "bob".to_string();
        let c = "carol".to_string();

        ledger
            .transfer_batch(&[Transfer::new(&a, &b, dec!(40)), Transfer::new(&b, &c, dec!(40))])
            .unwrap();
        assert_eq!(ledger.balance_of(&c), dec!(40));
        assert_eq!(ledger.balance_of(&b), dec!(0));
    }
}
