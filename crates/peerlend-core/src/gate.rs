//! Eligibility gate: the membership predicate every participant-facing
//! operation consults. The registry itself is external to the engine and
//! mutated only by the administrative surface; the ledger sees it through
//! this trait.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::types::AccountId;

/// The capacity an account acts in for a given operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Borrower,
    Lender,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Borrower => write!(f, "borrower"),
            Role::Lender => write!(f, "lender"),
        }
    }
}

pub trait EligibilityGate {
    fn is_eligible(&self, account: &AccountId, role: Role) -> bool;
}

/// Reference gate: one whitelist serving both roles, as the production
/// registry does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryWhitelist {
    members: BTreeSet<AccountId>,
}

impl InMemoryWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, account: impl Into<AccountId>) {
        self.members.insert(account.into());
    }

    pub fn remove(&mut self, account: &AccountId) {
        self.members.remove(account);
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.members.contains(account)
    }
}

impl EligibilityGate for InMemoryWhitelist {
    fn is_eligible(&self, account: &AccountId, _role: Role) -> bool {
        self.members.contains(account)
    }
}
