use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LendingError;
use crate::types::{AccountId, BasisPoints, LoanId, Money};
use crate::LendingResult;

/// Loan lifecycle states. `Requested -> Approved -> Confirmed` is the
/// negotiated path; `Pending` is the self-service entry point. Both converge
/// on funding; `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Requested,
    Approved,
    Confirmed,
    Pending,
    Active,
    Completed,
}

impl LoanStatus {
    /// The closed transition table. Everything not listed is rejected.
    pub fn can_transition(self, next: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, next),
            (Requested, Approved)
                | (Approved, Confirmed)
                | (Confirmed, Active)
                | (Pending, Active)
                | (Active, Completed)
        )
    }

    /// True for the two states a lender may fund from.
    pub fn awaiting_funding(self) -> bool {
        matches!(self, LoanStatus::Confirmed | LoanStatus::Pending)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoanStatus::Requested => "requested",
            LoanStatus::Approved => "approved",
            LoanStatus::Confirmed => "confirmed",
            LoanStatus::Pending => "pending",
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
        };
        write!(f, "{name}")
    }
}

/// The central entity of the ledger.
///
/// `fixed_emi` and `interest_rate_bps` are written exactly once, when the
/// terms are fixed at confirmation or direct creation, and never recomputed.
/// `next_payment_due` advances by exactly one period length per settled
/// installment regardless of when the payment actually arrived, so the
/// schedule never drifts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    /// Borrower-supplied external reference.
    pub reference: String,
    pub borrower: AccountId,
    /// Unset until funding.
    pub lender: Option<AccountId>,
    pub requested_amount: Money,
    pub approved_max_amount: Money,
    /// Final principal, immutable once funded.
    pub amount: Money,
    pub interest_rate_bps: BasisPoints,
    pub duration_months: u32,
    pub fixed_emi: Money,
    pub status: LoanStatus,
    pub funded_at: Option<DateTime<Utc>>,
    pub next_payment_due: Option<DateTime<Utc>>,
    /// Cumulative principal+interest settled toward the loan; excludes fees.
    pub total_paid: Money,
    /// Periods settled after their due timestamp.
    pub missed_payments: u32,
    /// Cumulative late fees ever charged. Monotone, audit-only.
    pub late_fee_accumulated: Money,
    /// Lender-claimable balance; reset to zero only by a claim.
    pub available_withdrawal: Money,
}

impl Loan {
    pub(crate) fn new_requested(id: LoanId, reference: String, borrower: AccountId) -> Self {
        Self {
            id,
            reference,
            borrower,
            lender: None,
            requested_amount: Money::ZERO,
            approved_max_amount: Money::ZERO,
            amount: Money::ZERO,
            interest_rate_bps: 0,
            duration_months: 0,
            fixed_emi: Money::ZERO,
            status: LoanStatus::Requested,
            funded_at: None,
            next_payment_due: None,
            total_paid: Money::ZERO,
            missed_payments: 0,
            late_fee_accumulated: Money::ZERO,
            available_withdrawal: Money::ZERO,
        }
    }

    pub(crate) fn transition(&mut self, next: LoanStatus) -> LendingResult<()> {
        if !self.status.can_transition(next) {
            return Err(LendingError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
