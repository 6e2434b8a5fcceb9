use thiserror::Error;

use crate::gate::Role;
use crate::ledger::loan::LoanStatus;
use crate::settlement::SettlementError;
use crate::types::{AccountId, LoanId, Money};

#[derive(Debug, Error)]
pub enum LendingError {
    #[error("Account {account} is not whitelisted as {role}")]
    NotWhitelisted { account: AccountId, role: Role },

    #[error("Invalid amount {amount}: must be within [{min}, {max}]")]
    InvalidAmount { amount: Money, min: Money, max: Money },

    #[error("Invalid duration {months} months: must be within [{min}, {max}]")]
    InvalidDuration { months: u32, min: u32, max: u32 },

    #[error("Loan {0} does not exist")]
    LoanNotFound(LoanId),

    #[error("Loan {id} is not awaiting funding (status: {status})")]
    LoanNotPending { id: LoanId, status: LoanStatus },

    #[error("Loan {id} is not active (status: {status})")]
    LoanNotActive { id: LoanId, status: LoanStatus },

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },

    #[error("Caller is not the borrower of loan {0}")]
    NotLoanBorrower(LoanId),

    #[error("Caller is not the recorded lender of loan {0}")]
    NotLoanLender(LoanId),

    #[error("No claimable balance on loan {0}")]
    NoInterestToClaim(LoanId),

    #[error("Ledger is paused")]
    EnforcedPause,

    #[error("Caller lacks administrative authority")]
    NotAuthorized,

    #[error("Settlement failed: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
