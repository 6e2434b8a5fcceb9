//! The loan ledger aggregate: loan records, their state machine, payment
//! processing with multi-period catch-up, balance accounting, and fee
//! distribution.
//!
//! Every mutating operation is atomic: preconditions are validated and the
//! full settlement batch is assembled before any loan state changes, and the
//! batch itself is all-or-nothing. Time never flows on its own: every
//! time-dependent operation takes the caller's `now`, and lateness is
//! computed lazily from it.

pub mod loan;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::amortization;
use crate::arrears::{self, LateFeeBreakdown};
use crate::config::LedgerConfig;
use crate::error::LendingError;
use crate::gate::{EligibilityGate, Role};
use crate::rates;
use crate::settlement::{SettlementLedger, Transfer};
use crate::types::{bps_rate, to_settlement_scale, AccountId, LoanId, Money};
use crate::LendingResult;

pub use loan::{Loan, LoanStatus};

// ---------------------------------------------------------------------------
// Aggregate types
// ---------------------------------------------------------------------------

/// Fee-collection accounts, configured by the administrative authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyWallets {
    pub fee: AccountId,
    pub insurance: AccountId,
    pub matching: AccountId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_loans: u64,
    /// Principal ever funded.
    pub total_volume: Money,
    pub active_loans: u64,
}

/// One period settled by a payment call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSettlement {
    pub due_at: DateTime<Utc>,
    /// EMI, capped to the remaining balance on the final installment.
    pub installment: Money,
    pub late_fee: Money,
    pub insurance_fee: Money,
    pub hours_late: i64,
}

/// Audit record of a `make_payment` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub loan_id: LoanId,
    pub periods: Vec<PeriodSettlement>,
    /// EMI + late fees pulled from the borrower into escrow.
    pub total_charged: Money,
    pub total_insurance: Money,
    pub total_late_fees: Money,
    /// Loan's cumulative `total_paid` after this call.
    pub total_paid: Money,
    pub completed: bool,
}

/// What a payment made right now would owe in late fees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateFeeInfo {
    pub estimated_late_fee: Money,
    /// Whole hours past the oldest unsettled due date; zero when nothing is
    /// overdue.
    pub hours_late: i64,
}

/// Pure output of the catch-up computation, applied to the loan only after
/// settlement succeeds.
struct PaymentPlan {
    periods: Vec<PeriodSettlement>,
    next_due: DateTime<Utc>,
    total_paid: Money,
    total_due: Money,
    total_insurance: Money,
    total_late_fees: Money,
    missed: u32,
    completed: bool,
}

// ---------------------------------------------------------------------------
// LoanLedger
// ---------------------------------------------------------------------------

pub struct LoanLedger<G, S> {
    config: LedgerConfig,
    gate: G,
    settlement: S,
    wallets: CompanyWallets,
    /// Custody account holding settled payments until the lender claims them.
    escrow: AccountId,
    owner: AccountId,
    paused: bool,
    loans: BTreeMap<LoanId, Loan>,
    next_id: LoanId,
    funded_volume: Money,
}

impl<G: EligibilityGate, S: SettlementLedger> LoanLedger<G, S> {
    pub fn new(
        config: LedgerConfig,
        gate: G,
        settlement: S,
        owner: AccountId,
        escrow: AccountId,
        wallets: CompanyWallets,
    ) -> LendingResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gate,
            settlement,
            wallets,
            escrow,
            owner,
            paused: false,
            loans: BTreeMap::new(),
            next_id: 1,
            funded_volume: Money::ZERO,
        })
    }

    // -- borrower operations -------------------------------------------------

    /// Open a negotiation: a `Requested` loan with no terms yet.
    pub fn request_loan(
        &mut self,
        caller: &AccountId,
        reference: impl Into<String>,
    ) -> LendingResult<LoanId> {
        self.ensure_not_paused()?;
        self.ensure_eligible(caller, Role::Borrower)?;

        let id = self.next_id;
        self.loans
            .insert(id, Loan::new_requested(id, reference.into(), caller.clone()));
        self.next_id += 1;
        Ok(id)
    }

    /// Accept approved terms at a chosen principal, fixing rate and EMI and
    /// paying the origination fee.
    pub fn confirm_loan(
        &mut self,
        caller: &AccountId,
        id: LoanId,
        amount: Money,
    ) -> LendingResult<()> {
        self.ensure_not_paused()?;

        let loan = self.loan(id)?;
        if caller != &loan.borrower {
            return Err(LendingError::NotLoanBorrower(id));
        }
        if loan.status != LoanStatus::Approved {
            return Err(LendingError::InvalidTransition {
                from: loan.status,
                to: LoanStatus::Confirmed,
            });
        }
        if amount > loan.approved_max_amount {
            return Err(LendingError::InvalidAmount {
                amount,
                min: self.config.min_principal,
                max: loan.approved_max_amount,
            });
        }
        let duration = loan.duration_months;
        let rate_bps = rates::annual_rate_bps(&self.config, amount);
        let emi = amortization::fixed_emi(&self.config, amount, rate_bps, duration)?;

        // Origination fee leaves the borrower before any principal moves.
        let origination = to_settlement_scale(amount * bps_rate(self.config.origination_fee_bps));
        self.settlement
            .transfer_batch(&[Transfer::new(caller, &self.wallets.fee, origination)])?;

        let loan = self.loan_mut(id)?;
        loan.amount = amount;
        loan.interest_rate_bps = rate_bps;
        loan.fixed_emi = emi;
        loan.transition(LoanStatus::Confirmed)
    }

    /// Self-service creation: request, approval and confirmation collapsed
    /// into one step, landing directly in `Pending`.
    pub fn create_loan(
        &mut self,
        caller: &AccountId,
        reference: impl Into<String>,
        amount: Money,
        duration: u32,
    ) -> LendingResult<LoanId> {
        self.ensure_not_paused()?;
        self.ensure_eligible(caller, Role::Borrower)?;

        let rate_bps = rates::annual_rate_bps(&self.config, amount);
        let emi = amortization::fixed_emi(&self.config, amount, rate_bps, duration)?;

        let origination = to_settlement_scale(amount * bps_rate(self.config.origination_fee_bps));
        self.settlement
            .transfer_batch(&[Transfer::new(caller, &self.wallets.fee, origination)])?;

        let id = self.next_id;
        let mut loan = Loan::new_requested(id, reference.into(), caller.clone());
        loan.requested_amount = amount;
        loan.approved_max_amount = amount;
        loan.amount = amount;
        loan.duration_months = duration;
        loan.interest_rate_bps = rate_bps;
        loan.fixed_emi = emi;
        loan.status = LoanStatus::Pending;
        self.loans.insert(id, loan);
        self.next_id += 1;
        Ok(id)
    }

    /// Settle every period whose due date has passed (at least one) in a
    /// single call, charging arrears per period and insurance on each
    /// period's due amount.
    pub fn make_payment(
        &mut self,
        caller: &AccountId,
        id: LoanId,
        now: DateTime<Utc>,
    ) -> LendingResult<PaymentReceipt> {
        self.ensure_not_paused()?;

        let loan = self.loan(id)?;
        if loan.status != LoanStatus::Active {
            return Err(LendingError::LoanNotActive {
                id,
                status: loan.status,
            });
        }
        if caller != &loan.borrower {
            return Err(LendingError::NotLoanBorrower(id));
        }
        self.ensure_eligible(caller, Role::Borrower)?;
        let first_due = loan.next_payment_due.ok_or(LendingError::LoanNotActive {
            id,
            status: loan.status,
        })?;

        let plan = build_payment_plan(&self.config, loan, first_due, now);

        self.settlement.transfer_batch(&[
            Transfer::new(caller, &self.escrow, plan.total_due),
            Transfer::new(caller, &self.wallets.insurance, plan.total_insurance),
        ])?;

        let loan = self.loan_mut(id)?;
        loan.available_withdrawal += plan.total_due;
        loan.total_paid = plan.total_paid;
        loan.late_fee_accumulated += plan.total_late_fees;
        loan.missed_payments += plan.missed;
        loan.next_payment_due = Some(plan.next_due);
        if plan.completed {
            loan.transition(LoanStatus::Completed)?;
        }

        Ok(PaymentReceipt {
            loan_id: id,
            periods: plan.periods,
            total_charged: plan.total_due,
            total_insurance: plan.total_insurance,
            total_late_fees: plan.total_late_fees,
            total_paid: plan.total_paid,
            completed: plan.completed,
        })
    }

    // -- lender operations ---------------------------------------------------

    /// Fund a `Confirmed` or `Pending` loan: principal in, matching fee out,
    /// remainder disbursed to the borrower, schedule started.
    pub fn fund_loan(
        &mut self,
        caller: &AccountId,
        id: LoanId,
        now: DateTime<Utc>,
    ) -> LendingResult<()> {
        self.ensure_not_paused()?;
        self.ensure_eligible(caller, Role::Lender)?;

        let loan = self.loan(id)?;
        if !loan.status.awaiting_funding() {
            return Err(LendingError::LoanNotPending {
                id,
                status: loan.status,
            });
        }
        let amount = loan.amount;
        let borrower = loan.borrower.clone();
        let matching = to_settlement_scale(amount * bps_rate(self.config.matching_fee_bps));

        self.settlement.transfer_batch(&[
            Transfer::new(caller, &self.wallets.matching, matching),
            Transfer::new(caller, &borrower, amount - matching),
        ])?;

        let period = self.config.period();
        let loan = self.loan_mut(id)?;
        loan.lender = Some(caller.clone());
        loan.funded_at = Some(now);
        loan.next_payment_due = Some(now + period);
        loan.transition(LoanStatus::Active)?;
        self.funded_volume += amount;
        Ok(())
    }

    /// Pay out the accumulated claimable balance to the recorded lender and
    /// reset it, as one unit.
    pub fn claim_interest(&mut self, caller: &AccountId, id: LoanId) -> LendingResult<Money> {
        self.ensure_not_paused()?;

        let loan = self.loan(id)?;
        if loan.lender.as_ref() != Some(caller) {
            return Err(LendingError::NotLoanLender(id));
        }
        self.ensure_eligible(caller, Role::Lender)?;
        let claimable = loan.available_withdrawal;
        if claimable.is_zero() {
            return Err(LendingError::NoInterestToClaim(id));
        }

        let escrow = self.escrow.clone();
        self.settlement
            .transfer_batch(&[Transfer::new(&escrow, caller, claimable)])?;

        self.loan_mut(id)?.available_withdrawal = Money::ZERO;
        Ok(claimable)
    }

    // -- administrative operations -------------------------------------------

    /// Negotiated path: the administrative authority sets the ceiling and
    /// term on a `Requested` loan.
    pub fn approve_loan_request(
        &mut self,
        caller: &AccountId,
        id: LoanId,
        max_amount: Money,
        duration: u32,
    ) -> LendingResult<()> {
        self.ensure_not_paused()?;
        self.ensure_owner(caller)?;

        if !self.config.in_principal_window(max_amount) {
            return Err(LendingError::InvalidAmount {
                amount: max_amount,
                min: self.config.min_principal,
                max: self.config.max_principal,
            });
        }
        if !self.config.in_duration_window(duration) {
            return Err(LendingError::InvalidDuration {
                months: duration,
                min: self.config.min_duration_months,
                max: self.config.max_duration_months,
            });
        }

        let loan = self.loan_mut(id)?;
        loan.transition(LoanStatus::Approved)?;
        loan.approved_max_amount = max_amount;
        loan.duration_months = duration;
        Ok(())
    }

    pub fn update_company_wallets(
        &mut self,
        caller: &AccountId,
        wallets: CompanyWallets,
    ) -> LendingResult<()> {
        self.ensure_owner(caller)?;
        self.wallets = wallets;
        Ok(())
    }

    pub fn pause(&mut self, caller: &AccountId) -> LendingResult<()> {
        self.ensure_owner(caller)?;
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId) -> LendingResult<()> {
        self.ensure_owner(caller)?;
        self.paused = false;
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> LendingResult<()> {
        self.ensure_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    // -- read views (available while paused) ---------------------------------

    pub fn get_loan(&self, id: LoanId) -> LendingResult<&Loan> {
        self.loan(id)
    }

    pub fn get_fixed_emi(&self, id: LoanId) -> LendingResult<Money> {
        Ok(self.loan(id)?.fixed_emi)
    }

    pub fn get_available_withdrawal(&self, id: LoanId) -> LendingResult<Money> {
        Ok(self.loan(id)?.available_withdrawal)
    }

    /// The exact arrears a payment made at `now` would be charged, without
    /// mutating anything. Runs the same catch-up computation as
    /// `make_payment`, so the numbers always agree.
    pub fn get_late_fee_info(&self, id: LoanId, now: DateTime<Utc>) -> LendingResult<LateFeeInfo> {
        let loan = self.loan(id)?;
        let Some(first_due) = loan.next_payment_due else {
            return Ok(LateFeeInfo {
                estimated_late_fee: Money::ZERO,
                hours_late: 0,
            });
        };
        if loan.status != LoanStatus::Active {
            return Ok(LateFeeInfo {
                estimated_late_fee: Money::ZERO,
                hours_late: 0,
            });
        }
        let plan = build_payment_plan(&self.config, loan, first_due, now);
        Ok(LateFeeInfo {
            estimated_late_fee: plan.total_late_fees,
            hours_late: plan.periods.first().map_or(0, |p| p.hours_late),
        })
    }

    pub fn get_stats(&self) -> LedgerStats {
        LedgerStats {
            total_loans: self.next_id - 1,
            total_volume: self.funded_volume,
            active_loans: self
                .loans
                .values()
                .filter(|l| l.status == LoanStatus::Active)
                .count() as u64,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn wallets(&self) -> &CompanyWallets {
        &self.wallets
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn escrow(&self) -> &AccountId {
        &self.escrow
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Registry mutation is the administrative surface's concern; the
    /// embedding application gates access to this.
    pub fn gate_mut(&mut self) -> &mut G {
        &mut self.gate
    }

    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    pub fn settlement_mut(&mut self) -> &mut S {
        &mut self.settlement
    }

    // -- internals -----------------------------------------------------------

    fn loan(&self, id: LoanId) -> LendingResult<&Loan> {
        self.loans.get(&id).ok_or(LendingError::LoanNotFound(id))
    }

    fn loan_mut(&mut self, id: LoanId) -> LendingResult<&mut Loan> {
        self.loans
            .get_mut(&id)
            .ok_or(LendingError::LoanNotFound(id))
    }

    fn ensure_not_paused(&self) -> LendingResult<()> {
        if self.paused {
            return Err(LendingError::EnforcedPause);
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &AccountId) -> LendingResult<()> {
        if caller != &self.owner {
            return Err(LendingError::NotAuthorized);
        }
        Ok(())
    }

    fn ensure_eligible(&self, account: &AccountId, role: Role) -> LendingResult<()> {
        if !self.gate.is_eligible(account, role) {
            return Err(LendingError::NotWhitelisted {
                account: account.clone(),
                role,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catch-up computation
// ---------------------------------------------------------------------------

/// Pure per-call settlement plan: which periods settle, what each one owes,
/// and where the loan lands afterwards.
///
/// Always settles at least one period: a payment ahead of the due date
/// prepays the next scheduled installment, fee-free. When several due dates
/// have passed, every one of them settles in chronological order, each with
/// its own lateness. The loop is bounded by the duration window and stops as
/// soon as the principal is repaid in full.
fn build_payment_plan(
    config: &LedgerConfig,
    loan: &Loan,
    first_due: DateTime<Utc>,
    now: DateTime<Utc>,
) -> PaymentPlan {
    let period = config.period();
    let insurance_rate = bps_rate(config.insurance_fee_bps);

    let periods_due = if now >= first_due {
        let whole = ((now - first_due).num_seconds() / period.num_seconds())
            .min(i64::from(config.max_duration_months));
        1 + whole as u32
    } else {
        1
    };
    let bound = periods_due.min(config.max_duration_months);

    let mut periods = Vec::with_capacity(bound as usize);
    let mut due = first_due;
    let mut total_paid = loan.total_paid;
    let mut total_due = Money::ZERO;
    let mut total_insurance = Money::ZERO;
    let mut total_late_fees = Money::ZERO;
    let mut missed = 0;

    for _ in 0..bound {
        let late = now > due;
        let hours_late = if late { (now - due).num_hours() } else { 0 };
        let fee = if late {
            arrears::late_fee(config, loan.fixed_emi, loan.interest_rate_bps, hours_late)
        } else {
            LateFeeBreakdown::zero()
        };

        // The fixed EMI, except the last installment never overshoots the
        // remaining balance.
        let installment = loan.fixed_emi.min(loan.amount - total_paid);
        let period_due = installment + fee.total;
        let insurance = to_settlement_scale(period_due * insurance_rate);

        total_paid += installment;
        total_due += period_due;
        total_insurance += insurance;
        total_late_fees += fee.total;
        if late {
            missed += 1;
        }
        periods.push(PeriodSettlement {
            due_at: due,
            installment,
            late_fee: fee.total,
            insurance_fee: insurance,
            hours_late,
        });

        due += period;
        if total_paid >= loan.amount {
            break;
        }
    }

    PaymentPlan {
        periods,
        next_due: due,
        completed: total_paid >= loan.amount,
        total_paid,
        total_due,
        total_insurance,
        total_late_fees,
        missed,
    }
}
