use chrono::{DateTime, Duration, TimeZone, Utc};
use peerlend_core::config::LedgerConfig;
use peerlend_core::gate::InMemoryWhitelist;
use peerlend_core::ledger::{CompanyWallets, LoanLedger, LoanStatus};
use peerlend_core::settlement::InMemorySettlement;
use peerlend_core::{LendingError, Money};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

type Ledger = LoanLedger<InMemoryWhitelist, InMemorySettlement>;

const ADMIN: &str = "admin";
const BORROWER: &str = "borrower";
const LENDER: &str = "lender";
const ESCROW: &str = "escrow";

fn account(name: &str) -> String {
    name.to_string()
}

fn wallets() -> CompanyWallets {
    CompanyWallets {
        fee: account("fee-wallet"),
        insurance: account("insurance-wallet"),
        matching: account("matching-wallet"),
    }
}

fn new_ledger() -> Ledger {
    let mut gate = InMemoryWhitelist::new();
    gate.add(BORROWER);
    gate.add(LENDER);

    let mut settlement = InMemorySettlement::new();
    for participant in [BORROWER, LENDER] {
        settlement.deposit(participant, dec!(200_000));
        settlement.authorize(participant, dec!(200_000));
    }
    // the ledger's custody account pays claims out of what borrowers paid in
    settlement.authorize(ESCROW, dec!(1_000_000));

    LoanLedger::new(
        LedgerConfig::default(),
        gate,
        settlement,
        account(ADMIN),
        account(ESCROW),
        wallets(),
    )
    .unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn days(n: i64) -> Duration {
    Duration::days(n)
}

// ===========================================================================
// Creation
// ===========================================================================

#[test]
fn test_create_loan_charges_origination_and_lands_pending() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);

    let id = ledger
        .create_loan(&borrower, "LOAN001", dec!(1_000), 3)
        .unwrap();
    assert_eq!(id, 1);

    let loan = ledger.get_loan(id).unwrap();
    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.amount, dec!(1_000));
    assert_eq!(loan.duration_months, 3);
    assert_eq!(loan.borrower, borrower);
    assert_eq!(loan.lender, None);
    // 1,000 in the small-principal tier
    assert_eq!(loan.interest_rate_bps, 600);

    // 0.5% origination fee left the borrower before any principal moved
    let fee_wallet = account("fee-wallet");
    assert_eq!(ledger.settlement().balance_of(&fee_wallet), dec!(5));
    assert_eq!(
        ledger.settlement().balance_of(&borrower),
        dec!(200_000) - dec!(5),
    );
}

#[test]
fn test_create_loan_rejects_non_whitelisted_borrower() {
    let mut ledger = new_ledger();
    let stranger = account("stranger");

    let result = ledger.create_loan(&stranger, "LOAN002", dec!(1_000), 3);
    assert!(matches!(
        result,
        Err(LendingError::NotWhitelisted { .. })
    ));
}

#[test]
fn test_create_loan_principal_window_boundaries() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);

    assert!(ledger.create_loan(&borrower, "MIN", dec!(100), 12).is_ok());
    assert!(ledger
        .create_loan(&borrower, "MAX", dec!(100_000), 12)
        .is_ok());
    assert!(matches!(
        ledger.create_loan(&borrower, "LOW", dec!(99), 12),
        Err(LendingError::InvalidAmount { .. }),
    ));
    assert!(matches!(
        ledger.create_loan(&borrower, "HIGH", dec!(100_001), 12),
        Err(LendingError::InvalidAmount { .. }),
    ));
}

#[test]
fn test_create_loan_duration_window_boundaries() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);

    assert!(ledger.create_loan(&borrower, "D1", dec!(1_000), 1).is_ok());
    assert!(ledger.create_loan(&borrower, "D36", dec!(1_000), 36).is_ok());
    assert!(matches!(
        ledger.create_loan(&borrower, "D0", dec!(1_000), 0),
        Err(LendingError::InvalidDuration { .. }),
    ));
    assert!(matches!(
        ledger.create_loan(&borrower, "D37", dec!(1_000), 37),
        Err(LendingError::InvalidDuration { .. }),
    ));
}

#[test]
fn test_failed_creation_does_not_burn_an_id() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);

    let _ = ledger.create_loan(&borrower, "BAD", dec!(99), 12);
    let id = ledger
        .create_loan(&borrower, "GOOD", dec!(1_000), 12)
        .unwrap();
    assert_eq!(id, 1);
}

// ===========================================================================
// Negotiated path
// ===========================================================================

#[test]
fn test_negotiation_flow_reaches_active() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let lender = account(LENDER);
    let admin = account(ADMIN);

    let id = ledger.request_loan(&borrower, "NEGOTIATED").unwrap();
    assert_eq!(ledger.get_loan(id).unwrap().status, LoanStatus::Requested);

    ledger
        .approve_loan_request(&admin, id, dec!(10_000), 12)
        .unwrap();
    assert_eq!(ledger.get_loan(id).unwrap().status, LoanStatus::Approved);

    ledger.confirm_loan(&borrower, id, dec!(10_000)).unwrap();
    let loan = ledger.get_loan(id).unwrap();
    assert_eq!(loan.status, LoanStatus::Confirmed);
    assert_eq!(loan.interest_rate_bps, 900);
    assert!(loan.fixed_emi > Money::ZERO);

    ledger.fund_loan(&lender, id, t0()).unwrap();
    let loan = ledger.get_loan(id).unwrap();
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.lender, Some(lender));
    assert_eq!(loan.funded_at, Some(t0()));
    assert_eq!(loan.next_payment_due, Some(t0() + days(30)));
}

#[test]
fn test_fixed_emi_identical_across_creation_paths() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let admin = account(ADMIN);

    let direct = ledger
        .create_loan(&borrower, "DIRECT", dec!(10_000), 12)
        .unwrap();

    let negotiated = ledger.request_loan(&borrower, "NEGOTIATED").unwrap();
    ledger
        .approve_loan_request(&admin, negotiated, dec!(10_000), 12)
        .unwrap();
    ledger.confirm_loan(&borrower, negotiated, dec!(10_000)).unwrap();

    assert_eq!(
        ledger.get_fixed_emi(direct).unwrap(),
        ledger.get_fixed_emi(negotiated).unwrap(),
    );
}

#[test]
fn test_approve_requires_administrative_authority() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);

    let id = ledger.request_loan(&borrower, "REQ").unwrap();
    let result = ledger.approve_loan_request(&borrower, id, dec!(5_000), 12);
    assert!(matches!(result, Err(LendingError::NotAuthorized)));
}

#[test]
fn test_confirm_cannot_exceed_approved_ceiling() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let admin = account(ADMIN);

    let id = ledger.request_loan(&borrower, "REQ").unwrap();
    ledger
        .approve_loan_request(&admin, id, dec!(5_000), 12)
        .unwrap();

    let result = ledger.confirm_loan(&borrower, id, dec!(5_001));
    assert!(matches!(result, Err(LendingError::InvalidAmount { .. })));
    // the ceiling itself is fine
    assert!(ledger.confirm_loan(&borrower, id, dec!(5_000)).is_ok());
}

#[test]
fn test_confirm_before_approval_is_rejected() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);

    let id = ledger.request_loan(&borrower, "REQ").unwrap();
    let result = ledger.confirm_loan(&borrower, id, dec!(5_000));
    assert!(matches!(
        result,
        Err(LendingError::InvalidTransition { .. }),
    ));
}

// ===========================================================================
// Funding
// ===========================================================================

#[test]
fn test_fund_loan_routes_matching_fee_and_disburses_remainder() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let lender = account(LENDER);

    let id = ledger
        .create_loan(&borrower, "FUND", dec!(1_000), 3)
        .unwrap();
    let borrower_before = ledger.settlement().balance_of(&borrower);

    ledger.fund_loan(&lender, id, t0()).unwrap();

    // 0.1% matching fee deducted from the principal
    let matching_wallet = account("matching-wallet");
    assert_eq!(ledger.settlement().balance_of(&matching_wallet), dec!(1));
    assert_eq!(
        ledger.settlement().balance_of(&borrower),
        borrower_before + dec!(999),
    );
    assert_eq!(
        ledger.settlement().balance_of(&lender),
        dec!(200_000) - dec!(1_000),
    );
}

#[test]
fn test_fund_loan_twice_is_rejected() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let lender = account(LENDER);

    let id = ledger
        .create_loan(&borrower, "FUND", dec!(1_000), 3)
        .unwrap();
    ledger.fund_loan(&lender, id, t0()).unwrap();

    let result = ledger.fund_loan(&lender, id, t0());
    assert!(matches!(
        result,
        Err(LendingError::LoanNotPending {
            status: LoanStatus::Active,
            ..
        }),
    ));
}

#[test]
fn test_fund_requires_lender_eligibility() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let stranger = account("stranger");

    let id = ledger
        .create_loan(&borrower, "FUND", dec!(1_000), 3)
        .unwrap();
    let result = ledger.fund_loan(&stranger, id, t0());
    assert!(matches!(result, Err(LendingError::NotWhitelisted { .. })));
}

#[test]
fn test_fund_unconfirmed_request_is_rejected() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let lender = account(LENDER);

    let id = ledger.request_loan(&borrower, "REQ").unwrap();
    let result = ledger.fund_loan(&lender, id, t0());
    assert!(matches!(
        result,
        Err(LendingError::LoanNotPending {
            status: LoanStatus::Requested,
            ..
        }),
    ));
}

// ===========================================================================
// Payments and withdrawal
// ===========================================================================

fn funded_loan(ledger: &mut Ledger, amount: Money, months: u32) -> u64 {
    let id = ledger
        .create_loan(&account(BORROWER), "PAY", amount, months)
        .unwrap();
    ledger.fund_loan(&account(LENDER), id, t0()).unwrap();
    id
}

#[test]
fn test_on_time_payment_credits_emi_and_insurance() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let id = funded_loan(&mut ledger, dec!(5_000), 12);
    let emi = ledger.get_fixed_emi(id).unwrap();

    // a day before the due date: early payment, no arrears
    let receipt = ledger
        .make_payment(&borrower, id, t0() + days(29))
        .unwrap();

    assert_eq!(receipt.periods.len(), 1);
    assert_eq!(receipt.total_charged, emi);
    assert_eq!(receipt.total_late_fees, Money::ZERO);
    assert!(!receipt.completed);

    let loan = ledger.get_loan(id).unwrap();
    assert_eq!(loan.total_paid, emi);
    assert_eq!(loan.available_withdrawal, emi);
    assert_eq!(loan.missed_payments, 0);
    // schedule advanced one fixed period, not to the payment instant
    assert_eq!(loan.next_payment_due, Some(t0() + days(60)));

    // 2% insurance on the due amount, paid on top
    let insurance_wallet = account("insurance-wallet");
    let expected_insurance = peerlend_core::to_settlement_scale(emi * dec!(0.02));
    assert_eq!(
        ledger.settlement().balance_of(&insurance_wallet),
        expected_insurance,
    );
}

#[test]
fn test_unclaimed_payments_accumulate_linearly() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let id = funded_loan(&mut ledger, dec!(5_000), 12);
    let emi = ledger.get_fixed_emi(id).unwrap();

    ledger.make_payment(&borrower, id, t0() + days(29)).unwrap();
    ledger.make_payment(&borrower, id, t0() + days(59)).unwrap();
    ledger.make_payment(&borrower, id, t0() + days(89)).unwrap();

    assert_eq!(
        ledger.get_available_withdrawal(id).unwrap(),
        emi * dec!(3),
    );
}

#[test]
fn test_claim_pays_full_balance_and_resets() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let lender = account(LENDER);
    let id = funded_loan(&mut ledger, dec!(5_000), 12);

    ledger.make_payment(&borrower, id, t0() + days(29)).unwrap();
    let claimable = ledger.get_available_withdrawal(id).unwrap();
    let lender_before = ledger.settlement().balance_of(&lender);

    let claimed = ledger.claim_interest(&lender, id).unwrap();
    assert_eq!(claimed, claimable);
    assert_eq!(
        ledger.settlement().balance_of(&lender),
        lender_before + claimable,
    );
    assert_eq!(ledger.get_available_withdrawal(id).unwrap(), Money::ZERO);

    // nothing left to claim
    let again = ledger.claim_interest(&lender, id);
    assert!(matches!(again, Err(LendingError::NoInterestToClaim(_))));
}

#[test]
fn test_claim_without_any_payment_fails() {
    let mut ledger = new_ledger();
    let lender = account(LENDER);
    let id = funded_loan(&mut ledger, dec!(5_000), 12);

    let result = ledger.claim_interest(&lender, id);
    assert!(matches!(result, Err(LendingError::NoInterestToClaim(_))));
}

#[test]
fn test_only_the_recorded_lender_can_claim() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let lender = account(LENDER);
    let other = account("other-lender");
    ledger.gate_mut().add(other.clone());

    let id = funded_loan(&mut ledger, dec!(5_000), 12);
    ledger.make_payment(&borrower, id, t0() + days(29)).unwrap();

    let result = ledger.claim_interest(&other, id);
    assert!(matches!(result, Err(LendingError::NotLoanLender(_))));

    assert!(ledger.claim_interest(&lender, id).is_ok());
}

#[test]
fn test_payment_on_foreign_loan_is_rejected() {
    let mut ledger = new_ledger();
    let lender = account(LENDER);
    let id = funded_loan(&mut ledger, dec!(5_000), 12);

    let result = ledger.make_payment(&lender, id, t0() + days(29));
    assert!(matches!(result, Err(LendingError::NotLoanBorrower(_))));
}

#[test]
fn test_three_month_loan_completes_in_one_catchup_call() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let id = funded_loan(&mut ledger, dec!(1_000), 3);

    // nothing paid for 90 days, then a single catch-up call
    let receipt = ledger
        .make_payment(&borrower, id, t0() + days(90))
        .unwrap();

    assert_eq!(receipt.periods.len(), 3);
    assert!(receipt.completed);

    let loan = ledger.get_loan(id).unwrap();
    assert_eq!(loan.status, LoanStatus::Completed);
    // the final installment is capped so the total lands exactly
    assert_eq!(loan.total_paid, dec!(1_000));
    // periods one and two were overdue; the third fell due at the call
    assert_eq!(loan.missed_payments, 2);

    let result = ledger.make_payment(&borrower, id, t0() + days(120));
    assert!(matches!(
        result,
        Err(LendingError::LoanNotActive {
            status: LoanStatus::Completed,
            ..
        }),
    ));
}

#[test]
fn test_failed_settlement_leaves_loan_untouched() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let id = funded_loan(&mut ledger, dec!(5_000), 12);

    // revoke the engine's spending authority over the borrower
    ledger.settlement_mut().authorize(BORROWER, Money::ZERO);

    let result = ledger.make_payment(&borrower, id, t0() + days(29));
    assert!(matches!(result, Err(LendingError::Settlement(_))));

    let loan = ledger.get_loan(id).unwrap();
    assert_eq!(loan.total_paid, Money::ZERO);
    assert_eq!(loan.available_withdrawal, Money::ZERO);
    assert_eq!(loan.next_payment_due, Some(t0() + days(30)));
    assert_eq!(loan.status, LoanStatus::Active);
}

// ===========================================================================
// Pause and administration
// ===========================================================================

#[test]
fn test_pause_blocks_mutations_but_not_reads() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let admin = account(ADMIN);
    let id = funded_loan(&mut ledger, dec!(5_000), 12);

    ledger.pause(&admin).unwrap();
    assert!(ledger.is_paused());

    let result = ledger.create_loan(&borrower, "PAUSED", dec!(1_000), 3);
    assert!(matches!(result, Err(LendingError::EnforcedPause)));
    let result = ledger.make_payment(&borrower, id, t0() + days(29));
    assert!(matches!(result, Err(LendingError::EnforcedPause)));

    // reads stay available
    assert!(ledger.get_loan(id).is_ok());
    assert!(ledger.get_fixed_emi(id).is_ok());

    ledger.unpause(&admin).unwrap();
    assert!(ledger.make_payment(&borrower, id, t0() + days(29)).is_ok());
}

#[test]
fn test_pause_requires_authority() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let result = ledger.pause(&borrower);
    assert!(matches!(result, Err(LendingError::NotAuthorized)));
}

#[test]
fn test_ownership_transfer_moves_authority() {
    let mut ledger = new_ledger();
    let admin = account(ADMIN);
    let successor = account("successor");

    ledger.transfer_ownership(&admin, successor.clone()).unwrap();
    assert!(matches!(
        ledger.pause(&admin),
        Err(LendingError::NotAuthorized),
    ));
    assert!(ledger.pause(&successor).is_ok());
}

#[test]
fn test_update_company_wallets() {
    let mut ledger = new_ledger();
    let admin = account(ADMIN);
    let new_wallets = CompanyWallets {
        fee: account("fee-2"),
        insurance: account("insurance-2"),
        matching: account("matching-2"),
    };

    ledger
        .update_company_wallets(&admin, new_wallets.clone())
        .unwrap();
    assert_eq!(ledger.wallets(), &new_wallets);
}

// ===========================================================================
// Stats
// ===========================================================================

#[test]
fn test_stats_track_creations_fundings_and_completions() {
    let mut ledger = new_ledger();
    let borrower = account(BORROWER);
    let lender = account(LENDER);

    let funded = ledger
        .create_loan(&borrower, "FUNDED", dec!(1_000), 3)
        .unwrap();
    ledger.fund_loan(&lender, funded, t0()).unwrap();
    let _unfunded = ledger
        .create_loan(&borrower, "UNFUNDED", dec!(2_000), 6)
        .unwrap();

    let stats = ledger.get_stats();
    assert_eq!(stats.total_loans, 2);
    assert_eq!(stats.total_volume, dec!(1_000));
    assert_eq!(stats.active_loans, 1);

    // completion removes the loan from the active count
    ledger
        .make_payment(&borrower, funded, t0() + days(90))
        .unwrap();
    let stats = ledger.get_stats();
    assert_eq!(stats.active_loans, 0);
    assert_eq!(stats.total_volume, dec!(1_000));
}
