pub mod amortization;
pub mod arrears;
pub mod rates;
