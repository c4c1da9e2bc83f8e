//! Loan amortization schedules for amortized, equal-principal and
//! interest-only repayment.

pub mod error;
pub mod export;
pub mod loan;
pub mod payoff;

pub use error::{LoanError, LoanResult};
pub use loan::{
    Amortization, LoanParameters, LoanPayment, LoanSummary, PaymentInfo, PmtSchedule,
    RepaymentMethod,
};
pub use payoff::Locale;
