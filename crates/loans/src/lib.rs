//! Loans domain module.
//!
//! The loan lifecycle (Active → Returned) implemented as a deterministic
//! aggregate: commands in, events out, no IO. Due-date and late-fee policy
//! live in [`policy`].

pub mod loan;
pub mod policy;

pub use loan::{
    ItemCheckedIn, ItemCheckedOut, LateFeeCharged, Loan, LoanCommand, LoanEvent, LoanId,
    LoanLine, LoanOpened, LoanReturned, LoanStatus, OpenLoan, ReturnLoan,
};
pub use policy::{LOAN_PERIOD_DAYS, due_date_for, whole_days_late};
