//! Due-date and late-day policy (date-only calendar).

use chrono::{Days, NaiveDate};

/// Fixed loan period: due date is the borrow date plus two weeks.
pub const LOAN_PERIOD_DAYS: u64 = 14;

/// Standard due date for a loan opened on `borrow_date`.
pub fn due_date_for(borrow_date: NaiveDate) -> NaiveDate {
    // Days::new cannot fail and calendar addition only fails at the
    // representable-date horizon, far outside library time.
    borrow_date
        .checked_add_days(Days::new(LOAN_PERIOD_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

/// Whole calendar days past due, clamped to zero.
///
/// Same-day (or early) return counts as zero days late; partial days do not
/// exist on a date-only calendar.
pub fn whole_days_late(due_date: NaiveDate, return_date: NaiveDate) -> u32 {
    let days = (return_date - due_date).num_days();
    u32::try_from(days).unwrap_or(0)
}
