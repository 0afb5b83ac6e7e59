use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use circulate_catalog::ItemId;
use circulate_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money};
use circulate_events::Event;
use circulate_members::MemberId;

use crate::policy::{due_date_for, whole_days_late};

/// Loan identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(pub AggregateId);

impl LoanId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LoanId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Loan status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
}

/// Loan line: one borrowed item with its rate snapshotted at open time.
///
/// Fees are computed per line from the line's own `daily_rate`; a loan with
/// several items never charges an aggregate rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanLine {
    pub item_id: ItemId,
    pub title: String,
    /// Daily late fee in smallest currency unit, per this item's kind.
    pub daily_rate: Money,
}

/// Aggregate root: Loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    id: LoanId,
    member_id: Option<MemberId>,
    member_name: String,
    lines: Vec<LoanLine>,
    borrow_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    return_date: Option<NaiveDate>,
    status: LoanStatus,
    version: u64,
    created: bool,
}

impl Loan {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: LoanId) -> Self {
        Self {
            id,
            member_id: None,
            member_name: String::new(),
            lines: Vec::new(),
            borrow_date: None,
            due_date: None,
            return_date: None,
            status: LoanStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LoanId {
        self.id
    }

    pub fn member_id(&self) -> Option<&MemberId> {
        self.member_id.as_ref()
    }

    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    pub fn lines(&self) -> &[LoanLine] {
        &self.lines
    }

    pub fn borrow_date(&self) -> Option<NaiveDate> {
        self.borrow_date
    }

    /// Due date, fixed when the loan is opened and never changed after.
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.created && self.status == LoanStatus::Active
    }
}

impl AggregateRoot for Loan {
    type Id = LoanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenLoan.
///
/// `due_date_override` exists for constructed fixtures (e.g. seeding an
/// already-overdue loan); when `None` the due date follows the standard
/// two-week policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLoan {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub member_name: String,
    pub lines: Vec<LoanLine>,
    pub borrow_date: NaiveDate,
    pub due_date_override: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnLoan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
    pub return_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanCommand {
    OpenLoan(OpenLoan),
    ReturnLoan(ReturnLoan),
}

/// Event: LoanOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOpened {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub member_name: String,
    pub lines: Vec<LoanLine>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemCheckedOut — the borrow confirmation, one per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCheckedOut {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    pub title: String,
    pub member_name: String,
    pub due_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReturned {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub return_date: NaiveDate,
    pub days_late: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemCheckedIn, one per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCheckedIn {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LateFeeCharged — emitted per overdue line, using that line's rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateFeeCharged {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    pub title: String,
    pub days_late: u32,
    pub fee: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanOpened(LoanOpened),
    ItemCheckedOut(ItemCheckedOut),
    LoanReturned(LoanReturned),
    ItemCheckedIn(ItemCheckedIn),
    LateFeeCharged(LateFeeCharged),
}

impl Event for LoanEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoanEvent::LoanOpened(_) => "loan.opened",
            LoanEvent::ItemCheckedOut(_) => "loan.item.checked_out",
            LoanEvent::LoanReturned(_) => "loan.returned",
            LoanEvent::ItemCheckedIn(_) => "loan.item.checked_in",
            LoanEvent::LateFeeCharged(_) => "loan.late_fee.charged",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LoanEvent::LoanOpened(e) => e.occurred_at,
            LoanEvent::ItemCheckedOut(e) => e.occurred_at,
            LoanEvent::LoanReturned(e) => e.occurred_at,
            LoanEvent::ItemCheckedIn(e) => e.occurred_at,
            LoanEvent::LateFeeCharged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Loan {
    type Command = LoanCommand;
    type Event = LoanEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LoanEvent::LoanOpened(e) => {
                self.id = e.loan_id;
                self.member_id = Some(e.member_id.clone());
                self.member_name = e.member_name.clone();
                self.lines = e.lines.clone();
                self.borrow_date = Some(e.borrow_date);
                self.due_date = Some(e.due_date);
                self.return_date = None;
                self.status = LoanStatus::Active;
                self.created = true;
            }
            LoanEvent::LoanReturned(e) => {
                self.return_date = Some(e.return_date);
                self.status = LoanStatus::Returned;
            }
            // Per-line notifications carry no aggregate state of their own.
            LoanEvent::ItemCheckedOut(_)
            | LoanEvent::ItemCheckedIn(_)
            | LoanEvent::LateFeeCharged(_) => {}
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LoanCommand::OpenLoan(cmd) => self.handle_open(cmd),
            LoanCommand::ReturnLoan(cmd) => self.handle_return(cmd),
        }
    }
}

impl Loan {
    fn ensure_loan_id(&self, loan_id: LoanId) -> Result<(), DomainError> {
        if self.id != loan_id {
            return Err(DomainError::invariant("loan_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenLoan) -> Result<Vec<LoanEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("loan already exists"));
        }
        self.ensure_loan_id(cmd.loan_id)?;

        if cmd.lines.is_empty() {
            return Err(DomainError::validation("loan must contain at least one item"));
        }
        for (i, line) in cmd.lines.iter().enumerate() {
            if cmd.lines[..i].iter().any(|prev| prev.item_id == line.item_id) {
                return Err(DomainError::validation(format!(
                    "item {} listed twice in loan",
                    line.item_id
                )));
            }
        }

        let due_date = cmd
            .due_date_override
            .unwrap_or_else(|| due_date_for(cmd.borrow_date));

        let mut events = vec![LoanEvent::LoanOpened(LoanOpened {
            loan_id: cmd.loan_id,
            member_id: cmd.member_id.clone(),
            member_name: cmd.member_name.clone(),
            lines: cmd.lines.clone(),
            borrow_date: cmd.borrow_date,
            due_date,
            occurred_at: cmd.occurred_at,
        })];

        for line in &cmd.lines {
            events.push(LoanEvent::ItemCheckedOut(ItemCheckedOut {
                loan_id: cmd.loan_id,
                item_id: line.item_id.clone(),
                title: line.title.clone(),
                member_name: cmd.member_name.clone(),
                due_date,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_return(&self, cmd: &ReturnLoan) -> Result<Vec<LoanEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_loan_id(cmd.loan_id)?;

        // Returned is terminal: a second return is an error, not a re-emission
        // of fee events.
        if self.status == LoanStatus::Returned {
            return Err(DomainError::invariant("loan already returned"));
        }

        let due_date = self
            .due_date
            .ok_or_else(|| DomainError::invariant("open loan without due date"))?;
        let member_id = self
            .member_id
            .clone()
            .ok_or_else(|| DomainError::invariant("open loan without member"))?;

        let days_late = whole_days_late(due_date, cmd.return_date);

        let mut events = vec![LoanEvent::LoanReturned(LoanReturned {
            loan_id: cmd.loan_id,
            member_id,
            return_date: cmd.return_date,
            days_late,
            occurred_at: cmd.occurred_at,
        })];

        for line in &self.lines {
            events.push(LoanEvent::ItemCheckedIn(ItemCheckedIn {
                loan_id: cmd.loan_id,
                item_id: line.item_id.clone(),
                title: line.title.clone(),
                occurred_at: cmd.occurred_at,
            }));
        }

        if days_late > 0 {
            for line in &self.lines {
                events.push(LoanEvent::LateFeeCharged(LateFeeCharged {
                    loan_id: cmd.loan_id,
                    item_id: line.item_id.clone(),
                    title: line.title.clone(),
                    days_late,
                    fee: line.daily_rate.times(u64::from(days_late)),
                    occurred_at: cmd.occurred_at,
                }));
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn test_loan_id() -> LoanId {
        LoanId::new(AggregateId::new())
    }

    fn test_member_id() -> MemberId {
        MemberId::new("A001").unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book_line(code: &str) -> LoanLine {
        LoanLine {
            item_id: ItemId::new(code).unwrap(),
            title: "A Little Life".to_string(),
            daily_rate: Money::from_cents(100),
        }
    }

    fn dvd_line(code: &str) -> LoanLine {
        LoanLine {
            item_id: ItemId::new(code).unwrap(),
            title: "The Hunger Games".to_string(),
            daily_rate: Money::from_cents(200),
        }
    }

    fn open_cmd(loan_id: LoanId, lines: Vec<LoanLine>, borrow: NaiveDate) -> OpenLoan {
        OpenLoan {
            loan_id,
            member_id: test_member_id(),
            member_name: "Aleesya Najwa".to_string(),
            lines,
            borrow_date: borrow,
            due_date_override: None,
            occurred_at: test_time(),
        }
    }

    fn opened_loan(lines: Vec<LoanLine>, borrow: NaiveDate) -> Loan {
        let loan_id = test_loan_id();
        let mut loan = Loan::empty(loan_id);
        let events = loan
            .handle(&LoanCommand::OpenLoan(open_cmd(loan_id, lines, borrow)))
            .unwrap();
        for event in &events {
            loan.apply(event);
        }
        loan
    }

    #[test]
    fn open_emits_opened_then_one_checked_out_per_line() {
        let loan_id = test_loan_id();
        let loan = Loan::empty(loan_id);
        let borrow = date(2025, 6, 1);

        let events = loan
            .handle(&LoanCommand::OpenLoan(open_cmd(
                loan_id,
                vec![book_line("B001"), dvd_line("D001")],
                borrow,
            )))
            .unwrap();

        assert_eq!(events.len(), 3);
        match &events[0] {
            LoanEvent::LoanOpened(e) => {
                assert_eq!(e.due_date, date(2025, 6, 15));
                assert_eq!(e.lines.len(), 2);
            }
            other => panic!("expected LoanOpened, got {other:?}"),
        }
        match &events[1] {
            LoanEvent::ItemCheckedOut(e) => {
                assert_eq!(e.item_id.as_str(), "B001");
                assert_eq!(e.member_name, "Aleesya Najwa");
                assert_eq!(e.due_date, date(2025, 6, 15));
            }
            other => panic!("expected ItemCheckedOut, got {other:?}"),
        }
    }

    #[test]
    fn due_date_is_borrow_plus_fourteen_and_immutable() {
        let borrow = date(2025, 6, 1);
        let mut loan = opened_loan(vec![book_line("B001")], borrow);
        assert_eq!(loan.due_date(), Some(date(2025, 6, 15)));

        let events = loan
            .handle(&LoanCommand::ReturnLoan(ReturnLoan {
                loan_id: loan.id_typed(),
                return_date: date(2025, 6, 20),
                occurred_at: test_time(),
            }))
            .unwrap();
        for event in &events {
            loan.apply(event);
        }

        // Returning never touches the due date.
        assert_eq!(loan.due_date(), Some(date(2025, 6, 15)));
    }

    #[test]
    fn due_date_override_is_respected() {
        let loan_id = test_loan_id();
        let loan = Loan::empty(loan_id);
        let mut cmd = open_cmd(loan_id, vec![book_line("B001")], date(2025, 6, 1));
        cmd.due_date_override = Some(date(2025, 5, 27));

        let events = loan.handle(&LoanCommand::OpenLoan(cmd)).unwrap();
        match &events[0] {
            LoanEvent::LoanOpened(e) => assert_eq!(e.due_date, date(2025, 5, 27)),
            other => panic!("expected LoanOpened, got {other:?}"),
        }
    }

    #[test]
    fn empty_loan_is_rejected() {
        let loan_id = test_loan_id();
        let loan = Loan::empty(loan_id);
        let err = loan
            .handle(&LoanCommand::OpenLoan(open_cmd(loan_id, vec![], date(2025, 6, 1))))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn duplicate_item_in_one_loan_is_rejected() {
        let loan_id = test_loan_id();
        let loan = Loan::empty(loan_id);
        let err = loan
            .handle(&LoanCommand::OpenLoan(open_cmd(
                loan_id,
                vec![book_line("B001"), book_line("B001")],
                date(2025, 6, 1),
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reopening_an_open_loan_is_a_conflict() {
        let loan = opened_loan(vec![book_line("B001")], date(2025, 6, 1));
        let err = loan
            .handle(&LoanCommand::OpenLoan(open_cmd(
                loan.id_typed(),
                vec![book_line("B002")],
                date(2025, 6, 2),
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn on_time_return_emits_no_fee_events() {
        let borrow = date(2025, 6, 1);
        let loan = opened_loan(vec![book_line("B001")], borrow);

        let events = loan
            .handle(&LoanCommand::ReturnLoan(ReturnLoan {
                loan_id: loan.id_typed(),
                return_date: date(2025, 6, 15), // exactly the due date
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(events.len(), 2); // LoanReturned + ItemCheckedIn
        match &events[0] {
            LoanEvent::LoanReturned(e) => assert_eq!(e.days_late, 0),
            other => panic!("expected LoanReturned, got {other:?}"),
        }
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LoanEvent::LateFeeCharged(_)))
        );
    }

    #[test]
    fn five_days_late_charges_five_dollars_on_a_book() {
        let loan = opened_loan(vec![book_line("B001")], date(2025, 6, 1));

        let events = loan
            .handle(&LoanCommand::ReturnLoan(ReturnLoan {
                loan_id: loan.id_typed(),
                return_date: date(2025, 6, 20), // due 6/15 + 5
                occurred_at: test_time(),
            }))
            .unwrap();

        let fees: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                LoanEvent::LateFeeCharged(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].days_late, 5);
        assert_eq!(fees[0].fee, Money::from_cents(500));
        assert_eq!(fees[0].fee.to_string(), "$5.00");
    }

    #[test]
    fn multi_item_loan_charges_each_line_at_its_own_rate() {
        let loan = opened_loan(
            vec![book_line("B001"), dvd_line("D001")],
            date(2025, 6, 1),
        );

        let events = loan
            .handle(&LoanCommand::ReturnLoan(ReturnLoan {
                loan_id: loan.id_typed(),
                return_date: date(2025, 6, 18), // 3 days late
                occurred_at: test_time(),
            }))
            .unwrap();

        let fees: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                LoanEvent::LateFeeCharged(f) => Some((f.item_id.as_str(), f.fee)),
                _ => None,
            })
            .collect();
        assert_eq!(
            fees,
            vec![
                ("B001", Money::from_cents(300)),
                ("D001", Money::from_cents(600)),
            ]
        );
    }

    #[test]
    fn second_return_violates_invariant() {
        let mut loan = opened_loan(vec![book_line("B001")], date(2025, 6, 1));
        let cmd = LoanCommand::ReturnLoan(ReturnLoan {
            loan_id: loan.id_typed(),
            return_date: date(2025, 6, 20),
            occurred_at: test_time(),
        });

        let events = loan.handle(&cmd).unwrap();
        for event in &events {
            loan.apply(event);
        }
        assert_eq!(loan.status(), LoanStatus::Returned);

        let err = loan.handle(&cmd).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("already returned") => {}
            other => panic!("expected InvariantViolation for double return, got {other:?}"),
        }
    }

    #[test]
    fn returning_an_unopened_loan_is_not_found() {
        let loan_id = test_loan_id();
        let loan = Loan::empty(loan_id);
        let err = loan
            .handle(&LoanCommand::ReturnLoan(ReturnLoan {
                loan_id,
                return_date: date(2025, 6, 20),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let loan = opened_loan(vec![book_line("B001")], date(2025, 6, 1));
        let before = loan.clone();

        let cmd = LoanCommand::ReturnLoan(ReturnLoan {
            loan_id: loan.id_typed(),
            return_date: date(2025, 6, 20),
            occurred_at: test_time(),
        });

        let events1 = loan.handle(&cmd).unwrap();
        assert_eq!(loan, before);

        let events2 = loan.handle(&cmd).unwrap();
        assert_eq!(loan, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn apply_is_deterministic_and_versions_count_events() {
        let loan_id = test_loan_id();
        let open = open_cmd(loan_id, vec![book_line("B001"), dvd_line("D001")], date(2025, 6, 1));

        let template = Loan::empty(loan_id);
        let events = template.handle(&LoanCommand::OpenLoan(open)).unwrap();

        let mut loan1 = Loan::empty(loan_id);
        let mut loan2 = Loan::empty(loan_id);
        for event in &events {
            loan1.apply(event);
            loan2.apply(event);
        }

        assert_eq!(loan1, loan2);
        assert_eq!(loan1.version(), events.len() as u64);
        assert!(loan1.is_active());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: returning d days past due charges every line
            /// d × its own daily rate; on-time returns charge nothing.
            #[test]
            fn fees_follow_days_late_and_line_rates(
                rate_cents in 1u64..1_000,
                late in 0u64..2_000,
            ) {
                let loan_id = test_loan_id();
                let line = LoanLine {
                    item_id: ItemId::new("X001").unwrap(),
                    title: "Title".to_string(),
                    daily_rate: Money::from_cents(rate_cents),
                };
                let mut loan = Loan::empty(loan_id);
                let borrow = date(2025, 1, 1);
                let events = loan
                    .handle(&LoanCommand::OpenLoan(open_cmd(loan_id, vec![line], borrow)))
                    .unwrap();
                for event in &events {
                    loan.apply(event);
                }

                let due = loan.due_date().unwrap();
                let return_date = due.checked_add_days(Days::new(late)).unwrap();
                let events = loan
                    .handle(&LoanCommand::ReturnLoan(ReturnLoan {
                        loan_id,
                        return_date,
                        occurred_at: test_time(),
                    }))
                    .unwrap();

                let charged: u64 = events
                    .iter()
                    .filter_map(|e| match e {
                        LoanEvent::LateFeeCharged(f) => Some(f.fee.cents()),
                        _ => None,
                    })
                    .sum();
                prop_assert_eq!(charged, rate_cents * late);
            }
        }
    }
}
