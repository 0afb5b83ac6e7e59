//! The circulation desk: single-threaded orchestration of catalog, members
//! and loans.

use std::collections::HashMap;

use chrono::{Local, NaiveDate, Utc};

use circulate_catalog::{Catalog, ItemId, LibraryItem};
use circulate_core::{Aggregate, AggregateId, DomainError, DomainResult, Money};
use circulate_events::{EventBus, InMemoryEventBus, Subscription};
use circulate_loans::{
    Loan, LoanCommand, LoanEvent, LoanId, LoanLine, OpenLoan, ReturnLoan, whole_days_late,
};
use circulate_members::{Member, MemberId, MemberRegistry};

/// One charged fee on a return receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeLine {
    pub item_id: ItemId,
    pub title: String,
    pub amount: Money,
}

/// What the member walks away with after a return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnReceipt {
    pub loan_id: LoanId,
    pub return_date: NaiveDate,
    pub days_late: u32,
    pub fees: Vec<FeeLine>,
}

impl ReturnReceipt {
    pub fn total(&self) -> Money {
        self.fees.iter().map(|f| f.amount).sum()
    }
}

/// The circulation desk.
///
/// Owns all process-lifetime state. Every handler takes the acting member's
/// id explicitly — there is no "current member" field; session context is the
/// caller's problem.
pub struct Desk {
    catalog: Catalog,
    members: MemberRegistry,
    loans: HashMap<LoanId, Loan>,
    bus: InMemoryEventBus<LoanEvent>,
}

impl Desk {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            members: MemberRegistry::new(),
            loans: HashMap::new(),
            bus: InMemoryEventBus::new(),
        }
    }

    pub fn add_item(&mut self, item: LibraryItem) -> DomainResult<()> {
        self.catalog.add(item)
    }

    pub fn register_member(&mut self, member: Member) -> DomainResult<()> {
        self.members.register(member)
    }

    /// Tap the observation channel. Each subscriber sees every loan event
    /// published after subscribing.
    pub fn subscribe(&self) -> Subscription<LoanEvent> {
        self.bus.subscribe()
    }

    /// Item lookup; a miss is the "item not found" user message, not a fault.
    pub fn find_item(&self, id: &ItemId) -> Option<&LibraryItem> {
        self.catalog.find(id)
    }

    /// Member lookup; login is exactly this.
    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.find(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &LibraryItem> {
        self.catalog.iter()
    }

    pub fn available_items(&self) -> impl Iterator<Item = &LibraryItem> {
        self.catalog.available()
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    pub fn loan(&self, id: &LoanId) -> Option<&Loan> {
        self.loans.get(id)
    }

    /// A member's active loans, in borrow order.
    pub fn active_loans(&self, member_id: &MemberId) -> DomainResult<Vec<&Loan>> {
        let member = self.members.find(member_id).ok_or(DomainError::NotFound)?;
        member
            .loans()
            .iter()
            .map(|id| {
                self.loans
                    .get(&LoanId::new(*id))
                    .ok_or_else(|| DomainError::invariant(format!("member holds unknown loan {id}")))
            })
            .collect()
    }

    /// Fees accrued on a member's active loans as of `as_of`, without
    /// returning anything (the dashboard number).
    pub fn outstanding_fees(&self, member_id: &MemberId, as_of: NaiveDate) -> DomainResult<Money> {
        let mut total = Money::ZERO;
        for loan in self.active_loans(member_id)? {
            let Some(due) = loan.due_date() else {
                continue;
            };
            let days_late = whole_days_late(due, as_of);
            for line in loan.lines() {
                total += line.daily_rate.times(u64::from(days_late));
            }
        }
        Ok(total)
    }

    /// Borrow a single item today.
    pub fn borrow(&mut self, member_id: &MemberId, item_id: &ItemId) -> DomainResult<LoanId> {
        self.borrow_on(member_id, std::slice::from_ref(item_id), today(), None)
    }

    /// Open a loan for one or more items on an explicit date.
    ///
    /// `due_date_override` skips the standard two-week policy; it exists for
    /// constructed fixtures and backdated entries.
    pub fn borrow_on(
        &mut self,
        member_id: &MemberId,
        item_ids: &[ItemId],
        borrow_date: NaiveDate,
        due_date_override: Option<NaiveDate>,
    ) -> DomainResult<LoanId> {
        let member = self.members.find(member_id).ok_or(DomainError::NotFound)?;
        let member_name = member.name().to_string();

        // Resolve and vet every item before touching any state.
        let mut lines = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            let item = self.catalog.find(item_id).ok_or(DomainError::NotFound)?;
            if !item.is_available() {
                return Err(DomainError::conflict(format!(
                    "item {item_id} is currently borrowed"
                )));
            }
            lines.push(LoanLine {
                item_id: item_id.clone(),
                title: item.title().to_string(),
                daily_rate: item.daily_late_fee(),
            });
        }

        let loan_id = LoanId::new(AggregateId::new());
        let mut loan = Loan::empty(loan_id);
        let events = loan.handle(&LoanCommand::OpenLoan(OpenLoan {
            loan_id,
            member_id: member_id.clone(),
            member_name,
            lines,
            borrow_date,
            due_date_override,
            occurred_at: Utc::now(),
        }))?;
        for event in &events {
            loan.apply(event);
        }

        // Commit: statuses, member record, ledger. The availability check
        // above makes these infallible in practice; errors still propagate.
        for item_id in item_ids {
            self.catalog.check_out(item_id)?;
        }
        self.members
            .find_mut(member_id)
            .ok_or(DomainError::NotFound)?
            .add_loan(loan_id.0)?;
        self.loans.insert(loan_id, loan);

        self.announce(&events);
        Ok(loan_id)
    }

    /// Return a loan today.
    pub fn return_loan(&mut self, loan_id: LoanId) -> DomainResult<ReturnReceipt> {
        self.return_loan_on(loan_id, today())
    }

    /// Return a loan on an explicit date.
    ///
    /// A second return of the same loan is an invariant violation — the
    /// terminal transition happens once and fee events are never re-emitted.
    pub fn return_loan_on(
        &mut self,
        loan_id: LoanId,
        return_date: NaiveDate,
    ) -> DomainResult<ReturnReceipt> {
        let loan = self.loans.get(&loan_id).ok_or(DomainError::NotFound)?;

        let events = loan.handle(&LoanCommand::ReturnLoan(ReturnLoan {
            loan_id,
            return_date,
            occurred_at: Utc::now(),
        }))?;

        let member_id = loan
            .member_id()
            .cloned()
            .ok_or_else(|| DomainError::invariant("open loan without member"))?;
        let item_ids: Vec<ItemId> = loan.lines().iter().map(|l| l.item_id.clone()).collect();

        if let Some(loan) = self.loans.get_mut(&loan_id) {
            for event in &events {
                loan.apply(event);
            }
        }
        for item_id in &item_ids {
            self.catalog.check_in(item_id)?;
        }
        self.members
            .find_mut(&member_id)
            .ok_or(DomainError::NotFound)?
            .remove_loan(&loan_id.0)?;

        let receipt = receipt_from(loan_id, return_date, &events);
        self.announce(&events);
        Ok(receipt)
    }

    /// Publish to the bus and mirror onto the log.
    fn announce(&self, events: &[LoanEvent]) {
        for event in events {
            match event {
                LoanEvent::ItemCheckedOut(e) => tracing::info!(
                    item = %e.item_id,
                    title = %e.title,
                    member = %e.member_name,
                    due = %e.due_date,
                    "item borrowed"
                ),
                LoanEvent::ItemCheckedIn(e) => tracing::info!(
                    item = %e.item_id,
                    title = %e.title,
                    "item returned"
                ),
                LoanEvent::LateFeeCharged(e) => tracing::info!(
                    item = %e.item_id,
                    days_late = e.days_late,
                    fee = %e.fee,
                    "late fee charged"
                ),
                LoanEvent::LoanOpened(_) | LoanEvent::LoanReturned(_) => {}
            }

            if self.bus.publish(event.clone()).is_err() {
                tracing::warn!("observation channel unavailable; event dropped");
            }
        }
    }
}

impl Default for Desk {
    fn default() -> Self {
        Self::new()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn receipt_from(loan_id: LoanId, return_date: NaiveDate, events: &[LoanEvent]) -> ReturnReceipt {
    let days_late = events
        .iter()
        .find_map(|e| match e {
            LoanEvent::LoanReturned(r) => Some(r.days_late),
            _ => None,
        })
        .unwrap_or(0);

    let fees = events
        .iter()
        .filter_map(|e| match e {
            LoanEvent::LateFeeCharged(f) => Some(FeeLine {
                item_id: f.item_id.clone(),
                title: f.title.clone(),
                amount: f.fee,
            }),
            _ => None,
        })
        .collect();

    ReturnReceipt {
        loan_id,
        return_date,
        days_late,
        fees,
    }
}
