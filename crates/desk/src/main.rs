//! Demo entry point: seed the sample library, run one borrow/return round
//! trip, and report outstanding fees.

use anyhow::Result;
use chrono::Local;

use circulate_catalog::ItemId;
use circulate_core::Entity;
use circulate_desk::seed;
use circulate_events::Event;
use circulate_members::MemberId;

fn main() -> Result<()> {
    circulate_observability::init();

    let mut desk = seed::sample_library()?;
    let tap = desk.subscribe();
    let today = Local::now().date_naive();

    tracing::info!(items = desk.items().count(), members = desk.members().count(), "library seeded");

    // Amirul borrows and promptly returns The Midnight Library.
    let amirul = MemberId::new("A002")?;
    let loan_id = desk.borrow(&amirul, &ItemId::new("B002")?)?;
    let receipt = desk.return_loan(loan_id)?;
    tracing::info!(
        loan = %loan_id,
        days_late = receipt.days_late,
        total = %receipt.total(),
        "round trip complete"
    );

    // Dashboard: outstanding fees per member.
    let member_ids: Vec<MemberId> = desk.members().map(|m| m.id().clone()).collect();
    for member_id in member_ids {
        let owed = desk.outstanding_fees(&member_id, today)?;
        if !owed.is_zero() {
            tracing::info!(member = %member_id, owed = %owed, "outstanding fees");
        }
    }

    for event in tap.drain() {
        tracing::debug!(event = event.event_type(), "observed");
    }

    Ok(())
}
