//! Sample library fixture.

use chrono::{Days, Local};

use circulate_catalog::{ItemId, LibraryItem};
use circulate_core::DomainResult;
use circulate_members::{Member, MemberId};

use crate::desk::Desk;

/// Build the demo library: five items, four members, and one loan for
/// Aleesya that is already five days overdue (seeded via an explicit
/// due-date override rather than any clock trickery).
pub fn sample_library() -> DomainResult<Desk> {
    let mut desk = Desk::new();

    desk.add_item(LibraryItem::book(
        ItemId::new("B001")?,
        "A Little Life",
        "Hanya Yanagihara",
        "978-0385539258",
    )?)?;
    desk.add_item(LibraryItem::book(
        ItemId::new("B002")?,
        "The Midnight Library",
        "Matt Haig",
        "978-0525559474",
    )?)?;
    desk.add_item(LibraryItem::book(
        ItemId::new("B003")?,
        "Project Hail Mary",
        "Andy Weir",
        "978-0593135204",
    )?)?;
    desk.add_item(LibraryItem::magazine(
        ItemId::new("M001")?,
        "Mastika",
        "January 2025",
    )?)?;
    desk.add_item(LibraryItem::dvd(
        ItemId::new("D001")?,
        "The Hunger Games",
        "Gary Ross",
    )?)?;

    desk.register_member(Member::new(MemberId::new("A001")?, "Aleesya Najwa")?)?;
    desk.register_member(Member::new(MemberId::new("A002")?, "Amirul Danial")?)?;
    desk.register_member(Member::new(MemberId::new("A003")?, "Alya Natasha")?)?;
    desk.register_member(Member::new(MemberId::new("A004")?, "Arieq Danish")?)?;

    let today = Local::now().date_naive();
    let five_days_ago = today.checked_sub_days(Days::new(5)).unwrap_or(today);
    desk.borrow_on(
        &MemberId::new("A001")?,
        &[ItemId::new("B001")?],
        today,
        Some(five_days_ago),
    )?;

    Ok(desk)
}
