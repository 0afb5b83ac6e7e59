use core::str::FromStr;
use serde::{Deserialize, Serialize};

use circulate_core::{DomainError, DomainResult, Entity, Money};

/// Human-assigned catalog code (e.g. "B001").
///
/// Immutable once created; uniqueness across the catalog is enforced by
/// [`crate::Catalog::add`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DomainError::invalid_id("ItemId: empty code"));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid_id(format!(
                "ItemId: whitespace in {code:?}"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Item kind: closed set of variants, each carrying its own metadata and
/// daily late-fee rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ItemKind {
    Book { author: String, isbn: String },
    Magazine { issue: String },
    Dvd { director: String },
}

impl ItemKind {
    /// Fee accrued per whole day past the due date.
    pub fn daily_late_fee(&self) -> Money {
        match self {
            ItemKind::Book { .. } => Money::from_cents(100),
            ItemKind::Magazine { .. } => Money::from_cents(50),
            ItemKind::Dvd { .. } => Money::from_cents(200),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Book { .. } => "book",
            ItemKind::Magazine { .. } => "magazine",
            ItemKind::Dvd { .. } => "dvd",
        }
    }
}

/// Availability flag, flipped only by the loan lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Borrowed,
}

/// A catalogued item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    id: ItemId,
    title: String,
    kind: ItemKind,
    status: ItemStatus,
}

impl LibraryItem {
    pub fn new(id: ItemId, title: impl Into<String>, kind: ItemKind) -> DomainResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        Ok(Self {
            id,
            title,
            kind,
            status: ItemStatus::Available,
        })
    }

    pub fn book(
        id: ItemId,
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> DomainResult<Self> {
        Self::new(
            id,
            title,
            ItemKind::Book {
                author: author.into(),
                isbn: isbn.into(),
            },
        )
    }

    pub fn magazine(
        id: ItemId,
        title: impl Into<String>,
        issue: impl Into<String>,
    ) -> DomainResult<Self> {
        Self::new(
            id,
            title,
            ItemKind::Magazine {
                issue: issue.into(),
            },
        )
    }

    pub fn dvd(
        id: ItemId,
        title: impl Into<String>,
        director: impl Into<String>,
    ) -> DomainResult<Self> {
        Self::new(
            id,
            title,
            ItemKind::Dvd {
                director: director.into(),
            },
        )
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }

    /// Daily rate for this item (dispatched by variant).
    pub fn daily_late_fee(&self) -> Money {
        self.kind.daily_late_fee()
    }

    /// Fee owed after `days_late` whole days past the due date.
    ///
    /// Zero days means zero fee. Negative inputs are unrepresentable here;
    /// calendar arithmetic is clamped where dates are subtracted.
    pub fn late_fee(&self, days_late: u32) -> Money {
        self.daily_late_fee().times(u64::from(days_late))
    }

    pub(crate) fn mark_borrowed(&mut self) {
        self.status = ItemStatus::Borrowed;
    }

    pub(crate) fn mark_available(&mut self) {
        self.status = ItemStatus::Available;
    }
}

impl Entity for LibraryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_id(code: &str) -> ItemId {
        ItemId::new(code).unwrap()
    }

    fn sample_book() -> LibraryItem {
        LibraryItem::book(item_id("B001"), "A Little Life", "Hanya Yanagihara", "978-0385539258")
            .unwrap()
    }

    #[test]
    fn item_id_rejects_empty_and_whitespace() {
        assert!(matches!(ItemId::new(""), Err(DomainError::InvalidId(_))));
        assert!(matches!(ItemId::new("  "), Err(DomainError::InvalidId(_))));
        assert!(matches!(ItemId::new("B 01"), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn new_items_start_available() {
        assert_eq!(sample_book().status(), ItemStatus::Available);
    }

    #[test]
    fn empty_title_is_rejected() {
        let err = LibraryItem::magazine(item_id("M001"), "  ", "January 2025").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn daily_rates_per_variant() {
        let book = sample_book();
        let magazine =
            LibraryItem::magazine(item_id("M001"), "Mastika", "January 2025").unwrap();
        let dvd = LibraryItem::dvd(item_id("D001"), "The Hunger Games", "Gary Ross").unwrap();

        assert_eq!(book.daily_late_fee(), Money::from_cents(100));
        assert_eq!(magazine.daily_late_fee(), Money::from_cents(50));
        assert_eq!(dvd.daily_late_fee(), Money::from_cents(200));
    }

    #[test]
    fn five_days_late_on_a_book_is_five_dollars() {
        assert_eq!(sample_book().late_fee(5), Money::from_cents(500));
        assert_eq!(sample_book().late_fee(5).to_string(), "$5.00");
    }

    #[test]
    fn zero_days_late_is_zero_fee_for_every_variant() {
        let items = [
            sample_book(),
            LibraryItem::magazine(item_id("M001"), "Mastika", "January 2025").unwrap(),
            LibraryItem::dvd(item_id("D001"), "The Hunger Games", "Gary Ross").unwrap(),
        ];
        for item in items {
            assert_eq!(item.late_fee(0), Money::ZERO);
        }
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_kind() -> impl Strategy<Value = ItemKind> {
            prop_oneof![
                Just(ItemKind::Book {
                    author: "a".to_string(),
                    isbn: "i".to_string()
                }),
                Just(ItemKind::Magazine {
                    issue: "1".to_string()
                }),
                Just(ItemKind::Dvd {
                    director: "d".to_string()
                }),
            ]
        }

        proptest! {
            /// Property: for every variant and day count, the fee is exactly
            /// days × that variant's daily rate.
            #[test]
            fn late_fee_is_days_times_rate(kind in any_kind(), days in 0u32..10_000) {
                let item = LibraryItem::new(
                    ItemId::new("X001").unwrap(),
                    "Title",
                    kind.clone(),
                ).unwrap();

                prop_assert_eq!(
                    item.late_fee(days).cents(),
                    u64::from(days) * kind.daily_late_fee().cents()
                );
            }
        }
    }
}
