//! Catalog domain module.
//!
//! Library items (books, magazines, DVDs) as a closed sum type with
//! per-variant late-fee rates, and the in-memory catalog that owns them.
//! Item status only changes through [`Catalog::check_out`] and
//! [`Catalog::check_in`], which the circulation desk drives as part of the
//! loan lifecycle.

pub mod catalog;
pub mod item;

pub use catalog::Catalog;
pub use item::{ItemId, ItemKind, ItemStatus, LibraryItem};
