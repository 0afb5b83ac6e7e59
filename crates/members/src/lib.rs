//! Members domain module.
//!
//! Library members and the registry that owns them. A member tracks the ids
//! of its active (not yet returned) loans behind explicit `add_loan` /
//! `remove_loan` mutations; the backing collection is never handed out
//! mutably.

pub mod member;
pub mod registry;

pub use member::{Member, MemberId};
pub use registry::MemberRegistry;
