//! In-memory member registry.

use std::collections::BTreeMap;

use circulate_core::{DomainError, DomainResult, Entity};

use crate::member::{Member, MemberId};

/// The member collection, keyed (and iterated) by member code.
#[derive(Debug, Default, Clone)]
pub struct MemberRegistry {
    members: BTreeMap<MemberId, Member>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member. Codes are unique for the life of the registry.
    pub fn register(&mut self, member: Member) -> DomainResult<()> {
        if self.members.contains_key(member.id()) {
            return Err(DomainError::conflict(format!(
                "member {} already registered",
                member.id()
            )));
        }
        self.members.insert(member.id().clone(), member);
        Ok(())
    }

    /// Look a member up by code. Login is exactly this lookup: a miss is the
    /// "invalid member identifier" case, surfaced to the caller as `None`.
    pub fn find(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn find_mut(&mut self, id: &MemberId) -> Option<&mut Member> {
        self.members.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
