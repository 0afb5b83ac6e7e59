use core::str::FromStr;
use serde::{Deserialize, Serialize};

use circulate_core::{AggregateId, DomainError, DomainResult, Entity};

/// Human-assigned member code (e.g. "A001").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DomainError::invalid_id("MemberId: empty code"));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid_id(format!(
                "MemberId: whitespace in {code:?}"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MemberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MemberId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A registered library member.
///
/// The active-loan list is private; it holds only loans not yet returned,
/// in borrow order, with no duplicates. Loans are referenced by their
/// [`AggregateId`] — the loan aggregate itself lives in the loan ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    name: String,
    active_loans: Vec<AggregateId>,
}

impl Member {
    pub fn new(id: MemberId, name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("member name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            active_loans: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active loan ids, in borrow order (read-only view).
    pub fn loans(&self) -> &[AggregateId] {
        &self.active_loans
    }

    pub fn has_loan(&self, loan: &AggregateId) -> bool {
        self.active_loans.contains(loan)
    }

    /// Record a newly opened loan.
    pub fn add_loan(&mut self, loan: AggregateId) -> DomainResult<()> {
        if self.has_loan(&loan) {
            return Err(DomainError::conflict(format!(
                "loan {loan} already recorded for member {}",
                self.id
            )));
        }
        self.active_loans.push(loan);
        Ok(())
    }

    /// Drop a loan on return. Unknown ids are an error: the caller is
    /// claiming a return of a loan this member never held (or held no longer).
    pub fn remove_loan(&mut self, loan: &AggregateId) -> DomainResult<()> {
        let pos = self
            .active_loans
            .iter()
            .position(|held| held == loan)
            .ok_or(DomainError::NotFound)?;
        self.active_loans.remove(pos);
        Ok(())
    }
}

impl Entity for Member {
    type Id = MemberId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
