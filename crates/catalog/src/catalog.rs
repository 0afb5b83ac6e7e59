//! In-memory catalog: owns every [`LibraryItem`] and guards status changes.

use std::collections::BTreeMap;

use circulate_core::{DomainError, DomainResult, Entity};

use crate::item::{ItemId, LibraryItem};

/// The item collection, keyed (and iterated) by catalog code.
///
/// Status transitions go through [`Catalog::check_out`] and
/// [`Catalog::check_in`] only; no caller gets a mutable handle to an item.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    items: BTreeMap<ItemId, LibraryItem>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the catalog.
    ///
    /// Rejects a second item with the same code: codes are unique and
    /// immutable for the life of the catalog.
    pub fn add(&mut self, item: LibraryItem) -> DomainResult<()> {
        if self.items.contains_key(item.id()) {
            return Err(DomainError::conflict(format!(
                "item {} already catalogued",
                item.id()
            )));
        }
        self.items.insert(item.id().clone(), item);
        Ok(())
    }

    /// Look an item up by code. A miss is not an error at this level.
    pub fn find(&self, id: &ItemId) -> Option<&LibraryItem> {
        self.items.get(id)
    }

    /// Flip an item to Borrowed as part of opening a loan.
    pub fn check_out(&mut self, id: &ItemId) -> DomainResult<&LibraryItem> {
        let item = self.items.get_mut(id).ok_or(DomainError::NotFound)?;
        if !item.is_available() {
            return Err(DomainError::conflict(format!(
                "item {id} is currently borrowed"
            )));
        }
        item.mark_borrowed();
        Ok(item)
    }

    /// Flip an item back to Available as part of returning a loan.
    pub fn check_in(&mut self, id: &ItemId) -> DomainResult<&LibraryItem> {
        let item = self.items.get_mut(id).ok_or(DomainError::NotFound)?;
        if item.is_available() {
            return Err(DomainError::invariant(format!(
                "item {id} is not checked out"
            )));
        }
        item.mark_available();
        Ok(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibraryItem> {
        self.items.values()
    }

    pub fn available(&self) -> impl Iterator<Item = &LibraryItem> {
        self.items.values().filter(|item| item.is_available())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
