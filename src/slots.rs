//! Id-addressed table of boxed entries.
//!
//! Entries are boxed so their addresses survive the table growing while one
//! of them is running.

use crate::CoId;
use crate::error::{Error, Result};

pub struct SlotTable<T> {
    slots: Vec<Option<Box<T>>>,
    /// Occupied slots
    live: usize,
}

impl<T> SlotTable<T> {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| Error::alloc("slot table", capacity))?;
        slots.resize_with(capacity, || None);
        Ok(Self { slots, live: 0 })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Store `entry` and return its id.
    ///
    /// A full table doubles and the entry takes the first new slot. Otherwise
    /// the scan for a free slot starts at `live` rather than 0, so freed ids
    /// are handed out in rotation instead of always reusing the lowest.
    pub fn insert(&mut self, entry: Box<T>) -> Result<CoId> {
        let cap = self.capacity();
        if self.live >= cap {
            self.slots
                .try_reserve_exact(cap)
                .map_err(|_| Error::alloc("slot table", cap * 2))?;
            self.slots.resize_with(cap * 2, || None);
            self.slots[cap] = Some(entry);
            self.live += 1;
            return Ok(cap);
        }

        let id = (0..cap)
            .map(|i| (i + self.live) % cap)
            .find(|&id| self.slots[id].is_none())
            .expect("slot table has a free slot when live < capacity");
        self.slots[id] = Some(entry);
        self.live += 1;
        Ok(id)
    }

    /// Panics if `id` was never a slot of this table.
    #[inline]
    pub fn check(&self, id: CoId) {
        assert!(
            id < self.capacity(),
            "coroutine id {id} out of range (capacity {})",
            self.capacity()
        );
    }

    pub fn get(&self, id: CoId) -> Option<&T> {
        self.check(id);
        self.slots[id].as_deref()
    }

    pub fn get_mut(&mut self, id: CoId) -> Option<&mut T> {
        self.check(id);
        self.slots[id].as_deref_mut()
    }

    pub fn remove(&mut self, id: CoId) -> Option<Box<T>> {
        self.check(id);
        let entry = self.slots[id].take();
        if entry.is_some() {
            self.live -= 1;
        }
        entry
    }

    /// Drop every entry, keeping the table size.
    pub fn clear(&mut self) -> usize {
        let dropped = self.live;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.live = 0;
        dropped
    }
}
