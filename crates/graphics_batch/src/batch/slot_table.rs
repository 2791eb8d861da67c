//! Entity ↔ slot mapping for one batch
//!
//! Slots are dense indices `[0, len)` into every attribute array of a batch.
//! Removal is a swap-remove: the entity occupying the last slot is moved into
//! the freed slot, so storage never has holes and can be uploaded as one
//! contiguous range.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;

use crate::error::{BatchError, BatchResult};

/// Externally issued entity identifier, never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(NonZeroU32);

impl EntityId {
    /// Wrap a raw id, returning `None` for zero
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// Raw numeric id
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl From<NonZeroU32> for EntityId {
    fn from(id: NonZeroU32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An entity relocated by a swap-remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedEntity {
    /// Entity whose slot changed
    pub entity: EntityId,
    /// Slot it occupied before the removal (always the last slot)
    pub from: u32,
    /// Slot it occupies now (the freed slot)
    pub to: u32,
}

/// Outcome of [`EntitySlotTable::remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRemoval {
    /// Slot the removed entity occupied
    pub slot: u32,
    /// Entity moved into `slot`, if the removed entity was not last
    pub moved: Option<MovedEntity>,
}

/// Bidirectional entity ↔ slot table
#[derive(Debug, Default)]
pub struct EntitySlotTable {
    slots: HashMap<EntityId, u32>,
    entities: Vec<EntityId>,
}

impl EntitySlotTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with room for `capacity` entities before rehashing
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
        }
    }

    /// Assign the next slot to `entity`
    pub fn insert(&mut self, entity: EntityId) -> BatchResult<u32> {
        if self.slots.contains_key(&entity) {
            return Err(BatchError::DuplicateEntity(entity));
        }

        let requested = self.entities.len() + 1;
        self.entities
            .try_reserve(1)
            .map_err(|source| BatchError::AllocationFailure { what: "slot table", requested, source })?;
        self.slots
            .try_reserve(1)
            .map_err(|source| BatchError::AllocationFailure { what: "slot table", requested, source })?;

        let slot = self.entities.len() as u32;
        self.entities.push(entity);
        self.slots.insert(entity, slot);
        Ok(slot)
    }

    /// Release the slot held by `entity`, filling it with the last entity
    pub fn remove(&mut self, entity: EntityId) -> BatchResult<SlotRemoval> {
        let slot = self.slots.remove(&entity).ok_or(BatchError::UnknownEntity(entity))?;
        let last = (self.entities.len() - 1) as u32;

        self.entities.swap_remove(slot as usize);

        let moved = if slot == last {
            None
        } else {
            let moved_entity = self.entities[slot as usize];
            self.slots.insert(moved_entity, slot);
            Some(MovedEntity { entity: moved_entity, from: last, to: slot })
        };

        Ok(SlotRemoval { slot, moved })
    }

    /// Slot currently held by `entity`
    pub fn lookup(&self, entity: EntityId) -> Option<u32> {
        self.slots.get(&entity).copied()
    }

    /// Entity resident in `slot`
    pub fn entity_at(&self, slot: u32) -> Option<EntityId> {
        self.entities.get(slot as usize).copied()
    }

    /// Check if `entity` is resident
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slots.contains_key(&entity)
    }

    /// Resident entities in slot order
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Number of resident entities (the active count)
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entity is resident
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Forget every entity
    pub fn clear(&mut self) {
        self.slots.clear();
        self.entities.clear();
    }
}
