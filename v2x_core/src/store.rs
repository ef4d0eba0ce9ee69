//! Entity state store: latest snapshot per entity id.
//!
//! Last-writer-wins per id; an upsert replaces the prior record wholesale.
//! Enumeration yields entities in first-seen insertion order — the conflict
//! scanner's output order is defined in those terms, so the order vector is
//! part of the contract, not an implementation nicety.
//!
//! The store never evicts on its own. Entities leave only through
//! [`EntityStore::remove`] or an explicit [`EntityStore::evict_stale`]
//! sweep driven by the caller.

use crate::types::EntitySnapshot;
use std::collections::HashMap;

/// Mapping from entity id to its latest kinematic snapshot.
#[derive(Debug, Default)]
pub struct EntityStore {
    /// Latest record per id
    entities: HashMap<String, EntitySnapshot>,

    /// Ids in first-insertion order; parallel to `entities` keys
    order: Vec<String>,
}

impl EntityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `snapshot.id`.
    ///
    /// A replacement keeps the id's original position in enumeration order.
    pub fn upsert(&mut self, snapshot: EntitySnapshot) {
        if !self.entities.contains_key(&snapshot.id) {
            self.order.push(snapshot.id.clone());
        }
        self.entities.insert(snapshot.id.clone(), snapshot);
    }

    /// Latest record for `id`, or `None` if the entity was never seen.
    pub fn get(&self, id: &str) -> Option<&EntitySnapshot> {
        self.entities.get(id)
    }

    /// All current records in insertion order.
    pub fn all(&self) -> Vec<&EntitySnapshot> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    /// Iterates current records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Removes an entity explicitly (e.g. on an "entity left" event).
    pub fn remove(&mut self, id: &str) -> Option<EntitySnapshot> {
        let removed = self.entities.remove(id);
        if removed.is_some() {
            self.order.retain(|o| o != id);
        }
        removed
    }

    /// Removes every entity whose snapshot is older than `ttl_s` at `now`.
    /// Returns the evicted ids in enumeration order.
    pub fn evict_stale(&mut self, now: f64, ttl_s: f64) -> Vec<String> {
        let stale: Vec<String> = self
            .order
            .iter()
            .filter(|id| {
                self.entities
                    .get(*id)
                    .map(|e| now - e.timestamp > ttl_s)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        for id in &stale {
            self.entities.remove(id);
        }
        self.order.retain(|id| self.entities.contains_key(id));
        stale
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entity has reported yet.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
