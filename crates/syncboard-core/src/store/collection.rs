// ── Immutable entity collection ──
//
// One canonical snapshot of a collection. Snapshots are never edited in
// place: every mutation produces a new `Collection` that shares the
// unchanged `Arc<E>` values with its predecessor.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::warn;

use crate::model::{Entity, EntityId};

/// Shared, immutable view of a collection.
pub type Snapshot<E> = Arc<Collection<E>>;

/// Id-keyed records in remote list order.
///
/// Lookups are O(1); iteration order is the order records arrived in and
/// serves as the final tie-break of the derived view.
#[derive(Debug)]
pub struct Collection<E: Entity> {
    entries: IndexMap<EntityId, Arc<E>>,
}

/// A pure state transition on a collection.
#[derive(Debug, Clone)]
pub enum Mutation<E: Entity> {
    /// Insert a record, or replace the one with the same id in place.
    Upsert(Arc<E>),
    /// Merge a patch into an existing record. No-op if absent.
    Patch { id: EntityId, patch: E::Patch },
    Remove(EntityId),
    /// Swap the record at `id` for `entity`, keeping its position. Used to
    /// turn a placeholder into the confirmed record.
    Replace { id: EntityId, entity: Arc<E> },
    /// Put back a prior entry (or its absence) at its prior position.
    Restore {
        id: EntityId,
        entry: Option<Arc<E>>,
        index: Option<usize>,
    },
}

impl<E: Entity> Collection<E> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Build from a remote listing. Duplicate ids keep the last record.
    pub fn from_entities(items: impl IntoIterator<Item = E>) -> Self {
        let mut entries = IndexMap::new();
        for item in items {
            let id = item.id().clone();
            if entries.insert(id.clone(), Arc::new(item)).is_some() {
                warn!(kind = %E::KIND, %id, "duplicate id in listing; keeping the last record");
            }
        }
        Self { entries }
    }

    pub fn get(&self, id: &EntityId) -> Option<&Arc<E>> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    /// Position of `id` in list order.
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.entries.get_index_of(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<E>> {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    /// Compute the collection that results from `mutation`.
    pub fn apply(&self, mutation: &Mutation<E>) -> Self {
        let mut entries = self.entries.clone();

        match mutation {
            Mutation::Upsert(entity) => {
                entries.insert(entity.id().clone(), Arc::clone(entity));
            }
            Mutation::Patch { id, patch } => {
                if let Some(slot) = entries.get_mut(id) {
                    let mut next = E::clone(slot);
                    next.apply_patch(patch);
                    *slot = Arc::new(next);
                }
            }
            Mutation::Remove(id) => {
                entries.shift_remove(id);
            }
            Mutation::Replace { id, entity } => {
                let index = entries.get_index_of(id);
                entries.shift_remove(id);
                let new_id = entity.id().clone();
                if let Some(existing) = entries.get_mut(&new_id) {
                    // A reload already brought the confirmed record in.
                    *existing = Arc::clone(entity);
                } else {
                    let at = index.unwrap_or(entries.len()).min(entries.len());
                    entries.shift_insert(at, new_id, Arc::clone(entity));
                }
            }
            Mutation::Restore { id, entry, index } => match entry {
                None => {
                    entries.shift_remove(id);
                }
                Some(entity) => {
                    if let Some(existing) = entries.get_mut(id) {
                        *existing = Arc::clone(entity);
                    } else {
                        let at = index.unwrap_or(entries.len()).min(entries.len());
                        entries.shift_insert(at, id.clone(), Arc::clone(entity));
                    }
                }
            },
        }

        Self { entries }
    }

    /// The `Restore` mutation that undoes any change to `id` made since
    /// this snapshot.
    pub fn restore_of(&self, id: &EntityId) -> Mutation<E> {
        Mutation::Restore {
            id: id.clone(),
            entry: self.entries.get(id).cloned(),
            index: self.entries.get_index_of(id),
        }
    }

    pub(crate) fn upsert_in_place(&mut self, entity: Arc<E>) {
        self.entries.insert(entity.id().clone(), entity);
    }

    pub(crate) fn remove_in_place(&mut self, id: &EntityId) {
        self.entries.shift_remove(id);
    }
}

impl<E: Entity> Default for Collection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for Collection<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

/// Equality of contents and order.
impl<E: Entity> PartialEq for Collection<E> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
    }
}
