//! Immutable ordered views of a live set

use crate::entity::Entity;
use std::fmt;
use std::sync::Arc;

/// Point-in-time view of a live set, in insertion order
///
/// Cloning is O(1) and shares structure with the live set; later deltas
/// never show through an existing snapshot.
#[derive(Clone)]
pub struct Snapshot<E: Entity> {
    items: im::Vector<Arc<E>>,
}

impl<E: Entity> Snapshot<E> {
    pub(crate) fn new(items: im::Vector<Arc<E>>) -> Self {
        Self { items }
    }

    /// Number of entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entity at position
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&E> {
        self.items.get(index).map(|e| &**e)
    }

    /// Entity by id
    #[must_use]
    pub fn find(&self, id: &E::Id) -> Option<&E> {
        self.iter().find(|e| e.id() == id)
    }

    /// Check if an entity with this id is present
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &E::Id) -> bool {
        self.find(id).is_some()
    }

    /// Iterate entities in order
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.items.iter().map(|e| &**e)
    }

    /// Shared handles to the entities, in order
    pub fn shared(&self) -> impl Iterator<Item = &Arc<E>> + '_ {
        self.items.iter()
    }

    /// Ids in order
    #[must_use]
    pub fn ids(&self) -> Vec<E::Id> {
        self.iter().map(|e| e.id().clone()).collect()
    }

    /// Clone entities into a vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<E> {
        self.iter().cloned().collect()
    }
}

impl<E: Entity> Default for Snapshot<E> {
    fn default() -> Self {
        Self::new(im::Vector::new())
    }
}

impl<E: Entity + fmt::Debug> fmt::Debug for Snapshot<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
