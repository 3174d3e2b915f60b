//! Live filtered views over a store.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::store::EStore;
use crate::types::{ActionType, Predicate, StoreConfig};
use crate::view::{StoreBase, StoreView};

/// The subset of a store's entities matching a fixed predicate.
///
/// A slice registered with [`EStore::add_slice`] is kept in sync by the
/// store: after every store mutation its members are exactly the store's
/// entities for which the predicate holds. It publishes its own snapshots
/// and deltas, and only when its membership actually changes.
pub struct Slice<E> {
    label: String,
    predicate: Predicate<E>,
    base: StoreBase<E>,
}

impl<E: Clone + Send + 'static> Slice<E> {
    /// Create a slice seeded from the current entities of `store`.
    ///
    /// The slice is not registered; use [`EStore::add_slice`] for a slice
    /// that follows the store.
    pub fn from_store<P>(label: impl Into<String>, predicate: P, store: &EStore<E>) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::with_entities(label, predicate, store.config().clone(), &store.all_snapshot())
    }

    /// Create a slice seeded with the matching subset of `entities`.
    pub fn with_entities<P>(
        label: impl Into<String>,
        predicate: P,
        config: StoreConfig<E>,
        entities: &[E],
    ) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::seeded(label.into(), Arc::new(predicate), config, entities)
    }

    pub(crate) fn seeded(
        label: String,
        predicate: Predicate<E>,
        config: StoreConfig<E>,
        entities: &[E],
    ) -> Self {
        let mut slice = Self {
            label,
            predicate,
            base: StoreBase::new(config),
        };

        let mut passed = Vec::new();
        for entity in entities {
            if let Some(guid) = slice.matching_guid(entity) {
                slice.base.insert(guid, entity.clone());
                passed.push(entity.clone());
            }
        }
        slice.base.notify_all(ActionType::Initialize, passed);
        slice
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn predicate(&self) -> &Predicate<E> {
        &self.predicate
    }

    /// Whether `entity` satisfies this slice's predicate.
    pub fn test(&self, entity: &E) -> bool {
        (self.predicate)(entity)
    }

    /// The entity's global id, if it has one. Entities without one cannot be
    /// indexed and are skipped.
    fn guid(&self, entity: &E) -> Option<String> {
        let guid = self.base.guid_of(entity);
        if guid.is_none() {
            tracing::warn!(slice = %self.label, "skipping entity without a global id");
        }
        guid
    }

    fn matching_guid(&self, entity: &E) -> Option<String> {
        if self.test(entity) {
            self.guid(entity)
        } else {
            None
        }
    }

    // --- Mutations ---

    /// Add the entity if it matches.
    ///
    /// Re-posting a member re-tests it: a member that no longer matches
    /// leaves the slice (`Delete` delta), one that still matches is refreshed
    /// without notification.
    pub fn post(&mut self, entity: E) {
        self.post_a(std::slice::from_ref(&entity));
    }

    /// Add the matching entities, publishing at most one `Delete` and then
    /// one `Post` delta for the batch.
    pub fn post_a(&mut self, entities: &[E]) {
        self.apply(entities, ActionType::Post);
    }

    /// Remove the entity if it is a member.
    ///
    /// Membership is decided by global id alone, so an entity whose fields no
    /// longer satisfy the predicate is still removed.
    pub fn delete(&mut self, entity: &E) {
        self.delete_a(std::slice::from_ref(entity));
    }

    /// Remove the member entities, publishing one delta for the batch.
    pub fn delete_a(&mut self, entities: &[E]) {
        let mut removed = Vec::new();
        for entity in entities {
            if let Some(guid) = self.guid(entity) {
                if let Some(member) = self.base.remove(&guid) {
                    removed.push(member);
                }
            }
        }
        if !removed.is_empty() {
            tracing::trace!(slice = %self.label, count = removed.len(), "entities left slice");
            self.base.notify_all(ActionType::Delete, removed);
        }
    }

    /// Re-test an updated entity.
    ///
    /// A member that no longer matches leaves the slice (`Delete` delta); a
    /// non-member that now matches enters it (`Put` delta). A member that
    /// still matches has its value refreshed without notification.
    pub fn put(&mut self, entity: E) {
        self.put_a(std::slice::from_ref(&entity));
    }

    /// Re-test a batch of updated entities, publishing at most one `Delete`
    /// and then one `Put` delta.
    pub fn put_a(&mut self, entities: &[E]) {
        self.apply(entities, ActionType::Put);
    }

    /// Bring membership in line with a batch the owner has just written.
    ///
    /// The owner keeps the last value written under each global id, so the
    /// batch is collapsed the same way before any entity is tested.
    fn apply(&mut self, entities: &[E], entry_action: ActionType) {
        let mut latest: IndexMap<String, &E> = IndexMap::new();
        for entity in entities {
            if let Some(guid) = self.guid(entity) {
                latest.insert(guid, entity);
            }
        }

        let mut exits = Vec::new();
        let mut entries = Vec::new();
        for (guid, entity) in latest {
            let matches = self.test(entity);
            if self.base.has(&guid) {
                if matches {
                    self.base.insert(guid, entity.clone());
                } else {
                    exits.push(guid);
                }
            } else if matches {
                entries.push((guid, entity.clone()));
            }
        }

        if !exits.is_empty() {
            let removed: Vec<E> = exits
                .iter()
                .filter_map(|guid| self.base.remove(guid))
                .collect();
            tracing::trace!(slice = %self.label, count = removed.len(), "entities left slice");
            self.base.notify_all(ActionType::Delete, removed);
        }
        if !entries.is_empty() {
            let mut added = Vec::with_capacity(entries.len());
            for (guid, entity) in entries {
                self.base.insert(guid, entity.clone());
                added.push(entity);
            }
            tracing::trace!(slice = %self.label, count = added.len(), "entities entered slice");
            self.base.notify_all(entry_action, added);
        }
    }

    /// Remove every member, publishing a `Reset` delta with the prior members.
    pub fn reset(&mut self) {
        let prior = self.base.clear();
        self.base.notify_all(ActionType::Reset, prior);
    }

    /// Complete every channel of this slice.
    pub fn destroy(&mut self) {
        tracing::debug!(slice = %self.label, "destroying slice");
        self.base.destroy();
    }
}

impl<E: Clone + Send + 'static> StoreView<E> for Slice<E> {
    fn base(&self) -> &StoreBase<E> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StoreBase<E> {
        &mut self.base
    }
}

impl<E> fmt::Debug for Slice<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
