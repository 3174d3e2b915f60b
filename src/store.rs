//! Main EStore struct tying indices, slices and notifications together.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::slice::Slice;
use crate::subscriptions::operators::{first_where, take_while_inclusive};
use crate::subscriptions::{Subject, Subscription};
use crate::types::{ActionType, Entity, StoreConfig};
use crate::view::{StoreBase, StoreView};

/// Active entities keyed by global id.
pub type ActiveMap<E> = IndexMap<String, E>;

/// The main entity store.
///
/// Provides a unified interface for:
/// - Posting, updating and deleting entities (single and batch)
/// - Looking entities up by global id or external id
/// - Maintaining labelled slices that follow the store
/// - Tracking an active subset and loading/searching flags
///
/// Every mutation first updates the indices, then forwards the change to
/// each slice, and finally publishes a full snapshot and a delta.
pub struct EStore<E> {
    base: StoreBase<E>,

    /// Slices by label, in registration order.
    slices: IndexMap<String, Slice<E>>,

    active: ActiveMap<E>,
    notify_active: Subject<ActiveMap<E>>,

    loading: bool,
    notify_loading: Subject<bool>,

    searching: bool,
    notify_searching: Subject<bool>,
}

impl<E: Entity + Clone + Send + 'static> EStore<E> {
    /// Create a store holding `entities`, with the default configuration.
    pub fn new(entities: impl IntoIterator<Item = E>) -> Self {
        Self::with_config(entities, StoreConfig::default())
    }
}

impl<E: Clone + Send + 'static> EStore<E> {
    /// Create a store holding `entities`.
    ///
    /// Entities without a global id get one. A snapshot and an `Initialize`
    /// delta are published even when there are no entities, so the store's
    /// channels always have a value to replay.
    pub fn with_config(entities: impl IntoIterator<Item = E>, config: StoreConfig<E>) -> Self {
        let buffer_size = config.buffer_size();
        let mut store = Self {
            base: StoreBase::new(config),
            slices: IndexMap::new(),
            active: IndexMap::new(),
            notify_active: Subject::with_buffer_size(buffer_size),
            loading: true,
            notify_loading: Subject::with_buffer_size(buffer_size),
            searching: false,
            notify_searching: Subject::with_buffer_size(buffer_size),
        };

        let mut initial = Vec::new();
        for mut entity in entities {
            if store.index(&mut entity).is_some() {
                initial.push(entity);
            }
        }
        tracing::debug!(count = initial.len(), "initialized store");

        store.base.notify_all(ActionType::Initialize, initial);
        store.notify_loading.next(store.loading);
        store.notify_searching.next(store.searching);
        store
    }

    /// Tag the entity with a global id if it has none and index it.
    ///
    /// Returns `None`, storing nothing, if the key strategy cannot write a
    /// global id into the entity (a JSON scalar, for example).
    fn index(&mut self, entity: &mut E) -> Option<String> {
        if self.base.guid_of(entity).is_none() {
            let generated = self.base.config().generate_id();
            self.base.keys().set_guid(entity, generated);
        }
        let Some(guid) = self.base.guid_of(entity) else {
            tracing::warn!("entity cannot carry a global id, not stored");
            return None;
        };
        self.base.insert(guid.clone(), entity.clone());
        Some(guid)
    }

    // --- Post ---

    /// Add an entity, assigning it a global id if it has none.
    ///
    /// The id is written into `entity` and returned. Posting an entity that
    /// already carries an id overwrites the entry under that id. Returns
    /// `None` and changes nothing if the entity cannot carry a global id.
    pub fn post(&mut self, entity: &mut E) -> Option<String> {
        let guid = self.index(entity)?;
        for slice in self.slices.values_mut() {
            slice.post(entity.clone());
        }
        tracing::debug!(%guid, "posted entity");
        self.base.notify_all(ActionType::Post, vec![entity.clone()]);
        Some(guid)
    }

    /// Add several entities, publishing one delta for the batch.
    pub fn post_n<'a, I>(&mut self, entities: I)
    where
        I: IntoIterator<Item = &'a mut E>,
        E: 'a,
    {
        let mut posted = Vec::new();
        for entity in entities {
            if self.index(entity).is_some() {
                posted.push(entity.clone());
            }
        }
        for slice in self.slices.values_mut() {
            slice.post_a(&posted);
        }
        tracing::debug!(count = posted.len(), "posted entities");
        self.base.notify_all(ActionType::Post, posted);
    }

    pub fn post_a(&mut self, entities: &mut [E]) {
        self.post_n(entities.iter_mut());
    }

    // --- Put ---

    /// Update (or insert) an entity that already carries a global id.
    ///
    /// The active set is not touched.
    pub fn put(&mut self, entity: E) -> Result<()> {
        self.put_n(std::iter::once(entity))
    }

    /// Update several entities, publishing one delta for the batch.
    ///
    /// Fails without changing anything if any entity lacks a global id.
    pub fn put_n(&mut self, entities: impl IntoIterator<Item = E>) -> Result<()> {
        let mut keyed = Vec::new();
        for entity in entities {
            let guid = self
                .base
                .guid_of(&entity)
                .ok_or(StoreError::MissingGuid { operation: "put" })?;
            keyed.push((guid, entity));
        }

        let mut updated = Vec::with_capacity(keyed.len());
        for (guid, entity) in keyed {
            self.base.insert(guid, entity.clone());
            updated.push(entity);
        }
        for slice in self.slices.values_mut() {
            slice.put_a(&updated);
        }
        tracing::debug!(count = updated.len(), "put entities");
        self.base.notify_all(ActionType::Put, updated);
        Ok(())
    }

    pub fn put_a(&mut self, entities: &[E]) -> Result<()> {
        self.put_n(entities.iter().cloned())
    }

    // --- Delete ---

    /// Remove an entity from the store, the active set and every slice.
    pub fn delete(&mut self, entity: &E) {
        self.delete_n(std::iter::once(entity));
    }

    /// Remove several entities, publishing one delta for the batch.
    ///
    /// The delta carries the entities as they were stored.
    pub fn delete_n<'a, I>(&mut self, entities: I)
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        let guids: Vec<String> = entities
            .into_iter()
            .filter_map(|entity| self.base.guid_of(entity))
            .collect();
        self.delete_guids(guids);
    }

    pub fn delete_a(&mut self, entities: &[E]) {
        self.delete_n(entities.iter());
    }

    /// Remove every entity matching `predicate`, publishing one delta.
    pub fn delete_p<P>(&mut self, predicate: P)
    where
        P: Fn(&E) -> bool,
    {
        let guids: Vec<String> = self
            .base
            .iter()
            .filter(|(_, entity)| predicate(*entity))
            .map(|(guid, _)| guid.clone())
            .collect();
        self.delete_guids(guids);
    }

    fn delete_guids(&mut self, guids: Vec<String>) {
        let mut active_changed = false;
        let mut removed = Vec::new();
        for guid in &guids {
            active_changed |= self.active.shift_remove(guid).is_some();
            if let Some(entity) = self.base.remove(guid) {
                removed.push(entity);
            }
        }
        if active_changed {
            self.publish_active();
        }
        for slice in self.slices.values_mut() {
            slice.delete_a(&removed);
        }
        tracing::debug!(count = removed.len(), "deleted entities");
        self.base.notify_all(ActionType::Delete, removed);
    }

    /// Delete the entity if the store contains it, otherwise post it.
    pub fn toggle(&mut self, entity: &mut E) {
        if self.contains(entity) {
            self.delete(entity);
        } else {
            self.post(entity);
        }
    }

    /// Remove every entity, publishing a `Reset` delta with the prior
    /// entities. Both indices, the active set and every slice are cleared.
    pub fn reset(&mut self) {
        let prior = self.base.clear();
        if !self.active.is_empty() {
            self.active.clear();
            self.publish_active();
        }
        for slice in self.slices.values_mut() {
            slice.reset();
        }
        tracing::debug!(count = prior.len(), "reset store");
        self.base.notify_all(ActionType::Reset, prior);
    }

    // --- Active Entities ---

    /// Mark an entity active, posting it first if the store lacks it.
    pub fn add_active(&mut self, entity: &mut E) {
        let guid = match self.base.guid_of(entity) {
            Some(guid) if self.base.has(&guid) => guid,
            _ => match self.post(entity) {
                Some(guid) => guid,
                None => return,
            },
        };
        if let Some(stored) = self.base.get(&guid) {
            self.active.insert(guid, stored.clone());
        }
        self.publish_active();
    }

    /// Unmark an entity. Entities that are not active are ignored.
    pub fn delete_active(&mut self, entity: &E) {
        if let Some(guid) = self.base.guid_of(entity) {
            self.active.shift_remove(&guid);
        }
        self.publish_active();
    }

    pub fn clear_active(&mut self) {
        self.active.clear();
        self.publish_active();
    }

    /// A copy of the active map.
    pub fn active(&self) -> ActiveMap<E> {
        self.active.clone()
    }

    pub fn active_snapshot(&self) -> Vec<E> {
        self.active.values().cloned().collect()
    }

    /// The earliest activated entity still active.
    pub fn first_active(&self) -> Option<E> {
        self.active.values().next().cloned()
    }

    pub fn is_active(&self, entity: &E) -> bool {
        self.base
            .keys()
            .guid(entity)
            .is_some_and(|guid| self.active.contains_key(guid))
    }

    /// Observe the active map. Each change publishes a new map.
    pub fn observe_active(&self) -> Subscription<ActiveMap<E>> {
        self.notify_active.subscribe()
    }

    fn publish_active(&self) {
        self.notify_active.next(self.active.clone());
    }

    // --- Loading / Searching ---

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.notify_loading.next(loading);
    }

    /// Observe the loading flag until it is false.
    ///
    /// The stream delivers `true` values and completes right after the first
    /// `false`. Call again for a fresh stream after it completes.
    pub fn observe_loading(&self) -> Subscription<bool> {
        self.notify_loading
            .subscribe_with(take_while_inclusive(|loading: &bool| *loading))
    }

    /// Delivers `true` once, when loading is (or becomes) false.
    pub fn observe_loading_complete(&self) -> Subscription<bool> {
        self.notify_loading
            .subscribe_with(first_where(|loading: &bool| !*loading, |_| true))
    }

    pub fn searching(&self) -> bool {
        self.searching
    }

    pub fn set_searching(&mut self, searching: bool) {
        self.searching = searching;
        self.notify_searching.next(searching);
    }

    /// Observe the searching flag until it is false.
    pub fn observe_searching(&self) -> Subscription<bool> {
        self.notify_searching
            .subscribe_with(take_while_inclusive(|searching: &bool| *searching))
    }

    /// Delivers `true` once, when searching is (or becomes) false.
    pub fn observe_searching_complete(&self) -> Subscription<bool> {
        self.notify_searching
            .subscribe_with(first_where(|searching: &bool| !*searching, |_| true))
    }

    // --- Slices ---

    /// Register a slice of the entities matching `predicate`.
    ///
    /// A slice already registered under `label` is replaced.
    pub fn add_slice<P>(&mut self, predicate: P, label: impl Into<String>)
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let label = label.into();
        let slice = Slice::seeded(
            label.clone(),
            Arc::new(predicate),
            self.base.config().clone(),
            &self.base.snapshot(),
        );
        tracing::debug!(%label, members = slice.count_snapshot(), "added slice");
        self.slices.insert(label, slice);
    }

    /// Unregister a slice. The store's entities are unaffected.
    pub fn remove_slice(&mut self, label: &str) -> Option<Slice<E>> {
        let removed = self.slices.shift_remove(label);
        if removed.is_some() {
            tracing::debug!(%label, "removed slice");
        }
        removed
    }

    pub fn get_slice(&self, label: &str) -> Option<&Slice<E>> {
        self.slices.get(label)
    }

    /// Labels of the registered slices, in registration order.
    pub fn slice_labels(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    /// Complete every channel of the store and of its slices.
    ///
    /// The store must not be mutated afterwards.
    pub fn destroy(&mut self) {
        tracing::debug!(slices = self.slices.len(), "destroying store");
        self.base.destroy();
        self.notify_active.complete();
        self.notify_loading.complete();
        self.notify_searching.complete();
        for slice in self.slices.values_mut() {
            slice.destroy();
        }
    }
}

impl<E: Clone + Send + 'static> StoreView<E> for EStore<E> {
    fn base(&self) -> &StoreBase<E> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StoreBase<E> {
        &mut self.base
    }
}

impl<E: Entity + Clone + Send + 'static> Default for EStore<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<E> fmt::Debug for EStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EStore")
            .field("slices", &self.slices.keys().collect::<Vec<_>>())
            .field("loading", &self.loading)
            .field("searching", &self.searching)
            .finish_non_exhaustive()
    }
}
