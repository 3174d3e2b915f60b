//! Shared indexing, notification and query surface for stores and slices.

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::subscriptions::operators::map;
use crate::subscriptions::{Emit, Subject, Subscription};
use crate::types::{ActionType, Delta, KeyStrategy, StoreConfig};

/// Entity indices and notification channels common to [`crate::EStore`]
/// and [`crate::Slice`].
pub struct StoreBase<E> {
    config: StoreConfig<E>,

    /// Primary index: global id -> entity, in first-insertion order.
    entries: IndexMap<String, E>,

    /// External id -> global id.
    id_entries: HashMap<String, String>,

    /// Full snapshots.
    notify: Subject<Vec<E>>,

    /// Deltas.
    notify_delta: Subject<Delta<E>>,

    notify_query: Subject<String>,
    query: String,
}

impl<E: Clone + Send + 'static> StoreBase<E> {
    pub(crate) fn new(config: StoreConfig<E>) -> Self {
        let buffer_size = config.buffer_size();
        Self {
            config,
            entries: IndexMap::new(),
            id_entries: HashMap::new(),
            notify: Subject::with_buffer_size(buffer_size),
            notify_delta: Subject::with_buffer_size(buffer_size),
            notify_query: Subject::with_buffer_size(buffer_size),
            query: String::new(),
        }
    }

    pub(crate) fn config(&self) -> &StoreConfig<E> {
        &self.config
    }

    pub(crate) fn keys(&self) -> &dyn KeyStrategy<E> {
        self.config.keys()
    }

    pub(crate) fn guid_of(&self, entity: &E) -> Option<String> {
        self.keys().guid(entity).map(str::to_owned)
    }

    pub(crate) fn get(&self, guid: &str) -> Option<&E> {
        self.entries.get(guid)
    }

    pub(crate) fn has(&self, guid: &str) -> bool {
        self.entries.contains_key(guid)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    /// Entities paired with the global id they are stored under.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &E)> {
        self.entries.iter()
    }

    /// Insert or overwrite an entity, keeping the id index in lock-step.
    pub(crate) fn insert(&mut self, guid: String, entity: E) {
        let new_id = self.keys().id(&entity).map(str::to_owned);
        let old_id = self
            .entries
            .get(&guid)
            .and_then(|old| self.keys().id(old))
            .map(str::to_owned);

        if let Some(old_id) = old_id {
            if new_id.as_deref() != Some(old_id.as_str()) {
                self.id_entries.remove(&old_id);
            }
        }
        if let Some(new_id) = new_id {
            self.id_entries.insert(new_id, guid.clone());
        }
        self.entries.insert(guid, entity);
    }

    /// Remove an entity and its id mapping.
    pub(crate) fn remove(&mut self, guid: &str) -> Option<E> {
        let removed = self.entries.shift_remove(guid)?;
        if let Some(id) = self.keys().id(&removed) {
            if self.id_entries.get(id).map(String::as_str) == Some(guid) {
                self.id_entries.remove(id);
            }
        }
        Some(removed)
    }

    /// Empty both indices, returning the prior entities.
    pub(crate) fn clear(&mut self) -> Vec<E> {
        self.id_entries.clear();
        self.entries.drain(..).map(|(_, entity)| entity).collect()
    }

    /// A freshly built vector of every entity.
    pub(crate) fn snapshot(&self) -> Vec<E> {
        self.entries.values().cloned().collect()
    }

    /// Broadcast a full snapshot followed by the delta.
    pub(crate) fn notify_all(&self, action: ActionType, entries: Vec<E>) {
        self.notify.next(self.snapshot());
        self.notify_delta.next(Delta::new(action, entries));
    }

    pub(crate) fn set_query(&mut self, query: String) {
        self.query = query.clone();
        self.notify_query.next(query);
    }

    /// Complete every channel.
    pub(crate) fn destroy(&self) {
        self.notify.complete();
        self.notify_delta.complete();
        self.notify_query.complete();
    }
}

/// Read-only query surface and live channels shared by stores and slices.
///
/// Implementors only provide access to their [`StoreBase`]; everything else
/// is derived from it.
pub trait StoreView<E: Clone + Send + 'static> {
    #[doc(hidden)]
    fn base(&self) -> &StoreBase<E>;

    #[doc(hidden)]
    fn base_mut(&mut self) -> &mut StoreBase<E>;

    fn config(&self) -> &StoreConfig<E> {
        self.base().config()
    }

    // --- Live channels ---

    /// Observe full snapshots of the entities.
    ///
    /// Each change produces a new vector. The latest snapshot is replayed
    /// on subscription.
    fn observe(&self) -> Subscription<Vec<E>> {
        self.base().notify.subscribe()
    }

    /// Observe full snapshots, each sorted with `compare` before delivery.
    fn observe_sorted<F>(&self, compare: F) -> Subscription<Vec<E>>
    where
        F: Fn(&E, &E) -> Ordering + Send + 'static,
        Self: Sized,
    {
        self.base().notify.subscribe_with(map(move |entries: &Vec<E>| {
            let mut sorted = entries.clone();
            sorted.sort_by(|a, b| compare(a, b));
            sorted
        }))
    }

    /// Observe the delta of each mutation.
    fn observe_delta(&self) -> Subscription<Delta<E>> {
        self.base().notify_delta.subscribe()
    }

    /// Live flag, true while there are no entities.
    fn is_empty(&self) -> Subscription<bool> {
        self.base()
            .notify
            .subscribe_with(map(|entries: &Vec<E>| entries.is_empty()))
    }

    /// Live entity count.
    fn count(&self) -> Subscription<usize> {
        self.base()
            .notify
            .subscribe_with(map(|entries: &Vec<E>| entries.len()))
    }

    /// Live count of the entities matching `predicate`, recomputed from each
    /// snapshot.
    fn count_where<P>(&self, predicate: P) -> Subscription<usize>
    where
        P: Fn(&E) -> bool + Send + 'static,
        Self: Sized,
    {
        self.base().notify.subscribe_with(move |entries: &Vec<E>| {
            Emit::Next(entries.iter().filter(|e| predicate(*e)).count())
        })
    }

    // --- Snapshots ---

    fn count_snapshot(&self) -> usize {
        self.base().len()
    }

    fn count_snapshot_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&E) -> bool,
        Self: Sized,
    {
        self.base().values().filter(|e| predicate(*e)).count()
    }

    fn all_snapshot(&self) -> Vec<E> {
        self.base().snapshot()
    }

    fn is_empty_snapshot(&self) -> bool {
        self.base().len() == 0
    }

    /// Whether an entity with the same global id is indexed.
    fn contains(&self, entity: &E) -> bool {
        let base = self.base();
        base.keys().guid(entity).is_some_and(|guid| base.has(guid))
    }

    fn contains_key(&self, guid: &str) -> bool {
        self.base().has(guid)
    }

    /// Whether an entity with the same external id is indexed.
    fn contains_by_id(&self, entity: &E) -> bool {
        let base = self.base();
        base.keys()
            .id(entity)
            .is_some_and(|id| base.id_entries.contains_key(id))
    }

    fn contains_id(&self, id: &str) -> bool {
        self.base().id_entries.contains_key(id)
    }

    fn find_one(&self, guid: &str) -> Option<E> {
        self.base().get(guid).cloned()
    }

    fn find_one_by_id(&self, id: &str) -> Option<E> {
        let base = self.base();
        base.id_entries
            .get(id)
            .and_then(|guid| base.get(guid))
            .cloned()
    }

    /// The entities matching `predicate`, in index order.
    fn select<P>(&self, predicate: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
        Self: Sized,
    {
        self.base()
            .values()
            .filter(|e| predicate(*e))
            .cloned()
            .collect()
    }

    /// Compare two entities by global id. Two entities without one are equal.
    fn equals_by_guid(&self, a: &E, b: &E) -> bool {
        let keys = self.base().keys();
        keys.guid(a) == keys.guid(b)
    }

    /// Compare two entities by external id. Two entities without one are equal.
    fn equals_by_id(&self, a: &E, b: &E) -> bool {
        let keys = self.base().keys();
        keys.id(a) == keys.id(b)
    }

    // --- Query ---

    fn query(&self) -> &str {
        &self.base().query
    }

    /// Set the free-text query and publish it.
    fn set_query(&mut self, query: impl Into<String>)
    where
        Self: Sized,
    {
        self.base_mut().set_query(query.into());
    }

    /// Observe the query. Nothing is replayed before the first
    /// [`set_query`](StoreView::set_query).
    fn observe_query(&self) -> Subscription<String> {
        self.base().notify_query.subscribe()
    }
}
