//! Core types for the entity store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::subscriptions::DEFAULT_BUFFER_SIZE;

/// Default name of the external id field for JSON entities.
pub const DEFAULT_ID_KEY: &str = "id";

/// Default name of the global id field for JSON entities.
pub const DEFAULT_GUID_KEY: &str = "gid";

/// Predicate over entities, shared between a slice and its owner.
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Generates fresh global ids.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Kind of mutation described by a [`Delta`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Initialize,
    Post,
    Put,
    Delete,
    Reset,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::Initialize => "Initialize",
            ActionType::Post => "Post",
            ActionType::Put => "Put",
            ActionType::Delete => "Delete",
            ActionType::Reset => "Reset",
        };
        f.write_str(name)
    }
}

/// The entities affected by the most recent mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delta<E> {
    #[serde(rename = "type")]
    pub action: ActionType,
    pub entries: Vec<E>,
}

impl<E> Delta<E> {
    pub fn new(action: ActionType, entries: Vec<E>) -> Self {
        Self { action, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A record with a store-assigned global id and an optional external id.
///
/// ```ignore
/// #[derive(Clone)]
/// struct Todo {
///     gid: Option<String>,
///     id: Option<String>,
///     title: String,
/// }
///
/// impl Entity for Todo {
///     fn gid(&self) -> Option<&str> { self.gid.as_deref() }
///     fn set_gid(&mut self, gid: String) { self.gid = Some(gid) }
///     fn id(&self) -> Option<&str> { self.id.as_deref() }
/// }
/// ```
pub trait Entity {
    fn gid(&self) -> Option<&str>;

    fn set_gid(&mut self, gid: String);

    /// External id, typically assigned by a backend.
    fn id(&self) -> Option<&str> {
        None
    }
}

/// Reads and writes the two well-known keys of an entity.
pub trait KeyStrategy<E>: Send + Sync {
    fn guid<'a>(&self, entity: &'a E) -> Option<&'a str>;

    fn set_guid(&self, entity: &mut E, guid: String);

    fn id<'a>(&self, entity: &'a E) -> Option<&'a str>;
}

/// Key strategy for types implementing [`Entity`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityKeys;

impl<E: Entity> KeyStrategy<E> for EntityKeys {
    fn guid<'a>(&self, entity: &'a E) -> Option<&'a str> {
        entity.gid()
    }

    fn set_guid(&self, entity: &mut E, guid: String) {
        entity.set_gid(guid);
    }

    fn id<'a>(&self, entity: &'a E) -> Option<&'a str> {
        entity.id()
    }
}

/// Key strategy for JSON objects with configurable field names.
///
/// Keys must be non-empty strings; any other value counts as absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonKeys {
    pub id_key: String,
    pub guid_key: String,
}

impl Default for JsonKeys {
    fn default() -> Self {
        Self {
            id_key: DEFAULT_ID_KEY.to_string(),
            guid_key: DEFAULT_GUID_KEY.to_string(),
        }
    }
}

impl JsonKeys {
    fn string_field<'a>(entity: &'a Value, field: &str) -> Option<&'a str> {
        entity
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl KeyStrategy<Value> for JsonKeys {
    fn guid<'a>(&self, entity: &'a Value) -> Option<&'a str> {
        Self::string_field(entity, &self.guid_key)
    }

    fn set_guid(&self, entity: &mut Value, guid: String) {
        if let Some(object) = entity.as_object_mut() {
            object.insert(self.guid_key.clone(), Value::String(guid));
        }
    }

    fn id<'a>(&self, entity: &'a Value) -> Option<&'a str> {
        Self::string_field(entity, &self.id_key)
    }
}

/// Random UUID v4 ids.
pub fn uuid_ids() -> IdGenerator {
    Arc::new(|| uuid::Uuid::new_v4().to_string())
}

/// Deterministic `prefix-1`, `prefix-2`, ... ids.
pub fn sequential_ids(prefix: impl Into<String>) -> IdGenerator {
    let prefix = prefix.into();
    let counter = AtomicU64::new(1);
    Arc::new(move || format!("{}-{}", prefix, counter.fetch_add(1, Ordering::Relaxed)))
}

/// Store configuration.
///
/// Fixed at construction; stores and slices only ever read it.
pub struct StoreConfig<E> {
    keys: Arc<dyn KeyStrategy<E>>,
    id_generator: IdGenerator,
    /// Max unread values per subscriber before it is dropped.
    /// Default: 1000
    buffer_size: usize,
}

impl<E> StoreConfig<E> {
    /// Create a config with a custom key strategy and UUID ids.
    pub fn new(keys: impl KeyStrategy<E> + 'static) -> Self {
        Self {
            keys: Arc::new(keys),
            id_generator: uuid_ids(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Replace the id generator.
    pub fn with_id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = generator;
        self
    }

    /// Replace the per-subscriber buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn keys(&self) -> &dyn KeyStrategy<E> {
        self.keys.as_ref()
    }

    /// Produce a fresh global id.
    pub fn generate_id(&self) -> String {
        (self.id_generator)()
    }
}

impl StoreConfig<Value> {
    /// JSON entities keyed by `"id"` and `"gid"`.
    pub fn json() -> Self {
        Self::new(JsonKeys::default())
    }

    /// JSON entities keyed by custom field names.
    pub fn json_fields(id_key: impl Into<String>, guid_key: impl Into<String>) -> Self {
        Self::new(JsonKeys {
            id_key: id_key.into(),
            guid_key: guid_key.into(),
        })
    }
}

impl<E: Entity> Default for StoreConfig<E> {
    fn default() -> Self {
        Self::new(EntityKeys)
    }
}

impl<E> Clone for StoreConfig<E> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            id_generator: Arc::clone(&self.id_generator),
            buffer_size: self.buffer_size,
        }
    }
}

impl<E> fmt::Debug for StoreConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("buffer_size", &self.buffer_size)
            .finish_non_exhaustive()
    }
}
