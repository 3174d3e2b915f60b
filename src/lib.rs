//! # Entity Store
//!
//! An in-memory, observable entity store for client applications that keep
//! a reactive local cache.
//!
//! ## Core Concepts
//!
//! - **Entities**: Records keyed by a store-generated global id, optionally
//!   also by an external id
//! - **Snapshots and deltas**: Every mutation publishes the full entity list
//!   and a description of what changed
//! - **Slices**: Live views of the entities matching a predicate
//! - **Active set**: The entities currently selected by the application
//!
//! ## Example
//!
//! ```ignore
//! use estore::{EStore, StoreView};
//!
//! let mut store: EStore<Todo> = EStore::new(vec![Todo::new("write docs", false)]);
//! store.add_slice(|todo: &Todo| todo.complete, "complete");
//!
//! // Snapshots are replayed to new subscribers
//! let todos = store.observe();
//! assert_eq!(todos.recv()?.len(), 1);
//!
//! // Post assigns a global id and updates the slice
//! let mut todo = Todo::new("ship it", true);
//! let gid = store.post(&mut todo).unwrap();
//! assert!(store.get_slice("complete").unwrap().contains_key(&gid));
//! ```

pub mod error;
pub mod slice;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod view;

// Re-exports
pub use error::{Result, StoreError};
pub use slice::Slice;
pub use store::{ActiveMap, EStore};
pub use subscriptions::{Emit, Subject, Subscription, SubscriptionId};
pub use types::*;
pub use view::{StoreBase, StoreView};
