//! Subscription system for live store updates.
//!
//! Every observable value in the store (full snapshots, deltas, the active
//! set, flags) is published through a [`Subject`]:
//! - Multicast: each subscriber gets its own channel
//! - Replay-of-one: a new subscriber immediately receives the latest value
//! - Synchronous: delivery happens inside the call that publishes
//! - Bounded: a subscriber that leaves too many values unread is dropped
//!
//! Subscribers can attach an operator (see [`operators`]) that maps, filters
//! or terminates their own stream without affecting anyone else.
//!
//! # Example
//!
//! ```ignore
//! let subject = Subject::new();
//! subject.next(1);
//!
//! let handle = subject.subscribe();
//! assert_eq!(handle.try_recv(), Ok(1)); // replayed
//!
//! subject.next(2);
//! assert_eq!(handle.try_recv(), Ok(2));
//!
//! subject.complete();
//! assert!(handle.recv().is_err()); // completed
//! ```

pub mod operators;
mod subject;
mod types;

pub use operators::Emit;
pub use subject::{Subject, DEFAULT_BUFFER_SIZE};
pub use types::{Subscription, SubscriptionId};
