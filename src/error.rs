//! Error types for the entity store.

use thiserror::Error;

/// Main error type for store operations.
///
/// Lookups that find nothing return `None` rather than an error; only
/// caller misuse that would corrupt the indices is reported here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{operation}: entity has no global id")]
    MissingGuid { operation: &'static str },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
