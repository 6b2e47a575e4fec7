//! Error types shared by the store, resolver and consumers.
//!
//! "Not found" is never an error here: it is `None` or an empty `Vec`.

use crate::model::ItemRef;
use thiserror::Error;

/// Failures of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to decode stored capabilities: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store misconfigured: {0}")]
    Misconfigured(String),

    #[error("{0} already exists")]
    Conflict(String),
}

/// The translation graph contradicts its own invariants.
///
/// Never folded into "not found".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataIntegrityError {
    #[error("translation record for {target} names unknown locale '{locale}'")]
    UnknownLocale { target: ItemRef, locale: String },

    #[error("translation record {source_ref} -> {target} points at a missing item {missing}")]
    DanglingRecord {
        source_ref: ItemRef,
        target: ItemRef,
        missing: ItemRef,
    },

    #[error("translation chain from {start} exceeds {max_depth} steps")]
    ChainTooLong { start: ItemRef, max_depth: usize },

    #[error("translation graph revisits {item} while walking from {start}")]
    Cycle { start: ItemRef, item: ItemRef },
}

/// Errors surfaced by resolver operations.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Integrity(#[from] DataIntegrityError),
}

impl ResolveError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, ResolveError::Integrity(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
