//! Error types for the engine.

use pantry_core::{ItemId, PantryError};
use pantry_store::StoreError;

use crate::retry::Retryable;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Rejected input: bad quantity, rate, threshold or change type.
    #[error(transparent)]
    Invalid(#[from] PantryError),

    /// Storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The item does not exist.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// An item with this ID is already registered.
    #[error("item already exists: {0}")]
    ItemAlreadyExists(ItemId),

    /// Stored item state the engine cannot process, such as a negative rate.
    #[error("item {item_id} has invalid state: {reason}")]
    InvalidItemState {
        /// The offending item.
        item_id: ItemId,
        /// What is wrong with it.
        reason: String,
    },

    /// A query window whose start is not before its end.
    #[error("invalid time window: start must be before end")]
    InvalidWindow,

    /// Engine configuration rejected at startup.
    #[error("invalid engine configuration: {0}")]
    Configuration(String),

    /// Processing of a single item panicked and was contained.
    #[error("processing of item {0} panicked")]
    Panicked(ItemId),
}

impl EngineError {
    /// Whether the failure is worth retrying.
    ///
    /// Only storage unavailability qualifies; validation and data errors fail the same
    /// way every time.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }

    pub(crate) fn invalid_state(item_id: ItemId, reason: impl Into<String>) -> Self {
        Self::InvalidItemState {
            item_id,
            reason: reason.into(),
        }
    }
}

impl Retryable for EngineError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}
