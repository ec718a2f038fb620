//! Error types for pantry storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// The backend is temporarily unavailable (locked, busy, shutting down).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A thread panicked while holding a store lock; the store stays unusable.
    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),
}

impl StoreError {
    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoning_is_not_transient() {
        assert!(StoreError::Unavailable("busy".into()).is_transient());
        assert!(StoreError::Database("io".into()).is_transient());
        assert!(!StoreError::Serialization("bad".into()).is_transient());
        assert!(!StoreError::Poisoned("memory store").is_transient());
    }
}
