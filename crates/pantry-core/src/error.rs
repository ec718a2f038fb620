//! Error types for the pantry domain.

use rust_decimal::Decimal;

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, PantryError>;

/// Validation errors raised by domain types.
///
/// These are configuration errors: they are rejected synchronously and never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PantryError {
    /// Consumption rate below zero.
    #[error("invalid consumption rate: {0} (must be >= 0)")]
    InvalidConsumptionRate(Decimal),

    /// Restock threshold not strictly positive.
    #[error("invalid restock threshold: {0} days (must be > 0)")]
    InvalidThreshold(Decimal),

    /// Quantity below zero.
    #[error("invalid quantity: {0} (must be >= 0)")]
    InvalidQuantity(Decimal),

    /// Unknown or disallowed change type.
    #[error("invalid change type: {0}")]
    InvalidChangeType(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
