//! Error types for Engram

use thiserror::Error;

/// Main error type for Engram operations
#[derive(Error, Debug)]
pub enum EngramError {
    /// Importance outside [0.0, 1.0] (or a non-finite adjustment factor)
    #[error("Invalid importance: {0} (expected a value in [0.0, 1.0])")]
    InvalidImportance(f32),

    /// A tier refused to admit an item
    #[error("Store failed: {0}")]
    StoreFailed(#[from] Rejected),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a tier refused an insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Content carried no tokens
    EmptyContent,
}

/// Rejection returned by [`BoundedTier::insert`](crate::storage::BoundedTier::insert).
///
/// A rejected insertion leaves the tier untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rejected: {reason:?}")]
pub struct Rejected {
    pub reason: RejectReason,
}

impl Rejected {
    pub fn empty_content() -> Self {
        Self {
            reason: RejectReason::EmptyContent,
        }
    }
}

/// Result type alias for Engram operations
pub type Result<T> = std::result::Result<T, EngramError>;
