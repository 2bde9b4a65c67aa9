//! Error type for map operations.

/// Why a map operation did not run.
///
/// A `take` that timed out, or that saw the value but lost the removal race
/// to another consumer, is not an error: both report `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    /// The map has been shut down with [`HandoffMap::clear`](crate::HandoffMap::clear).
    NotActive,
    /// A blocked `take` was released by a concurrent shutdown before any
    /// value arrived for its key.
    Cancelled,
    /// The named collection operation is not offered by this map.
    Unsupported(&'static str),
}

impl std::fmt::Display for HandoffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffError::NotActive => write!(f, "map shut down, not active"),
            HandoffError::Cancelled => write!(f, "wait cancelled by map shutdown"),
            HandoffError::Unsupported(op) => write!(f, "operation not supported: {}", op),
        }
    }
}

impl std::error::Error for HandoffError {}
