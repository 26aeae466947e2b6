//! Error types for the data model
//!
//! Every model operation is a validated mutation: on error the value it was
//! called on is left exactly as it was.

/// Errors raised by model-level validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Step index outside the accepted range
    #[error("invalid index {index} (valid range {min}..={max})")]
    InvalidIndex {
        /// The offending index
        index: i64,
        /// Lowest accepted value
        min: i64,
        /// Highest accepted value
        max: i64,
    },

    /// Anchor position outside the last-scanned volume
    #[error("position {position} lies outside scan bounds {bounds}")]
    OutOfBounds {
        /// Rendered position
        position: String,
        /// Rendered bounds
        bounds: String,
    },

    /// A structural invariant does not hold
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl ModelError {
    #[inline]
    pub(crate) fn invalid_index(index: i64, min: i64, max: i64) -> Self {
        Self::InvalidIndex { index, min, max }
    }
}
