//! Identifier types
//!
//! Artifacts are identified by ULIDs (sortable, generated once at creation).
//! Anchor and finding ids are derived deterministically so that replaying
//! the same operations yields the same ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique artifact identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub Ulid);

impl ArtifactId {
    /// Generate new artifact ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable anchor identifier
///
/// Allocated from a per-artifact monotonic sequence and never reused, so an
/// anchor keeps its id across step reordering and the id of a removed anchor
/// never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub u32);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor-{}", self.0)
    }
}

/// Monotonic anchor id allocator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSequence {
    next: u32,
}

impl AnchorSequence {
    /// Allocate the next id
    #[inline]
    pub fn allocate(&mut self) -> AnchorId {
        let id = AnchorId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    #[inline]
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// Identifier of one delivery from the analysis provider
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

impl BatchId {
    /// Create from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable finding identifier: the batch it arrived in plus its ordinal there
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FindingId {
    /// Delivering batch
    pub batch: BatchId,
    /// Position within the batch
    pub ordinal: u32,
}

impl FindingId {
    /// Create a finding id
    #[inline]
    #[must_use]
    pub fn new(batch: BatchId, ordinal: u32) -> Self {
        Self { batch, ordinal }
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.batch, self.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_sequence_is_monotonic() {
        let mut seq = AnchorSequence::default();
        let a = seq.allocate();
        let b = seq.allocate();
        assert!(a < b);
        assert_eq!(seq.issued(), 2);
    }

    #[test]
    fn finding_id_display() {
        let id = FindingId::new(BatchId::new("b-7"), 3);
        assert_eq!(id.to_string(), "b-7#3");
    }
}
