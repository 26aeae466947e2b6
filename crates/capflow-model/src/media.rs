//! Captured media handles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Opaque handle to captured media
///
/// Owned by exactly one step or by an artifact's top-level bucket. The URI
/// doubles as the ownership key: no two owners within one artifact may hold
/// the same URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    pub uri: String,
    pub kind: MediaKind,
}

impl MediaRef {
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            uri: uri.into(),
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn image(uri: impl Into<String>) -> Self {
        Self::new(uri, MediaKind::Image)
    }

    #[inline]
    #[must_use]
    pub fn video(uri: impl Into<String>) -> Self {
        Self::new(uri, MediaKind::Video)
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.uri)
    }
}

/// How breakdown-analysis footage was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// Live capture on the device
    Record,
    /// Existing file picked from storage
    Upload,
}
