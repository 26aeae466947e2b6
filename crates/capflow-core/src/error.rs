//! Error types for capflow Core
//!
//! Every error is a local, recoverable condition reported to the caller:
//! - Validation errors reject a mutation and leave the session unchanged
//! - Workflow errors reject a transition and leave the stage unchanged
//! - `AnalysisFailed` ends an outstanding analysis and can be retried

use crate::stage::Stage;
use capflow_model::{ArtifactKind, ModelError};

/// Main capture error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    /// Step or finding reference out of range
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// Anchor position outside the scanned volume
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// Template id not in the catalog for the artifact kind
    #[error("unknown template `{template}` for {kind}")]
    UnknownTemplate { kind: ArtifactKind, template: String },

    /// Media bucket full
    #[error("capture limit exceeded (max {limit} items)")]
    CaptureLimitExceeded { limit: usize },

    /// Finalize called early or with required fields missing
    #[error("not ready: {0}")]
    NotReady(String),

    /// Stage entry precondition not met
    #[error("cannot enter {stage}: {reason}")]
    IncompletePrerequisite { stage: Stage, reason: String },

    /// Operation not valid in the current stage
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Outstanding analysis failed or timed out
    #[error("analysis failed: {reason}")]
    AnalysisFailed { reason: String },
}

impl CaptureError {
    /// Rejected mutation; session left unchanged
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidIndex(_)
                | Self::OutOfBounds(_)
                | Self::UnknownTemplate { .. }
                | Self::CaptureLimitExceeded { .. }
        )
    }

    /// Rejected transition; stage left unchanged
    #[inline]
    #[must_use]
    pub fn is_workflow(&self) -> bool {
        matches!(
            self,
            Self::NotReady(_) | Self::IncompletePrerequisite { .. } | Self::InvalidState(_)
        )
    }

    /// Can the user retry the same action later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AnalysisFailed { .. })
    }

    #[inline]
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    #[inline]
    pub(crate) fn prerequisite(stage: Stage, reason: impl Into<String>) -> Self {
        Self::IncompletePrerequisite {
            stage,
            reason: reason.into(),
        }
    }
}

impl From<ModelError> for CaptureError {
    fn from(value: ModelError) -> Self {
        match value {
            e @ ModelError::InvalidIndex { .. } => Self::InvalidIndex(e.to_string()),
            e @ ModelError::OutOfBounds { .. } => Self::OutOfBounds(e.to_string()),
            ModelError::InvariantViolation(msg) => Self::InvalidState(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(CaptureError::CaptureLimitExceeded { limit: 20 }.is_validation());
        assert!(CaptureError::NotReady("x".into()).is_workflow());
        assert!(CaptureError::AnalysisFailed { reason: "timeout".into() }.is_retryable());
        assert!(!CaptureError::InvalidState("x".into()).is_retryable());
    }

    #[test]
    fn model_errors_map_onto_capture_kinds() {
        let err: CaptureError = ModelError::InvalidIndex { index: 4, min: 0, max: 2 }.into();
        assert!(matches!(err, CaptureError::InvalidIndex(_)));
        assert!(err.to_string().contains("invalid index 4"));

        let err: CaptureError = ModelError::InvariantViolation("audit".into()).into();
        assert!(matches!(err, CaptureError::InvalidState(_)));
    }

    #[test]
    fn prerequisite_display() {
        let err = CaptureError::prerequisite(Stage::Review, "no media captured");
        assert_eq!(err.to_string(), "cannot enter review: no media captured");
    }
}
