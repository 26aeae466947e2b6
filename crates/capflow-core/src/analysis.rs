//! Asynchronous analysis boundary
//!
//! The workflow never waits on the analysis provider. `begin_analysis`
//! snapshots what the provider needs into an [`AnalysisRequest`], the caller
//! drives [`run`] on whatever task it likes, and the resulting
//! [`AnalysisOutcome`] is handed back through `Workflow::deliver`.
//!
//! A timeout is reported as [`CaptureError::AnalysisFailed`], never as a
//! request left pending forever.

use crate::error::CaptureError;
use crate::providers::AnalysisProvider;
use crate::session::SessionId;
use capflow_model::{ArtifactKind, FindingsBatch, MediaRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Per-session analysis request number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u32);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Everything the provider gets to see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub request_id: RequestId,
    pub session: SessionId,
    pub kind: ArtifactKind,
    /// Template or guide type, if any
    pub template: Option<String>,
    /// Top-level media plus step media, in order
    pub media: Vec<MediaRef>,
    /// Step descriptions (guides)
    pub steps: Vec<String>,
}

/// Analysis progress as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Nothing requested yet (or the last request was cancelled)
    #[default]
    Idle,
    /// Waiting for delivery; render a pending indicator
    Pending { request: RequestId },
    /// Last request delivered this batch
    Delivered {
        request: RequestId,
        batch: capflow_model::BatchId,
    },
    /// Last request failed; retry with a new request
    Failed { request: RequestId, reason: String },
}

impl AnalysisStatus {
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Request the status refers to, if any
    #[must_use]
    pub fn request(&self) -> Option<RequestId> {
        match self {
            Self::Idle => None,
            Self::Pending { request }
            | Self::Delivered { request, .. }
            | Self::Failed { request, .. } => Some(*request),
        }
    }
}

/// Result of one analysis run, ready for delivery to the workflow
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub request_id: RequestId,
    pub result: Result<FindingsBatch, CaptureError>,
}

/// Run `request` against `provider`, bounded by `timeout`
///
/// Provider errors and timeouts both become
/// [`CaptureError::AnalysisFailed`] inside the outcome.
pub async fn run(
    provider: &dyn AnalysisProvider,
    request: AnalysisRequest,
    timeout: Duration,
) -> AnalysisOutcome {
    let request_id = request.request_id;
    tracing::debug!(%request_id, media = request.media.len(), "dispatching analysis");

    let result = match tokio::time::timeout(timeout, provider.analyze(request)).await {
        Ok(Ok(batch)) => Ok(batch),
        Ok(Err(e)) => Err(CaptureError::AnalysisFailed {
            reason: e.to_string(),
        }),
        Err(_) => Err(CaptureError::AnalysisFailed {
            reason: format!("timed out after {}ms", timeout.as_millis()),
        }),
    };

    if let Err(e) = &result {
        tracing::warn!(%request_id, error = %e, "analysis failed");
    }
    AnalysisOutcome { request_id, result }
}
