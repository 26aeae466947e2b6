//! External collaborator interfaces
//!
//! The core never talks to sensors, models or storage directly. It consumes:
//! - [`ScanProvider`]: current scan volume, and media release on abandon
//! - [`AnalysisProvider`]: AI review / breakdown analysis over captured media
//! - [`ArtifactSink`]: persistence of finalized artifacts
//!
//! [`FixedAnalysisProvider`] and [`MemorySink`] are in-process stand-ins for
//! demos and tests.

use crate::analysis::AnalysisRequest;
use async_trait::async_trait;
use capflow_model::{
    ArtifactKind, BatchId, FinalizedArtifact, FindingsBatch, MediaRef, ReportedFinding, ScanBounds,
    Severity,
};
use parking_lot::Mutex;

/// Collaborator failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Service could not be reached or is busy
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Service refused the input
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Scanning/capture device
pub trait ScanProvider: Send + Sync {
    /// Last reported scan volume, if a scan has produced one
    fn current_bounds(&self) -> Option<ScanBounds>;

    /// Give media back to the device store (fire-and-forget)
    fn release(&self, media: Vec<MediaRef>);
}

/// AI review / breakdown analysis service
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Analyze the request and return one findings batch
    async fn analyze(&self, request: AnalysisRequest) -> Result<FindingsBatch, ProviderError>;
}

/// Persistence for finalized artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Store a finalized artifact
    async fn persist(&self, artifact: FinalizedArtifact) -> Result<(), ProviderError>;
}

/// Analysis provider returning canned findings per artifact kind
///
/// Batch ids are derived from session and request, so redelivering the same
/// request produces the same batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAnalysisProvider;

impl FixedAnalysisProvider {
    /// Canned findings for `request`
    #[must_use]
    pub fn findings_for(request: &AnalysisRequest) -> Vec<ReportedFinding> {
        match request.kind {
            ArtifactKind::Audit => vec![
                ReportedFinding::new(
                    Severity::Minor,
                    "Minor Wear Detected",
                    "Surface wear observed on component A-234. Recommend inspection within 30 days.",
                ),
                ReportedFinding::new(
                    Severity::Info,
                    "Optimal Performance",
                    "All systems operating within normal parameters. No immediate action required.",
                ),
            ],
            ArtifactKind::Bda => vec![
                ReportedFinding::new(
                    Severity::Critical,
                    "Root Cause",
                    "Bearing failure due to inadequate lubrication",
                ),
                ReportedFinding::new(Severity::Info, "Recommended Action", "Replace bearing assembly"),
                ReportedFinding::new(Severity::Info, "Recommended Action", "Review lubrication schedule"),
                ReportedFinding::new(
                    Severity::Info,
                    "Recommended Action",
                    "Implement predictive maintenance",
                ),
            ],
            ArtifactKind::Guide => request
                .steps
                .iter()
                .enumerate()
                .filter(|(_, text)| text.trim().is_empty())
                .map(|(i, _)| {
                    ReportedFinding::new(
                        Severity::Minor,
                        format!("Step {} has no description", i + 1),
                        "Add instructions so the step can be followed without the media.",
                    )
                })
                .chain(std::iter::once(ReportedFinding::new(
                    Severity::Info,
                    "Guide generated",
                    format!("{} steps structured into a procedure.", request.steps.len()),
                )))
                .collect(),
            ArtifactKind::Map => Vec::new(),
        }
    }
}

#[async_trait]
impl AnalysisProvider for FixedAnalysisProvider {
    async fn analyze(&self, request: AnalysisRequest) -> Result<FindingsBatch, ProviderError> {
        if request.media.is_empty() && request.steps.is_empty() {
            return Err(ProviderError::Rejected("nothing to analyze".into()));
        }
        let findings = Self::findings_for(&request);
        let batch_id = BatchId::new(format!("{}-{}", request.session, request.request_id));
        Ok(FindingsBatch::new(batch_id, findings))
    }
}

/// Scan provider with a fixed volume that records released media
#[derive(Debug, Default)]
pub struct StaticScanProvider {
    bounds: Option<ScanBounds>,
    released: Mutex<Vec<MediaRef>>,
}

impl StaticScanProvider {
    #[must_use]
    pub fn new(bounds: Option<ScanBounds>) -> Self {
        Self {
            bounds,
            released: Mutex::new(Vec::new()),
        }
    }

    /// Media handed back so far
    #[must_use]
    pub fn released(&self) -> Vec<MediaRef> {
        self.released.lock().clone()
    }
}

impl ScanProvider for StaticScanProvider {
    fn current_bounds(&self) -> Option<ScanBounds> {
        self.bounds
    }

    fn release(&self, media: Vec<MediaRef>) {
        self.released.lock().extend(media);
    }
}

/// In-memory artifact store
#[derive(Debug, Default)]
pub struct MemorySink {
    stored: Mutex<Vec<FinalizedArtifact>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted
    #[must_use]
    pub fn stored(&self) -> Vec<FinalizedArtifact> {
        self.stored.lock().clone()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn persist(&self, artifact: FinalizedArtifact) -> Result<(), ProviderError> {
        self.stored.lock().push(artifact);
        Ok(())
    }
}
