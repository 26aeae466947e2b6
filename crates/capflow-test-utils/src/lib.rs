//! Testing utilities for capflow workspace
//!
//! Shared fixtures: bounds, findings batches, workflows parked at a given
//! stage, and analysis providers that stall or fail.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use capflow_core::analysis::AnalysisRequest;
use capflow_core::stage;
use capflow_core::templates;
use capflow_core::{
    AnalysisProvider, CaptureConfig, FixedAnalysisProvider, ProviderError, Stage, Workflow,
};
use capflow_model::{
    ArtifactKind, BatchId, FindingsBatch, MediaRef, Position, ReportedFinding, ScanBounds,
    Severity, Span,
};
use std::time::Duration;

/// Planar bounds `{0..size, 0..size}`
pub fn square_bounds(size: f64) -> ScanBounds {
    ScanBounds::planar(Span::new(0.0, size), Span::new(0.0, size)).unwrap()
}

/// Volume bounds `{0..size, 0..size, 0..depth}`
pub fn cube_bounds(size: f64, depth: f64) -> ScanBounds {
    ScanBounds::volume(Span::new(0.0, size), Span::new(0.0, size), Span::new(0.0, depth)).unwrap()
}

/// Batch `id` with `n` info findings titled `finding-0..n`
pub fn batch(id: &str, n: usize) -> FindingsBatch {
    FindingsBatch::new(
        BatchId::new(id),
        (0..n)
            .map(|i| ReportedFinding::new(Severity::Info, format!("finding-{i}"), "fixture"))
            .collect(),
    )
}

/// First catalog entry for `kind`, if it takes a template
pub fn default_template(kind: ArtifactKind) -> Option<&'static str> {
    templates::catalog(kind).first().map(|t| t.id)
}

pub fn start(kind: ArtifactKind) -> Workflow {
    start_with(kind, CaptureConfig::default())
}

pub fn start_with(kind: ArtifactKind, config: CaptureConfig) -> Workflow {
    Workflow::start(kind, default_template(kind), config).unwrap()
}

/// Fill in whatever the current stage needs before leaving it
pub fn satisfy_stage(wf: &mut Workflow) {
    let kind = wf.kind();
    match wf.stage() {
        Stage::Scan => wf.report_bounds(square_bounds(100.0)).unwrap(),
        Stage::Form => wf.set_title(format!("{kind} fixture")).unwrap(),
        Stage::Capture if kind.has_steps() => {
            let index = wf.insert_step(-1).unwrap();
            wf.set_step_description(index, "Isolate power").unwrap();
            wf.attach_media(MediaRef::image("fixture://step-0"), Some(index))
                .unwrap();
        }
        Stage::Capture => {
            wf.attach_media(MediaRef::image("fixture://bucket-0"), None)
                .unwrap();
        }
        Stage::Review => {
            wf.ingest_findings(batch("fixture", 1)).unwrap();
        }
        Stage::Anchors => {
            let index = wf.insert_step(-1).unwrap();
            wf.place_anchor(index, Position::planar(50.0, 50.0)).unwrap();
        }
        Stage::Generate | Stage::Complete => {}
    }
}

/// Workflow of `kind` walked forward until it reaches `target`
pub fn workflow_at(kind: ArtifactKind, target: Stage) -> Workflow {
    workflow_at_with(kind, target, CaptureConfig::default())
}

pub fn workflow_at_with(kind: ArtifactKind, target: Stage, config: CaptureConfig) -> Workflow {
    assert!(
        stage::stages(kind).contains(&target),
        "{target} is not a {kind} stage"
    );
    let mut wf = start_with(kind, config);
    while wf.stage() != target {
        satisfy_stage(&mut wf);
        if wf.allowed_transitions().contains(&Stage::Complete) {
            wf.complete().unwrap();
        } else {
            wf.advance().unwrap();
        }
    }
    wf
}

/// Provider that sleeps before answering like [`FixedAnalysisProvider`]
#[derive(Debug, Clone, Copy)]
pub struct SlowAnalysisProvider {
    pub delay: Duration,
}

impl SlowAnalysisProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AnalysisProvider for SlowAnalysisProvider {
    async fn analyze(&self, request: AnalysisRequest) -> Result<FindingsBatch, ProviderError> {
        tokio::time::sleep(self.delay).await;
        FixedAnalysisProvider.analyze(request).await
    }
}

/// Provider that is always unreachable
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAnalysisProvider;

#[async_trait]
impl AnalysisProvider for OfflineAnalysisProvider {
    async fn analyze(&self, _request: AnalysisRequest) -> Result<FindingsBatch, ProviderError> {
        Err(ProviderError::Unavailable("analysis service offline".into()))
    }
}
