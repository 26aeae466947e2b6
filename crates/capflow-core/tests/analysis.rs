//! Analysis round trips: delivery, idempotence, failure, timeout

use async_trait::async_trait;
use capflow_core::analysis::{self, AnalysisRequest};
use capflow_core::prelude::*;
use capflow_core::ProviderError;
use capflow_model::{BatchId, FindingId, FindingPatch, FindingsBatch, MediaRef, ReportedFinding, Severity};
use capflow_test_utils::{batch, workflow_at, workflow_at_with, OfflineAnalysisProvider, SlowAnalysisProvider};
use mockall::mock;
use pretty_assertions::assert_eq;
use std::time::Duration;

mock! {
    pub Analyzer {}

    #[async_trait]
    impl AnalysisProvider for Analyzer {
        async fn analyze(&self, request: AnalysisRequest) -> Result<FindingsBatch, ProviderError>;
    }
}

#[tokio::test]
async fn provider_sees_captured_media() {
    let mut wf = workflow_at(ArtifactKind::Bda, Stage::Capture);
    wf.attach_media(MediaRef::video("clip-a"), None).unwrap();
    wf.attach_media(MediaRef::video("clip-b"), None).unwrap();
    wf.advance().unwrap();

    let mut provider = MockAnalyzer::new();
    provider
        .expect_analyze()
        .withf(|req| req.kind == ArtifactKind::Bda && req.media.len() == 2)
        .times(1)
        .returning(|req| {
            Ok(FindingsBatch::new(
                BatchId::new(format!("bda-{}", req.request_id)),
                vec![ReportedFinding::new(Severity::Critical, "Root Cause", "Seized bearing")],
            ))
        });

    let report = wf.run_analysis(&provider).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(wf.artifact().findings()[0].severity(), Severity::Critical);
}

#[tokio::test]
async fn provider_error_is_retryable() {
    let mut wf = workflow_at(ArtifactKind::Audit, Stage::Review);

    let err = wf.run_analysis(&OfflineAnalysisProvider).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(wf.analysis_status(), AnalysisStatus::Failed { .. }));
    let findings_before = wf.artifact().findings().len();

    let mut provider = MockAnalyzer::new();
    provider
        .expect_analyze()
        .times(1)
        .returning(|_| Ok(batch("retry", 2)));
    wf.run_analysis(&provider).await.unwrap();
    assert_eq!(wf.artifact().findings().len(), findings_before + 2);
}

#[tokio::test]
async fn slow_provider_times_out() {
    let config = CaptureConfig::default().with_analysis_timeout(Duration::from_millis(20));
    let mut wf = workflow_at_with(ArtifactKind::Audit, Stage::Review, config);

    let slow = SlowAnalysisProvider::new(Duration::from_secs(5));
    let err = wf.run_analysis(&slow).await.unwrap_err();
    match err {
        CaptureError::AnalysisFailed { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected AnalysisFailed, got {other:?}"),
    }
    assert!(!wf.analysis_status().is_pending());
}

#[tokio::test]
async fn run_reports_timeout_in_outcome() {
    let mut wf = workflow_at(ArtifactKind::Guide, Stage::Generate);
    let request = wf.begin_analysis().unwrap();
    let id = request.request_id;

    let outcome = analysis::run(
        &SlowAnalysisProvider::new(Duration::from_secs(5)),
        request,
        Duration::from_millis(10),
    )
    .await;
    assert_eq!(outcome.request_id, id);
    assert!(outcome.result.is_err());
}

#[tokio::test]
async fn complete_waits_for_pending_analysis() {
    let mut wf = workflow_at(ArtifactKind::Audit, Stage::Review);
    let request = wf.begin_analysis().unwrap();
    assert!(matches!(
        wf.complete(),
        Err(CaptureError::IncompletePrerequisite { stage: Stage::Complete, .. })
    ));

    let outcome = analysis::run(&capflow_core::FixedAnalysisProvider, request, Duration::from_secs(1)).await;
    wf.deliver(outcome).unwrap();
    assert_eq!(wf.complete().unwrap(), Stage::Complete);
}

#[test]
fn cancelled_request_unblocks_complete_and_retry() {
    let mut wf = workflow_at(ArtifactKind::Audit, Stage::Review);
    wf.ingest_findings(batch("manual", 1)).unwrap();
    let request = wf.begin_analysis().unwrap();
    assert!(wf.complete().is_err());

    assert_eq!(wf.cancel_analysis().unwrap(), request.request_id);
    assert!(matches!(
        wf.analysis_status(),
        AnalysisStatus::Failed { reason, .. } if reason == "cancelled"
    ));
    assert!(matches!(wf.cancel_analysis(), Err(CaptureError::InvalidState(_))));

    let retry = wf.begin_analysis().unwrap();
    assert_ne!(retry.request_id, request.request_id);
    wf.cancel_analysis().unwrap();
    assert_eq!(wf.complete().unwrap(), Stage::Complete);
}

#[test]
fn duplicate_batch_keeps_finding_set() {
    let mut wf = workflow_at(ArtifactKind::Bda, Stage::Review);
    wf.ingest_findings(batch("b7", 3)).unwrap();
    let once = wf.artifact().findings().to_vec();

    let report = wf.ingest_findings(batch("b7", 3)).unwrap();
    assert!(report.duplicate);
    assert_eq!(report.added, 0);
    assert_eq!(wf.artifact().findings(), once.as_slice());
}

#[test]
fn edited_finding_survives_redelivery() {
    let mut wf = workflow_at(ArtifactKind::Audit, Stage::Review);
    wf.ingest_findings(batch("b1", 2)).unwrap();
    let id = FindingId::new(BatchId::new("b1"), 1);
    wf.edit_finding(&id, FindingPatch::notes("replace next shift").with_flag(true))
        .unwrap();

    wf.ingest_findings(batch("b1", 2)).unwrap();
    let f = wf.artifact().finding(&id).unwrap();
    assert_eq!(f.notes(), "replace next shift");
    assert!(f.is_flagged());
    assert_eq!(f.title(), "finding-1");
}

#[test]
fn ingest_outside_review_is_rejected() {
    let mut wf = workflow_at(ArtifactKind::Audit, Stage::Capture);
    assert!(matches!(
        wf.ingest_findings(batch("early", 1)),
        Err(CaptureError::InvalidState(_))
    ));
}
