//! Findings ingestion and user edits
//!
//! Batches are applied append-only and at most once per batch id. A finding
//! the user has edited is never overwritten by a later delivery.

use crate::error::CaptureError;
use crate::session::CaptureSession;
use capflow_model::{BatchId, Finding, FindingId, FindingPatch, FindingsBatch};
use serde::Serialize;

/// What one ingestion did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub batch_id: BatchId,
    /// Findings appended to the artifact
    pub added: usize,
    /// The batch had already been applied; nothing changed
    pub duplicate: bool,
}

impl CaptureSession {
    /// Apply `batch` to the artifact
    pub(crate) fn ingest(&mut self, batch: FindingsBatch) -> IngestReport {
        let FindingsBatch { batch_id, findings } = batch;
        if self.processed_batches().contains(&batch_id) {
            tracing::debug!(session = %self.id(), batch = %batch_id, "duplicate batch ignored");
            return IngestReport {
                batch_id,
                added: 0,
                duplicate: true,
            };
        }

        let artifact = self.artifact_mut();
        let mut added = 0;
        for (ordinal, reported) in (0u32..).zip(findings) {
            let id = FindingId::new(batch_id.clone(), ordinal);
            if artifact.finding(&id).is_some() {
                continue;
            }
            artifact.push_finding(Finding::ingest(&batch_id, ordinal, reported));
            added += 1;
        }
        self.mark_batch_processed(batch_id.clone());

        tracing::info!(session = %self.id(), batch = %batch_id, added, "findings ingested");
        IngestReport {
            batch_id,
            added,
            duplicate: false,
        }
    }

    /// Apply a user edit to one finding
    pub(crate) fn edit_finding(
        &mut self,
        id: &FindingId,
        patch: FindingPatch,
    ) -> Result<&Finding, CaptureError> {
        let Some(finding) = self.artifact_mut().finding_mut(id) else {
            return Err(CaptureError::InvalidIndex(format!("no finding {id}")));
        };
        finding.apply(patch);
        Ok(&*finding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use capflow_model::{ArtifactKind, ReportedFinding, Severity};
    use pretty_assertions::assert_eq;

    fn batch(id: &str, n: usize) -> FindingsBatch {
        FindingsBatch::new(
            BatchId::new(id),
            (0..n)
                .map(|i| ReportedFinding::new(Severity::Info, format!("f{i}"), "desc"))
                .collect(),
        )
    }

    fn session() -> CaptureSession {
        CaptureSession::start(ArtifactKind::Bda, None, &CaptureConfig::default()).unwrap()
    }

    #[test]
    fn second_delivery_is_a_no_op() {
        let mut s = session();
        let first = s.ingest(batch("b1", 3));
        assert_eq!(first.added, 3);
        assert!(!first.duplicate);

        let after_first = s.clone();
        let second = s.ingest(batch("b1", 3));
        assert!(second.duplicate);
        assert_eq!(s, after_first);
    }

    #[test]
    fn batches_append() {
        let mut s = session();
        s.ingest(batch("b1", 2));
        s.ingest(batch("b2", 1));
        assert_eq!(s.artifact().findings().len(), 3);
        assert_eq!(s.artifact().findings()[2].id().to_string(), "b2#0");
    }

    #[test]
    fn edits_survive_redelivery() {
        let mut s = session();
        s.ingest(batch("b1", 1));
        let id = FindingId::new(BatchId::new("b1"), 0);
        s.edit_finding(&id, FindingPatch::notes("checked on site")).unwrap();

        s.ingest(batch("b1", 1));
        let f = s.artifact().finding(&id).unwrap();
        assert!(f.is_edited());
        assert_eq!(f.notes(), "checked on site");
    }

    #[test]
    fn unknown_finding() {
        let mut s = session();
        let id = FindingId::new(BatchId::new("nope"), 0);
        assert!(matches!(
            s.edit_finding(&id, FindingPatch::notes("x")),
            Err(CaptureError::InvalidIndex(_))
        ));
    }
}
