//! Workflow state machine
//!
//! A [`Workflow`] owns one [`CaptureSession`] and the stage it is in. Every
//! operation is checked against the stage first ([`stage::permits`]), then
//! validated, then applied. Transition events go through [`Workflow::attempt`],
//! which resolves the target with [`stage::target`], checks entry
//! preconditions and records the attempt in the session journal.
//!
//! The machine is deterministic: it draws no random ids and reads no clock,
//! so the same stage, event and session content always give the same result.

use crate::analysis::{self, AnalysisOutcome, AnalysisRequest, AnalysisStatus, RequestId};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::ingest::IngestReport;
use crate::journal::Journal;
use crate::providers::{AnalysisProvider, ScanProvider};
use crate::session::CaptureSession;
use crate::stage::{self, Operation, Stage, WorkflowEvent};
use crate::templates;
use capflow_model::{
    AnchorId, Artifact, ArtifactKind, ArtifactStatus, FinalizedArtifact, Finding, FindingId,
    FindingPatch, FindingsBatch, MediaRef, MediaSource, Position, ScanBounds, SiteInfo, Step,
};

/// One in-progress capture workflow
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    session: CaptureSession,
    stage: Stage,
    config: CaptureConfig,
    journal: Journal,
}

fn status_for(stage: Stage) -> ArtifactStatus {
    match stage {
        Stage::Review | Stage::Generate | Stage::Anchors => ArtifactStatus::InReview,
        Stage::Complete => ArtifactStatus::Complete,
        Stage::Scan | Stage::Form | Stage::Capture => ArtifactStatus::Draft,
    }
}

impl Workflow {
    /// Start a workflow for a new artifact of `kind`
    ///
    /// # Errors
    /// [`CaptureError::UnknownTemplate`] if `template` is not in the catalog
    pub fn start(
        kind: ArtifactKind,
        template: Option<&str>,
        config: CaptureConfig,
    ) -> Result<Self, CaptureError> {
        let session = CaptureSession::start(kind, template, &config)?;
        Ok(Self::from_session(session, config))
    }

    /// Wrap an existing session, entering its kind's first stage
    #[must_use]
    pub fn from_session(session: CaptureSession, config: CaptureConfig) -> Self {
        let stage = stage::initial_stage(session.kind());
        tracing::info!(session = %session.id(), kind = %session.kind(), %stage, "workflow started");
        Self {
            session,
            stage,
            config,
            journal: Journal::default(),
        }
    }

    // ---- read access ----

    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.session.kind()
    }

    #[inline]
    #[must_use]
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    #[inline]
    #[must_use]
    pub fn artifact(&self) -> &Artifact {
        self.session.artifact()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Analysis indicator for the UI
    #[inline]
    #[must_use]
    pub fn analysis_status(&self) -> &AnalysisStatus {
        self.session.analysis_status()
    }

    /// Stages reachable from here in one event
    #[must_use]
    pub fn allowed_transitions(&self) -> Vec<Stage> {
        stage::allowed_transitions(self.kind(), self.stage)
    }

    fn require(&self, op: Operation) -> Result<(), CaptureError> {
        if stage::permits(self.kind(), self.stage, op) {
            Ok(())
        } else {
            Err(CaptureError::invalid_state(format!(
                "{op:?} is not allowed in {} ({})",
                self.stage,
                self.kind()
            )))
        }
    }

    // ---- transitions ----

    /// Apply a transition event
    ///
    /// Returns the new stage. On error the stage and session are unchanged.
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] for an event not legal from the current
    /// stage, [`CaptureError::IncompletePrerequisite`] if the target stage's
    /// entry precondition is not met
    pub fn attempt(&mut self, event: WorkflowEvent) -> Result<Stage, CaptureError> {
        let from = self.stage;
        let result = self.transition(event);

        if self.config.journal_enabled {
            let outcome = match &result {
                Ok(_) => "ok".to_string(),
                Err(e) => e.to_string(),
            };
            self.journal.record(event, from, self.stage, outcome);
        }

        match &result {
            Ok(to) => tracing::info!(session = %self.session.id(), %event, %from, %to, "stage transition"),
            Err(e) => tracing::warn!(session = %self.session.id(), %event, %from, error = %e, "transition rejected"),
        }
        result
    }

    fn transition(&mut self, event: WorkflowEvent) -> Result<Stage, CaptureError> {
        let from = self.stage;
        let to = stage::target(self.kind(), from, event)?;
        stage::validate_transition(self.kind(), from, to)?;

        match event {
            WorkflowEvent::Advance | WorkflowEvent::Complete => self.check_entry(from, to)?,
            WorkflowEvent::Back | WorkflowEvent::Reopen => self.session.discard_draft(),
        }
        if event == WorkflowEvent::Reopen {
            self.session.analysis = AnalysisStatus::Idle;
        }

        self.stage = to;
        self.session.artifact_mut().set_status(status_for(to));
        Ok(to)
    }

    fn check_entry(&self, from: Stage, to: Stage) -> Result<(), CaptureError> {
        let artifact = self.session.artifact();

        if from == Stage::Form && self.session.needs_template_selection() {
            let expected = if self.kind() == ArtifactKind::Guide {
                "guide type"
            } else {
                "template"
            };
            return Err(CaptureError::prerequisite(
                to,
                format!("no {expected} selected"),
            ));
        }

        match to {
            Stage::Form if from == Stage::Scan && self.session.bounds().is_none() => Err(
                CaptureError::prerequisite(to, "no scan bounds reported"),
            ),
            Stage::Review if artifact.media().is_empty() => {
                Err(CaptureError::prerequisite(to, "no media captured"))
            }
            Stage::Generate if artifact.completed_steps() == 0 => {
                Err(CaptureError::prerequisite(to, "no completed step"))
            }
            Stage::Complete => {
                if let AnalysisStatus::Pending { request } = self.analysis_status() {
                    return Err(CaptureError::prerequisite(
                        to,
                        format!("analysis {request} is still pending"),
                    ));
                }
                let gaps = self.session.completion_gaps();
                if gaps.is_empty() {
                    Ok(())
                } else {
                    Err(CaptureError::prerequisite(to, gaps.join("; ")))
                }
            }
            _ => Ok(()),
        }
    }

    /// Move to the next working stage
    ///
    /// # Errors
    /// See [`Workflow::attempt`]
    #[inline]
    pub fn advance(&mut self) -> Result<Stage, CaptureError> {
        self.attempt(WorkflowEvent::Advance)
    }

    /// Step back one stage, discarding the current stage's draft
    ///
    /// # Errors
    /// See [`Workflow::attempt`]
    #[inline]
    pub fn back(&mut self) -> Result<Stage, CaptureError> {
        self.attempt(WorkflowEvent::Back)
    }

    /// Fire the terminal event
    ///
    /// # Errors
    /// See [`Workflow::attempt`]
    #[inline]
    pub fn complete(&mut self) -> Result<Stage, CaptureError> {
        self.attempt(WorkflowEvent::Complete)
    }

    /// Reopen a completed artifact for edits
    ///
    /// # Errors
    /// See [`Workflow::attempt`]
    #[inline]
    pub fn reopen(&mut self) -> Result<Stage, CaptureError> {
        self.attempt(WorkflowEvent::Reopen)
    }

    // ---- header (Form) ----

    /// Choose the audit template or guide type
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside Form,
    /// [`CaptureError::UnknownTemplate`] for an id not in the catalog
    pub fn select_template(&mut self, id: &str) -> Result<(), CaptureError> {
        self.require(Operation::EditHeader)?;
        self.session.select_template(id)
    }

    /// # Errors
    /// [`CaptureError::InvalidState`] outside Form
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), CaptureError> {
        self.require(Operation::EditHeader)?;
        self.session.set_title(title);
        Ok(())
    }

    /// # Errors
    /// [`CaptureError::InvalidState`] outside Form
    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), CaptureError> {
        self.require(Operation::EditHeader)?;
        self.session.set_description(description);
        Ok(())
    }

    /// Record where a map was made
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside Form or for non-map artifacts
    pub fn set_site(&mut self, site: SiteInfo) -> Result<(), CaptureError> {
        self.require(Operation::EditHeader)?;
        self.session.set_site(site)
    }

    /// Record whether BDA media are recorded live or uploaded
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside Form or for non-BDA artifacts
    pub fn set_media_source(&mut self, source: MediaSource) -> Result<(), CaptureError> {
        self.require(Operation::EditHeader)?;
        self.session.set_media_source(source)
    }

    // ---- scan ----

    /// Record the scan volume anchors are validated against
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside Scan and Anchors,
    /// [`CaptureError::OutOfBounds`] if a placed anchor would fall outside
    /// the new volume
    pub fn report_bounds(&mut self, bounds: ScanBounds) -> Result<(), CaptureError> {
        self.require(Operation::ReportBounds)?;
        self.session.report_bounds(bounds)
    }

    /// Pull the latest bounds from the scanner, if it has any
    ///
    /// # Errors
    /// As [`Workflow::report_bounds`]
    pub fn sync_bounds(
        &mut self,
        scanner: &dyn ScanProvider,
    ) -> Result<Option<ScanBounds>, CaptureError> {
        self.require(Operation::ReportBounds)?;
        let bounds = scanner.current_bounds();
        if let Some(b) = bounds {
            self.session.report_bounds(b)?;
        }
        Ok(bounds)
    }

    // ---- media & steps ----

    /// Attach captured media to step `target`, or to the bucket when `None`
    ///
    /// Returns media displaced from the step. The caller owns it from then
    /// on and should hand it to [`crate::Launcher::release`].
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] in the wrong stage or for the wrong
    /// target shape, [`CaptureError::InvalidIndex`] for a bad step index,
    /// [`CaptureError::CaptureLimitExceeded`] when the bucket is full
    pub fn attach_media(
        &mut self,
        media: MediaRef,
        target: Option<usize>,
    ) -> Result<Option<MediaRef>, CaptureError> {
        self.require(Operation::AttachMedia)?;
        self.session.attach_media(media, target)
    }

    /// Insert an empty step after `after_index` (`-1` for the front)
    ///
    /// Returns the new step's index.
    ///
    /// # Errors
    /// [`CaptureError::InvalidIndex`] for an index outside `-1..len`,
    /// [`CaptureError::CaptureLimitExceeded`] at the step cap
    pub fn insert_step(&mut self, after_index: i64) -> Result<usize, CaptureError> {
        self.require(Operation::EditSteps)?;
        let index = self.session.insert_step(after_index)?.index();
        tracing::debug!(session = %self.session.id(), index, "step inserted");
        Ok(index)
    }

    /// Remove step `index` and renumber the rest
    ///
    /// The removed step's media is no longer owned by the artifact; the caller
    /// should hand it to [`crate::Launcher::release`].
    ///
    /// # Errors
    /// [`CaptureError::InvalidIndex`] for a bad index
    pub fn remove_step(&mut self, index: usize) -> Result<Step, CaptureError> {
        self.require(Operation::EditSteps)?;
        let removed = self.session.remove_step(index)?;
        tracing::debug!(session = %self.session.id(), index, "step removed");
        Ok(removed)
    }

    /// # Errors
    /// [`CaptureError::InvalidIndex`] for a bad index
    pub fn move_step(&mut self, from: usize, to: usize) -> Result<(), CaptureError> {
        self.require(Operation::EditSteps)?;
        self.session.move_step(from, to)
    }

    /// # Errors
    /// [`CaptureError::InvalidIndex`] for a bad index
    pub fn set_step_description(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), CaptureError> {
        self.require(Operation::EditSteps)?;
        self.session.set_step_description(index, text)
    }

    // ---- anchors ----

    /// Anchor step `index` at `position` directly
    ///
    /// # Errors
    /// [`CaptureError::OutOfBounds`] outside the last reported bounds,
    /// [`CaptureError::InvalidIndex`] for a bad index
    pub fn place_anchor(&mut self, index: usize, position: Position) -> Result<AnchorId, CaptureError> {
        self.require(Operation::PlaceAnchor)?;
        self.session.place_anchor(index, position)
    }

    /// Hold a validated position in the stage draft
    ///
    /// # Errors
    /// [`CaptureError::OutOfBounds`] outside the last reported bounds
    pub fn propose_anchor(&mut self, position: Position) -> Result<(), CaptureError> {
        self.require(Operation::PlaceAnchor)?;
        self.session.propose_anchor(position)
    }

    /// Bind the proposed position to step `index`
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] with nothing proposed,
    /// [`CaptureError::InvalidIndex`] for a bad index
    pub fn commit_anchor(&mut self, index: usize) -> Result<AnchorId, CaptureError> {
        self.require(Operation::PlaceAnchor)?;
        self.session.commit_anchor(index)
    }

    // ---- analysis & findings ----

    /// Snapshot captured content for the analysis provider
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside Review/Generate or while
    /// another request is pending
    pub fn begin_analysis(&mut self) -> Result<AnalysisRequest, CaptureError> {
        self.require(Operation::Analyze)?;
        let request = self.session.begin_analysis()?;
        tracing::info!(
            session = %self.session.id(),
            request_id = %request.request_id,
            media = request.media.len(),
            "analysis requested"
        );
        Ok(request)
    }

    /// Hand a finished analysis back to the workflow
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] for a stale or cancelled request or in
    /// the wrong stage, [`CaptureError::AnalysisFailed`] when the outcome is
    /// a failure (the status becomes Failed and can be retried)
    pub fn deliver(&mut self, outcome: AnalysisOutcome) -> Result<IngestReport, CaptureError> {
        self.require(Operation::Analyze)?;
        let AnalysisOutcome { request_id, result } = outcome;
        if self.analysis_status().request() != Some(request_id) {
            return Err(CaptureError::invalid_state(format!(
                "stale analysis result {request_id}"
            )));
        }

        match result {
            Ok(batch) => {
                let batch_id = batch.batch_id.clone();
                let report = self.session.ingest(batch);
                self.session.analysis = AnalysisStatus::Delivered {
                    request: request_id,
                    batch: batch_id,
                };
                Ok(report)
            }
            Err(e) => {
                if self.analysis_status().is_pending() {
                    self.session.analysis = AnalysisStatus::Failed {
                        request: request_id,
                        reason: e.to_string(),
                    };
                }
                tracing::warn!(session = %self.session.id(), %request_id, error = %e, "analysis delivery failed");
                Err(match e {
                    e @ CaptureError::AnalysisFailed { .. } => e,
                    other => CaptureError::AnalysisFailed {
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Give up waiting on the outstanding request
    ///
    /// The status becomes Failed, which unblocks `Complete` and lets
    /// [`Workflow::begin_analysis`] retry. A late result for the cancelled
    /// request is still accepted by [`Workflow::deliver`].
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside Review/Generate or with nothing
    /// pending
    pub fn cancel_analysis(&mut self) -> Result<RequestId, CaptureError> {
        self.require(Operation::Analyze)?;
        let &AnalysisStatus::Pending { request } = self.analysis_status() else {
            return Err(CaptureError::invalid_state("no analysis is pending"));
        };
        self.session.analysis = AnalysisStatus::Failed {
            request,
            reason: "cancelled".to_string(),
        };
        tracing::warn!(session = %self.session.id(), request_id = %request, "analysis cancelled");
        Ok(request)
    }

    /// Request, run and deliver an analysis in one call
    ///
    /// # Errors
    /// See [`Workflow::begin_analysis`] and [`Workflow::deliver`]
    pub async fn run_analysis(
        &mut self,
        provider: &dyn AnalysisProvider,
    ) -> Result<IngestReport, CaptureError> {
        let request = self.begin_analysis()?;
        let outcome = analysis::run(provider, request, self.config.analysis_timeout()).await;
        self.deliver(outcome)
    }

    /// Ingest a findings batch directly
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside Review/Generate
    pub fn ingest_findings(&mut self, batch: FindingsBatch) -> Result<IngestReport, CaptureError> {
        self.require(Operation::Analyze)?;
        Ok(self.session.ingest(batch))
    }

    /// Merge user notes or flag into a finding
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] in Complete,
    /// [`CaptureError::InvalidIndex`] for an unknown id
    pub fn edit_finding(
        &mut self,
        id: &FindingId,
        patch: FindingPatch,
    ) -> Result<&Finding, CaptureError> {
        if self.stage.is_terminal() {
            return Err(CaptureError::invalid_state(
                "completed artifacts are read-only; reopen to edit",
            ));
        }
        let finding = self.session.edit_finding(id, patch)?;
        tracing::debug!(finding = %finding.id(), "finding edited");
        Ok(finding)
    }

    // ---- finish ----

    /// Immutable snapshot of the completed artifact
    ///
    /// # Errors
    /// [`CaptureError::NotReady`] before Complete or with required fields missing
    pub fn finalize(&self) -> Result<FinalizedArtifact, CaptureError> {
        if !self.stage.is_terminal() {
            return Err(CaptureError::NotReady(format!(
                "workflow is in {}, not complete",
                self.stage
            )));
        }
        let gaps = self.session.completion_gaps();
        if !gaps.is_empty() {
            return Err(CaptureError::NotReady(gaps.join("; ")));
        }
        let sealed = FinalizedArtifact::seal(self.artifact().clone())?;
        tracing::info!(
            session = %self.session.id(),
            artifact = %sealed.id(),
            kind = %sealed.kind(),
            "artifact finalized"
        );
        Ok(sealed)
    }

    /// Drop the workflow, returning every owned media reference for release
    #[must_use]
    pub fn abandon(mut self) -> Vec<MediaRef> {
        let released = self.session.release_media();
        tracing::info!(
            session = %self.session.id(),
            stage = %self.stage,
            released = released.len(),
            "workflow abandoned"
        );
        released
    }

    /// Catalog the current kind offers in Form
    #[must_use]
    pub fn templates(&self) -> &'static [templates::Template] {
        templates::catalog(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capflow_model::{BatchId, ReportedFinding, Severity, Span};
    use pretty_assertions::assert_eq;

    fn bounds() -> ScanBounds {
        ScanBounds::planar(Span::new(0.0, 100.0), Span::new(0.0, 100.0)).unwrap()
    }

    fn audit_in_review() -> Workflow {
        let mut wf = Workflow::start(ArtifactKind::Audit, Some("1"), CaptureConfig::default()).unwrap();
        wf.set_title("Pump 3").unwrap();
        wf.advance().unwrap();
        wf.attach_media(MediaRef::image("img-0"), None).unwrap();
        wf.advance().unwrap();
        wf
    }

    #[test]
    fn audit_without_template_cannot_leave_form() {
        let mut wf = Workflow::start(ArtifactKind::Audit, None, CaptureConfig::default()).unwrap();
        let err = wf.advance().unwrap_err();
        assert!(matches!(err, CaptureError::IncompletePrerequisite { stage: Stage::Capture, .. }));
        assert_eq!(wf.stage(), Stage::Form);

        wf.select_template("3").unwrap();
        assert_eq!(wf.advance().unwrap(), Stage::Capture);
    }

    #[test]
    fn review_needs_media() {
        let mut wf = Workflow::start(ArtifactKind::Bda, None, CaptureConfig::default()).unwrap();
        wf.advance().unwrap();
        assert!(matches!(
            wf.advance(),
            Err(CaptureError::IncompletePrerequisite { stage: Stage::Review, .. })
        ));
        assert_eq!(wf.stage(), Stage::Capture);
    }

    #[test]
    fn status_follows_stage() {
        let mut wf = audit_in_review();
        assert_eq!(wf.artifact().status(), ArtifactStatus::InReview);
        wf.back().unwrap();
        assert_eq!(wf.artifact().status(), ArtifactStatus::Draft);
    }

    #[test]
    fn wrong_stage_is_invalid_state() {
        let mut wf = audit_in_review();
        assert!(matches!(wf.set_title("x"), Err(CaptureError::InvalidState(_))));
        assert!(matches!(
            wf.attach_media(MediaRef::image("late"), None),
            Err(CaptureError::InvalidState(_))
        ));
        assert!(matches!(
            wf.report_bounds(bounds()),
            Err(CaptureError::InvalidState(_))
        ));
    }

    #[test]
    fn complete_requires_findings_then_reopens() {
        let mut wf = audit_in_review();
        assert!(wf.complete().is_err());
        wf.ingest_findings(FindingsBatch::new(
            BatchId::new("b1"),
            vec![ReportedFinding::new(Severity::Minor, "Wear", "Surface wear")],
        ))
        .unwrap();
        assert_eq!(wf.complete().unwrap(), Stage::Complete);
        assert_eq!(wf.finalize().unwrap().status(), ArtifactStatus::Complete);

        assert_eq!(wf.reopen().unwrap(), Stage::Form);
        assert_eq!(wf.artifact().status(), ArtifactStatus::Draft);
        assert_eq!(wf.artifact().findings().len(), 1);
        assert!(matches!(wf.finalize(), Err(CaptureError::NotReady(_))));
    }

    #[test]
    fn back_cancels_pending_analysis() {
        let mut wf = audit_in_review();
        let request = wf.begin_analysis().unwrap();
        assert!(wf.analysis_status().is_pending());

        wf.back().unwrap();
        assert_eq!(wf.analysis_status(), &AnalysisStatus::Idle);
        wf.advance().unwrap();

        let stale = AnalysisOutcome {
            request_id: request.request_id,
            result: Ok(FindingsBatch::new(BatchId::new("late"), vec![])),
        };
        assert!(matches!(wf.deliver(stale), Err(CaptureError::InvalidState(_))));
        assert!(wf.artifact().findings().is_empty());
    }

    #[test]
    fn failed_delivery_is_retryable() {
        let mut wf = audit_in_review();
        let request = wf.begin_analysis().unwrap();
        let err = wf
            .deliver(AnalysisOutcome {
                request_id: request.request_id,
                result: Err(CaptureError::AnalysisFailed {
                    reason: "offline".into(),
                }),
            })
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(wf.analysis_status(), AnalysisStatus::Failed { .. }));

        let retry = wf.begin_analysis().unwrap();
        assert_ne!(retry.request_id, request.request_id);
    }

    #[test]
    fn journal_records_rejections() {
        let mut wf = Workflow::start(ArtifactKind::Audit, None, CaptureConfig::default()).unwrap();
        let _ = wf.back();
        let _ = wf.advance();
        wf.select_template("1").unwrap();
        wf.advance().unwrap();

        let entries = wf.journal().entries();
        assert_eq!(entries.len(), 3);
        assert!(!entries[0].accepted());
        assert!(!entries[1].accepted());
        assert!(entries[2].accepted());
        wf.journal().verify_integrity().unwrap();
    }

    #[test]
    fn journal_can_be_disabled() {
        let mut wf = Workflow::start(
            ArtifactKind::Audit,
            Some("1"),
            CaptureConfig::default().with_journal(false),
        )
        .unwrap();
        wf.advance().unwrap();
        assert!(wf.journal().is_empty());
    }

    #[test]
    fn abandon_returns_media() {
        let wf = audit_in_review();
        assert_eq!(wf.abandon(), vec![MediaRef::image("img-0")]);
    }
}
