//! Capture session
//!
//! A [`CaptureSession`] scopes exactly one workflow run: the draft artifact,
//! the selected template, the last reported scan volume, analysis
//! bookkeeping and the uncommitted per-stage draft.
//!
//! Sessions are created with [`CaptureSession::start`] and are then owned by
//! a [`crate::Workflow`]. Mutators are crate-private so every change goes
//! through the workflow's stage checks. Each mutator validates first and
//! only then writes, so a rejected call leaves the session untouched.

use crate::analysis::{AnalysisRequest, AnalysisStatus, RequestId};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::templates;
use capflow_model::{
    AnchorId, Artifact, ArtifactKind, BatchId, MediaRef, MediaSource, Position, ScanBounds,
    SiteInfo, Step,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use ulid::Ulid;

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Uncommitted state of the current stage; dropped by `Back`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageDraft {
    /// Validated anchor position not yet bound to a step
    pub proposed_anchor: Option<Position>,
}

impl StageDraft {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposed_anchor.is_none()
    }
}

/// Mutable aggregate for one in-progress workflow
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    id: SessionId,
    artifact: Artifact,
    media_cap: Option<usize>,
    max_steps: usize,
    bounds: Option<ScanBounds>,
    processed_batches: BTreeSet<BatchId>,
    pub(crate) analysis: AnalysisStatus,
    next_request: u32,
    draft: StageDraft,
}

impl CaptureSession {
    /// Start a session for a new draft artifact of `kind`
    ///
    /// Audits and guides without a template stay in the needs-selection
    /// sub-state until [`crate::Workflow::select_template`].
    ///
    /// # Errors
    /// [`CaptureError::UnknownTemplate`] if `template` is not in the catalog
    pub fn start(
        kind: ArtifactKind,
        template: Option<&str>,
        config: &CaptureConfig,
    ) -> Result<Self, CaptureError> {
        let mut artifact = Artifact::new(kind);
        if let Some(id) = template {
            let t = templates::lookup(kind, id)?;
            artifact.set_template(t.id);
        }
        let session = Self {
            id: SessionId::new(),
            artifact,
            media_cap: config.media_cap(kind),
            max_steps: config.max_steps,
            bounds: None,
            processed_batches: BTreeSet::new(),
            analysis: AnalysisStatus::Idle,
            next_request: 0,
            draft: StageDraft::default(),
        };
        tracing::debug!(session = %session.id, %kind, template = ?template, "session started");
        Ok(session)
    }

    // ---- read access ----

    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.artifact.kind()
    }

    #[inline]
    #[must_use]
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Still waiting for a template choice
    #[inline]
    #[must_use]
    pub fn needs_template_selection(&self) -> bool {
        templates::requires_template(self.kind()) && self.artifact.template().is_none()
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Option<&ScanBounds> {
        self.bounds.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn analysis_status(&self) -> &AnalysisStatus {
        &self.analysis
    }

    #[inline]
    #[must_use]
    pub fn draft(&self) -> &StageDraft {
        &self.draft
    }

    #[inline]
    #[must_use]
    pub fn processed_batches(&self) -> &BTreeSet<BatchId> {
        &self.processed_batches
    }

    #[inline]
    #[must_use]
    pub fn media_cap(&self) -> Option<usize> {
        self.media_cap
    }

    /// What is still missing before the artifact can be completed
    ///
    /// Empty when the artifact is ready.
    #[must_use]
    pub fn completion_gaps(&self) -> Vec<String> {
        let a = &self.artifact;
        let mut gaps = Vec::new();
        if a.title().trim().is_empty() {
            gaps.push("title is required".to_string());
        }
        match a.kind() {
            ArtifactKind::Audit | ArtifactKind::Bda => {
                if a.media().is_empty() {
                    gaps.push("at least one media item is required".to_string());
                }
                if a.findings().is_empty() {
                    gaps.push("at least one finding is required".to_string());
                }
            }
            ArtifactKind::Guide => {
                if a.completed_steps() == 0 {
                    gaps.push("at least one completed step is required".to_string());
                }
            }
            ArtifactKind::Map => {
                if a.steps().is_empty() {
                    gaps.push("at least one anchored step is required".to_string());
                }
                for step in a.steps().iter().filter(|s| s.anchor().is_none()) {
                    gaps.push(format!("step {} has no anchor", step.index()));
                }
            }
        }
        gaps
    }

    // ---- header ----

    pub(crate) fn select_template(&mut self, id: &str) -> Result<(), CaptureError> {
        let t = templates::lookup(self.kind(), id)?;
        self.artifact.set_template(t.id);
        tracing::debug!(session = %self.id, template = t.id, "template selected");
        Ok(())
    }

    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.artifact.set_title(title);
    }

    pub(crate) fn set_description(&mut self, description: impl Into<String>) {
        self.artifact.set_description(description);
    }

    pub(crate) fn set_site(&mut self, site: SiteInfo) -> Result<(), CaptureError> {
        if self.kind() != ArtifactKind::Map {
            return Err(CaptureError::invalid_state(format!(
                "site info applies to maps, not {}",
                self.kind()
            )));
        }
        self.artifact.set_site(site);
        Ok(())
    }

    pub(crate) fn set_media_source(&mut self, source: MediaSource) -> Result<(), CaptureError> {
        if self.kind() != ArtifactKind::Bda {
            return Err(CaptureError::invalid_state(format!(
                "media source applies to breakdown analyses, not {}",
                self.kind()
            )));
        }
        self.artifact.set_media_source(source);
        Ok(())
    }

    pub(crate) fn artifact_mut(&mut self) -> &mut Artifact {
        &mut self.artifact
    }

    // ---- scan ----

    /// Replace the scan volume
    ///
    /// Rejected without change if a placed anchor would fall outside it. A
    /// proposed anchor the new volume excludes is dropped from the draft.
    pub(crate) fn report_bounds(&mut self, bounds: ScanBounds) -> Result<(), CaptureError> {
        for anchor in self.artifact.steps().iter().filter_map(|s| s.anchor()) {
            bounds.ensure_contains(&anchor.position())?;
        }
        if self
            .draft
            .proposed_anchor
            .is_some_and(|p| !bounds.contains(&p))
        {
            self.draft.proposed_anchor = None;
        }
        tracing::debug!(session = %self.id, %bounds, "scan bounds reported");
        self.bounds = Some(bounds);
        Ok(())
    }

    // ---- media ----

    /// Attach media to step `target` or to the top-level bucket
    ///
    /// Returns media displaced from the step, which the caller should release.
    pub(crate) fn attach_media(
        &mut self,
        media: MediaRef,
        target: Option<usize>,
    ) -> Result<Option<MediaRef>, CaptureError> {
        if self.artifact.owns_media(&media.uri) {
            return Err(CaptureError::invalid_state(format!(
                "media {} already has an owner",
                media.uri
            )));
        }
        let kind = self.kind();
        match target {
            Some(index) => {
                if !kind.has_steps() {
                    return Err(CaptureError::invalid_state(format!(
                        "{kind} media go to the session bucket, not to a step"
                    )));
                }
                let displaced = self.artifact.attach_step_media(index, media)?;
                tracing::debug!(session = %self.id, step = index, "media attached to step");
                Ok(displaced)
            }
            None => {
                let Some(limit) = self.media_cap.filter(|_| kind.has_media_bucket()) else {
                    return Err(CaptureError::invalid_state(format!(
                        "{kind} media must target a step"
                    )));
                };
                if self.artifact.media().len() >= limit {
                    return Err(CaptureError::CaptureLimitExceeded { limit });
                }
                self.artifact.push_media(media);
                tracing::debug!(
                    session = %self.id,
                    count = self.artifact.media().len(),
                    limit,
                    "media attached to bucket"
                );
                Ok(None)
            }
        }
    }

    // ---- steps ----

    pub(crate) fn insert_step(&mut self, after_index: i64) -> Result<&Step, CaptureError> {
        if self.artifact.steps().len() >= self.max_steps {
            return Err(CaptureError::CaptureLimitExceeded {
                limit: self.max_steps,
            });
        }
        let step = self.artifact.insert_step(after_index)?;
        Ok(&*step)
    }

    pub(crate) fn remove_step(&mut self, index: usize) -> Result<Step, CaptureError> {
        Ok(self.artifact.remove_step(index)?)
    }

    pub(crate) fn move_step(&mut self, from: usize, to: usize) -> Result<(), CaptureError> {
        Ok(self.artifact.move_step(from, to)?)
    }

    pub(crate) fn set_step_description(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), CaptureError> {
        self.artifact.step_mut(index)?.set_description(text);
        Ok(())
    }

    // ---- anchors ----

    fn scan_bounds(&self) -> Result<ScanBounds, CaptureError> {
        self.bounds
            .ok_or_else(|| CaptureError::invalid_state("no scan bounds reported"))
    }

    pub(crate) fn place_anchor(
        &mut self,
        index: usize,
        position: Position,
    ) -> Result<AnchorId, CaptureError> {
        let bounds = self.scan_bounds()?;
        let id = self.artifact.place_anchor(index, position, &bounds)?;
        tracing::debug!(session = %self.id, step = index, anchor = %id, %position, "anchor placed");
        Ok(id)
    }

    pub(crate) fn propose_anchor(&mut self, position: Position) -> Result<(), CaptureError> {
        self.scan_bounds()?.ensure_contains(&position)?;
        self.draft.proposed_anchor = Some(position);
        Ok(())
    }

    pub(crate) fn commit_anchor(&mut self, index: usize) -> Result<AnchorId, CaptureError> {
        let Some(position) = self.draft.proposed_anchor else {
            return Err(CaptureError::invalid_state("no proposed anchor to commit"));
        };
        let id = self.place_anchor(index, position)?;
        self.draft.proposed_anchor = None;
        Ok(id)
    }

    // ---- analysis ----

    pub(crate) fn begin_analysis(&mut self) -> Result<AnalysisRequest, CaptureError> {
        if let AnalysisStatus::Pending { request } = self.analysis {
            return Err(CaptureError::invalid_state(format!(
                "analysis {request} is still pending"
            )));
        }
        let request_id = RequestId(self.next_request);
        self.next_request += 1;
        self.analysis = AnalysisStatus::Pending {
            request: request_id,
        };
        Ok(AnalysisRequest {
            request_id,
            session: self.id,
            kind: self.kind(),
            template: self.artifact.template().map(str::to_string),
            media: self.artifact.owned_media().cloned().collect(),
            steps: self
                .artifact
                .steps()
                .iter()
                .map(|s| s.description().to_string())
                .collect(),
        })
    }

    pub(crate) fn mark_batch_processed(&mut self, batch: BatchId) {
        self.processed_batches.insert(batch);
    }

    // ---- draft & teardown ----

    /// Drop uncommitted state and cancel any outstanding analysis
    pub(crate) fn discard_draft(&mut self) {
        self.draft = StageDraft::default();
        if self.analysis.is_pending() {
            tracing::debug!(session = %self.id, "outstanding analysis cancelled");
            self.analysis = AnalysisStatus::Idle;
        }
    }

    pub(crate) fn release_media(&mut self) -> Vec<MediaRef> {
        self.artifact.release_media()
    }
}
