//! Artifact aggregate
//!
//! An [`Artifact`] is the record a capture workflow builds: an audit, guide,
//! breakdown analysis or procedure map. Structural edits (step insert,
//! remove, move, anchor placement) are validated here and keep step indices
//! contiguous and anchor ids unique.
//!
//! # Invariants
//! - Step indices are exactly `0..steps.len()`, in order
//! - Anchor ids are unique and only present on map steps
//! - Audit and BDA artifacts hold no steps
//! - No media URI has two owners

use crate::error::ModelError;
use crate::finding::Finding;
use crate::geometry::{Position, ScanBounds};
use crate::ids::{AnchorId, AnchorSequence, ArtifactId, FindingId};
use crate::media::{MediaRef, MediaSource};
use crate::step::Step;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;

/// What is being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Equipment audit
    Audit,
    /// Step-by-step guide
    Guide,
    /// Breakdown analysis
    Bda,
    /// Spatially anchored procedure map
    Map,
}

impl ArtifactKind {
    /// All kinds, in dashboard order
    pub const ALL: [ArtifactKind; 4] = [Self::Audit, Self::Guide, Self::Bda, Self::Map];

    /// Whether the artifact is an ordered sequence of steps
    #[inline]
    #[must_use]
    pub const fn has_steps(self) -> bool {
        matches!(self, Self::Guide | Self::Map)
    }

    /// Whether captured media go to the top-level bucket
    #[inline]
    #[must_use]
    pub const fn has_media_bucket(self) -> bool {
        matches!(self, Self::Audit | Self::Bda)
    }

    /// Whether steps carry spatial anchors
    #[inline]
    #[must_use]
    pub const fn has_anchors(self) -> bool {
        matches!(self, Self::Map)
    }

    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::Guide => "guide",
            Self::Bda => "bda",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audit" => Ok(Self::Audit),
            "guide" => Ok(Self::Guide),
            "bda" => Ok(Self::Bda),
            "map" | "mapping" => Ok(Self::Map),
            other => Err(ModelError::InvariantViolation(format!(
                "unknown artifact kind: {other}"
            ))),
        }
    }
}

/// Artifact lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Draft,
    InReview,
    Complete,
}

/// Where a map was recorded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub site: String,
    pub section: String,
}

/// Artifact under construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    id: ArtifactId,
    kind: ArtifactKind,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    status: ArtifactStatus,
    template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_source: Option<MediaSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site: Option<SiteInfo>,
    steps: Vec<Step>,
    findings: Vec<Finding>,
    media: Vec<MediaRef>,
    anchor_ids: AnchorSequence,
}

impl Artifact {
    /// Create an empty draft
    #[must_use]
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            id: ArtifactId::new(),
            kind,
            title: String::new(),
            description: String::new(),
            created_at: Utc::now(),
            status: ArtifactStatus::Draft,
            template: None,
            media_source: None,
            site: None,
            steps: Vec::new(),
            findings: Vec::new(),
            media: Vec::new(),
            anchor_ids: AnchorSequence::default(),
        }
    }

    // ---- accessors ----

    #[inline]
    #[must_use]
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn media_source(&self) -> Option<MediaSource> {
        self.media_source
    }

    #[inline]
    #[must_use]
    pub fn site(&self) -> Option<&SiteInfo> {
        self.site.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[inline]
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Top-level media bucket
    #[inline]
    #[must_use]
    pub fn media(&self) -> &[MediaRef] {
        &self.media
    }

    /// Steps with a description or media
    #[must_use]
    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    /// Every media reference the artifact owns, bucket first then steps
    pub fn owned_media(&self) -> impl Iterator<Item = &MediaRef> {
        self.media
            .iter()
            .chain(self.steps.iter().filter_map(Step::media))
    }

    /// Whether `uri` already has an owner in this artifact
    #[must_use]
    pub fn owns_media(&self, uri: &str) -> bool {
        self.owned_media().any(|m| m.uri == uri)
    }

    // ---- header fields ----

    #[inline]
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    #[inline]
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    #[inline]
    pub fn set_status(&mut self, status: ArtifactStatus) {
        self.status = status;
    }

    #[inline]
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = Some(template.into());
    }

    #[inline]
    pub fn set_media_source(&mut self, source: MediaSource) {
        self.media_source = Some(source);
    }

    #[inline]
    pub fn set_site(&mut self, site: SiteInfo) {
        self.site = Some(site);
    }

    // ---- steps ----

    fn ensure_steps(&self) -> Result<(), ModelError> {
        if self.kind.has_steps() {
            Ok(())
        } else {
            Err(ModelError::InvariantViolation(format!(
                "{} artifacts do not hold steps",
                self.kind
            )))
        }
    }

    fn renumber_from(&mut self, start: usize) {
        for (i, step) in self.steps.iter_mut().enumerate().skip(start) {
            step.set_index(i);
        }
    }

    fn bad_index(&self, index: usize) -> ModelError {
        ModelError::invalid_index(
            i64::try_from(index).unwrap_or(i64::MAX),
            0,
            self.steps.len() as i64 - 1,
        )
    }

    /// Insert an empty step after `after_index` (`-1` inserts at the front)
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] if `after_index` is outside `-1..=len-1`
    pub fn insert_step(&mut self, after_index: i64) -> Result<&mut Step, ModelError> {
        self.ensure_steps()?;
        let max = self.steps.len() as i64 - 1;
        if after_index < -1 || after_index > max {
            return Err(ModelError::invalid_index(after_index, -1, max));
        }
        // after_index >= -1, so this is non-negative
        let at = usize::try_from(after_index + 1).unwrap_or(0);
        self.steps.insert(at, Step::empty(at));
        self.renumber_from(at);
        Ok(&mut self.steps[at])
    }

    /// Remove the step at `index` and close the gap
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] if `index` is out of range
    pub fn remove_step(&mut self, index: usize) -> Result<Step, ModelError> {
        self.ensure_steps()?;
        if index >= self.steps.len() {
            return Err(self.bad_index(index));
        }
        let removed = self.steps.remove(index);
        self.renumber_from(index);
        Ok(removed)
    }

    /// Move a step to a new position, renumbering everything in between
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] if either index is out of range
    pub fn move_step(&mut self, from: usize, to: usize) -> Result<(), ModelError> {
        self.ensure_steps()?;
        for index in [from, to] {
            if index >= self.steps.len() {
                return Err(self.bad_index(index));
            }
        }
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        self.renumber_from(from.min(to));
        Ok(())
    }

    /// Borrow a step
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] if `index` is out of range
    pub fn step(&self, index: usize) -> Result<&Step, ModelError> {
        self.steps.get(index).ok_or_else(|| self.bad_index(index))
    }

    /// Mutably borrow a step
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] if `index` is out of range
    pub fn step_mut(&mut self, index: usize) -> Result<&mut Step, ModelError> {
        if index >= self.steps.len() {
            return Err(self.bad_index(index));
        }
        Ok(&mut self.steps[index])
    }

    /// Place the anchor of step `index`, allocating ids from this artifact
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] for a bad index, [`ModelError::OutOfBounds`]
    /// for a position outside `bounds`, and [`ModelError::InvariantViolation`]
    /// on non-map artifacts
    pub fn place_anchor(
        &mut self,
        index: usize,
        position: Position,
        bounds: &ScanBounds,
    ) -> Result<AnchorId, ModelError> {
        if !self.kind.has_anchors() {
            return Err(ModelError::InvariantViolation(format!(
                "{} steps do not carry anchors",
                self.kind
            )));
        }
        if index >= self.steps.len() {
            return Err(self.bad_index(index));
        }
        self.steps[index].place_anchor(position, bounds, &mut self.anchor_ids)
    }

    /// Index of the step labelled by `anchor`
    #[must_use]
    pub fn step_for_anchor(&self, anchor: AnchorId) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.anchor().is_some_and(|a| a.id() == anchor))
    }

    /// Attach media to a step, returning the media it replaces
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] if `index` is out of range
    pub fn attach_step_media(
        &mut self,
        index: usize,
        media: MediaRef,
    ) -> Result<Option<MediaRef>, ModelError> {
        Ok(self.step_mut(index)?.attach_media(media))
    }

    /// Detach and return media from a step
    ///
    /// # Errors
    /// [`ModelError::InvalidIndex`] if `index` is out of range
    pub fn detach_step_media(&mut self, index: usize) -> Result<Option<MediaRef>, ModelError> {
        Ok(self.step_mut(index)?.take_media())
    }

    // ---- bucket & findings ----

    /// Append to the top-level media bucket
    #[inline]
    pub fn push_media(&mut self, media: MediaRef) {
        self.media.push(media);
    }

    /// Append an ingested finding
    #[inline]
    pub fn push_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    #[must_use]
    pub fn finding(&self, id: &FindingId) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id() == id)
    }

    pub fn finding_mut(&mut self, id: &FindingId) -> Option<&mut Finding> {
        self.findings.iter_mut().find(|f| f.id() == id)
    }

    /// Drain every media reference the artifact owns
    pub fn release_media(&mut self) -> Vec<MediaRef> {
        let mut released: Vec<MediaRef> = self.media.drain(..).collect();
        released.extend(self.steps.iter_mut().filter_map(Step::take_media));
        released
    }

    // ---- validation ----

    /// Re-check every structural invariant
    ///
    /// Pure and re-runnable.
    ///
    /// # Errors
    /// [`ModelError::InvariantViolation`] describing the first broken invariant
    pub fn check_invariants(&self) -> Result<(), ModelError> {
        if !self.kind.has_steps() && !self.steps.is_empty() {
            return Err(ModelError::InvariantViolation(format!(
                "{} artifact holds {} steps",
                self.kind,
                self.steps.len()
            )));
        }

        for (expected, step) in self.steps.iter().enumerate() {
            if step.index() != expected {
                return Err(ModelError::InvariantViolation(format!(
                    "step at position {expected} has index {}",
                    step.index()
                )));
            }
        }

        let mut anchors = HashSet::new();
        for step in &self.steps {
            if let Some(anchor) = step.anchor() {
                if !self.kind.has_anchors() {
                    return Err(ModelError::InvariantViolation(format!(
                        "step {} of a {} artifact carries an anchor",
                        step.index(),
                        self.kind
                    )));
                }
                if !anchors.insert(anchor.id()) {
                    return Err(ModelError::InvariantViolation(format!(
                        "duplicate {}",
                        anchor.id()
                    )));
                }
            }
        }

        let mut uris = HashSet::new();
        for media in self.owned_media() {
            if !uris.insert(media.uri.as_str()) {
                return Err(ModelError::InvariantViolation(format!(
                    "media {} has two owners",
                    media.uri
                )));
            }
        }

        let mut findings = HashSet::new();
        for finding in &self.findings {
            if !findings.insert(finding.id()) {
                return Err(ModelError::InvariantViolation(format!(
                    "duplicate finding {}",
                    finding.id()
                )));
            }
        }

        Ok(())
    }
}

/// Immutable snapshot of a completed artifact
///
/// Derefs to [`Artifact`] for reading; there is no mutable access.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FinalizedArtifact(Artifact);

impl FinalizedArtifact {
    /// Seal a completed artifact
    ///
    /// # Errors
    /// [`ModelError::InvariantViolation`] if the artifact is not `Complete`
    /// or fails [`Artifact::check_invariants`]
    pub fn seal(artifact: Artifact) -> Result<Self, ModelError> {
        if artifact.status != ArtifactStatus::Complete {
            return Err(ModelError::InvariantViolation(format!(
                "cannot seal artifact in status {:?}",
                artifact.status
            )));
        }
        artifact.check_invariants()?;
        Ok(Self(artifact))
    }

    /// Unwrap into an owned, editable copy
    #[must_use]
    pub fn into_inner(self) -> Artifact {
        self.0
    }
}

impl Deref for FinalizedArtifact {
    type Target = Artifact;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Span;
    use pretty_assertions::assert_eq;

    fn indices(a: &Artifact) -> Vec<usize> {
        a.steps().iter().map(Step::index).collect()
    }

    fn bounds() -> ScanBounds {
        ScanBounds::planar(Span::new(0.0, 100.0), Span::new(0.0, 100.0)).unwrap()
    }

    #[test]
    fn insert_front_and_middle() {
        let mut a = Artifact::new(ArtifactKind::Guide);
        a.insert_step(-1).unwrap().set_description("first");
        a.insert_step(0).unwrap().set_description("second");
        a.insert_step(-1).unwrap().set_description("zeroth");
        assert_eq!(indices(&a), vec![0, 1, 2]);
        assert_eq!(a.steps()[0].description(), "zeroth");
        assert_eq!(a.steps()[2].description(), "second");
    }

    #[test]
    fn insert_rejects_out_of_range() {
        let mut a = Artifact::new(ArtifactKind::Guide);
        assert!(matches!(
            a.insert_step(0),
            Err(ModelError::InvalidIndex { index: 0, min: -1, max: -1 })
        ));
        assert!(a.insert_step(-2).is_err());
        assert!(a.steps().is_empty());
    }

    #[test]
    fn remove_closes_gap() {
        let mut a = Artifact::new(ArtifactKind::Guide);
        for i in 0..4 {
            a.insert_step(i - 1).unwrap();
        }
        a.remove_step(1).unwrap();
        assert_eq!(indices(&a), vec![0, 1, 2]);
        assert!(a.remove_step(3).is_err());
    }

    #[test]
    fn move_renumbers_and_keeps_anchor() {
        let mut a = Artifact::new(ArtifactKind::Map);
        for i in 0..3 {
            a.insert_step(i - 1).unwrap();
        }
        let id = a.place_anchor(2, Position::planar(5.0, 5.0), &bounds()).unwrap();
        a.move_step(2, 0).unwrap();
        assert_eq!(indices(&a), vec![0, 1, 2]);
        assert_eq!(a.step_for_anchor(id), Some(0));
        a.check_invariants().unwrap();
    }

    #[test]
    fn audit_rejects_steps() {
        let mut a = Artifact::new(ArtifactKind::Audit);
        assert!(matches!(
            a.insert_step(-1),
            Err(ModelError::InvariantViolation(_))
        ));
    }

    #[test]
    fn guide_rejects_anchor() {
        let mut a = Artifact::new(ArtifactKind::Guide);
        a.insert_step(-1).unwrap();
        assert!(a.place_anchor(0, Position::planar(1.0, 1.0), &bounds()).is_err());
    }

    #[test]
    fn shared_media_is_an_invariant_violation() {
        let mut a = Artifact::new(ArtifactKind::Guide);
        a.insert_step(-1).unwrap();
        a.insert_step(0).unwrap();
        a.attach_step_media(0, MediaRef::image("m1")).unwrap();
        a.attach_step_media(1, MediaRef::image("m1")).unwrap();
        assert!(a.check_invariants().is_err());
    }

    #[test]
    fn release_drains_everything() {
        let mut a = Artifact::new(ArtifactKind::Guide);
        a.insert_step(-1).unwrap();
        a.attach_step_media(0, MediaRef::video("v0")).unwrap();
        let released = a.release_media();
        assert_eq!(released, vec![MediaRef::video("v0")]);
        assert!(a.owned_media().next().is_none());
    }

    #[test]
    fn seal_requires_complete() {
        let mut a = Artifact::new(ArtifactKind::Audit);
        assert!(FinalizedArtifact::seal(a.clone()).is_err());
        a.set_status(ArtifactStatus::Complete);
        let sealed = FinalizedArtifact::seal(a).unwrap();
        assert_eq!(sealed.status(), ArtifactStatus::Complete);
    }

    #[test]
    fn kind_parses() {
        assert_eq!("Mapping".parse::<ArtifactKind>().unwrap(), ArtifactKind::Map);
        assert!("webhome".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn serializes_kind_snake_case() {
        let a = Artifact::new(ArtifactKind::Bda);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["kind"], "bda");
        assert_eq!(json["status"], "draft");
    }
}
