//! Workflow stages and the legal transition matrix
//!
//! Each artifact kind walks a fixed sequence of working stages ending in
//! the terminal `Complete` stage:
//!
//! | Kind        | Sequence                                 |
//! |-------------|------------------------------------------|
//! | Audit, BDA  | Form → Capture → Review → Complete       |
//! | Guide       | Form → Capture → Generate → Complete     |
//! | Map         | Scan → Form → Anchors → Complete         |
//!
//! Only adjacent moves are legal, plus `Reopen` from `Complete` to `Form`.

use crate::error::CaptureError;
use capflow_model::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scan,
    Form,
    Capture,
    Review,
    Generate,
    Anchors,
    Complete,
}

impl Stage {
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Stages in which analysis results are accepted
    #[inline]
    #[must_use]
    pub const fn accepts_findings(self) -> bool {
        matches!(self, Self::Review | Self::Generate)
    }

    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Form => "form",
            Self::Capture => "capture",
            Self::Review => "review",
            Self::Generate => "generate",
            Self::Anchors => "anchors",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Move to the next working stage
    Advance,
    /// Move to the immediately preceding stage
    Back,
    /// Terminal event: last working stage to `Complete`
    Complete,
    /// `Complete` back to `Form` for further edits
    Reopen,
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Advance => "advance",
            Self::Back => "back",
            Self::Complete => "complete",
            Self::Reopen => "reopen",
        };
        f.write_str(s)
    }
}

/// Operations gated by stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Title, description, template, site, media source
    EditHeader,
    /// Record scan bounds
    ReportBounds,
    /// Insert, remove, move, describe steps
    EditSteps,
    /// Attach captured media
    AttachMedia,
    /// Propose, commit or place anchors
    PlaceAnchor,
    /// Request, deliver and ingest analysis
    Analyze,
}

/// Full stage sequence for `kind`, terminal stage last
#[must_use]
pub const fn stages(kind: ArtifactKind) -> &'static [Stage] {
    match kind {
        ArtifactKind::Audit | ArtifactKind::Bda => {
            &[Stage::Form, Stage::Capture, Stage::Review, Stage::Complete]
        }
        ArtifactKind::Guide => &[Stage::Form, Stage::Capture, Stage::Generate, Stage::Complete],
        ArtifactKind::Map => &[Stage::Scan, Stage::Form, Stage::Anchors, Stage::Complete],
    }
}

/// Entry stage for `kind`
#[inline]
#[must_use]
pub fn initial_stage(kind: ArtifactKind) -> Stage {
    stages(kind)[0]
}

fn position(kind: ArtifactKind, stage: Stage) -> Option<usize> {
    stages(kind).iter().position(|s| *s == stage)
}

/// Resolve the stage `event` leads to from `from`
///
/// Only the matrix is consulted here; entry preconditions are checked by
/// the workflow.
///
/// # Errors
/// [`CaptureError::InvalidState`] if the event is not legal from `from`
pub fn target(kind: ArtifactKind, from: Stage, event: WorkflowEvent) -> Result<Stage, CaptureError> {
    let seq = stages(kind);
    let Some(at) = position(kind, from) else {
        return Err(CaptureError::invalid_state(format!(
            "{from} is not a {kind} stage"
        )));
    };
    let last_working = seq.len() - 2;

    let illegal = || {
        CaptureError::invalid_state(format!("{event} is not allowed from {from} ({kind})"))
    };

    match event {
        WorkflowEvent::Advance if at < last_working => Ok(seq[at + 1]),
        WorkflowEvent::Complete if at == last_working => Ok(Stage::Complete),
        WorkflowEvent::Back if at > 0 && !from.is_terminal() => Ok(seq[at - 1]),
        WorkflowEvent::Reopen if from.is_terminal() => Ok(Stage::Form),
        WorkflowEvent::Advance
        | WorkflowEvent::Complete
        | WorkflowEvent::Back
        | WorkflowEvent::Reopen => Err(illegal()),
    }
}

/// Stages reachable from `from` in one event
#[must_use]
pub fn allowed_transitions(kind: ArtifactKind, from: Stage) -> Vec<Stage> {
    [
        WorkflowEvent::Advance,
        WorkflowEvent::Complete,
        WorkflowEvent::Back,
        WorkflowEvent::Reopen,
    ]
    .into_iter()
    .filter_map(|event| target(kind, from, event).ok())
    .collect()
}

/// Validate a stage-to-stage move against the matrix
///
/// # Errors
/// [`CaptureError::InvalidState`] if `to` is not reachable from `from`
pub fn validate_transition(kind: ArtifactKind, from: Stage, to: Stage) -> Result<(), CaptureError> {
    if allowed_transitions(kind, from).contains(&to) {
        Ok(())
    } else {
        Err(CaptureError::invalid_state(format!(
            "illegal transition {from} -> {to} ({kind})"
        )))
    }
}

/// Whether `op` may run in `stage` for a `kind` workflow
#[must_use]
pub fn permits(kind: ArtifactKind, stage: Stage, op: Operation) -> bool {
    use Operation::{Analyze, AttachMedia, EditHeader, EditSteps, PlaceAnchor, ReportBounds};
    match (stage, op) {
        (Stage::Scan, ReportBounds) | (Stage::Form, EditHeader) => true,
        (Stage::Capture, AttachMedia) => true,
        (Stage::Capture, EditSteps) => kind.has_steps(),
        (Stage::Review | Stage::Generate, Analyze) => true,
        (Stage::Anchors, EditSteps | AttachMedia | PlaceAnchor | ReportBounds) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_forward_path() {
        let k = ArtifactKind::Audit;
        assert_eq!(target(k, Stage::Form, WorkflowEvent::Advance).unwrap(), Stage::Capture);
        assert_eq!(target(k, Stage::Capture, WorkflowEvent::Advance).unwrap(), Stage::Review);
        assert!(target(k, Stage::Review, WorkflowEvent::Advance).is_err());
        assert_eq!(target(k, Stage::Review, WorkflowEvent::Complete).unwrap(), Stage::Complete);
    }

    #[test]
    fn complete_only_reopens() {
        let k = ArtifactKind::Guide;
        assert_eq!(allowed_transitions(k, Stage::Complete), vec![Stage::Form]);
        assert!(target(k, Stage::Complete, WorkflowEvent::Back).is_err());
    }

    #[test]
    fn first_stage_has_no_back() {
        assert!(target(ArtifactKind::Map, Stage::Scan, WorkflowEvent::Back).is_err());
        assert_eq!(
            target(ArtifactKind::Map, Stage::Form, WorkflowEvent::Back).unwrap(),
            Stage::Scan
        );
    }

    #[test]
    fn foreign_stage_rejected() {
        assert!(target(ArtifactKind::Audit, Stage::Anchors, WorkflowEvent::Advance).is_err());
        assert!(validate_transition(ArtifactKind::Guide, Stage::Capture, Stage::Review).is_err());
    }

    #[test]
    fn permissions() {
        assert!(permits(ArtifactKind::Guide, Stage::Capture, Operation::EditSteps));
        assert!(!permits(ArtifactKind::Audit, Stage::Capture, Operation::EditSteps));
        assert!(!permits(ArtifactKind::Audit, Stage::Complete, Operation::EditHeader));
        assert!(permits(ArtifactKind::Map, Stage::Anchors, Operation::PlaceAnchor));
    }
}
