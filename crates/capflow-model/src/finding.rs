//! Analysis findings
//!
//! Findings are produced by the analysis collaborator and become user
//! property once ingested: notes and the flag are editable, severity and
//! title are not.

use crate::ids::{BatchId, FindingId};
use serde::{Deserialize, Serialize};

/// Finding severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Minor,
    Warning,
    Critical,
}

/// A finding as reported by the analysis provider, before ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedFinding {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

impl ReportedFinding {
    #[inline]
    #[must_use]
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// One delivery from the analysis provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsBatch {
    pub batch_id: BatchId,
    pub findings: Vec<ReportedFinding>,
}

impl FindingsBatch {
    #[inline]
    #[must_use]
    pub fn new(batch_id: BatchId, findings: Vec<ReportedFinding>) -> Self {
        Self { batch_id, findings }
    }
}

/// User edit to a finding; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingPatch {
    pub notes: Option<String>,
    pub flagged: Option<bool>,
}

impl FindingPatch {
    #[inline]
    #[must_use]
    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            flagged: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_flag(mut self, flagged: bool) -> Self {
        self.flagged = Some(flagged);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.flagged.is_none()
    }
}

/// An ingested finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    id: FindingId,
    severity: Severity,
    title: String,
    description: String,
    notes: String,
    flagged: bool,
    edited: bool,
}

impl Finding {
    /// Materialize a reported finding under a stable id
    #[must_use]
    pub fn ingest(batch: &BatchId, ordinal: u32, reported: ReportedFinding) -> Self {
        Self {
            id: FindingId::new(batch.clone(), ordinal),
            severity: reported.severity,
            title: reported.title,
            description: reported.description,
            notes: String::new(),
            flagged: false,
            edited: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &FindingId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
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
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[inline]
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    /// Whether the user has touched this finding
    #[inline]
    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.edited
    }

    /// Merge a user patch. Severity, title and description are read-only.
    pub fn apply(&mut self, patch: FindingPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(flagged) = patch.flagged {
            self.flagged = flagged;
        }
        self.edited = true;
    }
}
