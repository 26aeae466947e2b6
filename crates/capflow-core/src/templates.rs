//! Fixed template catalogs
//!
//! Audits and guides start from a template (audit checklist or guide type);
//! breakdown analyses and maps take none.

use crate::error::CaptureError;
use capflow_model::ArtifactKind;
use serde::Serialize;

/// A selectable template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub label: &'static str,
}

const AUDIT_TEMPLATES: &[Template] = &[
    Template { id: "1", label: "Safety Inspection" },
    Template { id: "2", label: "Quality Check" },
    Template { id: "3", label: "Maintenance Review" },
    Template { id: "4", label: "Compliance Audit" },
];

const GUIDE_TYPES: &[Template] = &[
    Template { id: "maintenance", label: "Maintenance" },
    Template { id: "operational", label: "Operational" },
    Template { id: "troubleshooting", label: "Troubleshooting" },
    Template { id: "safety", label: "Safety" },
];

/// Catalog for `kind`; empty for kinds that take no template
#[must_use]
pub fn catalog(kind: ArtifactKind) -> &'static [Template] {
    match kind {
        ArtifactKind::Audit => AUDIT_TEMPLATES,
        ArtifactKind::Guide => GUIDE_TYPES,
        ArtifactKind::Bda | ArtifactKind::Map => &[],
    }
}

/// Whether a workflow of `kind` must select a template before capture
#[inline]
#[must_use]
pub fn requires_template(kind: ArtifactKind) -> bool {
    !catalog(kind).is_empty()
}

/// Look up `id` in the catalog for `kind`
///
/// # Errors
/// [`CaptureError::UnknownTemplate`] if `id` is not listed
pub fn lookup(kind: ArtifactKind, id: &str) -> Result<&'static Template, CaptureError> {
    catalog(kind)
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| CaptureError::UnknownTemplate {
            kind,
            template: id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guide_types() {
        assert_eq!(lookup(ArtifactKind::Guide, "maintenance").unwrap().label, "Maintenance");
        assert!(lookup(ArtifactKind::Guide, "1").is_err());
    }

    #[test]
    fn audit_templates_by_id() {
        assert_eq!(lookup(ArtifactKind::Audit, "4").unwrap().label, "Compliance Audit");
    }

    #[test]
    fn map_and_bda_take_none() {
        assert!(!requires_template(ArtifactKind::Map));
        assert!(!requires_template(ArtifactKind::Bda));
        assert!(matches!(
            lookup(ArtifactKind::Bda, "maintenance"),
            Err(CaptureError::UnknownTemplate { .. })
        ));
    }
}
