//! Ordered procedure steps and their spatial anchors

use crate::error::ModelError;
use crate::geometry::{Position, ScanBounds};
use crate::ids::{AnchorId, AnchorSequence};
use crate::media::MediaRef;
use serde::{Deserialize, Serialize};

/// Spatial placement of a step inside the scanned space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    id: AnchorId,
    position: Position,
}

impl Anchor {
    #[inline]
    #[must_use]
    pub fn id(&self) -> AnchorId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }
}

/// One ordered unit of a guide or map
///
/// The index is owned by the enclosing artifact, which renumbers on every
/// structural change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    index: usize,
    description: String,
    media: Option<MediaRef>,
    anchor: Option<Anchor>,
}

impl Step {
    #[inline]
    #[must_use]
    pub(crate) fn empty(index: usize) -> Self {
        Self {
            index,
            description: String::new(),
            media: None,
            anchor: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    #[inline]
    #[must_use]
    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    /// Attach media, returning whatever it replaces
    #[inline]
    pub fn attach_media(&mut self, media: MediaRef) -> Option<MediaRef> {
        self.media.replace(media)
    }

    #[inline]
    pub(crate) fn take_media(&mut self) -> Option<MediaRef> {
        self.media.take()
    }

    #[inline]
    #[must_use]
    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    /// A step counts as completed once it says or shows something
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !self.description.trim().is_empty() || self.media.is_some()
    }

    /// Place (or move) this step's anchor
    ///
    /// The first placement takes a fresh id from `ids`; later placements keep
    /// the id and update the position.
    ///
    /// # Errors
    /// [`ModelError::OutOfBounds`] if `position` is outside `bounds`; the
    /// existing anchor is left untouched.
    pub fn place_anchor(
        &mut self,
        position: Position,
        bounds: &ScanBounds,
        ids: &mut AnchorSequence,
    ) -> Result<AnchorId, ModelError> {
        bounds.ensure_contains(&position)?;
        match self.anchor.as_mut() {
            Some(anchor) => {
                anchor.position = position;
                Ok(anchor.id)
            }
            None => {
                let id = ids.allocate();
                self.anchor = Some(Anchor { id, position });
                Ok(id)
            }
        }
    }
}

/// Free-function form of [`Step::place_anchor`]
///
/// # Errors
/// See [`Step::place_anchor`]
pub fn place_anchor(
    step: &mut Step,
    position: Position,
    bounds: &ScanBounds,
    ids: &mut AnchorSequence,
) -> Result<AnchorId, ModelError> {
    step.place_anchor(position, bounds, ids)
}
