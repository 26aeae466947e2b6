//! Scan-local positions and bounding volumes

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in scan-local coordinates
///
/// `z` is present only when the scanner reported depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Position {
    /// Planar position
    #[inline]
    #[must_use]
    pub const fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Position with depth
    #[inline]
    #[must_use]
    pub const fn spatial(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "({}, {}, {})", self.x, self.y, z),
            None => write!(f, "({}, {})", self.x, self.y),
        }
    }
}

/// Inclusive closed interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Last-scanned bounding volume, as reported by the scanning collaborator
///
/// Axis-aligned; `depth` is absent when the scan was planar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct ScanBounds {
    x: Span,
    y: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    depth: Option<Span>,
}

/// Unchecked wire form of [`ScanBounds`]
#[derive(Deserialize)]
struct RawBounds {
    x: Span,
    y: Span,
    #[serde(default)]
    depth: Option<Span>,
}

impl TryFrom<RawBounds> for ScanBounds {
    type Error = ModelError;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Self::checked(raw.x, raw.y, raw.depth)
    }
}

impl ScanBounds {
    /// Planar bounds
    ///
    /// # Errors
    /// Returns [`ModelError::InvariantViolation`] if a span is inverted or not finite
    pub fn planar(x: Span, y: Span) -> Result<Self, ModelError> {
        Self::checked(x, y, None)
    }

    /// Bounds with a depth range
    ///
    /// # Errors
    /// Returns [`ModelError::InvariantViolation`] if a span is inverted or not finite
    pub fn volume(x: Span, y: Span, depth: Span) -> Result<Self, ModelError> {
        Self::checked(x, y, Some(depth))
    }

    fn checked(x: Span, y: Span, depth: Option<Span>) -> Result<Self, ModelError> {
        for span in [Some(x), Some(y), depth].into_iter().flatten() {
            if !(span.min.is_finite() && span.max.is_finite()) || span.min > span.max {
                return Err(ModelError::InvariantViolation(format!(
                    "degenerate span {}..{}",
                    span.min, span.max
                )));
            }
        }
        Ok(Self { x, y, depth })
    }

    #[inline]
    #[must_use]
    pub fn x(&self) -> Span {
        self.x
    }

    #[inline]
    #[must_use]
    pub fn y(&self) -> Span {
        self.y
    }

    /// Depth range, absent for a planar scan
    #[inline]
    #[must_use]
    pub fn depth(&self) -> Option<Span> {
        self.depth
    }

    /// Whether `p` lies inside the volume
    ///
    /// A planar position is accepted inside a volume; a position carrying
    /// depth cannot be checked against planar bounds and is rejected.
    #[must_use]
    pub fn contains(&self, p: &Position) -> bool {
        if !p.is_finite() || !self.x.contains(p.x) || !self.y.contains(p.y) {
            return false;
        }
        match (p.z, self.depth) {
            (None, _) => true,
            (Some(z), Some(depth)) => depth.contains(z),
            (Some(_), None) => false,
        }
    }

    /// Check containment, producing an [`ModelError::OutOfBounds`] on failure
    ///
    /// # Errors
    /// Returns [`ModelError::OutOfBounds`] if `p` is outside the volume
    pub fn ensure_contains(&self, p: &Position) -> Result<(), ModelError> {
        if self.contains(p) {
            Ok(())
        } else {
            Err(ModelError::OutOfBounds {
                position: p.to_string(),
                bounds: self.to_string(),
            })
        }
    }
}

impl fmt::Display for ScanBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}..{}, {}..{}",
            self.x.min, self.x.max, self.y.min, self.y.max
        )?;
        if let Some(d) = self.depth {
            write!(f, ", {}..{}", d.min, d.max)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> ScanBounds {
        ScanBounds::planar(Span::new(0.0, 100.0), Span::new(0.0, 100.0)).unwrap()
    }

    #[test]
    fn edges_are_inclusive() {
        let b = square();
        assert!(b.contains(&Position::planar(0.0, 0.0)));
        assert!(b.contains(&Position::planar(100.0, 100.0)));
        assert!(!b.contains(&Position::planar(100.1, 50.0)));
    }

    #[test]
    fn depth_needs_volume() {
        let b = square();
        assert!(!b.contains(&Position::spatial(10.0, 10.0, 1.0)));

        let v = ScanBounds::volume(
            Span::new(0.0, 100.0),
            Span::new(0.0, 100.0),
            Span::new(0.0, 5.0),
        )
        .unwrap();
        assert!(v.contains(&Position::spatial(10.0, 10.0, 1.0)));
        assert!(v.contains(&Position::planar(10.0, 10.0)));
        assert!(!v.contains(&Position::spatial(10.0, 10.0, 6.0)));
    }

    #[test]
    fn nan_is_never_inside() {
        assert!(!square().contains(&Position::planar(f64::NAN, 1.0)));
    }

    #[test]
    fn inverted_span_rejected() {
        assert!(ScanBounds::planar(Span::new(5.0, 1.0), Span::new(0.0, 1.0)).is_err());
    }

    #[test]
    fn decoding_applies_span_checks() {
        let planar: ScanBounds =
            serde_json::from_str(r#"{"x":{"min":0.0,"max":10.0},"y":{"min":0.0,"max":5.0}}"#)
                .unwrap();
        assert_eq!(planar.depth(), None);
        assert_eq!(planar.y(), Span::new(0.0, 5.0));

        let inverted = r#"{"x":{"min":10.0,"max":0.0},"y":{"min":0.0,"max":5.0}}"#;
        assert!(serde_json::from_str::<ScanBounds>(inverted).is_err());
    }

    #[test]
    fn out_of_bounds_error_renders_both_sides() {
        let err = square()
            .ensure_contains(&Position::planar(150.0, 50.0))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("(150, 50)"));
        assert!(msg.contains("{0..100, 0..100}"));
    }
}
