//! capflow Model - artifacts, steps, anchors and findings
//!
//! Pure data plus validation for guided capture workflows.
//!
//! # Core Concepts
//!
//! - [`Artifact`]: the audit, guide, breakdown analysis or map being built
//! - [`Step`]: one ordered unit of a guide or map; indices stay contiguous
//! - [`Anchor`]: a step's validated position inside the last [`ScanBounds`]
//! - [`MediaRef`]: handle to captured media with a single owner
//! - [`Finding`]: an ingested analysis result with user-editable notes
//!
//! # Example
//!
//! ```rust
//! use capflow_model::{Artifact, ArtifactKind, Position, ScanBounds, Span};
//!
//! let bounds = ScanBounds::planar(Span::new(0.0, 100.0), Span::new(0.0, 100.0))?;
//! let mut map = Artifact::new(ArtifactKind::Map);
//! map.insert_step(-1)?.set_description("Isolate main breaker");
//! let anchor = map.place_anchor(0, Position::planar(50.0, 50.0), &bounds)?;
//!
//! map.insert_step(-1)?;
//! assert_eq!(map.step_for_anchor(anchor), Some(1));
//! # Ok::<(), capflow_model::ModelError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod artifact;
mod error;
mod finding;
mod geometry;
mod ids;
mod media;
mod step;

// Re-exports
pub use artifact::{Artifact, ArtifactKind, ArtifactStatus, FinalizedArtifact, SiteInfo};
pub use error::ModelError;
pub use finding::{Finding, FindingPatch, FindingsBatch, ReportedFinding, Severity};
pub use geometry::{Position, ScanBounds, Span};
pub use ids::{AnchorId, AnchorSequence, ArtifactId, BatchId, FindingId};
pub use media::{MediaKind, MediaRef, MediaSource};
pub use step::{place_anchor, Anchor, Step};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
