//! capflow Core - guided capture workflows
//!
//! Drives one artifact at a time from an empty draft to a finalized
//! snapshot through a fixed, per-kind stage sequence.
//!
//! # Quick Start
//!
//! ```rust
//! use capflow_core::prelude::*;
//! use capflow_model::MediaRef;
//!
//! let mut wf = Workflow::start(ArtifactKind::Guide, Some("maintenance"), CaptureConfig::default())?;
//! wf.set_title("Replace filter")?;
//! wf.advance()?;                                   // Capture
//! wf.insert_step(-1)?;
//! wf.attach_media(MediaRef::image("file:///dcim/0001.jpg"), Some(0))?;
//! wf.advance()?;                                   // Generate
//! wf.complete()?;
//!
//! let artifact = wf.finalize()?;
//! assert_eq!(artifact.status(), ArtifactStatus::Complete);
//! # Ok::<(), CaptureError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod journal;
pub mod launcher;
pub mod providers;
pub mod session;
pub mod stage;
pub mod templates;
pub mod workflow;

// Re-exports
pub use analysis::{AnalysisOutcome, AnalysisRequest, AnalysisStatus, RequestId};
pub use config::{CaptureConfig, ConfigError};
pub use error::CaptureError;
pub use ingest::IngestReport;
pub use journal::{Journal, JournalEntry, JournalError};
pub use launcher::{LaunchError, Launcher};
pub use providers::{
    AnalysisProvider, ArtifactSink, FixedAnalysisProvider, MemorySink, ProviderError,
    ScanProvider, StaticScanProvider,
};
pub use session::{CaptureSession, SessionId, StageDraft};
pub use stage::{Operation, Stage, WorkflowEvent};
pub use workflow::Workflow;

/// Common imports for driving a workflow
pub mod prelude {
    pub use crate::analysis::{AnalysisOutcome, AnalysisStatus};
    pub use crate::config::CaptureConfig;
    pub use crate::error::CaptureError;
    pub use crate::providers::{AnalysisProvider, ArtifactSink, ScanProvider};
    pub use crate::stage::{Stage, WorkflowEvent};
    pub use crate::workflow::Workflow;
    pub use capflow_model::{ArtifactKind, ArtifactStatus};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
