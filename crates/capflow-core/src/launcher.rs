//! Shell boundary
//!
//! The [`Launcher`] is what the surrounding application holds: the
//! signed-in user's role, the capture configuration, and the entry points
//! that start workflows and hand finished or abandoned ones to their
//! collaborators. Authentication itself happens elsewhere; the role is an
//! opaque string here.

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::providers::{ArtifactSink, ProviderError, ScanProvider};
use crate::workflow::Workflow;
use capflow_model::{ArtifactId, ArtifactKind, MediaRef};

/// Hand-off failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LaunchError {
    /// The workflow refused to finalize
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The sink could not store the artifact
    #[error("sink failed: {0}")]
    Sink(#[from] ProviderError),
}

/// Starts workflows and routes their results
#[derive(Debug, Clone)]
pub struct Launcher {
    role: String,
    config: CaptureConfig,
}

impl Launcher {
    #[must_use]
    pub fn new(role: impl Into<String>, config: CaptureConfig) -> Self {
        Self {
            role: role.into(),
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Start an independent workflow
    ///
    /// # Errors
    /// [`CaptureError::UnknownTemplate`] if `template` is not in the catalog
    pub fn start(&self, kind: ArtifactKind, template: Option<&str>) -> Result<Workflow, CaptureError> {
        tracing::debug!(role = %self.role, %kind, "launching workflow");
        Workflow::start(kind, template, self.config.clone())
    }

    /// Finalize `workflow` and persist the result
    ///
    /// # Errors
    /// [`LaunchError::Capture`] if the workflow is not complete,
    /// [`LaunchError::Sink`] if persistence fails
    pub async fn submit(
        &self,
        workflow: &Workflow,
        sink: &dyn ArtifactSink,
    ) -> Result<ArtifactId, LaunchError> {
        let artifact = workflow.finalize()?;
        let id = artifact.id();
        sink.persist(artifact).await?;
        tracing::info!(role = %self.role, artifact = %id, "artifact handed off");
        Ok(id)
    }

    /// Release media the workflow no longer owns
    ///
    /// For media displaced by [`Workflow::attach_media`] or carried off by
    /// [`Workflow::remove_step`]. Returns how many references were released.
    pub fn release(
        &self,
        media: impl IntoIterator<Item = MediaRef>,
        scanner: &dyn ScanProvider,
    ) -> usize {
        let media: Vec<MediaRef> = media.into_iter().collect();
        let count = media.len();
        if count > 0 {
            tracing::debug!(role = %self.role, count, "releasing media");
            scanner.release(media);
        }
        count
    }

    /// Abandon `workflow`, releasing its media through `scanner`
    ///
    /// Returns how many media references were released.
    pub fn abandon(&self, workflow: Workflow, scanner: &dyn ScanProvider) -> usize {
        self.release(workflow.abandon(), scanner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MemorySink, StaticScanProvider};

    #[test]
    fn workflows_are_independent() {
        let launcher = Launcher::new("technician", CaptureConfig::default());
        let mut a = launcher.start(ArtifactKind::Bda, None).unwrap();
        let b = launcher.start(ArtifactKind::Bda, None).unwrap();
        a.set_title("Gearbox").unwrap();
        assert_eq!(b.artifact().title(), "");
        assert_ne!(a.session().id(), b.session().id());
    }

    #[tokio::test]
    async fn submit_requires_complete() {
        let launcher = Launcher::new("technician", CaptureConfig::default());
        let wf = launcher.start(ArtifactKind::Guide, Some("safety")).unwrap();
        let sink = MemorySink::new();
        let err = launcher.submit(&wf, &sink).await.unwrap_err();
        assert!(matches!(err, LaunchError::Capture(CaptureError::NotReady(_))));
        assert!(sink.stored().is_empty());
    }

    #[test]
    fn abandon_releases_through_scanner() {
        let launcher = Launcher::new("supervisor", CaptureConfig::default());
        let mut wf = launcher.start(ArtifactKind::Audit, Some("2")).unwrap();
        wf.advance().unwrap();
        wf.attach_media(MediaRef::image("a"), None).unwrap();
        wf.attach_media(MediaRef::video("b"), None).unwrap();

        let scanner = StaticScanProvider::new(None);
        assert_eq!(launcher.abandon(wf, &scanner), 2);
        assert_eq!(scanner.released().len(), 2);
    }

    #[test]
    fn displaced_and_removed_media_are_released() {
        let launcher = Launcher::new("technician", CaptureConfig::default());
        let mut wf = launcher.start(ArtifactKind::Guide, Some("maintenance")).unwrap();
        wf.set_title("Belt swap").unwrap();
        wf.advance().unwrap();
        let first = wf.insert_step(-1).unwrap();
        let second = wf.insert_step(0).unwrap();
        wf.attach_media(MediaRef::video("take-1"), Some(first)).unwrap();
        wf.attach_media(MediaRef::video("take-9"), Some(second)).unwrap();

        let scanner = StaticScanProvider::new(None);
        let displaced = wf.attach_media(MediaRef::video("take-2"), Some(first)).unwrap();
        assert_eq!(launcher.release(displaced, &scanner), 1);

        let removed = wf.remove_step(second).unwrap();
        assert_eq!(launcher.release(removed.media().cloned(), &scanner), 1);

        let uris: Vec<String> = scanner.released().into_iter().map(|m| m.uri).collect();
        assert_eq!(uris, ["take-1", "take-9"]);
        assert_eq!(launcher.abandon(wf, &scanner), 1);
    }
}
