//! Scripted end-to-end walkthrough of one workflow
//!
//! Uses the in-process collaborators ([`FixedAnalysisProvider`],
//! [`StaticScanProvider`], [`MemorySink`]) to take an artifact of the chosen
//! kind from start to hand-off.

use capflow_core::{
    CaptureConfig, FixedAnalysisProvider, JournalEntry, LaunchError, Launcher, MemorySink,
    StaticScanProvider, Stage, Workflow,
};
use capflow_model::{
    ArtifactKind, FinalizedArtifact, MediaRef, MediaSource, Position, ScanBounds, SiteInfo, Span,
};
use serde::Serialize;
use std::fmt::Write;

/// Outcome of a demo run
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub role: String,
    pub kind: ArtifactKind,
    /// Stages visited, in order
    pub stages: Vec<Stage>,
    pub artifact: FinalizedArtifact,
    pub journal: Vec<JournalEntry>,
}

impl DemoReport {
    /// Human-readable summary
    #[must_use]
    pub fn render_text(&self) -> String {
        let a = &self.artifact;
        let mut out = String::new();
        let path: Vec<&str> = self.stages.iter().map(|s| s.as_str()).collect();
        let _ = writeln!(out, "{} \"{}\" ({})", a.kind(), a.title(), a.id());
        let _ = writeln!(out, "  role:     {}", self.role);
        let _ = writeln!(out, "  stages:   {}", path.join(" -> "));
        if let Some(t) = a.template() {
            let _ = writeln!(out, "  template: {t}");
        }
        let _ = writeln!(out, "  media:    {}", a.owned_media().count());
        for step in a.steps() {
            let anchor = step
                .anchor()
                .map(|an| format!(" @ {} {}", an.id(), an.position()))
                .unwrap_or_default();
            let _ = writeln!(out, "  step {}: {}{anchor}", step.index(), step.description());
        }
        for f in a.findings() {
            let _ = writeln!(out, "  [{:?}] {}: {}", f.severity(), f.title(), f.description());
        }
        let _ = writeln!(out, "  journal:  {} transitions", self.journal.len());
        out
    }
}

fn scanner() -> StaticScanProvider {
    StaticScanProvider::new(ScanBounds::planar(Span::new(0.0, 100.0), Span::new(0.0, 100.0)).ok())
}

fn track(wf: &Workflow, stages: &mut Vec<Stage>) {
    if stages.last() != Some(&wf.stage()) {
        stages.push(wf.stage());
    }
}

/// Drive a workflow of `kind` to completion and hand it to a memory sink
///
/// # Errors
/// Any [`LaunchError`] raised along the way; the scripted path is valid for
/// the default configuration
pub async fn run_demo(
    kind: ArtifactKind,
    role: &str,
    config: CaptureConfig,
) -> Result<DemoReport, LaunchError> {
    let launcher = Launcher::new(role, config);
    let template = match kind {
        ArtifactKind::Audit => Some("1"),
        ArtifactKind::Guide => Some("maintenance"),
        ArtifactKind::Bda | ArtifactKind::Map => None,
    };
    let mut wf = launcher.start(kind, template)?;
    let mut stages = vec![wf.stage()];
    let analyzer = FixedAnalysisProvider;

    match kind {
        ArtifactKind::Audit | ArtifactKind::Bda => {
            wf.set_title(format!("Demo {kind}"))?;
            if kind == ArtifactKind::Bda {
                wf.set_media_source(MediaSource::Record)?;
            }
            wf.advance()?;
            track(&wf, &mut stages);
            for i in 0..3 {
                let media = if kind == ArtifactKind::Bda {
                    MediaRef::video(format!("demo://clip-{i}"))
                } else {
                    MediaRef::image(format!("demo://photo-{i}"))
                };
                wf.attach_media(media, None)?;
            }
            wf.advance()?;
            track(&wf, &mut stages);
            wf.run_analysis(&analyzer).await?;
        }
        ArtifactKind::Guide => {
            wf.set_title("Replace intake filter")?;
            wf.advance()?;
            track(&wf, &mut stages);
            let first = wf.insert_step(-1)?;
            wf.set_step_description(first, "Power down and lock out the unit")?;
            wf.attach_media(MediaRef::video("demo://step-0"), Some(first))?;
            let second = wf.insert_step(0)?;
            wf.set_step_description(second, "Swap the filter cartridge")?;
            wf.advance()?;
            track(&wf, &mut stages);
            wf.run_analysis(&analyzer).await?;
        }
        ArtifactKind::Map => {
            wf.sync_bounds(&scanner())?;
            wf.advance()?;
            track(&wf, &mut stages);
            wf.set_title("Line 2 isolation points")?;
            wf.set_site(SiteInfo {
                site: "Plant A".into(),
                section: "Line 2".into(),
            })?;
            wf.advance()?;
            track(&wf, &mut stages);
            for (i, (x, y)) in [(20.0, 30.0), (75.0, 60.0)].into_iter().enumerate() {
                let index = wf.insert_step(i as i64 - 1)?;
                wf.set_step_description(index, format!("Isolation point {}", i + 1))?;
                wf.propose_anchor(Position::planar(x, y))?;
                wf.commit_anchor(index)?;
            }
        }
    }

    wf.complete()?;
    track(&wf, &mut stages);

    let sink = MemorySink::new();
    launcher.submit(&wf, &sink).await?;
    let artifact = wf.finalize()?;

    Ok(DemoReport {
        role: launcher.role().to_string(),
        kind,
        stages,
        artifact,
        journal: wf.journal().entries().to_vec(),
    })
}
