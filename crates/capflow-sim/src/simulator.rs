//! Workflow simulator - seeded randomized harness for capture workflows
//!
//! Drives many concurrent workflows with a mix of valid, edge-case and
//! invalid operations and checks the engine's invariants after every step.
//! The same seed always replays the same operation sequence.

use capflow_core::analysis::AnalysisOutcome;
use capflow_core::stage;
use capflow_core::templates;
use capflow_core::{
    AnalysisStatus, CaptureConfig, CaptureError, FixedAnalysisProvider, RequestId, Stage,
    Workflow, WorkflowEvent,
};
use capflow_model::{
    ArtifactKind, ArtifactStatus, BatchId, FindingsBatch, MediaRef, Position, ReportedFinding,
    ScanBounds, Severity, Span,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeMap;

/// Side length of the square every simulated scan reports
const SCAN_SIZE: f64 = 100.0;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total operations to execute
    pub total_operations: u64,
    /// Distribution of operation types
    pub operation_distribution: OperationDistribution,
    /// Workflows alive at once
    pub max_concurrent_workflows: usize,
    /// Engine configuration every workflow starts with
    pub capture: CaptureConfig,
    /// Stop conditions
    pub stop_on_first_violation: bool,
    pub stop_on_error_count: Option<usize>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 10_000,
            operation_distribution: OperationDistribution::default(),
            max_concurrent_workflows: 8,
            capture: CaptureConfig::default(),
            stop_on_first_violation: true,
            stop_on_error_count: None,
        }
    }
}

/// Probability distribution for operation generation
#[derive(Debug, Clone)]
pub struct OperationDistribution {
    /// Operations a well-behaved front-end would send
    pub valid_ops: f64,
    /// Boundary values and backward moves
    pub edge_cases: f64,
    /// Operations that must be rejected
    pub invalid_ops: f64,
}

impl Default for OperationDistribution {
    fn default() -> Self {
        Self {
            valid_ops: 0.70,
            edge_cases: 0.20,
            invalid_ops: 0.10,
        }
    }
}

/// Every operation the simulator can generate
///
/// `usize` slots index the live workflow list.
#[derive(Debug, Clone)]
pub enum SimulatedOperation {
    // Lifecycle
    Start(ArtifactKind, Option<String>),
    Submit(usize),
    Abandon(usize),

    // Transitions
    Event(usize, WorkflowEvent),

    // Header
    SelectTemplate(usize, String),
    SetTitle(usize, String),

    // Capture
    ReportBounds(usize, ScanBounds),
    AttachMedia(usize, MediaRef, Option<usize>),
    InsertStep(usize, i64),
    RemoveStep(usize, usize),
    MoveStep(usize, usize, usize),
    DescribeStep(usize, usize, String),
    PlaceAnchor(usize, usize, Position),

    // Review
    RequestAnalysis(usize),
    DeliverStale(usize),
    Ingest(usize, FindingsBatch),
}

impl SimulatedOperation {
    fn slot(&self) -> Option<usize> {
        match self {
            Self::Start(..) => None,
            Self::Submit(s)
            | Self::Abandon(s)
            | Self::Event(s, _)
            | Self::SelectTemplate(s, _)
            | Self::SetTitle(s, _)
            | Self::ReportBounds(s, _)
            | Self::AttachMedia(s, ..)
            | Self::InsertStep(s, _)
            | Self::RemoveStep(s, _)
            | Self::MoveStep(s, ..)
            | Self::DescribeStep(s, ..)
            | Self::PlaceAnchor(s, ..)
            | Self::RequestAnalysis(s)
            | Self::DeliverStale(s)
            | Self::Ingest(s, _) => Some(*s),
        }
    }

    fn type_name(&self) -> String {
        format!("{self:?}")
            .split('(')
            .next()
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Expected result classification for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedResult {
    ShouldSucceed,
    ShouldFail,
    /// Outcome depends on the workflow's stage and content
    ContextDependent,
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// Operation outcome didn't match expectation
    UnexpectedOutcome {
        operation_index: u64,
        operation: SimulatedOperation,
        expected: ExpectedResult,
        actual: Result<String, String>,
    },
    /// Invariant was violated
    Invariant(InvariantViolation),
}

/// A specific invariant violation
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub check: InvariantCheck,
    pub details: String,
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    // Artifact
    ArtifactInvariantsHold,
    MediaCapRespected,

    // Workflow
    StatusMatchesStage,
    RejectionLeavesState,
    FinalizeOnlyWhenComplete,
    NothingPendingWhenComplete,

    // Journal
    JournalChainIsUnbroken,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub invariant_violations: u64,
    pub operations_by_type: BTreeMap<String, u64>,
}

impl OperationStats {
    pub fn record(&mut self, operation: &SimulatedOperation, result: &Result<String, String>) {
        self.total_operations += 1;
        *self
            .operations_by_type
            .entry(operation.type_name())
            .or_insert(0) += 1;

        match result {
            Ok(_) => self.successful_operations += 1,
            Err(_) => self.failed_operations += 1,
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: OperationStats,
    pub violations: Vec<Violation>,
    pub final_workflow_count: usize,
    pub submitted_artifacts: usize,
    pub released_media: usize,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        let _ = writeln!(report, "=== capflow Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Total Operations: {}", self.stats.total_operations);
        let _ = writeln!(report, "Successful: {}", self.stats.successful_operations);
        let _ = writeln!(report, "Rejected: {}", self.stats.failed_operations);
        let _ = writeln!(report, "Violations: {}", self.violations.len());
        let _ = writeln!(report, "Live Workflows: {}", self.final_workflow_count);
        let _ = writeln!(report, "Submitted Artifacts: {}", self.submitted_artifacts);
        let _ = writeln!(report, "Released Media: {}", self.released_media);

        if !self.stats.operations_by_type.is_empty() {
            report.push_str("\n=== Operations ===\n");
            for (name, count) in &self.stats.operations_by_type {
                let _ = writeln!(report, "{name}: {count}");
            }
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = write!(
            report,
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run the simulator
#[must_use]
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();

    let mut workflows: Vec<Workflow> = Vec::new();
    let mut submitted = 0usize;
    let mut released = 0usize;

    for i in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &config, &workflows);
        let expected_result = classify_expected_result(&operation);

        let snapshot = operation.slot().map(|s| workflows[s].clone());
        let actual_result = execute_operation(
            &config.capture,
            &operation,
            &mut workflows,
            &mut submitted,
            &mut released,
        );

        let outcome_matches = match (expected_result, &actual_result) {
            (ExpectedResult::ShouldSucceed, Ok(_))
            | (ExpectedResult::ShouldFail, Err(_))
            | (ExpectedResult::ContextDependent, _) => true,
            _ => false,
        };

        let actual_str: Result<String, String> = match &actual_result {
            Ok(s) => Ok(s.clone()),
            Err(e) => Err(e.to_string()),
        };

        let mut found = Vec::new();
        if !outcome_matches {
            found.push(Violation::UnexpectedOutcome {
                operation_index: i,
                operation: operation.clone(),
                expected: expected_result,
                actual: actual_str.clone(),
            });
        }

        if let (Err(e), Some(before), Some(slot)) = (&actual_result, &snapshot, operation.slot()) {
            if let Some(after) = workflows.get(slot) {
                if after.stage() != before.stage() || after.session() != before.session() {
                    found.push(Violation::Invariant(InvariantViolation {
                        check: InvariantCheck::RejectionLeavesState,
                        details: format!("{} changed state after rejection: {e}", operation.type_name()),
                    }));
                }
            }
        }

        if let Err(inv) = WorkflowInvariants::check_all(&workflows, &config.capture) {
            stats.invariant_violations += inv.len() as u64;
            found.extend(inv.into_iter().map(Violation::Invariant));
        }

        stats.record(&operation, &actual_str);

        if !found.is_empty() {
            violations.extend(found);
            if config.stop_on_first_violation {
                break;
            }
            if let Some(max_errors) = config.stop_on_error_count {
                if violations.len() >= max_errors {
                    break;
                }
            }
        }
    }

    tracing::info!(
        seed = config.seed,
        operations = stats.total_operations,
        violations = violations.len(),
        "simulation finished"
    );

    SimulatorReport {
        config,
        stats,
        violations,
        final_workflow_count: workflows.len(),
        submitted_artifacts: submitted,
        released_media: released,
    }
}

fn square_bounds() -> Option<ScanBounds> {
    ScanBounds::planar(Span::new(0.0, SCAN_SIZE), Span::new(0.0, SCAN_SIZE)).ok()
}

fn random_kind(rng: &mut StdRng) -> ArtifactKind {
    ArtifactKind::ALL[rng.gen_range(0..ArtifactKind::ALL.len())]
}

fn fresh_media(rng: &mut StdRng) -> MediaRef {
    let uri = format!("sim://{:016x}", rng.gen::<u64>());
    if rng.gen_bool(0.5) {
        MediaRef::image(uri)
    } else {
        MediaRef::video(uri)
    }
}

fn random_batch(rng: &mut StdRng) -> FindingsBatch {
    let severities = [Severity::Info, Severity::Minor, Severity::Warning, Severity::Critical];
    let n = rng.gen_range(1..4);
    // Small id space so redeliveries happen
    let id = BatchId::new(format!("sim-batch-{}", rng.gen_range(0..16)));
    FindingsBatch::new(
        id,
        (0..n)
            .map(|i| {
                ReportedFinding::new(
                    severities[rng.gen_range(0..severities.len())],
                    format!("Finding {i}"),
                    "simulated",
                )
            })
            .collect(),
    )
}

/// Forward event for the workflow's current stage
fn forward_event(wf: &Workflow) -> WorkflowEvent {
    if wf.allowed_transitions().contains(&Stage::Complete) && !wf.stage().is_terminal() {
        WorkflowEvent::Complete
    } else {
        WorkflowEvent::Advance
    }
}

/// Generate a random operation based on the distribution
fn generate_operation(
    rng: &mut StdRng,
    config: &SimulatorConfig,
    workflows: &[Workflow],
) -> SimulatedOperation {
    let distribution = &config.operation_distribution;
    let r: f64 = rng.gen();

    if workflows.is_empty() {
        let kind = random_kind(rng);
        let template = templates::catalog(kind).first().map(|t| t.id.to_string());
        return SimulatedOperation::Start(kind, template);
    }

    if r < distribution.valid_ops {
        generate_valid_operation(rng, workflows, config.max_concurrent_workflows)
    } else if r < distribution.valid_ops + distribution.edge_cases {
        generate_edge_case_operation(rng, workflows)
    } else {
        generate_invalid_operation(rng, workflows)
    }
}

/// Generate an operation a well-behaved front-end would send
fn generate_valid_operation(
    rng: &mut StdRng,
    workflows: &[Workflow],
    max_workflows: usize,
) -> SimulatedOperation {
    if workflows.len() < max_workflows && rng.gen_bool(0.05) {
        let kind = random_kind(rng);
        let catalog = templates::catalog(kind);
        let template = (!catalog.is_empty())
            .then(|| catalog[rng.gen_range(0..catalog.len())].id.to_string());
        return SimulatedOperation::Start(kind, template);
    }

    let slot = rng.gen_range(0..workflows.len());
    let wf = &workflows[slot];
    let kind = wf.kind();
    let steps = wf.artifact().steps().len();

    if !wf.stage().is_terminal() && rng.gen_bool(0.25) {
        return SimulatedOperation::Event(slot, forward_event(wf));
    }

    match wf.stage() {
        Stage::Scan => square_bounds().map_or(
            SimulatedOperation::Event(slot, WorkflowEvent::Advance),
            |b| SimulatedOperation::ReportBounds(slot, b),
        ),
        Stage::Form => {
            if wf.session().needs_template_selection() {
                let catalog = templates::catalog(kind);
                let id = catalog[rng.gen_range(0..catalog.len())].id.to_string();
                SimulatedOperation::SelectTemplate(slot, id)
            } else if wf.artifact().title().is_empty() {
                SimulatedOperation::SetTitle(slot, format!("{kind} #{slot}"))
            } else {
                SimulatedOperation::Event(slot, WorkflowEvent::Advance)
            }
        }
        Stage::Capture if kind.has_steps() => match rng.gen_range(0..3) {
            0 if steps > 0 => {
                SimulatedOperation::AttachMedia(slot, fresh_media(rng), Some(rng.gen_range(0..steps)))
            }
            1 if steps > 0 => SimulatedOperation::DescribeStep(
                slot,
                rng.gen_range(0..steps),
                "Follow the lockout procedure".to_string(),
            ),
            _ => SimulatedOperation::InsertStep(slot, rng.gen_range(-1..=steps as i64 - 1)),
        },
        Stage::Capture => SimulatedOperation::AttachMedia(slot, fresh_media(rng), None),
        Stage::Review | Stage::Generate => match rng.gen_range(0..3) {
            0 => SimulatedOperation::Ingest(slot, random_batch(rng)),
            1 => SimulatedOperation::Event(slot, WorkflowEvent::Complete),
            _ => SimulatedOperation::RequestAnalysis(slot),
        },
        Stage::Anchors => match rng.gen_range(0..4) {
            0 | 1 if steps > 0 => SimulatedOperation::PlaceAnchor(
                slot,
                rng.gen_range(0..steps),
                Position::planar(rng.gen_range(0.0..=SCAN_SIZE), rng.gen_range(0.0..=SCAN_SIZE)),
            ),
            2 if steps > 1 => SimulatedOperation::MoveStep(
                slot,
                rng.gen_range(0..steps),
                rng.gen_range(0..steps),
            ),
            _ => SimulatedOperation::InsertStep(slot, rng.gen_range(-1..=steps as i64 - 1)),
        },
        Stage::Complete => {
            if rng.gen_bool(0.8) {
                SimulatedOperation::Submit(slot)
            } else {
                SimulatedOperation::Event(slot, WorkflowEvent::Reopen)
            }
        }
    }
}

/// Generate a boundary or backward operation
fn generate_edge_case_operation(rng: &mut StdRng, workflows: &[Workflow]) -> SimulatedOperation {
    let slot = rng.gen_range(0..workflows.len());
    let steps = workflows[slot].artifact().steps().len();

    match rng.gen_range(0..7) {
        0 => SimulatedOperation::Event(slot, WorkflowEvent::Back),
        1 => SimulatedOperation::Event(slot, WorkflowEvent::Reopen),
        2 => SimulatedOperation::PlaceAnchor(
            slot,
            steps.saturating_sub(1),
            Position::planar(SCAN_SIZE, 0.0),
        ),
        3 => SimulatedOperation::InsertStep(slot, -1),
        4 if steps > 0 => SimulatedOperation::RemoveStep(slot, rng.gen_range(0..steps)),
        5 => SimulatedOperation::SetTitle(slot, String::new()),
        _ => SimulatedOperation::Abandon(slot),
    }
}

/// Generate an operation that must be rejected
fn generate_invalid_operation(rng: &mut StdRng, workflows: &[Workflow]) -> SimulatedOperation {
    let slot = rng.gen_range(0..workflows.len());

    match rng.gen_range(0..6) {
        0 => SimulatedOperation::PlaceAnchor(
            slot,
            0,
            Position::planar(SCAN_SIZE * 1.5, SCAN_SIZE / 2.0),
        ),
        1 => SimulatedOperation::InsertStep(slot, -2 - rng.gen_range(0..8)),
        2 => SimulatedOperation::SelectTemplate(slot, "no-such-template".to_string()),
        3 => SimulatedOperation::RemoveStep(slot, usize::MAX),
        4 => SimulatedOperation::MoveStep(slot, usize::MAX, 0),
        _ => SimulatedOperation::DeliverStale(slot),
    }
}

/// Classify whether an operation should succeed or fail
///
/// Only context-free outcomes are classified; everything else depends on
/// the workflow's stage and is checked by the invariants instead.
fn classify_expected_result(operation: &SimulatedOperation) -> ExpectedResult {
    match operation {
        SimulatedOperation::Start(kind, template) => match template {
            Some(id) if templates::lookup(*kind, id).is_err() => ExpectedResult::ShouldFail,
            _ => ExpectedResult::ShouldSucceed,
        },
        SimulatedOperation::PlaceAnchor(_, _, p)
            if !(0.0..=SCAN_SIZE).contains(&p.x) || !(0.0..=SCAN_SIZE).contains(&p.y) =>
        {
            ExpectedResult::ShouldFail
        }
        SimulatedOperation::InsertStep(_, after) if *after < -1 => ExpectedResult::ShouldFail,
        SimulatedOperation::SelectTemplate(_, id) if id == "no-such-template" => {
            ExpectedResult::ShouldFail
        }
        SimulatedOperation::RemoveStep(_, usize::MAX)
        | SimulatedOperation::MoveStep(_, usize::MAX, _)
        | SimulatedOperation::DeliverStale(_) => ExpectedResult::ShouldFail,
        SimulatedOperation::Abandon(_) => ExpectedResult::ShouldSucceed,
        _ => ExpectedResult::ContextDependent,
    }
}

/// Execute an operation against the live workflows
fn execute_operation(
    capture: &CaptureConfig,
    operation: &SimulatedOperation,
    workflows: &mut Vec<Workflow>,
    submitted: &mut usize,
    released: &mut usize,
) -> Result<String, CaptureError> {
    match operation {
        SimulatedOperation::Start(kind, template) => {
            let wf = Workflow::start(*kind, template.as_deref(), capture.clone())?;
            workflows.push(wf);
            Ok(format!("Started {kind}"))
        }
        SimulatedOperation::Submit(slot) => {
            let artifact = workflows[*slot].finalize()?;
            workflows.swap_remove(*slot);
            *submitted += 1;
            Ok(format!("Submitted {}", artifact.id()))
        }
        SimulatedOperation::Abandon(slot) => {
            let media = workflows.swap_remove(*slot).abandon();
            *released += media.len();
            Ok(format!("Released {} media", media.len()))
        }
        SimulatedOperation::Event(slot, event) => {
            let to = workflows[*slot].attempt(*event)?;
            Ok(format!("Now in {to}"))
        }
        SimulatedOperation::SelectTemplate(slot, id) => {
            workflows[*slot].select_template(id)?;
            Ok(format!("Template {id}"))
        }
        SimulatedOperation::SetTitle(slot, title) => {
            workflows[*slot].set_title(title.clone())?;
            Ok("Title set".to_string())
        }
        SimulatedOperation::ReportBounds(slot, bounds) => {
            workflows[*slot].report_bounds(*bounds)?;
            Ok(format!("Bounds {bounds}"))
        }
        SimulatedOperation::AttachMedia(slot, media, target) => {
            let displaced = workflows[*slot].attach_media(media.clone(), *target)?;
            if displaced.is_some() {
                *released += 1;
            }
            Ok(format!("Attached {}", media.uri))
        }
        SimulatedOperation::InsertStep(slot, after) => {
            let index = workflows[*slot].insert_step(*after)?;
            Ok(format!("Inserted step {index}"))
        }
        SimulatedOperation::RemoveStep(slot, index) => {
            let step = workflows[*slot].remove_step(*index)?;
            if step.media().is_some() {
                *released += 1;
            }
            Ok(format!("Removed step {index}"))
        }
        SimulatedOperation::MoveStep(slot, from, to) => {
            workflows[*slot].move_step(*from, *to)?;
            Ok(format!("Moved step {from} -> {to}"))
        }
        SimulatedOperation::DescribeStep(slot, index, text) => {
            workflows[*slot].set_step_description(*index, text.clone())?;
            Ok(format!("Described step {index}"))
        }
        SimulatedOperation::PlaceAnchor(slot, index, position) => {
            let id = workflows[*slot].place_anchor(*index, *position)?;
            Ok(format!("Placed {id}"))
        }
        SimulatedOperation::RequestAnalysis(slot) => {
            let wf = &mut workflows[*slot];
            let request = wf.begin_analysis()?;
            let batch = FindingsBatch::new(
                BatchId::new(format!("{}-{}", request.session, request.request_id)),
                FixedAnalysisProvider::findings_for(&request),
            );
            let report = wf.deliver(AnalysisOutcome {
                request_id: request.request_id,
                result: Ok(batch),
            })?;
            Ok(format!("Analysis added {} findings", report.added))
        }
        SimulatedOperation::DeliverStale(slot) => {
            let report = workflows[*slot].deliver(AnalysisOutcome {
                request_id: RequestId(u32::MAX),
                result: Ok(FindingsBatch::new(BatchId::new("stale"), Vec::new())),
            })?;
            Ok(format!("Stale delivery added {}", report.added))
        }
        SimulatedOperation::Ingest(slot, batch) => {
            let report = workflows[*slot].ingest_findings(batch.clone())?;
            Ok(format!("Ingested {} (duplicate: {})", report.added, report.duplicate))
        }
    }
}

/// Engine invariant checks over live workflows
pub struct WorkflowInvariants;

impl WorkflowInvariants {
    /// Check all invariants
    ///
    /// # Errors
    /// Every violation found across all workflows
    pub fn check_all(
        workflows: &[Workflow],
        capture: &CaptureConfig,
    ) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        for (slot, wf) in workflows.iter().enumerate() {
            let checks = [
                Self::check_artifact(wf, capture),
                Self::check_stage(wf),
                Self::check_journal(wf),
            ];
            violations.extend(checks.into_iter().filter_map(Result::err).map(|mut v| {
                v.details = format!("workflow {slot}: {}", v.details);
                v
            }));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Structural artifact invariants and the media cap
    ///
    /// # Errors
    /// The first broken invariant
    pub fn check_artifact(wf: &Workflow, capture: &CaptureConfig) -> Result<(), InvariantViolation> {
        if let Err(e) = wf.artifact().check_invariants() {
            return Err(InvariantViolation {
                check: InvariantCheck::ArtifactInvariantsHold,
                details: e.to_string(),
            });
        }
        let held = wf.artifact().media().len();
        if let Some(cap) = capture.media_cap(wf.kind()) {
            if held > cap {
                return Err(InvariantViolation {
                    check: InvariantCheck::MediaCapRespected,
                    details: format!("{held} media in a bucket capped at {cap}"),
                });
            }
        }
        Ok(())
    }

    /// Status, finalize and analysis agree with the stage
    ///
    /// # Errors
    /// The first disagreement
    pub fn check_stage(wf: &Workflow) -> Result<(), InvariantViolation> {
        let stage = wf.stage();
        let expected = match stage {
            Stage::Review | Stage::Generate | Stage::Anchors => ArtifactStatus::InReview,
            Stage::Complete => ArtifactStatus::Complete,
            Stage::Scan | Stage::Form | Stage::Capture => ArtifactStatus::Draft,
        };
        if wf.artifact().status() != expected || !stage::stages(wf.kind()).contains(&stage) {
            return Err(InvariantViolation {
                check: InvariantCheck::StatusMatchesStage,
                details: format!("{} artifact {:?} in {stage}", wf.kind(), wf.artifact().status()),
            });
        }
        if wf.finalize().is_ok() != stage.is_terminal() {
            return Err(InvariantViolation {
                check: InvariantCheck::FinalizeOnlyWhenComplete,
                details: format!("finalize disagrees with stage {stage}"),
            });
        }
        if stage.is_terminal() && matches!(wf.analysis_status(), AnalysisStatus::Pending { .. }) {
            return Err(InvariantViolation {
                check: InvariantCheck::NothingPendingWhenComplete,
                details: "analysis pending in complete stage".to_string(),
            });
        }
        Ok(())
    }

    /// Journal hash chain
    ///
    /// # Errors
    /// The integrity failure
    pub fn check_journal(wf: &Workflow) -> Result<(), InvariantViolation> {
        wf.journal()
            .verify_integrity()
            .map_err(|e| InvariantViolation {
                check: InvariantCheck::JournalChainIsUnbroken,
                details: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_run_passes() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 500,
            ..Default::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.total_operations, 500);
    }

    #[test]
    fn same_seed_same_run() {
        let config = SimulatorConfig {
            seed: 7,
            total_operations: 300,
            ..Default::default()
        };
        let a = run_simulator(config.clone());
        let b = run_simulator(config);
        assert_eq!(a.stats.operations_by_type, b.stats.operations_by_type);
        assert_eq!(a.stats.successful_operations, b.stats.successful_operations);
        assert_eq!(a.submitted_artifacts, b.submitted_artifacts);
    }

    #[test]
    fn invalid_ops_are_classified() {
        let op = SimulatedOperation::InsertStep(0, -4);
        assert_eq!(classify_expected_result(&op), ExpectedResult::ShouldFail);
        let op = SimulatedOperation::PlaceAnchor(0, 0, Position::planar(150.0, 50.0));
        assert_eq!(classify_expected_result(&op), ExpectedResult::ShouldFail);
        let op = SimulatedOperation::Event(0, WorkflowEvent::Advance);
        assert_eq!(classify_expected_result(&op), ExpectedResult::ContextDependent);
    }
}
