//! Property tests for the workflow state machine
//!
//! Random operation sequences against every artifact kind must never break
//! the artifact invariants, never move the stage on a rejected transition,
//! and never change the session on a rejected mutation.

use capflow_core::prelude::*;
use capflow_model::{FindingPatch, MediaRef, Position};
use capflow_test_utils::{batch, default_template, square_bounds};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Event(WorkflowEvent),
    Template(usize),
    Title(bool),
    Bounds,
    Bucket(u8),
    Insert(i64),
    Remove(usize),
    StepMedia(usize, u8),
    Describe(usize),
    Anchor(usize, f64, f64),
    Propose(f64, f64),
    Commit(usize),
    Ingest(u8, usize),
    Edit(u8, u32),
    BeginAnalysis,
}

fn event() -> impl Strategy<Value = WorkflowEvent> {
    prop_oneof![
        4 => Just(WorkflowEvent::Advance),
        2 => Just(WorkflowEvent::Back),
        2 => Just(WorkflowEvent::Complete),
        1 => Just(WorkflowEvent::Reopen),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => event().prop_map(Op::Event),
        1 => (0usize..6).prop_map(Op::Template),
        1 => any::<bool>().prop_map(Op::Title),
        1 => Just(Op::Bounds),
        2 => any::<u8>().prop_map(Op::Bucket),
        2 => (-2i64..6).prop_map(Op::Insert),
        1 => (0usize..6).prop_map(Op::Remove),
        1 => (0usize..6, any::<u8>()).prop_map(|(i, m)| Op::StepMedia(i, m)),
        1 => (0usize..6).prop_map(Op::Describe),
        1 => (0usize..6, -20.0f64..120.0, -20.0f64..120.0).prop_map(|(i, x, y)| Op::Anchor(i, x, y)),
        1 => (-20.0f64..120.0, -20.0f64..120.0).prop_map(|(x, y)| Op::Propose(x, y)),
        1 => (0usize..6).prop_map(Op::Commit),
        1 => (0u8..3, 0usize..4).prop_map(|(b, n)| Op::Ingest(b, n)),
        1 => (0u8..3, 0u32..4).prop_map(|(b, o)| Op::Edit(b, o)),
        1 => Just(Op::BeginAnalysis),
    ]
}

fn kind() -> impl Strategy<Value = ArtifactKind> {
    prop_oneof![
        Just(ArtifactKind::Audit),
        Just(ArtifactKind::Guide),
        Just(ArtifactKind::Bda),
        Just(ArtifactKind::Map),
    ]
}

/// Apply `op`, discarding any success value
fn apply(wf: &mut Workflow, op: &Op) -> Result<(), CaptureError> {
    let kind = wf.kind();
    match op.clone() {
        Op::Event(e) => wf.attempt(e).map(|_| ()),
        Op::Template(i) => {
            let ids = ["1", "2", "maintenance", "safety", "bogus", "4"];
            wf.select_template(ids[i])
        }
        Op::Title(set) => wf.set_title(if set { "Fixture" } else { "" }),
        Op::Bounds => wf.report_bounds(square_bounds(100.0)),
        Op::Bucket(m) => wf
            .attach_media(MediaRef::image(format!("bucket-{m}")), None)
            .map(|_| ()),
        Op::Insert(after) => wf.insert_step(after).map(|_| ()),
        Op::Remove(i) => wf.remove_step(i).map(|_| ()),
        Op::StepMedia(i, m) => wf
            .attach_media(MediaRef::video(format!("{kind}-step-{m}")), Some(i))
            .map(|_| ()),
        Op::Describe(i) => wf.set_step_description(i, "Check the seal"),
        Op::Anchor(i, x, y) => wf.place_anchor(i, Position::planar(x, y)).map(|_| ()),
        Op::Propose(x, y) => wf.propose_anchor(Position::planar(x, y)),
        Op::Commit(i) => wf.commit_anchor(i).map(|_| ()),
        Op::Ingest(b, n) => wf.ingest_findings(batch(&format!("b{b}"), n)).map(|_| ()),
        Op::Edit(b, o) => {
            let id = capflow_model::FindingId::new(capflow_model::BatchId::new(format!("b{b}")), o);
            wf.edit_finding(&id, FindingPatch::notes("edited")).map(|_| ())
        }
        Op::BeginAnalysis => wf.begin_analysis().map(|_| ()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_rejections_leave_state(kind in kind(), ops in prop::collection::vec(op(), 0..80)) {
        let mut wf = Workflow::start(kind, default_template(kind), CaptureConfig::default()).unwrap();

        for op in &ops {
            let before = wf.clone();
            if let Err(e) = apply(&mut wf, op) {
                prop_assert_eq!(wf.stage(), before.stage(), "stage moved on {:?}: {}", op, e);
                prop_assert_eq!(wf.session(), before.session(), "session changed on {:?}: {}", op, e);
            }
            prop_assert!(wf.artifact().check_invariants().is_ok());

            if wf.stage() == Stage::Complete {
                prop_assert!(wf.finalize().is_ok());
            } else {
                prop_assert!(wf.finalize().is_err());
            }
        }
    }

    #[test]
    fn prop_transitions_are_deterministic(kind in kind(), ops in prop::collection::vec(op(), 0..40), last in event()) {
        let mut wf = Workflow::start(kind, default_template(kind), CaptureConfig::default()).unwrap();
        for op in &ops {
            let _ = apply(&mut wf, op);
        }

        let mut a = wf.clone();
        let mut b = wf;
        let ra = a.attempt(last);
        let rb = b.attempt(last);
        prop_assert_eq!(ra, rb);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_status_tracks_stage(kind in kind(), ops in prop::collection::vec(op(), 0..60)) {
        let mut wf = Workflow::start(kind, default_template(kind), CaptureConfig::default()).unwrap();
        for op in &ops {
            let _ = apply(&mut wf, op);
            let expected = match wf.stage() {
                Stage::Review | Stage::Generate | Stage::Anchors => ArtifactStatus::InReview,
                Stage::Complete => ArtifactStatus::Complete,
                Stage::Scan | Stage::Form | Stage::Capture => ArtifactStatus::Draft,
            };
            prop_assert_eq!(wf.artifact().status(), expected);
        }
    }
}

#[test]
fn stage_reached_only_through_matrix() {
    for kind in ArtifactKind::ALL {
        let stages = capflow_core::stage::stages(kind);
        for from in stages {
            for to in capflow_core::stage::allowed_transitions(kind, *from) {
                assert!(stages.contains(&to), "{kind}: {from} -> {to}");
            }
        }
    }
}
