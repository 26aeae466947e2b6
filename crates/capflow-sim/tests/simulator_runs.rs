//! Simulator runs across seeds and configurations

use capflow_core::CaptureConfig;
use capflow_sim::simulator::{run_simulator, OperationDistribution, SimulatorConfig};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_any_seed_passes(seed in any::<u64>()) {
        let report = run_simulator(SimulatorConfig {
            seed,
            total_operations: 400,
            ..Default::default()
        });
        prop_assert!(report.passed(), "{}", report.generate_text());
    }
}

#[test]
fn tight_caps_hold() {
    let capture = CaptureConfig::default()
        .with_max_audit_media(1)
        .with_max_bda_media(1)
        .with_max_steps(2);
    let report = run_simulator(SimulatorConfig {
        seed: 99,
        total_operations: 2_000,
        capture,
        ..Default::default()
    });
    assert!(report.passed(), "{}", report.generate_text());
}

#[test]
fn hostile_mix_is_rejected_cleanly() {
    let report = run_simulator(SimulatorConfig {
        seed: 3,
        total_operations: 1_000,
        operation_distribution: OperationDistribution {
            valid_ops: 0.2,
            edge_cases: 0.3,
            invalid_ops: 0.5,
        },
        stop_on_first_violation: false,
        ..Default::default()
    });
    assert!(report.passed(), "{}", report.generate_text());
    assert!(report.stats.failed_operations > 0);
}

#[test]
fn long_run_submits_artifacts() {
    let report = run_simulator(SimulatorConfig {
        seed: 2024,
        total_operations: 5_000,
        ..Default::default()
    });
    assert!(report.passed(), "{}", report.generate_text());
    assert!(report.submitted_artifacts > 0);
    assert!(report.generate_text().contains("Result: PASS"));
}
