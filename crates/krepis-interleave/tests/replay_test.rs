//! Integration Test: Checkpoint & Replay
//!
//! A failing exploration writes its decision trace; replaying the trace
//! reproduces the failure in a single execution.

use krepis_interleave::{thread, DecisionTrace, Harness, InterleaveConfig, InterleaveError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn quiet() -> InterleaveConfig {
    InterleaveConfig::default().with_print_trace(false)
}

fn lost_update() {
    let counter = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                let seen = counter.load(Ordering::SeqCst);
                thread::yield_now();
                counter.store(seen + 1, Ordering::SeqCst);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2, "lost update");
}

fn serial_program() {
    let child = thread::spawn(|| thread::yield_now());
    child.join().unwrap();
}

#[test]
fn test_checkpoint_replays_failure() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("failing.json");

    let failure = Harness::with_config(quiet().with_checkpoint(&checkpoint))
        .check(lost_update)
        .unwrap_err();
    assert!(checkpoint.exists(), "checkpoint written on failure");
    println!("💾 recorded:\n{}", failure.trace);

    let saved = DecisionTrace::load(&checkpoint).unwrap();
    assert_eq!(saved, failure.trace);

    let replayed = Harness::replay_file(&checkpoint, quiet())
        .unwrap()
        .check(lost_update)
        .unwrap_err();

    println!("🔁 replayed: {}", replayed.error);
    assert_eq!(replayed.iteration, 1);
    assert_eq!(replayed.trace, failure.trace);
    match (&failure.error, &replayed.error) {
        (
            InterleaveError::TestPanicked { message: first, .. },
            InterleaveError::TestPanicked { message: again, .. },
        ) => assert_eq!(first, again),
        other => panic!("expected the same assertion twice, got {:?}", other),
    }
}

#[test]
fn test_trace_labels_point_at_source() {
    let failure = Harness::with_config(quiet()).check(lost_update).unwrap_err();

    let labels = failure.trace.labels();
    println!("🏷️ {:?}", labels);
    assert!(labels.iter().any(|label| label.contains("replay_test.rs:")));
    assert!(labels
        .iter()
        .all(|label| label.contains(" @ ") || label.ends_with(" exit")));
    assert!(failure.to_string().contains("decision trace"));
}

#[test]
fn test_replay_of_other_program_diverges() {
    let failure = Harness::with_config(quiet()).check(lost_update).unwrap_err();

    let diverged = Harness::replay(failure.trace, quiet())
        .check(serial_program)
        .unwrap_err();

    println!("🔀 {}", diverged.error);
    assert!(matches!(diverged.error, InterleaveError::ReplayDiverged { step: 0, .. }));
    assert!(diverged.error.is_contract_violation());
}

#[test]
fn test_empty_trace_replays_decision_free_program() {
    let report = Harness::replay(DecisionTrace::default(), quiet())
        .check(|| {})
        .unwrap();
    assert_eq!(report.iterations, 1);
    assert!(report.complete);

    // an empty trace cannot cover a program that has decisions
    let failure = Harness::replay(DecisionTrace::default(), quiet())
        .check(serial_program)
        .unwrap_err();
    assert!(matches!(failure.error, InterleaveError::ReplayDiverged { step: 0, .. }));
}
