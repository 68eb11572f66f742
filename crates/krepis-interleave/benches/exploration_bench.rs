//! Exploration Benchmark Suite
//!
//! # Scenarios
//!
//! 1. **Model-only yields**: the scheduling model driven without host
//!    threads; measures decision tree and scheduler bookkeeping alone
//!
//! 2. **Lost update**: full harness, exhaustive run over real threads
//!    - grows with the number of increments per thread
//!
//! 3. **AB-BA deadlock**: full harness until the first failing execution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use krepis_interleave::sync::Mutex;
use krepis_interleave::{
    thread, DepthFirstExplorer, Explorer, Harness, InterleaveConfig, Schedule, SchedulerState,
    ThreadId,
};
use parking_lot::Mutex as PlMutex;
use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

/// Exhaustively explore `threads` children that yield `yields` times each,
/// driving the model directly; returns the number of executions
fn explore_model(threads: usize, yields: usize) -> usize {
    let explorer = Arc::new(PlMutex::new(DepthFirstExplorer::new()));
    let mut executions = 0;

    while !explorer.lock().is_completely_tested() {
        executions += 1;
        let mut state = SchedulerState::new(explorer.clone(), 100_000);
        let root = state.begin(0usize);

        let mut remaining: HashMap<ThreadId, usize> = HashMap::new();
        for _ in 0..threads {
            let child = state.new_thread(&root).expect("child registered");
            remaining.insert(child, yields);
        }

        let mut schedule = state.thread_terminated(&root).expect("root exit");
        while let Schedule::Resume(current) = schedule {
            let left = remaining.get_mut(&current).expect("known thread");
            schedule = if *left > 0 {
                *left -= 1;
                state.yield_point(&current, Location::caller()).expect("yield")
            } else {
                state.thread_terminated(&current).expect("exit")
            };
        }

        explorer.lock().done().expect("deterministic model");
    }
    executions
}

fn quiet() -> InterleaveConfig {
    InterleaveConfig::default().with_print_trace(false)
}

fn lost_update(increments: usize) {
    let counter = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..increments {
                    let seen = counter.load(Ordering::SeqCst);
                    thread::yield_now();
                    counter.store(seen + 1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("child result");
    }
    black_box(counter.load(Ordering::SeqCst));
}

fn abba() {
    let a = Arc::new(Mutex::new(()));
    let b = Arc::new(Mutex::new(()));
    let (a2, b2) = (a.clone(), b.clone());
    let child = thread::spawn(move || {
        let _a = a2.lock();
        let _b = b2.lock();
    });
    {
        let _b = b.lock();
        let _a = a.lock();
    }
    child.join().expect("child result");
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Scheduling model without host threads
fn bench_model_yields(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_yields");

    for (threads, yields) in [(2, 2), (2, 4), (3, 2)] {
        group.bench_with_input(
            BenchmarkId::new(format!("{}_threads", threads), yields),
            &(threads, yields),
            |b, &(threads, yields)| {
                b.iter(|| black_box(explore_model(threads, yields)));
            },
        );
    }

    group.finish();
}

/// Exhaustive harness run over host threads
fn bench_lost_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("lost_update");
    group.sample_size(10);

    for increments in [1, 2] {
        group.bench_with_input(BenchmarkId::new("exhaustive", increments), &increments, |b, &n| {
            b.iter(|| {
                let report = Harness::with_config(quiet())
                    .check(|| lost_update(n))
                    .expect("no assertion in the benchmark body");
                black_box(report.iterations)
            });
        });
    }

    group.finish();
}

/// Time to the first deadlocking execution
fn bench_abba_deadlock(c: &mut Criterion) {
    let mut group = c.benchmark_group("abba_deadlock");
    group.sample_size(10);

    group.bench_function("first_failure", |b| {
        b.iter(|| {
            let failure = Harness::with_config(quiet())
                .check(abba)
                .expect_err("deadlock is reachable");
            black_box(failure.iteration)
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_model_yields, bench_lost_update, bench_abba_deadlock);

criterion_main!(benches);
