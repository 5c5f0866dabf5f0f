// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use edm_core::{CancelToken, ExecutionContext, IoSink, MISSING, Options, ReturnCode};
use edm_manifold::ManifoldGenerator;
use edm_predict::{predict, predict_async};
use std::sync::Arc;
use std::time::Duration;

fn logistic_map(n: usize, x0: f64) -> Vec<f64> {
    let mut x = Vec::with_capacity(n);
    let mut value = x0;
    for _ in 0..n {
        x.push(value);
        value = 3.9 * value * (1.0 - value);
    }
    x
}

fn shifted_target(x: &[f64]) -> Vec<f64> {
    let mut y: Vec<f64> = x[1..].to_vec();
    y.push(MISSING);
    y
}

fn generator(n: usize) -> ManifoldGenerator {
    let x = logistic_map(n, 0.29);
    let y = shifted_target(&x);
    ManifoldGenerator::new(x, y, 1).expect("generator")
}

/// Sink that fires a cancellation token the first time a progress
/// milestone is reported from inside the pool.
struct CancellingSink {
    cancel: CancelToken,
}

impl IoSink for CancellingSink {
    fn print(&self, _msg: &str) {}

    fn print_async(&self, msg: &str) {
        if msg.contains("% of predictions done") {
            self.cancel.cancel();
        }
    }

    fn error(&self, _msg: &str) {}
}

#[test]
fn pre_cancelled_run_reports_break_hit_without_predicting() {
    let n = 80;
    let generator = generator(n);
    let train: Vec<bool> = (0..n).map(|i| i < 40).collect();
    let pred: Vec<bool> = (0..n).map(|i| i >= 40).collect();

    let cancel = CancelToken::new();
    cancel.cancel();
    let ctx = ExecutionContext::new().with_cancel(&cancel);

    let opts = Options { e: 2, k: 3, ..Options::default() };
    let result = predict(&opts, &generator, &train, &pred, &ctx).expect("run should complete");

    assert_eq!(result.rc, ReturnCode::BreakHit);
    for q in 0..result.num_predictions {
        assert_eq!(result.ystar(0, q), MISSING, "cancelled task {q} still wrote a value");
    }
}

#[test]
fn mid_run_cancellation_leaves_a_partial_slab() {
    let n = 800;
    let generator = generator(n);
    let train: Vec<bool> = (0..n).map(|i| i < 400).collect();
    let pred: Vec<bool> = (0..n).map(|i| i >= 400).collect();

    let cancel = CancelToken::new();
    let sink = CancellingSink { cancel: cancel.clone() };
    let ctx = ExecutionContext::new().with_cancel(&cancel).with_io(&sink);

    let opts = Options { e: 2, k: 3, ..Options::default() };
    let result = predict(&opts, &generator, &train, &pred, &ctx).expect("run should complete");

    // The flag fires from the first quartile milestone: the finished tasks
    // kept their values, tasks that started afterwards reported the break.
    assert_eq!(result.rc, ReturnCode::BreakHit);
    let populated = (0..result.num_predictions)
        .filter(|&q| result.ystar(0, q) != MISSING)
        .count();
    assert!(populated > 0, "no task finished before the cancellation fired");
    assert!(
        populated < result.num_predictions,
        "cancellation arrived after every task had already run"
    );
}

#[test]
fn async_handle_runs_to_completion_and_joins() {
    let n = 120;
    let generator = Arc::new(generator(n));
    let train: Vec<bool> = (0..n).map(|i| i < 60).collect();
    let pred: Vec<bool> = (0..n).map(|i| i >= 60).collect();

    let opts = Options { e: 2, k: 3, ..Options::default() };
    let handle = predict_async(
        opts,
        Arc::clone(&generator),
        train,
        pred,
        None,
        CancelToken::new(),
    );

    let result = handle.join().expect("background run should succeed");
    assert_eq!(result.rc, ReturnCode::Success);
    assert_eq!(result.num_predictions, 60);
    assert!(result.rho[0] > 0.9);
}

#[test]
fn async_handle_cancel_propagates_to_the_workers() {
    let n = 1000;
    let generator = Arc::new(generator(n));
    let train: Vec<bool> = (0..n).map(|i| i < 500).collect();
    let pred: Vec<bool> = (0..n).map(|i| i >= 500).collect();

    // A wide embedding keeps the run long enough that the flag always
    // lands while work remains.
    let opts = Options { e: 10, k: 5, ..Options::default() };
    let handle = predict_async(
        opts,
        Arc::clone(&generator),
        train,
        pred,
        None,
        CancelToken::new(),
    );

    handle.cancel();
    let result = handle.join().expect("cancelled run still joins cleanly");
    // The flag may land before or during the pool run, but it is always
    // reflected in the aggregate code.
    assert_eq!(result.rc, ReturnCode::BreakHit);

    // A fresh handle can poll without joining.
    let train: Vec<bool> = (0..n).map(|i| i < 500).collect();
    let pred: Vec<bool> = (0..n).map(|i| i >= 500).collect();
    let handle = predict_async(
        Options { e: 2, k: 3, ..Options::default() },
        generator,
        train,
        pred,
        None,
        CancelToken::new(),
    );
    while !handle.is_finished() {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(handle.join().is_ok());
}

#[test]
fn identical_runs_with_a_fixed_thread_count_match_bitwise() {
    let n = 300;
    let generator = generator(n);
    let train: Vec<bool> = (0..n).map(|i| i < 150).collect();
    let pred: Vec<bool> = (0..n).map(|i| i >= 150).collect();

    let opts = Options {
        e: 2,
        k: 5,
        thetas: vec![0.0, 1.0, 2.0],
        nthreads: 2,
        ..Options::default()
    };
    let ctx = ExecutionContext::new();

    let first = predict(&opts, &generator, &train, &pred, &ctx).expect("first run");
    let second = predict(&opts, &generator, &train, &pred, &ctx).expect("second run");

    assert_eq!(first.ystar, second.ystar);
    assert_eq!(first.rho, second.rho);
    assert_eq!(first.mae, second.mae);
}
