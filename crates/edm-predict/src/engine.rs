// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Prediction driver: one task per query row over a shared read-only pair
//! of manifolds, a bounded worker pool, and worst-code aggregation.

use crate::neighbors::select_neighbors;
use crate::simplex::simplex_prediction;
use crate::smap::smap_prediction;
use edm_core::{
    Algorithm, CancelToken, DistanceKind, EdmError, ExecutionContext, IoSink, Options,
    ReturnCode,
};
use edm_distance::{DistanceIndexPairs, lp_distances, wasserstein_distances};
use edm_manifold::{Manifold, ManifoldGenerator};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Output of one invocation.
///
/// `ystar` is a `num_thetas x num_predictions` slab; `coeffs`, present only
/// for S-map runs under `save_mode`, adds a trailing `num_coeff_cols` axis.
/// Cells that could not be predicted hold the missing sentinel.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub num_thetas: usize,
    pub num_predictions: usize,
    pub num_coeff_cols: usize,
    pub ystar: Vec<f64>,
    pub coeffs: Option<Vec<f64>>,
    /// Pearson correlation against the held-out targets, one per theta.
    pub rho: Vec<f64>,
    /// Mean absolute error against the held-out targets, one per theta.
    pub mae: Vec<f64>,
    pub rc: ReturnCode,
}

impl Prediction {
    #[inline]
    pub fn ystar(&self, theta: usize, q: usize) -> f64 {
        self.ystar[theta * self.num_predictions + q]
    }

    /// Coefficient `c` of prediction `q` at theta index `theta`; `None`
    /// when coefficients were not materialised.
    pub fn coeff(&self, theta: usize, q: usize, c: usize) -> Option<f64> {
        let coeffs = self.coeffs.as_ref()?;
        Some(coeffs[(theta * self.num_predictions + q) * self.num_coeff_cols + c])
    }
}

/// Per-task result, assembled into the output slabs after the join.
struct RowOutput {
    rc: ReturnCode,
    ystar: Vec<f64>,
    coeffs: Option<Vec<f64>>,
}

impl RowOutput {
    fn missing_for(opts_thetas: usize, coeff_cols: usize, missing: f64, rc: ReturnCode) -> Self {
        Self {
            rc,
            ystar: vec![missing; opts_thetas],
            coeffs: if coeff_cols > 0 {
                Some(vec![missing; opts_thetas * coeff_cols])
            } else {
                None
            },
        }
    }
}

fn resolve_nthreads(requested: usize) -> usize {
    let available = thread::available_parallelism().map_or(1, |n| n.get());
    if requested == 0 {
        available
    } else {
        requested.min(available).max(1)
    }
}

/// Metrics-table width the distance kernel actually indexes: full manifold
/// columns for the Lp family, channels plus unlagged extras for the
/// curve-matching kernel.
fn metrics_width(opts: &Options, m: &Manifold) -> usize {
    match opts.distance {
        DistanceKind::Wasserstein => {
            let channels = 1 + usize::from(m.e_dt() > 0) + m.e_lagged_extras() / m.e();
            channels + m.num_unlagged_extras()
        }
        _ => m.e_actual(),
    }
}

fn predict_row(
    q: usize,
    opts: &Options,
    m: &Manifold,
    mp: &Manifold,
    candidates: &[usize],
    coeff_cols: usize,
    ctx: &ExecutionContext<'_>,
) -> RowOutput {
    let missing = m.missing();
    let num_thetas = opts.thetas.len();

    if ctx.is_cancelled() {
        return RowOutput::missing_for(num_thetas, coeff_cols, missing, ReturnCode::BreakHit);
    }

    let pairs: DistanceIndexPairs = match opts.distance {
        DistanceKind::Wasserstein => {
            match wasserstein_distances(q, opts, m, mp, candidates, ctx) {
                Ok(pairs) => pairs,
                Err(EdmError::Cancelled) => {
                    return RowOutput::missing_for(
                        num_thetas,
                        coeff_cols,
                        missing,
                        ReturnCode::BreakHit,
                    );
                }
                Err(err) => {
                    return RowOutput::missing_for(
                        num_thetas,
                        coeff_cols,
                        missing,
                        err.return_code(),
                    );
                }
            }
        }
        _ => lp_distances(q, opts, m, mp, candidates),
    };

    if pairs.is_empty() {
        return RowOutput::missing_for(
            num_thetas,
            coeff_cols,
            missing,
            ReturnCode::InsufficientUnique,
        );
    }

    let neighbors = select_neighbors(&pairs, opts.k);

    let mut out = RowOutput::missing_for(num_thetas, coeff_cols, missing, ReturnCode::Success);
    for (t, &theta) in opts.thetas.iter().enumerate() {
        match opts.algorithm {
            Algorithm::Simplex => {
                match simplex_prediction(theta, &neighbors, m.y_vec(), missing) {
                    Some(value) => out.ystar[t] = value,
                    None => out.rc = out.rc.worst(ReturnCode::InsufficientUnique),
                }
            }
            Algorithm::SMap => {
                match smap_prediction(theta, &neighbors, m, mp.row(q), opts.force_compute) {
                    Ok(fit) => {
                        out.ystar[t] = fit.prediction;
                        if let Some(coeffs) = out.coeffs.as_mut() {
                            let base = t * coeff_cols;
                            for c in 0..coeff_cols {
                                coeffs[base + c] =
                                    fit.coefficients.get(c).copied().unwrap_or(missing);
                            }
                        }
                    }
                    Err(err) => {
                        out.rc = out.rc.worst(err.return_code());
                    }
                }
            }
        }
    }

    out
}

/// Coarse progress reporting: one line per completed quartile.
fn report_milestone(ctx: &ExecutionContext<'_>, completed: usize, total: usize) {
    let mut percent = None;
    for quartile in 1..=4usize {
        if completed > 0 && completed == total * quartile / 4 {
            percent = Some(25 * quartile);
        }
    }
    if let Some(percent) = percent {
        ctx.print_async(&format!("{percent}% of predictions done\n"));
    }
}

/// Runs one prediction invocation.
///
/// Fatal conditions (mask shape mismatch, out-of-domain options, a metrics
/// table of the wrong width) fail before any task starts. Everything a
/// single query row can recover from is folded into the aggregate
/// [`ReturnCode`] instead.
pub fn predict(
    opts: &Options,
    generator: &ManifoldGenerator,
    training_rows: &[bool],
    prediction_rows: &[bool],
    ctx: &ExecutionContext<'_>,
) -> Result<Prediction, EdmError> {
    opts.validate()?;

    let n = generator.len();
    if training_rows.len() != n || prediction_rows.len() != n {
        return Err(EdmError::invalid_input(format!(
            "row masks must match the input length {n}; got {} and {}",
            training_rows.len(),
            prediction_rows.len()
        )));
    }
    if opts.copredict && !generator.has_coprediction_data() {
        return Err(EdmError::invalid_input(
            "coprediction requested but the generator holds no co_x series",
        ));
    }

    let m = generator.create_manifold(opts.e, training_rows, false, false);
    let mp = generator.create_manifold(opts.e, prediction_rows, opts.copredict, true);
    debug_assert_eq!(m.e_actual(), mp.e_actual());

    opts.validate_for(metrics_width(opts, &m))?;

    let num_thetas = opts.thetas.len();
    let num_predictions = mp.nobs();
    let coeff_cols = match opts.algorithm {
        Algorithm::SMap => opts.coeff_cols(m.e_actual()),
        Algorithm::Simplex => 0,
    };
    let missing = m.missing();
    let candidates: Vec<usize> = (0..m.nobs()).collect();

    let nthreads = resolve_nthreads(opts.nthreads);
    ctx.print_async(&format!(
        "Predicting {num_predictions} observations against a library of {} with {nthreads} threads\n",
        m.nobs()
    ));

    let completed = AtomicUsize::new(0);
    let run_row = |q: usize| {
        let row = predict_row(q, opts, &m, &mp, &candidates, coeff_cols, ctx);
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        report_milestone(ctx, done, num_predictions);
        row
    };

    #[cfg(feature = "rayon")]
    let rows: Vec<RowOutput> = {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(nthreads)
            .build()
            .map_err(|err| EdmError::resource_limit(format!("worker pool: {err}")))?;
        pool.install(|| (0..num_predictions).into_par_iter().map(run_row).collect())
    };

    #[cfg(not(feature = "rayon"))]
    let rows: Vec<RowOutput> = (0..num_predictions).map(run_row).collect();

    let mut ystar = vec![missing; num_thetas * num_predictions];
    let mut coeffs = if coeff_cols > 0 {
        Some(vec![missing; num_thetas * num_predictions * coeff_cols])
    } else {
        None
    };
    let mut rc = ReturnCode::Success;

    for (q, row) in rows.iter().enumerate() {
        rc = rc.worst(row.rc);
        for t in 0..num_thetas {
            ystar[t * num_predictions + q] = row.ystar[t];
        }
        if let (Some(slab), Some(row_coeffs)) = (coeffs.as_mut(), row.coeffs.as_ref()) {
            for t in 0..num_thetas {
                let src = t * coeff_cols;
                let dst = (t * num_predictions + q) * coeff_cols;
                slab[dst..dst + coeff_cols]
                    .copy_from_slice(&row_coeffs[src..src + coeff_cols]);
            }
        }
    }

    if ctx.is_cancelled() {
        rc = rc.worst(ReturnCode::BreakHit);
    }

    let observed = mp.y_vec();
    let mut rho = Vec::with_capacity(num_thetas);
    let mut mae = Vec::with_capacity(num_thetas);
    for t in 0..num_thetas {
        let predicted = &ystar[t * num_predictions..(t + 1) * num_predictions];
        rho.push(edm_eval::pearson_rho(observed, predicted, missing));
        mae.push(edm_eval::mean_absolute_error(observed, predicted, missing));
    }

    ctx.print_async(&format!("Finished with return code \"{rc}\"\n"));

    Ok(Prediction {
        num_thetas,
        num_predictions,
        num_coeff_cols: coeff_cols,
        ystar,
        coeffs,
        rho,
        mae,
        rc,
    })
}

/// Handle over a prediction running on its own thread: start, poll,
/// collect, with the same cancellation token the workers poll.
pub struct PredictionHandle {
    join: Option<thread::JoinHandle<Result<Prediction, EdmError>>>,
    cancel: CancelToken,
}

impl PredictionHandle {
    /// True once the background run has completed (or panicked).
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(thread::JoinHandle::is_finished)
    }

    /// Requests cooperative cancellation of the running prediction.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Blocks until the run completes and returns its result.
    pub fn join(mut self) -> Result<Prediction, EdmError> {
        match self.join.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(EdmError::unknown("prediction worker panicked"))),
            None => Err(EdmError::unknown("prediction already collected")),
        }
    }
}

/// Starts a prediction on a background thread and returns immediately.
pub fn predict_async(
    opts: Options,
    generator: Arc<ManifoldGenerator>,
    training_rows: Vec<bool>,
    prediction_rows: Vec<bool>,
    io: Option<Arc<dyn IoSink>>,
    cancel: CancelToken,
) -> PredictionHandle {
    let worker_cancel = cancel.clone();
    let join = thread::spawn(move || {
        let ctx = ExecutionContext {
            cancel: Some(&worker_cancel),
            io: io.as_deref(),
        };
        predict(&opts, &generator, &training_rows, &prediction_rows, &ctx)
    });

    PredictionHandle {
        join: Some(join),
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::{Prediction, metrics_width, resolve_nthreads};
    use edm_core::{DistanceKind, MISSING, Options, ReturnCode};
    use edm_manifold::Manifold;

    #[test]
    fn resolve_nthreads_clamps_to_available_parallelism() {
        let available = std::thread::available_parallelism().map_or(1, |n| n.get());
        assert_eq!(resolve_nthreads(0), available);
        assert_eq!(resolve_nthreads(1), 1);
        assert_eq!(resolve_nthreads(usize::MAX), available);
    }

    #[test]
    fn metrics_width_depends_on_the_kernel() {
        // E=2 with a full dt block, one lagged extra and one unlagged extra.
        let e_actual_cells = 2 + 2 + 2 + 1;
        let m = Manifold::from_parts(
            vec![0.0; e_actual_cells],
            vec![0.0],
            None,
            2,
            2,
            2,
            3,
            MISSING,
            false,
        );

        let lp = Options::default();
        assert_eq!(metrics_width(&lp, &m), 7);

        let wasserstein = Options {
            distance: DistanceKind::Wasserstein,
            ..Options::default()
        };
        // Channels x, dt and the lagged extra, plus one unlagged extra.
        assert_eq!(metrics_width(&wasserstein, &m), 4);
    }

    #[test]
    fn prediction_slab_indexing_is_row_major_over_thetas() {
        let pred = Prediction {
            num_thetas: 2,
            num_predictions: 3,
            num_coeff_cols: 2,
            ystar: vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0],
            coeffs: Some((0..12).map(f64::from).collect()),
            rho: vec![MISSING; 2],
            mae: vec![MISSING; 2],
            rc: ReturnCode::Success,
        };

        assert_eq!(pred.ystar(0, 2), 2.0);
        assert_eq!(pred.ystar(1, 0), 10.0);
        assert_eq!(pred.coeff(0, 1, 0), Some(2.0));
        assert_eq!(pred.coeff(1, 2, 1), Some(11.0));

        let no_coeffs = Prediction { coeffs: None, ..pred };
        assert_eq!(no_coeffs.coeff(0, 0, 0), None);
    }
}
