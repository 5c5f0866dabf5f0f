// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Immutable packed manifold: `nobs x e_actual` row-major cells plus an
/// aligned target vector and optional panel labels.
///
/// Column layout per row (contractual): E lag columns of the primary
/// series, then `e_dt` time-delta columns, then the lagged-extra blocks
/// (E columns each), then one column per unlagged extra.
#[derive(Clone, Debug, PartialEq)]
pub struct Manifold {
    flat: Vec<f64>,
    y: Vec<f64>,
    panel_ids: Option<Vec<i64>>,
    nobs: usize,
    e: usize,
    e_dt: usize,
    e_lagged_extras: usize,
    e_extras: usize,
    e_actual: usize,
    missing: f64,
    prediction: bool,
}

/// Channel view over the lagged prefix of one row, used by the
/// curve-matching distance: channel `c` covers row columns
/// `[c * e, (c + 1) * e)`, so channel 0 is the primary series, channel 1
/// the time deltas (when embedded with a full-width dt block), and the
/// remaining channels the lagged extras.
#[derive(Clone, Copy, Debug)]
pub struct LaggedObs<'a> {
    row: &'a [f64],
    channels: usize,
    e: usize,
}

impl<'a> LaggedObs<'a> {
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn e(&self) -> usize {
        self.e
    }

    #[inline]
    pub fn get(&self, channel: usize, t: usize) -> f64 {
        debug_assert!(channel < self.channels && t < self.e);
        self.row[channel * self.e + t]
    }
}

impl Manifold {
    /// Assembles a manifold from packed parts.
    ///
    /// Panics when the flat buffer is not a whole number of rows, or when
    /// the target/panel vectors are not row-aligned.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        flat: Vec<f64>,
        y: Vec<f64>,
        panel_ids: Option<Vec<i64>>,
        e: usize,
        e_dt: usize,
        e_lagged_extras: usize,
        e_extras: usize,
        missing: f64,
        prediction: bool,
    ) -> Self {
        let e_actual = e + e_dt + e_extras;
        assert!(e >= 1, "Manifold requires e >= 1; got {e}");
        assert!(
            e_lagged_extras <= e_extras,
            "lagged extras ({e_lagged_extras}) cannot exceed total extras width ({e_extras})"
        );
        assert!(
            flat.len() % e_actual == 0,
            "flat buffer length {} is not a multiple of e_actual {e_actual}",
            flat.len()
        );
        let nobs = flat.len() / e_actual;
        assert!(
            y.len() == nobs,
            "target vector length {} must equal nobs {nobs}",
            y.len()
        );
        if let Some(ids) = &panel_ids {
            assert!(
                ids.len() == nobs,
                "panel id vector length {} must equal nobs {nobs}",
                ids.len()
            );
        }

        Self {
            flat,
            y,
            panel_ids,
            nobs,
            e,
            e_dt,
            e_lagged_extras,
            e_extras,
            e_actual,
            missing,
            prediction,
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.flat[i * self.e_actual + j]
    }

    /// Full packed row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.flat[i * self.e_actual..(i + 1) * self.e_actual]
    }

    #[inline]
    pub fn y(&self, i: usize) -> f64 {
        self.y[i]
    }

    pub fn y_vec(&self) -> &[f64] {
        &self.y
    }

    /// Panel label for row `i`; rows without panel data share label 0.
    #[inline]
    pub fn panel(&self, i: usize) -> i64 {
        match &self.panel_ids {
            Some(ids) => ids[i],
            None => 0,
        }
    }

    pub fn has_panel_ids(&self) -> bool {
        self.panel_ids.is_some()
    }

    /// Present-time value of unlagged extra `var` on row `i`.
    #[inline]
    pub fn unlagged_extra(&self, i: usize, var: usize) -> f64 {
        let offset = self.e + self.e_dt + self.e_lagged_extras + var;
        self.flat[i * self.e_actual + offset]
    }

    pub fn num_unlagged_extras(&self) -> usize {
        self.e_extras - self.e_lagged_extras
    }

    /// Channel view over the lagged prefix of row `i`.
    pub fn lagged_obs(&self, i: usize) -> LaggedObs<'_> {
        let channels = 1 + usize::from(self.e_dt > 0) + self.e_lagged_extras / self.e;
        LaggedObs {
            row: &self.flat[i * self.e_actual..i * self.e_actual + channels * self.e],
            channels,
            e: self.e,
        }
    }

    pub fn any_missing(&self, i: usize) -> bool {
        self.row(i).iter().any(|&v| v == self.missing)
    }

    pub fn any_not_missing(&self, i: usize) -> bool {
        self.row(i).iter().any(|&v| v != self.missing)
    }

    pub fn num_not_missing(&self, i: usize) -> usize {
        self.row(i).iter().filter(|&&v| v != self.missing).count()
    }

    /// Spread (max minus min) over every non-missing cell; 0 when the
    /// manifold holds no data.
    pub fn range(&self) -> f64 {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in &self.flat {
            if v != self.missing {
                min = min.min(v);
                max = max.max(v);
            }
        }
        if min > max { 0.0 } else { max - min }
    }

    #[inline]
    pub fn nobs(&self) -> usize {
        self.nobs
    }

    #[inline]
    pub fn e(&self) -> usize {
        self.e
    }

    #[inline]
    pub fn e_dt(&self) -> usize {
        self.e_dt
    }

    #[inline]
    pub fn e_lagged_extras(&self) -> usize {
        self.e_lagged_extras
    }

    #[inline]
    pub fn e_extras(&self) -> usize {
        self.e_extras
    }

    #[inline]
    pub fn e_actual(&self) -> usize {
        self.e_actual
    }

    #[inline]
    pub fn missing(&self) -> f64 {
        self.missing
    }

    /// Bookkeeping tag: true when this manifold was built from the
    /// prediction mask.
    pub fn is_prediction(&self) -> bool {
        self.prediction
    }
}
