// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::manifold::Manifold;
use edm_core::{EdmError, MISSING};

/// Holds the raw input series and materialises delay-embedded manifolds.
///
/// Inputs are immutable after construction; one generator serves every
/// manifold an invocation needs (library, query, coprediction). The
/// generator itself never fails: out-of-range lags, panel-boundary
/// crossings and gaps in the inputs all surface as MISSING cells.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifoldGenerator {
    x: Vec<f64>,
    y: Vec<f64>,
    co_x: Option<Vec<f64>>,
    t: Option<Vec<f64>>,
    extras: Vec<Vec<f64>>,
    num_extras_lagged: usize,
    panel_ids: Option<Vec<i64>>,
    tau: usize,
    missing: f64,
    dt_weight: f64,
    use_dt: bool,
    add_dt0: bool,
    cumulative_dt: bool,
}

impl ManifoldGenerator {
    /// Generator over a primary series `x`, its target `y` and lag stride
    /// `tau`.
    pub fn new(x: Vec<f64>, y: Vec<f64>, tau: usize) -> Result<Self, EdmError> {
        if x.is_empty() {
            return Err(EdmError::invalid_input("x must contain at least one value"));
        }
        if y.len() != x.len() {
            return Err(EdmError::invalid_input(format!(
                "y length {} must equal x length {}",
                y.len(),
                x.len()
            )));
        }
        if tau == 0 {
            return Err(EdmError::invalid_input("tau must be >= 1; got 0"));
        }

        Ok(Self {
            x,
            y,
            co_x: None,
            t: None,
            extras: Vec::new(),
            num_extras_lagged: 0,
            panel_ids: None,
            tau,
            missing: MISSING,
            dt_weight: 0.0,
            use_dt: false,
            add_dt0: false,
            cumulative_dt: false,
        })
    }

    /// Attaches auxiliary series; the first `num_lagged` of them are
    /// embedded with E lags like x, the rest contribute a single
    /// present-time column each.
    pub fn with_extras(
        mut self,
        extras: Vec<Vec<f64>>,
        num_lagged: usize,
    ) -> Result<Self, EdmError> {
        if num_lagged > extras.len() {
            return Err(EdmError::invalid_input(format!(
                "num_lagged {} exceeds number of extras {}",
                num_lagged,
                extras.len()
            )));
        }
        for (z, extra) in extras.iter().enumerate() {
            if extra.len() != self.x.len() {
                return Err(EdmError::invalid_input(format!(
                    "extras[{z}] length {} must equal x length {}",
                    extra.len(),
                    self.x.len()
                )));
            }
        }
        self.extras = extras;
        self.num_extras_lagged = num_lagged;
        Ok(self)
    }

    /// Enables the time-delta block. `dt_weight` must be positive; `add_dt0`
    /// widens the block to E columns, `cumulative` switches the columns to
    /// running sums of the pairwise deltas.
    pub fn with_dt(
        mut self,
        t: Vec<f64>,
        dt_weight: f64,
        add_dt0: bool,
        cumulative: bool,
    ) -> Result<Self, EdmError> {
        if t.len() != self.x.len() {
            return Err(EdmError::invalid_input(format!(
                "t length {} must equal x length {}",
                t.len(),
                self.x.len()
            )));
        }
        if !dt_weight.is_finite() || dt_weight <= 0.0 {
            return Err(EdmError::invalid_input(format!(
                "dt_weight must be finite and > 0; got {dt_weight}"
            )));
        }
        self.t = Some(t);
        self.dt_weight = dt_weight;
        self.use_dt = true;
        self.add_dt0 = add_dt0;
        self.cumulative_dt = cumulative;
        Ok(self)
    }

    /// Attaches panel labels; lag windows never cross a label change.
    pub fn with_panel_ids(mut self, panel_ids: Vec<i64>) -> Result<Self, EdmError> {
        if panel_ids.len() != self.x.len() {
            return Err(EdmError::invalid_input(format!(
                "panel id length {} must equal x length {}",
                panel_ids.len(),
                self.x.len()
            )));
        }
        self.panel_ids = Some(panel_ids);
        Ok(self)
    }

    /// Attaches the secondary primary series used by coprediction.
    pub fn with_coprediction(mut self, co_x: Vec<f64>) -> Result<Self, EdmError> {
        if co_x.len() != self.x.len() {
            return Err(EdmError::invalid_input(format!(
                "co_x length {} must equal x length {}",
                co_x.len(),
                self.x.len()
            )));
        }
        self.co_x = Some(co_x);
        Ok(self)
    }

    /// Substitutes the missing sentinel hosts whose data collides with the
    /// default should use.
    pub fn with_missing_sentinel(mut self, missing: f64) -> Self {
        self.missing = missing;
        self
    }

    /// Number of raw input rows.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn missing(&self) -> f64 {
        self.missing
    }

    pub fn tau(&self) -> usize {
        self.tau
    }

    pub fn num_extras(&self) -> usize {
        self.extras.len()
    }

    pub fn num_extras_lagged(&self) -> usize {
        self.num_extras_lagged
    }

    pub fn has_coprediction_data(&self) -> bool {
        self.co_x.is_some()
    }

    /// Width of the time-delta block for embedding dimension `e`.
    pub fn e_dt(&self, e: usize) -> usize {
        if self.use_dt {
            e - 1 + usize::from(self.add_dt0)
        } else {
            0
        }
    }

    /// Width of the extras block for embedding dimension `e`.
    pub fn e_extras(&self, e: usize) -> usize {
        self.extras.len() + self.num_extras_lagged * (e - 1)
    }

    /// Total manifold width for embedding dimension `e`.
    pub fn e_actual(&self, e: usize) -> usize {
        e + self.e_dt(e) + self.e_extras(e)
    }

    /// Lag value of `series` at retained index `i`, offset `lag`.
    fn lagged(&self, series: &[f64], i: usize, lag: usize) -> f64 {
        let offset = lag * self.tau;
        if offset > i {
            return self.missing;
        }
        let j = i - offset;
        if let Some(ids) = &self.panel_ids
            && ids[j] != ids[i]
        {
            return self.missing;
        }
        let value = series[j];
        if value == self.missing { self.missing } else { value }
    }

    /// Pairwise time delta `t[i - l*tau] - t[i - (l+1)*tau]`, unweighted.
    fn find_dt(&self, i: usize, l: usize) -> f64 {
        let Some(t) = &self.t else {
            return self.missing;
        };

        let near_offset = l * self.tau;
        let far_offset = (l + 1) * self.tau;
        if far_offset > i {
            return self.missing;
        }
        let a = i - near_offset;
        let b = i - far_offset;

        if let Some(ids) = &self.panel_ids
            && (ids[a] != ids[i] || ids[b] != ids[i])
        {
            return self.missing;
        }

        let ta = t[a];
        let tb = t[b];
        if ta == self.missing || tb == self.missing {
            return self.missing;
        }
        ta - tb
    }

    /// Materialises the manifold selected by `row_filter`.
    ///
    /// `copredict` substitutes the coprediction series into the lag block
    /// only; `prediction` is a bookkeeping tag carried on the result.
    /// Panics when the filter length differs from the input length, when
    /// `e` is zero, or when coprediction is requested without data.
    pub fn create_manifold(
        &self,
        e: usize,
        row_filter: &[bool],
        copredict: bool,
        prediction: bool,
    ) -> Manifold {
        assert!(e >= 1, "create_manifold requires e >= 1; got {e}");
        assert!(
            row_filter.len() == self.x.len(),
            "row filter length {} must equal input length {}",
            row_filter.len(),
            self.x.len()
        );

        let primary: &[f64] = if copredict {
            self.co_x
                .as_deref()
                .expect("coprediction requested but no co_x series was attached")
        } else {
            &self.x
        };

        let e_dt = self.e_dt(e);
        let e_extras = self.e_extras(e);
        let e_actual = self.e_actual(e);
        let nobs = row_filter.iter().filter(|&&b| b).count();

        let mut flat = Vec::with_capacity(nobs * e_actual);
        let mut y = Vec::with_capacity(nobs);
        let mut panels = self.panel_ids.as_ref().map(|_| Vec::with_capacity(nobs));

        for (i, &keep) in row_filter.iter().enumerate() {
            if !keep {
                continue;
            }

            for l in 0..e {
                flat.push(self.lagged(primary, i, l));
            }

            if e_dt > 0 {
                let mut running = 0.0;
                let mut poisoned = false;
                for l in 0..e_dt {
                    let delta = self.find_dt(i, l);
                    if poisoned || delta == self.missing {
                        poisoned = true;
                        flat.push(self.missing);
                        continue;
                    }
                    if self.cumulative_dt {
                        running += delta;
                        flat.push(self.dt_weight * running);
                    } else {
                        flat.push(self.dt_weight * delta);
                    }
                }
            }

            for extra in self.extras.iter().take(self.num_extras_lagged) {
                for l in 0..e {
                    flat.push(self.lagged(extra, i, l));
                }
            }
            for extra in self.extras.iter().skip(self.num_extras_lagged) {
                flat.push(self.lagged(extra, i, 0));
            }

            y.push(self.y[i]);
            if let (Some(out), Some(ids)) = (panels.as_mut(), self.panel_ids.as_ref()) {
                out.push(ids[i]);
            }
        }

        debug_assert_eq!(flat.len(), nobs * e_actual);

        Manifold::from_parts(
            flat,
            y,
            panels,
            e,
            e_dt,
            self.num_extras_lagged * e,
            e_extras,
            self.missing,
            prediction,
        )
    }
}
