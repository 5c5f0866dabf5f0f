// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Train/predict mask construction from deterministic uniform draws.
//!
//! The engine owns no RNG: a driver supplies one uniform draw per usable
//! row and these functions turn the buffer into the library, cross-fold,
//! or median splits, so a run is reproducible from the buffer alone.

use crate::EdmError;

/// Paired row masks produced by a split.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitMasks {
    pub train: Vec<bool>,
    pub predict: Vec<bool>,
}

impl SplitMasks {
    pub fn train_count(&self) -> usize {
        self.train.iter().filter(|&&b| b).count()
    }

    pub fn predict_count(&self) -> usize {
        self.predict.iter().filter(|&&b| b).count()
    }
}

fn check_draws(u: &[f64], usable: &[bool]) -> Result<(), EdmError> {
    let needed = usable.iter().filter(|&&b| b).count();
    if u.len() != needed {
        return Err(EdmError::invalid_input(format!(
            "uniform buffer length mismatch: got {} draws for {needed} usable rows",
            u.len()
        )));
    }
    if let Some(bad) = u.iter().copied().find(|v| !v.is_finite()) {
        return Err(EdmError::invalid_input(format!(
            "uniform buffer must be finite; got {bad}"
        )));
    }
    Ok(())
}

/// 1-based ranks of `values`, ties resolved by original position.
pub fn rank(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut ranks = vec![0usize; values.len()];
    for (position, &idx) in order.iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}

/// Median via select-nth; even lengths average the two middle elements.
pub fn median(values: &[f64]) -> f64 {
    assert!(!values.is_empty(), "median requires at least one value");

    let mut scratch = values.to_vec();
    let mid = scratch.len() / 2;
    let total_cmp = |a: &f64, b: &f64| a.total_cmp(b);

    if scratch.len() % 2 == 1 {
        let (_, m, _) = scratch.select_nth_unstable_by(mid, total_cmp);
        *m
    } else {
        let (_, hi, _) = scratch.select_nth_unstable_by(mid, total_cmp);
        let hi = *hi;
        let (_, lo, _) = scratch.select_nth_unstable_by(mid - 1, total_cmp);
        (*lo + hi) / 2.0
    }
}

/// Cross-mapping library split: the `library` rows with the smallest draws
/// train, every usable row is predicted.
pub fn library_split(
    u: &[f64],
    usable: &[bool],
    library: usize,
) -> Result<SplitMasks, EdmError> {
    check_draws(u, usable)?;

    let cutoff = if library < u.len() {
        let mut scratch = u.to_vec();
        let (_, cut, _) = scratch.select_nth_unstable_by(library, |a, b| a.total_cmp(b));
        *cut
    } else {
        // A library at least as large as the sample takes everything.
        f64::INFINITY
    };

    let mut train = Vec::with_capacity(usable.len());
    let mut predict = Vec::with_capacity(usable.len());
    let mut obs = 0usize;
    for &keep in usable {
        if keep {
            train.push(u[obs] < cutoff);
            predict.push(true);
            obs += 1;
        } else {
            train.push(false);
            predict.push(false);
        }
    }

    Ok(SplitMasks { train, predict })
}

/// Self-prediction over the whole sample: train = predict = usable.
pub fn full_split(usable: &[bool]) -> SplitMasks {
    SplitMasks {
        train: usable.to_vec(),
        predict: usable.to_vec(),
    }
}

/// Cross-fold split: rows whose draw rank lands in fold `fold` (1-based)
/// are predicted, every other usable row trains.
pub fn crossfold_split(
    u: &[f64],
    usable: &[bool],
    folds: usize,
    fold: usize,
) -> Result<SplitMasks, EdmError> {
    check_draws(u, usable)?;

    if folds < 2 {
        return Err(EdmError::invalid_input(format!(
            "crossfold_split requires folds >= 2; got {folds}"
        )));
    }
    if fold == 0 || fold > folds {
        return Err(EdmError::invalid_input(format!(
            "crossfold_split requires 1 <= fold <= folds; got fold={fold}, folds={folds}"
        )));
    }

    let ranks = rank(u);

    let mut train = Vec::with_capacity(usable.len());
    let mut predict = Vec::with_capacity(usable.len());
    let mut obs = 0usize;
    for &keep in usable {
        if keep {
            let held_out = ranks[obs] % folds == fold - 1;
            train.push(!held_out);
            predict.push(held_out);
            obs += 1;
        } else {
            train.push(false);
            predict.push(false);
        }
    }

    Ok(SplitMasks { train, predict })
}

/// Default explore split: draws below the median train, the rest predict.
pub fn median_split(u: &[f64], usable: &[bool]) -> Result<SplitMasks, EdmError> {
    check_draws(u, usable)?;

    if u.is_empty() {
        return Err(EdmError::invalid_input(
            "median_split requires at least one usable row",
        ));
    }

    let cutoff = median(u);

    let mut train = Vec::with_capacity(usable.len());
    let mut predict = Vec::with_capacity(usable.len());
    let mut obs = 0usize;
    for &keep in usable {
        if keep {
            let below = u[obs] < cutoff;
            train.push(below);
            predict.push(!below);
            obs += 1;
        } else {
            train.push(false);
            predict.push(false);
        }
    }

    Ok(SplitMasks { train, predict })
}
