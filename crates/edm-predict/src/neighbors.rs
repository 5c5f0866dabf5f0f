// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use edm_distance::DistanceIndexPairs;

/// Selected neighbours, ordered by distance with ties broken by lower
/// library index; `dists[0]` is the base distance the predictors weight
/// against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighbors {
    pub inds: Vec<usize>,
    pub dists: Vec<f64>,
}

impl Neighbors {
    pub fn len(&self) -> usize {
        self.inds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inds.is_empty()
    }
}

/// Selects the `k` smallest valid distances.
///
/// `k <= 0` means "all valid" (`-1` is the conventional alias), as does any
/// `k` at least as large as the valid count. Selection is a linear-time
/// partial sort; the chosen prefix is then ordered by `(distance, index)`.
pub fn select_neighbors(pairs: &DistanceIndexPairs, k: isize) -> Neighbors {
    let count = pairs.len();
    if count == 0 {
        return Neighbors::default();
    }

    let mut order: Vec<(f64, usize)> = pairs
        .dists
        .iter()
        .copied()
        .zip(pairs.inds.iter().copied())
        .collect();

    let compare =
        |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));

    let keep = if k <= 0 || k as usize >= count {
        count
    } else {
        let keep = k as usize;
        order.select_nth_unstable_by(keep - 1, compare);
        keep
    };

    let selected = &mut order[..keep];
    selected.sort_unstable_by(compare);

    Neighbors {
        inds: selected.iter().map(|&(_, i)| i).collect(),
        dists: selected.iter().map(|&(d, _)| d).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::select_neighbors;
    use edm_distance::DistanceIndexPairs;

    fn pairs(entries: &[(usize, f64)]) -> DistanceIndexPairs {
        DistanceIndexPairs {
            inds: entries.iter().map(|&(i, _)| i).collect(),
            dists: entries.iter().map(|&(_, d)| d).collect(),
        }
    }

    #[test]
    fn selects_the_k_smallest_in_ascending_order() {
        let pool = pairs(&[(10, 4.0), (11, 1.0), (12, 3.0), (13, 2.0), (14, 5.0)]);
        let top = select_neighbors(&pool, 3);
        assert_eq!(top.inds, vec![11, 13, 12]);
        assert_eq!(top.dists, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn non_positive_k_takes_everything() {
        let pool = pairs(&[(3, 2.0), (1, 1.0), (2, 3.0)]);

        for k in [0isize, -1, -7] {
            let all = select_neighbors(&pool, k);
            assert_eq!(all.inds, vec![1, 3, 2]);
            assert_eq!(all.dists, vec![1.0, 2.0, 3.0]);
        }
    }

    #[test]
    fn oversized_k_clamps_to_the_valid_count() {
        let pool = pairs(&[(3, 2.0), (1, 1.0)]);
        let all = select_neighbors(&pool, 10);
        assert_eq!(all.len(), 2);
        assert_eq!(all.inds, vec![1, 3]);
    }

    #[test]
    fn ties_break_toward_the_lower_library_index() {
        let pool = pairs(&[(9, 1.0), (2, 1.0), (5, 1.0), (7, 0.5)]);
        let top = select_neighbors(&pool, 3);
        assert_eq!(top.inds, vec![7, 2, 5]);
    }

    #[test]
    fn empty_input_selects_nothing() {
        let none = select_neighbors(&DistanceIndexPairs::default(), 4);
        assert!(none.is_empty());
        assert_eq!(none.len(), 0);
    }
}
