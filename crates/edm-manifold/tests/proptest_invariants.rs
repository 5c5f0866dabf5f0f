// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use edm_core::MISSING;
use edm_manifold::ManifoldGenerator;
use proptest::prelude::*;

fn arbitrary_series(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            8 => -1000.0..1000.0f64,
            1 => Just(MISSING),
        ],
        len,
    )
}

proptest! {
    #[test]
    fn nobs_always_equals_the_filter_popcount(
        x in arbitrary_series(40),
        mask in prop::collection::vec(any::<bool>(), 40),
        e in 1usize..6,
        tau in 1usize..4,
    ) {
        let y = x.clone();
        let generator = ManifoldGenerator::new(x, y, tau).expect("generator");
        let m = generator.create_manifold(e, &mask, false, false);

        prop_assert_eq!(m.nobs(), mask.iter().filter(|&&b| b).count());
        prop_assert_eq!(m.e_actual(), generator.e_actual(e));
        prop_assert_eq!(m.e_actual(), e);
    }

    #[test]
    fn lag_columns_replay_the_strided_history(
        x in arbitrary_series(50),
        e in 1usize..6,
        tau in 1usize..4,
    ) {
        let y = x.clone();
        let generator = ManifoldGenerator::new(x.clone(), y, tau).expect("generator");
        let mask = vec![true; x.len()];
        let m = generator.create_manifold(e, &mask, false, false);

        for i in 0..x.len() {
            for l in 0..e {
                let expected = match i.checked_sub(l * tau) {
                    Some(j) => x[j],
                    None => MISSING,
                };
                prop_assert_eq!(m.get(i, l), expected, "row {} lag {}", i, l);
            }
        }
    }

    #[test]
    fn targets_stay_aligned_with_retained_rows(
        x in arbitrary_series(30),
        mask in prop::collection::vec(any::<bool>(), 30),
    ) {
        let y: Vec<f64> = (0..30).map(|i| i as f64 * 10.0).collect();
        let generator = ManifoldGenerator::new(x, y.clone(), 1).expect("generator");
        let m = generator.create_manifold(2, &mask, false, false);

        let mut r = 0usize;
        for (i, &keep) in mask.iter().enumerate() {
            if keep {
                prop_assert_eq!(m.y(r), y[i]);
                r += 1;
            }
        }
    }

    #[test]
    fn panel_windows_never_cross_a_boundary(
        x in prop::collection::vec(-100.0..100.0f64, 40),
        boundary in 1usize..39,
        e in 2usize..5,
    ) {
        let y = x.clone();
        let panel_ids: Vec<i64> = (0..40).map(|i| i64::from(i >= boundary)).collect();
        let generator = ManifoldGenerator::new(x, y, 1)
            .expect("generator")
            .with_panel_ids(panel_ids.clone())
            .expect("panels");
        let m = generator.create_manifold(e, &vec![true; 40], false, false);

        for i in 0usize..40 {
            for l in 0..e {
                if let Some(j) = i.checked_sub(l)
                    && panel_ids[j] != panel_ids[i]
                {
                    prop_assert_eq!(m.get(i, l), MISSING);
                }
            }
        }
    }
}
