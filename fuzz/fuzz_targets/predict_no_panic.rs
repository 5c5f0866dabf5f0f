// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use edm_core::{Algorithm, DistanceKind, ExecutionContext, MISSING, Options};
use edm_manifold::ManifoldGenerator;
use edm_predict::predict;
use libfuzzer_sys::fuzz_target;

fn build_series(cursor: &mut common::ByteCursor<'_>, n: usize) -> Vec<f64> {
    (0..n)
        .map(|_| {
            let raw = cursor.next_i16();
            match cursor.next_u8() % 8 {
                0 => MISSING,
                1 => 0.0,
                _ => f64::from(raw) / 64.0,
            }
        })
        .collect()
}

fn build_mask(cursor: &mut common::ByteCursor<'_>, n: usize) -> Vec<bool> {
    (0..n).map(|_| cursor.next_u8() & 1 == 1).collect()
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let n = common::bounded(cursor.next_u8(), 4, 48);
    let x = build_series(&mut cursor, n);
    let y = build_series(&mut cursor, n);
    let tau = common::bounded(cursor.next_u8(), 1, 3);

    let Ok(generator) = ManifoldGenerator::new(x, y, tau) else {
        return;
    };
    let generator = if cursor.next_u8() & 1 == 1 {
        let ids: Vec<i64> = (0..n).map(|i| i64::from(i >= n / 2)).collect();
        match generator.with_panel_ids(ids) {
            Ok(g) => g,
            Err(_) => return,
        }
    } else {
        generator
    };

    let algorithm = if cursor.next_u8() & 1 == 0 {
        Algorithm::Simplex
    } else {
        Algorithm::SMap
    };
    let distance = match cursor.next_u8() % 3 {
        0 => DistanceKind::Euclidean,
        1 => DistanceKind::MeanAbsoluteError,
        _ => DistanceKind::Wasserstein,
    };

    let opts = Options {
        e: common::bounded(cursor.next_u8(), 1, 6),
        algorithm,
        distance,
        thetas: vec![f64::from(cursor.next_u8() % 8) / 2.0],
        k: i16::from(cursor.next_u8() % 12) as isize - 2,
        missing_distance: f64::from(cursor.next_u8() % 4),
        panel_mode: cursor.next_u8() & 1 == 1,
        idw: f64::from(cursor.next_u8() % 2) * 10.0,
        save_mode: cursor.next_u8() & 1 == 1,
        force_compute: cursor.next_u8() & 1 == 1,
        nthreads: 1,
        ..Options::default()
    };

    let train = build_mask(&mut cursor, n);
    let pred = build_mask(&mut cursor, n);

    // Malformed configurations may error, but nothing here may panic.
    let _ = predict(&opts, &generator, &train, &pred, &ExecutionContext::new());
});
