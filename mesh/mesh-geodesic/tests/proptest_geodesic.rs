//! Property-based tests for the triangle update rule and distance fields.
//!
//! Run with: cargo test -p mesh-geodesic -- proptest

#![allow(clippy::unwrap_used)]

use mesh_geodesic::{Contributor, DistanceField, planar_update};
use nalgebra::Vector3;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Two edge vectors from the unknown corner with a well-conditioned angle
/// between them.
fn arb_corner() -> impl Strategy<Value = (Vector3<f64>, Vector3<f64>)> {
    (0.1..5.0f64, 0.1..5.0f64, 0.0..std::f64::consts::TAU, 0.2..2.9f64).prop_map(
        |(r0, r1, heading, opening)| {
            let x0 = Vector3::new(r0 * heading.cos(), r0 * heading.sin(), 0.0);
            let x1 = Vector3::new(
                r1 * (heading + opening).cos(),
                r1 * (heading + opening).sin(),
                0.0,
            );
            (x0, x1)
        },
    )
}

/// Known distance, occasionally still infinite.
fn arb_distance() -> impl Strategy<Value = f64> {
    prop_oneof![9 => 0.0..10.0f64, 1 => Just(f64::INFINITY)]
}

// =============================================================================
// Update rule
// =============================================================================

proptest! {
    #[test]
    fn proptest_update_never_drops_below_known_corners(
        (x0, x1) in arb_corner(),
        t0 in arb_distance(),
        t1 in arb_distance(),
    ) {
        let up = planar_update(&x0, &x1, t0, t1);
        prop_assert!(up.distance >= 0.0);
        prop_assert!(up.distance >= t0.min(t1) - 1e-9);
    }

    #[test]
    fn proptest_update_never_exceeds_edge_paths(
        (x0, x1) in arb_corner(),
        t0 in arb_distance(),
        t1 in arb_distance(),
    ) {
        let up = planar_update(&x0, &x1, t0, t1);
        let edge = (t0 + x0.norm()).min(t1 + x1.norm());
        if edge.is_finite() {
            prop_assert!(up.distance <= edge + 1e-6 * (1.0 + edge));
        } else {
            prop_assert!(up.distance.is_infinite());
        }
    }

    #[test]
    fn proptest_planar_update_is_causal(
        (x0, x1) in arb_corner(),
        t0 in 0.0..10.0f64,
        t1 in 0.0..10.0f64,
    ) {
        let up = planar_update(&x0, &x1, t0, t1);
        if up.planar {
            prop_assert!(up.distance >= t0.max(t1));
            let expected = if t1 < t0 { Contributor::Second } else { Contributor::First };
            prop_assert_eq!(up.contributor, expected);
        }
    }

    #[test]
    fn proptest_one_known_corner_propagates_along_edge(
        (x0, x1) in arb_corner(),
        t0 in 0.0..10.0f64,
    ) {
        let up = planar_update(&x0, &x1, t0, f64::INFINITY);
        prop_assert!(!up.planar);
        prop_assert_eq!(up.contributor, Contributor::First);
        prop_assert!((up.distance - (t0 + x0.norm())).abs() < 1e-12);
    }
}

// =============================================================================
// Distance fields
// =============================================================================

proptest! {
    #[test]
    fn proptest_normalize_is_idempotent(
        values in prop::collection::vec(prop_oneof![4 => 0.0..100.0f64, 1 => Just(f64::INFINITY)], 1..50),
    ) {
        let once = DistanceField::from(values).normalized();
        let twice = once.normalized();
        prop_assert_eq!(&once, &twice);

        for (_, d) in once.iter_reachable() {
            prop_assert!((0.0..=1.0).contains(&d));
        }
    }
}
