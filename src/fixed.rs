// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-point bridge between the floating-point pipeline and the 2D
//! boolean engine.
//!
//! Callers normalize their coordinates into `[0,1]` before crossing the
//! bridge, so a single scaling constant covers the whole working range
//! without overflow headroom problems in the engine. Every contour that
//! enters a boolean operation is snapped onto this grid; the snap is the
//! only place where float/integer conversion noise enters the pipeline.

use nalgebra::Point2;

/// Scaling constant between `[0,1]` floats and the integer grid.
///
/// The largest range the boolean engine can multiply without overflowing
/// 64-bit intermediates.
pub const SCALE: i64 = 1_518_500_249;

/// A 2D point on the fixed-point grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    pub x: i64,
    pub y: i64,
}

/// Scale a normalized coordinate onto the integer grid (truncating)
#[inline]
pub fn to_fixed(v: f64) -> i64 {
    (v * SCALE as f64) as i64
}

/// Map a grid coordinate back into float space
#[inline]
pub fn from_fixed(v: i64) -> f64 {
    v as f64 / SCALE as f64
}

impl FixedPoint {
    #[inline]
    pub fn from_point(p: &Point2<f64>) -> Self {
        Self {
            x: to_fixed(p.x),
            y: to_fixed(p.y),
        }
    }

    #[inline]
    pub fn to_point(self) -> Point2<f64> {
        Point2::new(from_fixed(self.x), from_fixed(self.y))
    }
}

/// Snap a point onto the fixed-point grid.
///
/// Applied to every coordinate entering or leaving the boolean engine so
/// repeated trips quantize to the same values.
#[inline]
pub fn snap(p: Point2<f64>) -> Point2<f64> {
    FixedPoint::from_point(&p).to_point()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_error_is_sub_epsilon() {
        for &v in &[0.0, 0.25, 0.5, 0.7531, 1.0] {
            let back = from_fixed(to_fixed(v));
            assert!((back - v).abs() < 1e-9, "value {} came back as {}", v, back);
        }
    }

    #[test]
    fn test_snap_is_idempotent() {
        let p = Point2::new(0.123456789, 0.987654321);
        let s1 = snap(p);
        let s2 = snap(s1);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_unit_bounds_fit_the_grid() {
        assert_eq!(to_fixed(0.0), 0);
        assert_eq!(to_fixed(1.0), SCALE);
        assert_eq!(from_fixed(SCALE), 1.0);
    }

    #[test]
    fn test_truncation_bias() {
        // Grid snapping truncates toward zero, it never rounds up.
        assert!(from_fixed(to_fixed(0.5)) <= 0.5);
    }
}
