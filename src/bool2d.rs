// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D polygon boolean operations for the opening pipeline.
//!
//! Wraps the i_overlay engine behind union/difference/intersection with a
//! non-zero fill rule. All coordinates pass through the fixed-point grid
//! (`crate::fixed`) on the way in and out, and every contour is
//! orientation-normalized before it reaches the engine, so no other module
//! has to care about either concern.

use crate::error::{Error, Result};
use crate::fixed;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Squared distance below which two contour vertices count as duplicates
const DUPLICATE_EPSILON_SQ: f64 = 1e-5;

/// A polygon with an outer boundary and zero or more holes.
///
/// Outer contours are counter-clockwise, holes clockwise.
#[derive(Debug, Clone)]
pub struct ExPolygon {
    pub outer: Vec<Point2<f64>>,
    pub holes: Vec<Vec<Point2<f64>>>,
}

/// Union of a set of contours.
///
/// A single self-intersecting contour is resolved by the fill rule, which
/// is how micro self-intersections are scrubbed out of window contours.
/// Returns no polygons when the input is degenerate.
pub fn union(contours: &[Vec<Point2<f64>>]) -> Vec<ExPolygon> {
    let subject = to_engine_paths(contours);
    if subject.is_empty() {
        return Vec::new();
    }
    let clip: Vec<Vec<[f64; 2]>> = Vec::new();
    let shapes = subject.overlay(&clip, OverlayRule::Subject, FillRule::NonZero);
    shapes_to_expolygons(shapes)
}

/// Boolean difference `subject \ clip`
pub fn difference(
    subject: &[Vec<Point2<f64>>],
    clip: &[Vec<Point2<f64>>],
) -> Result<Vec<ExPolygon>> {
    let (subject, clip) = engine_operands(subject, clip)?;
    let shapes = subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero);
    Ok(shapes_to_expolygons(shapes))
}

/// Boolean intersection of subject and clip
pub fn intersection(
    subject: &[Vec<Point2<f64>>],
    clip: &[Vec<Point2<f64>>],
) -> Result<Vec<ExPolygon>> {
    let (subject, clip) = engine_operands(subject, clip)?;
    let shapes = subject.overlay(&clip, OverlayRule::Intersect, FillRule::NonZero);
    Ok(shapes_to_expolygons(shapes))
}

/// Union of two contours, for merging overlapping opening candidates
pub fn merge_pair(a: &[Point2<f64>], b: &[Point2<f64>]) -> Vec<ExPolygon> {
    union(&[a.to_vec(), b.to_vec()])
}

/// Signed area of a contour; positive means counter-clockwise
pub fn signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    let n = contour.len();
    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }
    area * 0.5
}

/// Contour orientation test
#[inline]
pub fn is_ccw(contour: &[Point2<f64>]) -> bool {
    signed_area(contour) >= 0.0
}

/// Reverse a contour in place if it is not counter-clockwise
pub fn ensure_ccw(contour: &mut Vec<Point2<f64>>) {
    if signed_area(contour) < 0.0 {
        contour.reverse();
    }
}

/// Reverse a contour in place if it is not clockwise
pub fn ensure_cw(contour: &mut Vec<Point2<f64>>) {
    if signed_area(contour) > 0.0 {
        contour.reverse();
    }
}

/// Check whether a vertex duplicates one already in the contour
pub fn is_duplicate_vertex(v: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    contour
        .iter()
        .any(|c| (c - v).norm_squared() < DUPLICATE_EPSILON_SQ)
}

// Convert contours into engine paths: snap onto the fixed grid, drop
// degenerate loops, normalize orientation to counter-clockwise.
fn to_engine_paths(contours: &[Vec<Point2<f64>>]) -> Vec<Vec<[f64; 2]>> {
    contours
        .iter()
        .filter(|c| c.len() >= 3)
        .map(|c| {
            let mut snapped: Vec<Point2<f64>> = c.iter().map(|p| fixed::snap(*p)).collect();
            ensure_ccw(&mut snapped);
            snapped.iter().map(|p| [p.x, p.y]).collect()
        })
        .collect()
}

fn engine_operands(
    subject: &[Vec<Point2<f64>>],
    clip: &[Vec<Point2<f64>>],
) -> Result<(Vec<Vec<[f64; 2]>>, Vec<Vec<[f64; 2]>>)> {
    let subject = to_engine_paths(subject);
    if subject.is_empty() {
        return Err(Error::BooleanEngine("subject has no usable contour".into()));
    }
    let clip = to_engine_paths(clip);
    if clip.is_empty() {
        return Err(Error::BooleanEngine("clip has no usable contour".into()));
    }
    Ok((subject, clip))
}

// The engine reports each result shape as outer contour first, holes after.
// Snap everything back onto the grid on the way out.
fn shapes_to_expolygons(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> Vec<ExPolygon> {
    let mut out = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let mut contours = shape.into_iter().map(|contour| {
            contour
                .into_iter()
                .map(|p| fixed::snap(Point2::new(p[0], p[1])))
                .collect::<Vec<_>>()
        });

        let Some(mut outer) = contours.next() else {
            continue;
        };
        if outer.len() < 3 {
            continue;
        }
        ensure_ccw(&mut outer);

        let holes = contours
            .filter(|h| h.len() >= 3)
            .map(|mut h| {
                ensure_cw(&mut h);
                h
            })
            .collect();

        out.push(ExPolygon { outer, holes });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = square(0.0, 0.0, 1.0, 1.0);
        assert!((signed_area(&ccw) - 1.0).abs() < 1e-9);
        assert!(is_ccw(&ccw));

        let cw: Vec<_> = ccw.iter().rev().cloned().collect();
        assert!((signed_area(&cw) + 1.0).abs() < 1e-9);
        assert!(!is_ccw(&cw));
    }

    #[test]
    fn test_union_of_overlapping_squares_is_one_polygon() {
        let polys = union(&[square(0.0, 0.0, 0.5, 0.5), square(0.3, 0.0, 0.8, 0.5)]);
        assert_eq!(polys.len(), 1);
        assert!(polys[0].holes.is_empty());
        // area is 0.5*0.5 + 0.5*0.5 - 0.2*0.5
        let area = signed_area(&polys[0].outer);
        assert!((area - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_union_of_disjoint_squares_stays_two() {
        let polys = union(&[square(0.0, 0.0, 0.2, 0.2), square(0.5, 0.5, 0.8, 0.8)]);
        assert_eq!(polys.len(), 2);
    }

    #[test]
    fn test_difference_produces_hole() {
        let result = difference(
            &[square(0.0, 0.0, 1.0, 1.0)],
            &[square(0.25, 0.25, 0.75, 0.75)],
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
    }

    #[test]
    fn test_difference_cutting_the_edge() {
        // Clip overlaps the right edge: the subject shrinks, no hole
        let result = difference(&[square(0.0, 0.0, 0.6, 0.6)], &[square(0.4, 0.0, 0.8, 0.6)]).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result[0].holes.is_empty());
        let area = signed_area(&result[0].outer);
        assert!((area - 0.24).abs() < 1e-6);
    }

    #[test]
    fn test_intersection() {
        let result = intersection(&[square(0.0, 0.0, 0.6, 0.6)], &[square(0.4, 0.4, 1.0, 1.0)]).unwrap();
        assert_eq!(result.len(), 1);
        let area = signed_area(&result[0].outer);
        assert!((area - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_subject_is_reported() {
        let result = difference(&[vec![Point2::new(0.0, 0.0)]], &[square(0.0, 0.0, 1.0, 1.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_union_output_is_orientation_normalized() {
        let polys = union(&[square(0.0, 0.0, 1.0, 1.0)]);
        assert_eq!(polys.len(), 1);
        assert!(is_ccw(&polys[0].outer));
    }

    #[test]
    fn test_is_duplicate_vertex() {
        let contour = square(0.0, 0.0, 1.0, 1.0);
        assert!(is_duplicate_vertex(&Point2::new(0.0, 1e-4), &contour));
        assert!(!is_duplicate_vertex(&Point2::new(0.5, 0.5), &contour));
    }
}
