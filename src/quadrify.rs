// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rectilinear subdivision of the unit square against opening boxes.
//!
//! Produces an axis-aligned quad tiling of `[0,1]²` in which every opening
//! bounding box becomes a hole. Precondition: the boxes are pairwise
//! disjoint (the merging pass in the opening pipeline guarantees this).

use crate::mesh::PolyMesh;
use log::warn;
use nalgebra::{Point2, Point3};

/// Axis-aligned 2D bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BoundingBox {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing the given contour, clamped to `[0,1]²`
    pub fn of_contour(contour: &[Point2<f64>]) -> Self {
        let mut min = Point2::new(f64::MAX, f64::MAX);
        let mut max = Point2::new(f64::MIN, f64::MIN);
        for p in contour {
            let x = p.x.clamp(0.0, 1.0);
            let y = p.y.clamp(0.0, 1.0);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
        }
        Self { min, max }
    }

    /// Strict overlap test; shared edges count as adjacent, not overlapping
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn area(&self) -> f64 {
        (self.max.x - self.min.x).abs() * (self.max.y - self.min.y).abs()
    }

    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }
}

/// Subdivide `[pmin,pmax]` into quads around the openings in `bbs`.
///
/// `field` holds the box indices sorted by (min.x, min.y); each recursion
/// consumes either an x or a y range, so the descent terminates.
fn quadrify_part(
    pmin: Point2<f64>,
    pmax: Point2<f64>,
    field: &[usize],
    bbs: &[BoundingBox],
    out: &mut Vec<Point2<f64>>,
) {
    if pmin.x == pmax.x || pmin.y == pmax.y {
        return;
    }

    let mut xs = 1e10;
    let mut xe = 1e10;
    let mut found = false;
    let mut start = 0usize;

    // Search along the x axis until an opening intersects the current slab
    for (pos, &bi) in field.iter().enumerate() {
        let bb = &bbs[bi];
        if bb.min.x >= pmax.x {
            break;
        }
        if bb.max.x > pmin.x && bb.max.y > pmin.y && bb.min.y < pmax.y {
            xs = bb.min.x;
            xe = bb.max.x;
            found = true;
            start = pos;
            break;
        }
    }

    if !found {
        // The whole rectangle is opaque, fill it with one quad
        out.push(pmin);
        out.push(Point2::new(pmin.x, pmax.y));
        out.push(pmax);
        out.push(Point2::new(pmax.x, pmin.y));
        return;
    }

    xs = xs.max(pmin.x);
    xe = xe.min(pmax.x);

    // Strip to the left of the first opening
    if xs - pmin.x != 0.0 {
        out.push(pmin);
        out.push(Point2::new(pmin.x, pmax.y));
        out.push(Point2::new(xs, pmax.y));
        out.push(Point2::new(xs, pmin.y));
    }

    // Walk down the y axis over all openings overlapping the [xs,xe] strip
    let mut ylast = pmin.y;
    found = false;
    for &bi in &field[start..] {
        let bb = &bbs[bi];
        if bb.min.x > xs || bb.min.y >= pmax.y {
            break;
        }
        if bb.max.y > ylast {
            found = true;
            let ys = bb.min.y.max(pmin.y);
            let ye = bb.max.y.min(pmax.y);
            if ys - ylast > 0.0 {
                quadrify_part(
                    Point2::new(xs, ylast),
                    Point2::new(xe, ys),
                    field,
                    bbs,
                    out,
                );
            }
            ylast = ye;
        }
    }
    if !found {
        out.push(Point2::new(xs, pmin.y));
        out.push(Point2::new(xs, pmax.y));
        out.push(Point2::new(xe, pmax.y));
        out.push(Point2::new(xe, pmin.y));
        return;
    }
    if ylast < pmax.y {
        quadrify_part(
            Point2::new(xs, ylast),
            Point2::new(xe, pmax.y),
            field,
            bbs,
            out,
        );
    }

    // And the rest of the x range
    if pmax.x - xe != 0.0 {
        quadrify_part(Point2::new(xe, pmin.y), pmax, field, bbs, out);
    }
}

/// Tile the unit square with quads, leaving a hole for every box.
///
/// The mesh must be empty; each group of four emitted vertices forms one
/// quad with z = 0.
pub fn quadrify(bbs: &[BoundingBox], curmesh: &mut PolyMesh) {
    debug_assert!(curmesh.is_empty());

    // Sort the openings by x then y as a preliminary to the subdivision
    let mut field: Vec<usize> = (0..bbs.len()).collect();
    field.sort_by(|&a, &b| {
        (bbs[a].min.x, bbs[a].min.y)
            .partial_cmp(&(bbs[b].min.x, bbs[b].min.y))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for w in field.windows(2) {
        if bbs[w[0]].min == bbs[w[1]].min {
            warn!("constraint failure during generation of wall openings, results may be faulty");
        }
    }

    let mut quads: Vec<Point2<f64>> = Vec::with_capacity(bbs.len() * 4);
    quadrify_part(
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 1.0),
        &field,
        bbs,
        &mut quads,
    );
    debug_assert!(quads.len() % 4 == 0);

    curmesh
        .face_sizes
        .resize(curmesh.face_sizes.len() + quads.len() / 4, 4);
    curmesh.verts.reserve(quads.len());
    for v2 in &quads {
        curmesh.verts.push(Point3::new(v2.x, v2.y, 0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    #[test]
    fn test_overlap_is_strict() {
        let a = bb(0.0, 0.0, 0.5, 0.5);
        let b = bb(0.5, 0.0, 1.0, 0.5);
        // Sharing an edge counts as adjacent, not overlapping
        assert!(!a.overlaps(&b));
        let c = bb(0.4, 0.0, 1.0, 0.5);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn test_no_openings_gives_single_quad() {
        let mut mesh = PolyMesh::new();
        quadrify(&[], &mut mesh);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_centered_opening_gives_four_border_strips() {
        let mut mesh = PolyMesh::new();
        quadrify(&[bb(0.2, 0.2, 0.8, 0.8)], &mut mesh);
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.is_well_formed());

        // No quad may overlap the opening interior
        for face in mesh.faces() {
            let cx = face.iter().map(|v| v.x).sum::<f64>() / face.len() as f64;
            let cy = face.iter().map(|v| v.y).sum::<f64>() / face.len() as f64;
            let inside = cx > 0.2 && cx < 0.8 && cy > 0.2 && cy < 0.8;
            assert!(!inside, "quad centered at ({}, {}) overlaps the hole", cx, cy);
        }

        // The tiles plus the hole cover the unit square
        let tiled: f64 = mesh
            .faces()
            .map(|f| {
                let w = (f[2].x - f[0].x).abs();
                let h = (f[2].y - f[0].y).abs();
                w * h
            })
            .sum();
        assert!((tiled + 0.36 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_disjoint_openings() {
        let mut mesh = PolyMesh::new();
        quadrify(&[bb(0.1, 0.1, 0.3, 0.4), bb(0.6, 0.5, 0.9, 0.8)], &mut mesh);
        assert!(mesh.is_well_formed());

        let tiled: f64 = mesh
            .faces()
            .map(|f| {
                let w = (f[2].x - f[0].x).abs();
                let h = (f[2].y - f[0].y).abs();
                w * h
            })
            .sum();
        let holes = 0.2 * 0.3 + 0.3 * 0.3;
        assert!((tiled + holes - 1.0).abs() < 1e-9);

        for face in mesh.faces() {
            assert_eq!(face.len(), 4);
            let cx = face.iter().map(|v| v.x).sum::<f64>() / 4.0;
            let cy = face.iter().map(|v| v.y).sum::<f64>() / 4.0;
            assert!(!(cx > 0.1 && cx < 0.3 && cy > 0.1 && cy < 0.4));
            assert!(!(cx > 0.6 && cx < 0.9 && cy > 0.5 && cy < 0.8));
        }
    }

    #[test]
    fn test_opening_touching_the_border() {
        // A door: opening reaching down to y = 0
        let mut mesh = PolyMesh::new();
        quadrify(&[bb(0.4, 0.0, 0.6, 0.7)], &mut mesh);
        assert!(mesh.is_well_formed());

        let tiled: f64 = mesh
            .faces()
            .map(|f| {
                let w = (f[2].x - f[0].x).abs();
                let h = (f[2].y - f[0].y).abs();
                w * h
            })
            .sum();
        assert!((tiled + 0.2 * 0.7 - 1.0).abs() < 1e-9);
    }
}
