// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Half-space boolean differences via per-face plane clipping.
//!
//! Each face of the first operand is clipped against the oriented plane
//! independently; geometry on the positive side survives, edges crossing
//! the plane gain their intersection point.

use crate::mesh::PolyMesh;
use log::debug;
use nalgebra::{Point3, Vector3};

/// An oriented clipping plane
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Point on the plane
    pub point: Point3<f64>,
    /// Normal vector, normalized on construction
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Signed distance from a point; positive is the kept side
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.point).dot(&self.normal)
    }
}

enum SegmentIntersect {
    No,
    LiesOnPlane,
    Yes(Point3<f64>),
}

fn intersect_segment_plane(
    p: &Point3<f64>,
    n: &Vector3<f64>,
    e0: &Point3<f64>,
    e1: &Point3<f64>,
) -> SegmentIntersect {
    let pdelta = e0 - p;
    let seg = e1 - e0;
    let dot_one = n.dot(&seg);
    let dot_two = -n.dot(&pdelta);

    if dot_one.abs() < 1e-6 {
        return if dot_two.abs() < 1e-6 {
            SegmentIntersect::LiesOnPlane
        } else {
            SegmentIntersect::No
        };
    }

    let t = dot_two / dot_one;
    if !(0.0..=1.0).contains(&t) {
        return SegmentIntersect::No;
    }
    SegmentIntersect::Yes(e0 + seg * t)
}

/// Clip every face of the first operand against the plane, appending the
/// surviving geometry to `result`.
///
/// Vertices with `(v - plane.point) · normal > 0` are kept; crossing
/// edges are cut at the plane. Consecutive near-duplicates left behind by
/// cuts running along an edge are fused, and faces reduced below a
/// triangle are dropped.
pub fn clip_mesh_by_plane(first_operand: &PolyMesh, plane: &Plane, result: &mut PolyMesh) {
    let p = plane.point;
    let n = plane.normal;

    result.verts.reserve(first_operand.verts.len());
    result.face_sizes.reserve(first_operand.face_sizes.len());

    for face in first_operand.faces() {
        let cnt = face.len();
        let start = result.verts.len();

        for i in 0..cnt {
            let e0 = face[i];
            let e1 = face[(i + 1) % cnt];

            match intersect_segment_plane(&p, &n, &e0, &e1) {
                SegmentIntersect::No | SegmentIntersect::LiesOnPlane => {
                    if (e0 - p).dot(&n) > 0.0 {
                        result.verts.push(e0);
                    }
                }
                SegmentIntersect::Yes(isectpos) => {
                    if (e0 - p).dot(&n) > 0.0 {
                        result.verts.push(e0);
                        result.verts.push(isectpos);
                    } else {
                        // e0 is on the wrong side, keep the cut point only
                        result.verts.push(isectpos);
                    }
                }
            }
        }

        if result.verts.len() == start {
            continue;
        }

        // Points landing directly on the intersection line come out as
        // near-duplicates; bitwise comparison cannot catch them, so fuse
        // within a tolerance scaled to the face size.
        let mut vmin = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut vmax = Point3::new(f64::MIN, f64::MIN, f64::MIN);
        for v in &result.verts[start..] {
            vmin.x = vmin.x.min(v.x);
            vmin.y = vmin.y.min(v.y);
            vmin.z = vmin.z.min(v.z);
            vmax.x = vmax.x.max(v.x);
            vmax.y = vmax.y.max(v.y);
            vmax.z = vmax.z.max(v.z);
        }
        let epsilon = (vmax - vmin).norm_squared() / 1e6;

        let mut fused: Vec<Point3<f64>> = Vec::with_capacity(result.verts.len() - start);
        for v in &result.verts[start..] {
            if let Some(last) = fused.last() {
                if (v - last).norm_squared() < epsilon {
                    continue;
                }
            }
            fused.push(*v);
        }
        if fused.len() > 1 {
            let first = fused[0];
            if (first - *fused.last().unwrap()).norm_squared() < epsilon {
                fused.pop();
            }
        }

        result.verts.truncate(start);
        if fused.len() > 2 {
            result.face_sizes.push(fused.len() as u32);
            result.verts.extend(fused);
        }
    }

    debug!("generating solid geometry by plane clipping");
}
