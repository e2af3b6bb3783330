// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projected window contours and their repair passes.
//!
//! After quadrification every opening is a rectangular hole. The passes
//! here swap the true polygonal contours back in and clip the tiled
//! result against the real outline of the wall face.

use crate::bool2d::{self, ExPolygon};
use crate::error::Error;
use crate::mesh::PolyMesh;
use crate::quadrify::BoundingBox;
use log::error;
use nalgebra::{Point2, Point3};

/// One opening after projection into the face's unit square.
///
/// An empty contour is flagged invalid but keeps its slot so positional
/// indices into the contour list stay stable.
#[derive(Debug, Clone)]
pub struct ProjectedContour {
    pub contour: Vec<Point2<f64>>,
    pub bb: BoundingBox,
}

impl ProjectedContour {
    pub fn new(contour: Vec<Point2<f64>>, bb: BoundingBox) -> Self {
        Self { contour, bb }
    }

    #[inline]
    pub fn is_invalid(&self) -> bool {
        self.contour.is_empty()
    }

    pub fn flag_invalid(&mut self) {
        self.contour.clear();
    }
}

/// Pull a contour out of a boolean-engine polygon, with sanity clamping
/// into the unit square and optional duplicate filtering.
pub fn extract_contour(poly: &[Point2<f64>], filter_duplicates: bool) -> Vec<Point2<f64>> {
    let mut out: Vec<Point2<f64>> = Vec::with_capacity(poly.len());
    for p in poly {
        let v = Point2::new(p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0));
        if !filter_duplicates || !bool2d::is_duplicate_vertex(&v, &out) {
            out.push(v);
        }
    }
    out
}

/// Scrub micro self-intersections out of every window contour.
///
/// Each contour is unioned with itself so the fill rule resolves the
/// knots the fixed/float hops can tie into it. A contour that dissolves
/// into zero pieces is flagged invalid; one that splits into several
/// pieces keeps its largest piece under protest.
pub fn cleanup_window_contours(contours: &mut [ProjectedContour]) {
    for window in contours.iter_mut() {
        if window.is_invalid() {
            continue;
        }
        let cleaned = bool2d::union(std::slice::from_ref(&window.contour));
        match cleaned.len() {
            0 => {
                error!("error during polygon clipping, window contour is degenerate");
                window.flag_invalid();
            }
            1 => {
                window.contour = extract_contour(&cleaned[0].outer, false);
            }
            _ => {
                error!("error during polygon clipping, window contour is not convex");
                window.contour = extract_contour(&cleaned[0].outer, false);
            }
        }
        // The bounding box is assumed not to change here
    }
}

/// Replace the rectangular quadrify holes with the true window contours.
///
/// Walks each contour looking for vertices on the bounding-box boundary;
/// between two consecutive hits the interjacent contour vertices become a
/// gap-filling face, with a synthesized corner vertex when the hit moves
/// to another box edge. Emitted faces are reversed so the hole winds
/// opposite to the surrounding quads.
pub fn insert_window_contours(contours: &[ProjectedContour], curmesh: &mut PolyMesh) {
    for window in contours {
        let contour = &window.contour;
        let bb = &window.bb;
        if contour.is_empty() {
            continue;
        }

        let diag = bb.diagonal();
        let epsilon = diag / 1000.0;

        // Many windows fit their rectangular hole perfectly; nothing to do
        // when the contour is its own bounding box.
        if contour.len() == 4 {
            let corners = [
                bb.min,
                bb.max,
                Point2::new(bb.min.x, bb.max.y),
                Point2::new(bb.max.x, bb.min.y),
            ];
            let all_corners_present = corners.iter().all(|c| {
                contour
                    .iter()
                    .any(|v| (v.x - c.x).abs() < epsilon && (v.y - c.y).abs() < epsilon)
            });
            if all_corners_present {
                continue;
            }
        }

        let size = contour.len();
        let mut last_hit: Option<usize> = None;
        let mut very_first_hit: Option<usize> = None;
        let mut edge = Point2::new(0.0, 0.0);

        let mut n = 0usize;
        let mut e = 0usize;
        loop {
            if e == size * 2 {
                error!("encountered unexpected topology while generating window contour");
                break;
            }

            let v = &contour[n];

            let mut hit = false;
            if (v.x - bb.min.x).abs() < epsilon {
                edge.x = bb.min.x;
                hit = true;
            } else if (v.x - bb.max.x).abs() < epsilon {
                edge.x = bb.max.x;
                hit = true;
            }
            if (v.y - bb.min.y).abs() < epsilon {
                edge.y = bb.min.y;
                hit = true;
            } else if (v.y - bb.max.y).abs() < epsilon {
                edge.y = bb.max.y;
                hit = true;
            }

            if hit {
                if let Some(last) = last_hit {
                    let cnt = if last > n { size - (last - n) } else { n - last };

                    let old = curmesh.verts.len();
                    let mut a = last;
                    for _ in 0..=cnt {
                        // Skip outliers: once the contour is back in float
                        // space, consumed precision can make it
                        // self-intersecting, and the stray vertices sit far
                        // away from the current box edge.
                        if (contour[a] - edge).norm_squared() <= diag * diag * 0.7 {
                            curmesh
                                .verts
                                .push(Point3::new(contour[a].x, contour[a].y, 0.0));
                        }
                        a = (a + 1) % size;
                    }

                    if edge != contour[last] {
                        let mut corner = edge;

                        if (contour[last].x - bb.min.x).abs() < epsilon {
                            corner.x = bb.min.x;
                        } else if (contour[last].x - bb.max.x).abs() < epsilon {
                            corner.x = bb.max.x;
                        }

                        if (contour[last].y - bb.min.y).abs() < epsilon {
                            corner.y = bb.min.y;
                        } else if (contour[last].y - bb.max.y).abs() < epsilon {
                            corner.y = bb.max.y;
                        }

                        curmesh.verts.push(Point3::new(corner.x, corner.y, 0.0));
                    } else if cnt == 1 {
                        // A bare line or point, drop it
                        curmesh.verts.truncate(old);
                    }

                    let d = curmesh.verts.len() - old;
                    if d > 0 {
                        curmesh.face_sizes.push(d as u32);
                        curmesh.verts[old..].reverse();
                    }
                    if Some(n) == very_first_hit {
                        break;
                    }
                } else {
                    very_first_hit = Some(n);
                }

                last_hit = Some(n);
            }

            n = (n + 1) % size;
            e += 1;
        }
    }
}

/// Clip the quadrified face against the real outline of the surface.
///
/// The quadrify output always spans the whole unit square; anything
/// outside the projected face contour has to go. Faces are clipped one
/// by one: a single combined boolean would merge adjacent quads back
/// together and undo the subdivision.
pub fn cleanup_outer_contour(contour_flat: &[Point2<f64>], curmesh: &mut PolyMesh) {
    let mut vold: Vec<Point3<f64>> = Vec::with_capacity(curmesh.verts.len());
    let mut iold: Vec<u32> = Vec::with_capacity(curmesh.face_sizes.len());

    let clip = vec![contour_flat.to_vec()];

    for face in curmesh.faces() {
        // Contour reconstruction can leave line- and point-degenerate
        // faces behind; they end here.
        if face.len() < 3 {
            continue;
        }
        let subject: Vec<Point2<f64>> = face.iter().map(|v| Point2::new(v.x, v.y)).collect();

        let clipped: Vec<ExPolygon> = match bool2d::intersection(&[subject], &clip) {
            Ok(c) => c,
            Err(Error::BooleanEngine(msg)) => {
                error!(
                    "error during polygon clipping, wall contour line may be wrong: {}",
                    msg
                );
                return;
            }
            Err(e) => {
                error!("error during polygon clipping: {}", e);
                return;
            }
        };

        for ex in &clipped {
            iold.push(ex.outer.len() as u32);
            vold.extend(ex.outer.iter().map(|p| Point3::new(p.x, p.y, 0.0)));
        }
    }

    curmesh.verts = vold;
    curmesh.face_sizes = iold;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn rect_contour(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    #[test]
    fn test_perfect_fit_contour_adds_nothing() {
        let contour = rect_contour(0.2, 0.2, 0.8, 0.8);
        let bb = BoundingBox::of_contour(&contour);
        let windows = vec![ProjectedContour::new(contour, bb)];

        let mut mesh = PolyMesh::new();
        insert_window_contours(&windows, &mut mesh);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_beveled_window_fills_the_gaps() {
        // A window with a chamfered top: the bb hole is rectangular, so
        // the two triangles between contour and box must be generated.
        let contour = vec![
            Point2::new(0.2, 0.2),
            Point2::new(0.8, 0.2),
            Point2::new(0.8, 0.6),
            Point2::new(0.5, 0.8),
            Point2::new(0.2, 0.6),
        ];
        let bb = BoundingBox::of_contour(&contour);
        let windows = vec![ProjectedContour::new(contour, bb)];

        let mut mesh = PolyMesh::new();
        insert_window_contours(&windows, &mut mesh);

        assert!(!mesh.is_empty());
        assert!(mesh.is_well_formed());
        for face in mesh.faces() {
            assert!(face.len() >= 3);
        }
        // The top-right chamfer triangle must be among the emitted faces
        let has_chamfer = mesh.faces().any(|f| {
            f.iter()
                .any(|v| (v.x - 0.5).abs() < 1e-9 && (v.y - 0.8).abs() < 1e-9)
                && f.iter()
                    .any(|v| (v.x - 0.8).abs() < 1e-9 && (v.y - 0.8).abs() < 1e-9)
        });
        assert!(has_chamfer);
    }

    #[test]
    fn test_invalid_contour_is_skipped() {
        let bb = BoundingBox::of_contour(&rect_contour(0.1, 0.1, 0.4, 0.4));
        let windows = vec![ProjectedContour::new(Vec::new(), bb)];
        let mut mesh = PolyMesh::new();
        insert_window_contours(&windows, &mut mesh);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_cleanup_flags_degenerate_contour() {
        let mut windows = vec![ProjectedContour::new(
            vec![Point2::new(0.5, 0.5), Point2::new(0.5, 0.5)],
            BoundingBox::new(Point2::new(0.5, 0.5), Point2::new(0.5, 0.5)),
        )];
        cleanup_window_contours(&mut windows);
        assert!(windows[0].is_invalid());
    }

    #[test]
    fn test_cleanup_keeps_simple_contour() {
        let contour = rect_contour(0.2, 0.2, 0.8, 0.8);
        let bb = BoundingBox::of_contour(&contour);
        let mut windows = vec![ProjectedContour::new(contour, bb)];
        cleanup_window_contours(&mut windows);
        assert!(!windows[0].is_invalid());
        assert_eq!(windows[0].contour.len(), 4);
    }

    #[test]
    fn test_outer_clip_trims_overhanging_quads() {
        // Two quads tiling the unit square, clipped against a face whose
        // real outline only spans x in [0, 0.5]
        let mut mesh = PolyMesh::new();
        mesh.push_face(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.25, 1.0, 0.0),
            Point3::new(0.25, 0.0, 0.0),
        ]);
        mesh.push_face(&[
            Point3::new(0.25, 0.0, 0.0),
            Point3::new(0.25, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ]);

        let outline = rect_contour(0.0, 0.0, 0.5, 1.0);
        cleanup_outer_contour(&outline, &mut mesh);

        assert!(mesh.is_well_formed());
        assert_eq!(mesh.face_count(), 2);
        for v in &mesh.verts {
            assert!(v.x <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn test_outer_clip_drops_disjoint_quads() {
        let mut mesh = PolyMesh::new();
        mesh.push_face(&[
            Point3::new(0.6, 0.0, 0.0),
            Point3::new(0.6, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ]);
        let outline = rect_contour(0.0, 0.0, 0.5, 1.0);
        cleanup_outer_contour(&outline, &mut mesh);
        assert_eq!(mesh.face_count(), 0);
    }
}
