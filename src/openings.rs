// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The opening-resolution pipeline.
//!
//! Cuts window and door openings into wall faces: project the face into
//! its unit square, merge overlapping opening candidates, tile the square
//! with quads around the opening boxes, swap the true contours back in,
//! clip against the real face outline and unproject. A triangulation
//! fallback covers the topologies the quad subdivision cannot express.

use crate::bool2d;
use crate::contours::{self, ProjectedContour};
use crate::mesh::PolyMesh;
use crate::plane;
use crate::quadrify::{self, BoundingBox};
use crate::triangulation;
use log::{debug, error, warn};
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Openings smaller than this in projected area are projection errors
/// from the opposite side of the wall.
const MIN_OPENING_AREA: f64 = 1e-5;

/// One opening candidate attached to a wall-like element.
///
/// The profile mesh is the opening's volumetric boundary. `wall_points`
/// is written while processing the first wall face and read on the
/// second, which is how the two projected contours of the same opening
/// find each other again.
#[derive(Debug, Clone)]
pub struct Opening {
    /// Direction from the front face through the wall to the back face
    pub extrusion_dir: Vector3<f64>,
    /// Volumetric profile of the opening, possibly several polygons
    pub profile_mesh: PolyMesh,
    /// Contour points remembered from the first wall face
    pub wall_points: Vec<Point3<f64>>,
}

impl Opening {
    pub fn new(extrusion_dir: Vector3<f64>, profile_mesh: PolyMesh) -> Self {
        Self {
            extrusion_dir,
            profile_mesh,
            wall_points: Vec::new(),
        }
    }
}

/// Cut the given openings into one wall face.
///
/// `nors` carries the precomputed profile normal of every opening,
/// parallel to `openings`. The face mesh must hold exactly one polygon;
/// it is rewritten in place. Returns whether at least one opening was
/// applied.
///
/// With `check_intersection`, openings whose profile does not reach the
/// face's plane are rejected. With `generate_connection_geometry`, the
/// contour-to-opening bookkeeping is maintained and reveal faces
/// connecting the two sides of the wall are emitted on the second pass.
pub fn generate_openings(
    openings: &mut [Opening],
    nors: &[Vector3<f64>],
    curmesh: &mut PolyMesh,
    check_intersection: bool,
    generate_connection_geometry: bool,
) -> bool {
    let proj = match plane::project_onto_plane(curmesh) {
        Ok(p) => p,
        Err(e) => {
            debug!("no working plane for this face: {}", e);
            return false;
        }
    };
    let nor = proj.normal;

    let mut contours_vec: Vec<ProjectedContour> = Vec::new();
    let mut contours_to_openings: Vec<Vec<usize>> = Vec::new();

    for oi in 0..openings.len() {
        let profile = &openings[oi].profile_mesh;
        if profile.verts.len() <= 2 {
            continue;
        }

        let mut vpmin = Point2::new(f64::MAX, f64::MAX);
        let mut vpmax = Point2::new(f64::MIN, f64::MIN);
        let mut dmin = f64::MAX;
        let mut dmax = f64::MIN;
        let mut temp_contour: Vec<Point2<f64>> = Vec::new();

        // The opening meshes are real 3D solids: skip the faces pointing
        // the wrong way, and track the plane-equation d range of the rest
        // so we can test whether the solid reaches this face at all.
        let mut vi_total = 0usize;
        for &fsize in &profile.face_sizes {
            let fsize = fsize as usize;
            if fsize < 3 {
                vi_total += fsize;
                continue;
            }
            let face_nor = (profile.verts[vi_total + 2] - profile.verts[vi_total])
                .cross(&(profile.verts[vi_total + 1] - profile.verts[vi_total]))
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::zeros);

            if nor.dot(&face_nor).abs() < 0.5 {
                vi_total += fsize;
                continue;
            }

            for vi in 0..fsize {
                let x = &profile.verts[vi_total + vi];

                if check_intersection {
                    let vert_d = -x.coords.dot(&nor);
                    dmin = dmin.min(vert_d);
                    dmax = dmax.max(vert_d);
                }

                let v = proj.to_plane.transform_point(x);
                let vv = Point2::new(v.x.clamp(0.0, 1.0), v.y.clamp(0.0, 1.0));

                vpmin.x = vpmin.x.min(vv.x);
                vpmin.y = vpmin.y.min(vv.y);
                vpmax.x = vpmax.x.max(vv.x);
                vpmax.y = vpmax.y.max(vv.y);

                if !bool2d::is_duplicate_vertex(&vv, &temp_contour) {
                    temp_contour.push(vv);
                }
            }
            vi_total += fsize;
        }

        if temp_contour.len() <= 2 {
            continue;
        }

        let epsilon = (dmax - dmin).abs() * 0.01;
        if check_intersection && (proj.base_d < dmin - epsilon || proj.base_d > dmax + epsilon) {
            continue;
        }

        let mut bb = BoundingBox::new(vpmin, vpmax);
        if bb.area() < MIN_OPENING_AREA {
            warn!("skipping tiny opening, presumably a projection error");
            continue;
        }

        let mut joined_openings: Vec<usize> = vec![oi];

        // Merge against everything already accepted. A merge changes the
        // box, which may create overlaps that did not exist before, so
        // each merge restarts the scan from the beginning.
        let mut i = 0usize;
        while i < contours_vec.len() {
            let ibb = contours_vec[i].bb;
            if ibb.overlaps(&bb) {
                let other = contours_vec[i].contour.clone();

                // Subtracting the old contour from the new one may already
                // shrink the new box out of the overlap.
                if let Ok(disjunct) = bool2d::difference(&[temp_contour.clone()], &[other.clone()])
                {
                    if disjunct.len() == 1 {
                        let newbb = BoundingBox::of_contour(&disjunct[0].outer);
                        if !ibb.overlaps(&newbb) {
                            bb = newbb;
                            temp_contour = contours::extract_contour(&disjunct[0].outer, false);
                            continue;
                        }
                    }
                }

                // Otherwise merge the two overlapping contours into one.
                // Overlaps should not happen, but they do in real files.
                let merged = bool2d::merge_pair(&temp_contour, &other);
                if merged.len() > 1 {
                    return apply_openings_triangulated(
                        openings,
                        nors,
                        curmesh,
                        generate_connection_geometry,
                    );
                } else if merged.is_empty() {
                    warn!("ignoring duplicate opening");
                    temp_contour.clear();
                    break;
                } else {
                    debug!("merging overlapping openings");
                    temp_contour = contours::extract_contour(&merged[0].outer, true);
                    bb = bb.union(&ibb);

                    if generate_connection_geometry {
                        let joined = contours_to_openings.remove(i);
                        joined_openings.extend(joined);
                    }
                    contours_vec.remove(i);

                    i = 0;
                    continue;
                }
            }
            i += 1;
        }

        if !temp_contour.is_empty() {
            if generate_connection_geometry {
                contours_to_openings.push(joined_openings);
            }
            contours_vec.push(ProjectedContour::new(temp_contour, bb));
        }
    }

    // It is fine for no candidate to survive: the openings may all belong
    // to the other side of the wall or point perpendicular to this face.
    if contours_vec.is_empty() {
        return false;
    }

    curmesh.clear();

    let bbs: Vec<BoundingBox> = contours_vec.iter().map(|c| c.bb).collect();
    quadrify::quadrify(&bbs, curmesh);

    contours::cleanup_window_contours(&mut contours_vec);
    contours::insert_window_contours(&contours_vec, curmesh);
    contours::cleanup_outer_contour(&proj.contour, curmesh);

    // Undo the projection and get back to world space
    for v in &mut curmesh.verts {
        *v = proj.from_plane.transform_point(v);
    }

    if generate_connection_geometry {
        close_windows(
            &contours_vec,
            &proj.from_plane,
            &contours_to_openings,
            openings,
            curmesh,
        );
    }
    true
}

/// Generate the reveal faces connecting the two sides of a wall.
///
/// On the first wall face every opening still has empty `wall_points`,
/// so the unprojected contour is stored away. On the second face each
/// contour point pairs with its squared-distance-nearest stored point
/// and a quad per contour edge spans the wall thickness.
///
/// Merged contours pertain to several openings; the pairing assumes the
/// merge happened symmetrically on both sides of the wall.
fn close_windows(
    contours: &[ProjectedContour],
    from_plane: &Matrix4<f64>,
    contours_to_openings: &[Vec<usize>],
    openings: &mut [Opening],
    curmesh: &mut PolyMesh,
) {
    const BORDER_EPSILON: f64 = 1e-4;

    for (ci, window) in contours.iter().enumerate() {
        if window.is_invalid() {
            continue;
        }
        let refs = &contours_to_openings[ci];

        let has_other_side = refs
            .iter()
            .any(|&oi| !openings[oi].wall_points.is_empty());

        if has_other_side {
            let contour = &window.contour;
            let n = contour.len();

            let world: Vec<Point3<f64>> = contour
                .iter()
                .map(|p| plane::unproject(from_plane, p))
                .collect();

            // The closest stored point is a good heuristic for the point
            // that was really meant to be connected.
            let paired: Vec<Point3<f64>> = world
                .iter()
                .map(|w| {
                    let mut best = f64::MAX;
                    let mut bestv = *w;
                    for &oi in refs {
                        for other in &openings[oi].wall_points {
                            let sqdist = (w - other).norm_squared();
                            if sqdist < best {
                                best = sqdist;
                                bestv = *other;
                            }
                        }
                    }
                    bestv
                })
                .collect();

            let on_border = |p: &Point2<f64>| {
                p.x <= BORDER_EPSILON
                    || p.x >= 1.0 - BORDER_EPSILON
                    || p.y <= BORDER_EPSILON
                    || p.y >= 1.0 - BORDER_EPSILON
            };

            curmesh.verts.reserve(n * 4);
            curmesh.face_sizes.reserve(n);

            for k in 0..n {
                let next = (k + 1) % n;
                let a = &contour[k];
                let b = &contour[next];

                // Contour edges running along the outer boundary of the
                // projection square stay open: door thresholds and similar
                // cuts must not grow closing geometry.
                if on_border(a) && on_border(b) && ((b.x - a.x) * (b.y - a.y)).abs() < 1e-5 {
                    continue;
                }

                curmesh.push_face(&[world[k], paired[k], paired[next], world[next]]);
            }
        } else {
            for &oi in refs {
                let opening = &mut openings[oi];
                opening.wall_points.reserve(window.contour.len());
                for p in &window.contour {
                    opening.wall_points.push(plane::unproject(from_plane, p));
                }
            }
        }
    }
}

/// Fallback when the quad subdivision cannot express the face: union all
/// opening contours, subtract them from the face outline and hand the
/// result to the triangulator. On failure the face reverts to its
/// pre-opening state.
fn apply_openings_triangulated(
    openings: &[Opening],
    nors: &[Vector3<f64>],
    curmesh: &mut PolyMesh,
    generate_connection_geometry: bool,
) -> bool {
    warn!("forced to use the triangulation fallback to generate wall openings");

    let Ok((m3, _)) = plane::derive_plane_space(curmesh) else {
        return false;
    };
    let Some(minv3) = m3.try_inverse() else {
        return false;
    };
    let nor = Vector3::new(m3[(2, 0)], m3[(2, 1)], m3[(2, 2)]);

    let mut coord = -1.0;
    let mut vmin = Point2::new(f64::MAX, f64::MAX);
    let mut vmax = Point2::new(f64::MIN, f64::MIN);
    let mut contour_flat: Vec<Point2<f64>> = Vec::with_capacity(curmesh.verts.len());

    for x in &curmesh.verts {
        let vv = m3 * x.coords;
        // The z offset is shared by all face vertices, precision aside
        coord = vv.z;
        vmin.x = vmin.x.min(vv.x);
        vmin.y = vmin.y.min(vv.y);
        vmax.x = vmax.x.max(vv.x);
        vmax.y = vmax.y.max(vv.y);
        contour_flat.push(Point2::new(vv.x, vv.y));
    }

    let extent = vmax - vmin;
    if extent.x.abs() < 1e-12 || extent.y.abs() < 1e-12 {
        return false;
    }

    let mut wall_extrusion = Vector3::zeros();
    let mut do_connections = false;
    let mut first = true;

    // This path only handles openings whose profile plane is parallel to
    // the wall face.
    let mut hole_contours: Vec<Vec<Point2<f64>>> = Vec::new();
    for (t, outernor) in openings.iter().zip(nors) {
        let dot = nor.dot(outernor);
        if dot.abs() < 1.0 - 1e-6 {
            continue;
        }
        let va = &t.profile_mesh.verts;
        if va.len() <= 2 {
            continue;
        }

        let mut contour: Vec<Point2<f64>> = Vec::with_capacity(va.len());
        for xx in va {
            let vv = m3 * xx.coords;
            let vv_extr = m3 * (xx.coords + t.extrusion_dir);
            let is_extruded_side = (vv.z - coord).abs() > (vv_extr.z - coord).abs();

            if first {
                first = false;
                if dot > 0.0 {
                    do_connections = true;
                    wall_extrusion = if is_extruded_side {
                        -t.extrusion_dir
                    } else {
                        t.extrusion_dir
                    };
                }
            }

            let vv = if is_extruded_side { vv_extr } else { vv };
            contour.push(Point2::new(
                (vv.x - vmin.x) / extent.x,
                (vv.y - vmin.y) / extent.y,
            ));
        }
        hole_contours.push(contour);
    }

    let holes_union = bool2d::union(&hole_contours);
    if holes_union.is_empty() {
        return false;
    }

    // Subtract the union of all holes from the outer contour to obtain
    // the polygon to feed into the triangulator.
    let normalized_outer: Vec<Point2<f64>> = contour_flat
        .iter()
        .map(|p| {
            Point2::new((p.x - vmin.x) / extent.x, (p.y - vmin.y) / extent.y)
        })
        .collect();

    let hole_outers: Vec<Vec<Point2<f64>>> =
        holes_union.iter().map(|h| h.outer.clone()).collect();

    let clipped = match bool2d::difference(&[normalized_outer], &hole_outers) {
        Ok(c) => c,
        Err(e) => {
            error!(
                "error during polygon clipping, skipping openings for this face: {}",
                e
            );
            return false;
        }
    };

    let old_verts = std::mem::take(&mut curmesh.verts);
    let old_sizes = std::mem::take(&mut curmesh.face_sizes);

    let unproject = |p: &Point2<f64>| -> Point3<f64> {
        Point3::from(
            minv3
                * Vector3::new(
                    vmin.x + p.x * extent.x,
                    vmin.y + p.y * extent.y,
                    coord,
                ),
        )
    };

    // Close the hole sides across the wall. Done from one side of the
    // wall only, or the faces would be emitted twice.
    if generate_connection_geometry && do_connections {
        for hole in &holes_union {
            let pts: Vec<Point3<f64>> = hole.outer.iter().map(&unproject).collect();
            for i in 0..pts.len() {
                let next = (i + 1) % pts.len();
                curmesh.push_face(&[
                    pts[i],
                    pts[i] + wall_extrusion,
                    pts[next] + wall_extrusion,
                    pts[next],
                ]);
            }
        }
    }

    let mut result = false;
    for clip in &clipped {
        match triangulation::triangulate_with_holes(&clip.outer, &clip.holes) {
            Ok((points, indices)) => {
                for tri in indices.chunks(3) {
                    for &idx in tri {
                        curmesh.verts.push(unproject(&points[idx]));
                    }
                    curmesh.face_sizes.push(3);
                }
                result = true;
            }
            Err(e) => {
                error!(
                    "error during polygon triangulation, skipping some openings: {}",
                    e
                );
                continue;
            }
        }
    }

    if !result {
        // Revert, it's a shame but better than nothing
        curmesh.verts = old_verts;
        curmesh.face_sizes = old_sizes;
        error!("could not generate openings for this wall, reverting face");
    }

    result
}
