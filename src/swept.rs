// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Swept solids: linear extrusion, revolution and disk sweeps.
//!
//! All three paths share a structure: sample or extrude a 2D profile into
//! side-face quads, optionally emit front/back caps, and feed each face
//! through the opening pipeline when the solid carries openings.

use crate::mesh::PolyMesh;
use crate::openings::{generate_openings, Opening};
use crate::profile::{Curve, Profile, ProfileKind};
use log::{debug, warn};
use nalgebra::{Matrix4, Point3, Rotation3, Translation3, Unit, Vector3};
use std::cmp::Ordering;
use std::f64::consts::{FRAC_PI_2, TAU};

/// A profile extruded along a direction
pub struct ExtrudedAreaSolid {
    pub profile: Profile,
    /// Extrusion direction in the solid's local frame
    pub direction: Vector3<f64>,
    pub depth: f64,
    /// Placement of the solid's local frame
    pub position: Matrix4<f64>,
}

/// A profile revolved around an axis
pub struct RevolvedAreaSolid {
    pub profile: Profile,
    pub axis: Vector3<f64>,
    pub axis_origin: Point3<f64>,
    /// Total revolution angle in radians
    pub angle: f64,
    pub position: Matrix4<f64>,
}

/// A circular disk swept along a directrix curve
pub struct SweptDiskSolid {
    pub directrix: Box<dyn Curve>,
    pub radius: f64,
    pub start_param: f64,
    pub end_param: f64,
}

/// Extrude a profile into side quads plus caps.
///
/// When `apply_openings` is given, each side face and cap runs through
/// the opening pipeline; with `spatial_sort`, openings are applied in
/// order of distance to the extrusion reference point, which keeps
/// restarts of the merge pass deterministic for real-world walls.
pub fn process_extruded_area_solid(
    solid: &ExtrudedAreaSolid,
    result: &mut PolyMesh,
    mut apply_openings: Option<&mut [Opening]>,
    spatial_sort: bool,
) {
    if solid.profile.mesh.verts.len() <= 1 {
        return;
    }

    let mut in_verts = solid.profile.mesh.verts.clone();
    let size = in_verts.len();

    let has_area = solid.profile.kind == ProfileKind::Area && size > 2;
    if solid.depth < 1e-3 {
        if has_area {
            *result = solid.profile.mesh.clone();
        }
        return;
    }

    // Transform the profile into the target coordinate space; the
    // direction only rotates.
    for v in &mut in_verts {
        *v = solid.position.transform_point(v);
    }
    let rot = solid.position.fixed_view::<3, 3>(0, 0).into_owned();
    let dir = rot * (solid.direction * solid.depth);

    let reference = in_verts[0];

    let openings_active = apply_openings.as_ref().map_or(false, |o| !o.is_empty());

    let mut nors: Vec<Vector3<f64>> = Vec::new();
    if openings_active {
        let openings = apply_openings.as_deref_mut().unwrap();

        if spatial_sort {
            // It is essential to apply the openings in spatial order: we
            // would screw up if we started with a door in between two
            // windows.
            openings.sort_by(|a, b| {
                let da = (a.profile_mesh.center() - reference).norm_squared();
                let db = (b.profile_mesh.center() - reference).norm_squared();
                da.partial_cmp(&db).unwrap_or(Ordering::Equal)
            });
        }

        nors.reserve(openings.len());
        for t in openings.iter() {
            let bounds = &t.profile_mesh.verts;
            if bounds.len() <= 2 {
                nors.push(Vector3::zeros());
                continue;
            }
            nors.push(
                (bounds[2] - bounds[0])
                    .cross(&(bounds[1] - bounds[0]))
                    .try_normalize(1e-12)
                    .unwrap_or_else(Vector3::zeros),
            );
        }
    }

    let mut temp = PolyMesh::new();
    let mut sides_with_openings = 0usize;

    for i in 0..size {
        let next = (i + 1) % size;
        let quad = [
            in_verts[i],
            in_verts[i] + dir,
            in_verts[next] + dir,
            in_verts[next],
        ];

        if openings_active {
            let openings = apply_openings.as_deref_mut().unwrap();
            temp.push_face(&quad);
            if generate_openings(openings, &nors, &mut temp, true, true) {
                sides_with_openings += 1;
            }
            result.append(&temp);
            temp.clear();
        } else {
            result.push_face(&quad);
        }
    }

    let mut sides_with_v_openings = 0usize;
    if has_area {
        for n in 0..2 {
            let offset = if n == 1 { dir } else { Vector3::zeros() };
            let cap: Vec<Point3<f64>> = (0..size).rev().map(|i| in_verts[i] + offset).collect();

            if openings_active && size > 2 {
                let openings = apply_openings.as_deref_mut().unwrap();
                temp.push_face(&cap);
                if generate_openings(openings, &nors, &mut temp, true, true) {
                    sides_with_v_openings += 1;
                }
                result.append(&temp);
                temp.clear();
            } else {
                result.push_face(&cap);
            }
        }
    }

    if openings_active
        && ((sides_with_openings > 0 && sides_with_openings < size) || sides_with_v_openings == 1)
    {
        warn!("failed to resolve all openings, some faces could not be pierced");
    }

    debug!("generate mesh procedurally by extrusion");
}

/// Revolve a profile around an axis.
///
/// The segment count scales with the swept angle; a revolution below a
/// thousandth of a radian degenerates to the profile itself, and caps
/// only appear when the revolution stays short of a full turn.
pub fn process_revolved_area_solid(solid: &RevolvedAreaSolid, result: &mut PolyMesh) {
    let meshout = &solid.profile.mesh;
    if meshout.verts.len() <= 1 {
        return;
    }
    let size = meshout.verts.len();

    let mut has_area = solid.profile.kind == ProfileKind::Area && size > 2;
    let max_angle = solid.angle;
    if max_angle.abs() < 1e-3 {
        if has_area {
            *result = meshout.clone();
        }
        return;
    }

    let cnt_segments = 2u32.max((16.0 * max_angle.abs() / FRAC_PI_2).ceil() as u32);
    let delta = max_angle / cnt_segments as f64;

    has_area = has_area && max_angle.abs() < TAU * 0.99;

    let Some(axis) = Unit::try_new(solid.axis, 1e-12) else {
        warn!("skipping revolved solid with a zero-length axis");
        return;
    };
    let rot = Translation3::from(solid.axis_origin.coords).to_homogeneous()
        * Rotation3::from_axis_angle(&axis, delta).to_homogeneous()
        * Translation3::from(-solid.axis_origin.coords).to_homogeneous();

    result
        .verts
        .reserve(size * cnt_segments as usize * 4 + if has_area { size * 2 } else { 0 });
    result
        .face_sizes
        .reserve(size * cnt_segments as usize + 2);

    let start_ring = meshout.verts.clone();
    let mut prev_ring = start_ring.clone();

    for _seg in 0..cnt_segments {
        let next_ring: Vec<Point3<f64>> =
            prev_ring.iter().map(|p| rot.transform_point(p)).collect();
        for i in 0..size {
            let next = (i + 1) % size;
            result.push_face(&[prev_ring[i], prev_ring[next], next_ring[next], next_ring[i]]);
        }
        prev_ring = next_ring;
    }

    if has_area {
        // Leave the triangulation of the caps to downstream processing,
        // for now these are two big polygons.
        let final_cap: Vec<Point3<f64>> = prev_ring.iter().rev().cloned().collect();
        result.push_face(&final_cap);
        result.push_face(&start_ring);
    }

    result.transform(&solid.position);
    debug!("generate mesh procedurally by radial extrusion");
}

/// Sweep a disk of the given radius along a directrix curve.
///
/// At each curve sample a 16-point ring is spun around the local tangent;
/// consecutive rings connect with the rotation offset that minimizes
/// twist, and quads facing the curve are flipped outward.
pub fn process_swept_disk_solid(solid: &SweptDiskSolid, result: &mut PolyMesh) {
    const CNT_SEGMENTS: usize = 16;
    let delta_angle = TAU / CNT_SEGMENTS as f64;

    let estimated = solid
        .directrix
        .estimate_sample_count(solid.start_param, solid.end_param);

    let curve_points = solid
        .directrix
        .sample_discrete(solid.start_param, solid.end_param);
    if curve_points.is_empty() {
        warn!("curve evaluation yielded no points for the disk sweep");
        return;
    }
    let samples = curve_points.len();
    if samples < 2 {
        warn!("disk sweep directrix has a single sample, nothing to sweep");
        return;
    }

    let mut points: Vec<Point3<f64>> = Vec::with_capacity(CNT_SEGMENTS * estimated.max(samples));
    result.verts.reserve(CNT_SEGMENTS * samples * 4);
    result.face_sizes.reserve((samples - 1) * CNT_SEGMENTS);

    let mut current = curve_points[0];
    let mut previous = current;
    let mut next = current;

    let mut startvec = Vector3::new(1.0, 1.0, 1.0);
    let mut last_dir = 0usize;

    // Generate the rings at the sweep positions
    for i in 0..samples {
        if i != samples - 1 {
            next = curve_points[i + 1];
        }

        // Tangent estimate reflecting the local curvature
        let d = ((current - previous) + (next - previous))
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z);

        // Pick a ring seed q with d . q = 0, preferring the axis used for
        // the previous ring so the seed varies continuously along the
        // curve.
        let mut q = Vector3::zeros();
        let mut take_any = false;
        for _ in 0..2 {
            if (last_dir == 0 || take_any) && d.x.abs() > 1e-6 {
                q.y = startvec.y;
                q.z = startvec.z;
                q.x = -(d.y * q.y + d.z * q.z) / d.x;
                last_dir = 0;
                break;
            } else if (last_dir == 1 || take_any) && d.y.abs() > 1e-6 {
                q.x = startvec.x;
                q.z = startvec.z;
                q.y = -(d.x * q.x + d.z * q.z) / d.y;
                last_dir = 1;
                break;
            } else if (last_dir == 2 && d.z.abs() > 1e-6) || take_any {
                q.y = startvec.y;
                q.x = startvec.x;
                q.z = -(d.y * q.y + d.x * q.x) / d.z;
                last_dir = 2;
                break;
            }
            take_any = true;
        }

        q *= solid.radius / q.norm();
        startvec = q;

        let rot = Rotation3::from_axis_angle(&Unit::new_normalize(d), delta_angle);
        for _seg in 0..CNT_SEGMENTS {
            points.push(current + q);
            q = rot * q;
        }

        previous = current;
        current = next;
    }

    // Connect the rings into quads
    for i in 0..samples - 1 {
        let this_start = points[i * CNT_SEGMENTS];

        // Locate the matching point on the next ring: the offset with the
        // least distance to our reference vertex avoids twist artifacts.
        let mut best_pair_offset = 0usize;
        let mut best_distance_squared = f64::MAX;
        for seg in 0..CNT_SEGMENTS {
            let p = points[(i + 1) * CNT_SEGMENTS + seg];
            let l = (p - this_start).norm_squared();
            if l < best_distance_squared {
                best_pair_offset = seg;
                best_distance_squared = l;
            }
        }

        for seg in 0..CNT_SEGMENTS {
            let mut quad = [
                points[i * CNT_SEGMENTS + seg],
                points[i * CNT_SEGMENTS + (seg + 1) % CNT_SEGMENTS],
                points[(i + 1) * CNT_SEGMENTS + (seg + 1 + best_pair_offset) % CNT_SEGMENTS],
                points[(i + 1) * CNT_SEGMENTS + (seg + best_pair_offset) % CNT_SEGMENTS],
            ];

            let a = quad[0];
            let b = quad[1];
            let d2 = quad[3];
            if (a - b).cross(&(a - d2)).dot(&(a - curve_points[i])) < 0.0 {
                quad.swap(0, 3);
                quad.swap(1, 2);
            }

            result.push_face(&quad);
        }
    }

    debug!("generate mesh procedurally by sweeping a disk along a curve");
}
