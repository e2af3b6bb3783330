// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar coordinate spaces for wall faces.
//!
//! Every face entering the opening pipeline is mapped onto its own plane
//! and rescaled into the `[0,1]` square, so the epsilons downstream are
//! scale-free constants.

use crate::error::{Error, Result};
use crate::mesh::PolyMesh;
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};

/// The composed face-to-unit-square projection and its inverse.
#[derive(Debug, Clone)]
pub struct Projection {
    /// World space to normalized plane space (`z` becomes the plane offset)
    pub to_plane: Matrix4<f64>,
    /// Normalized plane space back to world space
    pub from_plane: Matrix4<f64>,
    /// Plane normal, the third row of the derived basis
    pub normal: Vector3<f64>,
    /// Signed plane offset of the face
    pub base_d: f64,
    /// The face contour projected into `[0,1]²`
    pub contour: Vec<Point2<f64>>,
}

/// Derive an orthonormal basis placing the given polygon on the XY plane.
///
/// Anchored at the last vertex, the first ordered vertex pair spanning a
/// non-degenerate triangle with the anchor defines the plane normal and
/// the in-plane x-axis. Newell's normal would be more robust but gives no
/// aligned in-plane axis; this exploits the near-quadrilateral shape of
/// extruded wall sides.
///
/// Returns the basis as a row-major rotation plus the signed plane offset.
pub fn derive_plane_space(mesh: &PolyMesh) -> Result<(Matrix3<f64>, f64)> {
    let out = &mesh.verts;
    let s = out.len();
    debug_assert!(mesh.face_sizes.len() == 1 && mesh.face_sizes[0] as usize == s);
    if s < 3 {
        return Err(Error::DegenerateInput(
            "cannot derive a plane from fewer than 3 vertices".into(),
        ));
    }

    let anchor = out[s - 1];

    let mut found: Option<(usize, Vector3<f64>)> = None;
    'outer: for i in 0..s - 1 {
        for j in i + 1..s {
            let nor = -(out[i] - anchor).cross(&(out[j] - anchor));
            if nor.norm() > 1e-8 {
                found = Some((i, nor));
                break 'outer;
            }
        }
    }

    let Some((i, nor)) = found else {
        return Err(Error::DegenerateInput(
            "all vertex pairs are collinear with the anchor".into(),
        ));
    };

    let nor = nor.normalize();
    let r = (out[i] - anchor).normalize();
    let d = -anchor.coords.dot(&nor);

    let u = r.cross(&nor).normalize();

    let m = Matrix3::new(
        r.x, r.y, r.z, //
        u.x, u.y, u.z, //
        nor.x, nor.y, nor.z,
    );
    Ok((m, d))
}

/// Project a single-polygon mesh into its own plane and rescale to `[0,1]²`.
///
/// The returned transform carries the rescale, so `to_plane * v` has its
/// x/y in the unit square and z equal to zero for points on the plane.
pub fn project_onto_plane(mesh: &PolyMesh) -> Result<Projection> {
    let (m3, base_d) = derive_plane_space(mesh)?;
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&m3);

    let mut coord = -1.0;
    let mut vmin = Point2::new(f64::MAX, f64::MAX);
    let mut vmax = Point2::new(f64::MIN, f64::MIN);
    let mut contour = Vec::with_capacity(mesh.verts.len());

    for x in &mesh.verts {
        let vv = m3 * x.coords;
        // The z offset is shared by all vertices of a planar polygon, up
        // to the precision noise we accept here.
        coord = vv.z;
        vmin.x = vmin.x.min(vv.x);
        vmin.y = vmin.y.min(vv.y);
        vmax.x = vmax.x.max(vv.x);
        vmax.y = vmax.y.max(vv.y);
        contour.push(Point2::new(vv.x, vv.y));
    }

    let extent = vmax - vmin;
    if extent.x.abs() < 1e-12 || extent.y.abs() < 1e-12 {
        return Err(Error::DegenerateInput(
            "face projects to a zero-extent region".into(),
        ));
    }

    for vv in &mut contour {
        vv.x = ((vv.x - vmin.x) / extent.x).clamp(0.0, 1.0);
        vv.y = ((vv.y - vmin.y) / extent.y).clamp(0.0, 1.0);
    }

    // Fold the [0,1] rescale into the projection matrix
    let mut mult = Matrix4::identity();
    mult[(0, 0)] = 1.0 / extent.x;
    mult[(1, 1)] = 1.0 / extent.y;
    mult[(0, 3)] = -vmin.x * mult[(0, 0)];
    mult[(1, 3)] = -vmin.y * mult[(1, 1)];
    mult[(2, 3)] = -coord;
    m = mult * m;

    let from_plane = m.try_inverse().ok_or_else(|| {
        Error::DegenerateInput("face projection is not invertible".into())
    })?;

    Ok(Projection {
        to_plane: m,
        from_plane,
        normal: Vector3::new(m3[(2, 0)], m3[(2, 1)], m3[(2, 2)]),
        base_d,
        contour,
    })
}

/// Map a normalized plane point back into world space
#[inline]
pub fn unproject(from_plane: &Matrix4<f64>, p: &Point2<f64>) -> Point3<f64> {
    from_plane.transform_point(&Point3::new(p.x, p.y, 0.0))
}
