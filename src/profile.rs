// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Profiles and directrix curves as handed over by the object resolver.
//!
//! Profile materialization itself happens upstream; this module only
//! defines the shapes the swept-solid builders consume.

use crate::mesh::PolyMesh;
use nalgebra::Point3;

/// Whether a profile bounds an area or is a bare curve.
///
/// Only area profiles grow front and back caps when swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Area,
    Curve,
}

/// A materialized 2D profile boundary: planar vertices in the profile's
/// local coordinate frame, one polygon per face.
#[derive(Debug, Clone)]
pub struct Profile {
    pub kind: ProfileKind,
    pub mesh: PolyMesh,
}

impl Profile {
    pub fn new(kind: ProfileKind, mesh: PolyMesh) -> Self {
        Self { kind, mesh }
    }

    /// Closed area profile from a 2D vertex loop in the XY plane
    pub fn area_from_loop(points: &[[f64; 2]]) -> Self {
        let mut mesh = PolyMesh::new();
        let face: Vec<Point3<f64>> = points
            .iter()
            .map(|p| Point3::new(p[0], p[1], 0.0))
            .collect();
        mesh.push_face(&face);
        Self::new(ProfileKind::Area, mesh)
    }

    /// Open curve profile from a 3D polyline
    pub fn curve_from_points(points: &[Point3<f64>]) -> Self {
        let mut mesh = PolyMesh::new();
        mesh.push_face(points);
        Self::new(ProfileKind::Curve, mesh)
    }
}

/// A directrix curve for disk sweeps.
///
/// Implementations discretize themselves over a parameter range; the
/// sweep builder never sees the analytic form.
pub trait Curve {
    /// Number of samples the discretization will produce
    fn estimate_sample_count(&self, start: f64, end: f64) -> usize;

    /// Sample the curve over the parameter range
    fn sample_discrete(&self, start: f64, end: f64) -> Vec<Point3<f64>>;
}

/// A polyline directrix, the simplest curve a file can carry.
#[derive(Debug, Clone)]
pub struct PolylineCurve {
    pub points: Vec<Point3<f64>>,
}

impl PolylineCurve {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }
}

impl Curve for PolylineCurve {
    fn estimate_sample_count(&self, _start: f64, _end: f64) -> usize {
        self.points.len()
    }

    fn sample_discrete(&self, _start: f64, _end: f64) -> Vec<Point3<f64>> {
        self.points.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_profile_from_loop() {
        let profile = Profile::area_from_loop(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert_eq!(profile.kind, ProfileKind::Area);
        assert_eq!(profile.mesh.face_count(), 1);
        assert_eq!(profile.mesh.vertex_count(), 4);
        assert!(profile.mesh.verts.iter().all(|v| v.z == 0.0));
    }

    #[test]
    fn test_polyline_curve_sampling() {
        let curve = PolylineCurve::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ]);
        assert_eq!(curve.estimate_sample_count(0.0, 1.0), 3);
        let samples = curve.sample_discrete(0.0, 1.0);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2], Point3::new(2.0, 1.0, 0.0));
    }
}
