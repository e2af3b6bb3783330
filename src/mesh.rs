// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon-soup mesh used throughout the synthesis pipeline.
//!
//! Faces are stored as an ordered vertex sequence plus a parallel list of
//! per-face vertex counts. The sum of `face_sizes` always equals
//! `verts.len()`, and no count is zero.

use nalgebra::{Matrix4, Point3, Vector3};

/// Append-only polygon soup.
///
/// This is the working representation for every procedurally generated
/// solid: faces may have any vertex count and carry no connectivity.
/// Triangulation and deduplication are downstream concerns.
#[derive(Debug, Clone, Default)]
pub struct PolyMesh {
    /// Vertex positions, face after face
    pub verts: Vec<Point3<f64>>,
    /// Number of vertices of each face
    pub face_sizes: Vec<u32>,
}

impl PolyMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            verts: Vec::new(),
            face_sizes: Vec::new(),
        }
    }

    /// Create a mesh with reserved capacity
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            verts: Vec::with_capacity(vertex_count),
            face_sizes: Vec::with_capacity(face_count),
        }
    }

    /// Append a single face given its vertex loop
    pub fn push_face(&mut self, face: &[Point3<f64>]) {
        self.verts.extend_from_slice(face);
        self.face_sizes.push(face.len() as u32);
    }

    /// Append all faces of another mesh
    pub fn append(&mut self, other: &PolyMesh) {
        self.verts.extend_from_slice(&other.verts);
        self.face_sizes.extend_from_slice(&other.face_sizes);
    }

    /// Remove all faces
    #[inline]
    pub fn clear(&mut self) {
        self.verts.clear();
        self.face_sizes.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.face_sizes.is_empty()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_sizes.len()
    }

    /// Iterate over the faces as vertex slices
    pub fn faces(&self) -> impl Iterator<Item = &[Point3<f64>]> {
        let mut offset = 0usize;
        self.face_sizes.iter().map(move |&n| {
            let slice = &self.verts[offset..offset + n as usize];
            offset += n as usize;
            slice
        })
    }

    /// Average of all vertex positions
    pub fn center(&self) -> Point3<f64> {
        if self.verts.is_empty() {
            return Point3::origin();
        }
        let mut sum = Vector3::zeros();
        for v in &self.verts {
            sum += v.coords;
        }
        Point3::from(sum / self.verts.len() as f64)
    }

    /// Compute the Newell normal of every face.
    ///
    /// Unnormalized, the length of each normal is twice the face area,
    /// which callers use to filter degenerate polygons.
    pub fn polygon_normals(&self, normalize: bool) -> Vec<Vector3<f64>> {
        self.faces()
            .map(|face| newell_normal(face, normalize))
            .collect()
    }

    /// Newell normal of the most recently appended face
    pub fn last_polygon_normal(&self, normalize: bool) -> Vector3<f64> {
        match self.face_sizes.last() {
            Some(&n) => {
                let start = self.verts.len() - n as usize;
                newell_normal(&self.verts[start..], normalize)
            }
            None => Vector3::zeros(),
        }
    }

    /// Transform all vertices in place
    pub fn transform(&mut self, m: &Matrix4<f64>) {
        for v in &mut self.verts {
            *v = m.transform_point(v);
        }
    }

    /// Checks the structural invariant: face sizes sum to the vertex count
    /// and no face is empty.
    pub fn is_well_formed(&self) -> bool {
        self.face_sizes.iter().map(|&n| n as usize).sum::<usize>() == self.verts.len()
            && !self.face_sizes.contains(&0)
    }
}

/// Newell normal of one vertex loop
pub fn newell_normal(face: &[Point3<f64>], normalize: bool) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for i in 0..face.len() {
        let a = &face[i];
        let b = &face[(i + 1) % face.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    if normalize {
        n.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mesh() {
        let mesh = PolyMesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.face_count(), 0);
        assert!(mesh.is_well_formed());
    }

    #[test]
    fn test_push_and_iterate_faces() {
        let mut mesh = PolyMesh::new();
        mesh.push_face(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ]);
        mesh.push_face(&[
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ]);

        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 7);
        assert!(mesh.is_well_formed());

        let sizes: Vec<usize> = mesh.faces().map(|f| f.len()).collect();
        assert_eq!(sizes, vec![3, 4]);
    }

    #[test]
    fn test_append() {
        let mut a = PolyMesh::new();
        a.push_face(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        let b = a.clone();
        a.append(&b);
        assert_eq!(a.face_count(), 2);
        assert_eq!(a.vertex_count(), 6);
    }

    #[test]
    fn test_newell_normal_unit_square() {
        let face = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let n = newell_normal(&face, false);
        // Length is twice the area of the unit square
        assert!((n.norm() - 2.0).abs() < 1e-12);
        assert!(n.z > 0.0);

        let nn = newell_normal(&face, true);
        assert!((nn.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_normal() {
        let face = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let n = newell_normal(&face, false);
        assert!(n.norm() < 1e-12);
    }

    #[test]
    fn test_center() {
        let mut mesh = PolyMesh::new();
        mesh.push_face(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]);
        let c = mesh.center();
        assert!((c.x - 1.0).abs() < 1e-12);
        assert!((c.y - 1.0).abs() < 1e-12);
    }
}
