// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests for the opening-resolution pipeline: whole walls go
//! in, pierced polygon soups come out.

use approx::assert_relative_eq;
use ifc_meshgen::openings::{generate_openings, Opening};
use ifc_meshgen::swept::{process_extruded_area_solid, ExtrudedAreaSolid};
use ifc_meshgen::{PolyMesh, Profile};
use nalgebra::{Matrix4, Point3, Vector3};

fn wall_solid() -> ExtrudedAreaSolid {
    ExtrudedAreaSolid {
        profile: Profile::area_from_loop(&[[0.0, 0.0], [1.0, 0.0], [1.0, 0.1], [0.0, 0.1]]),
        direction: Vector3::new(0.0, 0.0, 1.0),
        depth: 2.0,
        position: Matrix4::identity(),
    }
}

fn window_in_front_face(x0: f64, z0: f64, x1: f64, z1: f64) -> Opening {
    let mut profile = PolyMesh::new();
    profile.push_face(&[
        Point3::new(x0, 0.0, z0),
        Point3::new(x1, 0.0, z0),
        Point3::new(x1, 0.0, z1),
        Point3::new(x0, 0.0, z1),
    ]);
    Opening::new(Vector3::new(0.0, 1.0, 0.0), profile)
}

fn face_area_sum(mesh: &PolyMesh) -> f64 {
    mesh.polygon_normals(false)
        .iter()
        .map(|n| n.norm() * 0.5)
        .sum()
}

/// All invariants every produced mesh must satisfy
fn assert_mesh_invariants(mesh: &PolyMesh) {
    assert!(mesh.is_well_formed());
    for face in mesh.faces() {
        assert!(face.len() >= 3, "face with {} vertices survived", face.len());
        for i in 0..face.len() {
            let next = (i + 1) % face.len();
            assert!(
                (face[i] - face[next]).norm() > 1e-12,
                "consecutive duplicate vertex in face"
            );
        }
    }
}

#[test]
fn wall_without_openings_is_a_plain_box() {
    let mut result = PolyMesh::new();
    process_extruded_area_solid(&wall_solid(), &mut result, None, false);

    assert_eq!(result.face_count(), 6);
    assert_mesh_invariants(&result);
    assert!(result.faces().all(|f| f.len() == 4));

    // Total surface area of the 1 x 0.1 x 2 box
    let expected = 2.0 * (1.0 * 0.1 + 1.0 * 2.0 + 0.1 * 2.0);
    assert_relative_eq!(face_area_sum(&result), expected, epsilon = 1e-9);
}

#[test]
fn wall_with_one_window() {
    let mut openings = vec![window_in_front_face(0.2, 0.4, 0.8, 1.6)];

    let mut result = PolyMesh::new();
    process_extruded_area_solid(&wall_solid(), &mut result, Some(&mut openings), true);

    // 4 border strips on the pierced side, 3 plain sides, 2 caps
    assert_eq!(result.face_count(), 9);
    assert_mesh_invariants(&result);

    // The hole is really missing from the surface area
    let expected = 2.0 * (1.0 * 0.1 + 1.0 * 2.0 + 0.1 * 2.0) - 0.6 * 1.2;
    assert!((face_area_sum(&result) - expected).abs() < 1e-3);

    // Every vertex of the pierced side stays on its plane
    for f in result.faces() {
        if f.iter().all(|v| v.y.abs() < 1e-3) {
            for v in f {
                assert!(v.y.abs() < 1e-3 * 2.0);
            }
        }
    }
}

#[test]
fn wall_with_crossing_windows_merges_them() {
    // A narrow tall slot crossed by a wide short one; neither survives
    // subtracting the other in one piece, so the pipeline merges them
    // into a single cross-shaped opening.
    let mut openings = vec![
        window_in_front_face(0.45, 0.3, 0.55, 1.7),
        window_in_front_face(0.2, 0.8, 0.8, 1.2),
    ];

    let mut result = PolyMesh::new();
    process_extruded_area_solid(&wall_solid(), &mut result, Some(&mut openings), true);

    assert_mesh_invariants(&result);

    // The merged contour feeds its points to both originating openings
    assert!(!openings[0].wall_points.is_empty());
    assert!(!openings[1].wall_points.is_empty());
    assert_eq!(openings[0].wall_points.len(), openings[1].wall_points.len());

    // A single merged hole covering the union of the two slots
    let hole = 0.1 * 1.4 + 0.6 * 0.4 - 0.1 * 0.4;
    let expected = 2.0 * (1.0 * 0.1 + 1.0 * 2.0 + 0.1 * 2.0) - hole;
    assert!((face_area_sum(&result) - expected).abs() < 1e-2);
}

#[test]
fn degenerate_opening_leaves_the_wall_untouched() {
    let mut plain = PolyMesh::new();
    process_extruded_area_solid(&wall_solid(), &mut plain, None, false);

    let mut openings = vec![window_in_front_face(0.5, 1.0, 0.5001, 1.0001)];
    let mut result = PolyMesh::new();
    process_extruded_area_solid(&wall_solid(), &mut result, Some(&mut openings), true);

    assert_eq!(result.face_count(), plain.face_count());
    assert_eq!(result.verts, plain.verts);
}

#[test]
fn projection_round_trip_preserves_the_face() {
    use ifc_meshgen::plane::project_onto_plane;

    let mut face = PolyMesh::new();
    face.push_face(&[
        Point3::new(2.0, 7.0, 1.0),
        Point3::new(5.0, 7.0, 1.0),
        Point3::new(5.0, 7.0, 4.0),
        Point3::new(2.0, 7.0, 4.0),
    ]);

    let proj = project_onto_plane(&face).unwrap();
    for v in &face.verts {
        let p = proj.to_plane.transform_point(v);
        let back = proj.from_plane.transform_point(&p);
        assert!((back - v).norm() <= 1e-6 * 5.0);
    }
}

#[test]
fn two_pass_wall_grows_reveal_geometry() {
    // Wall slab faces at y = 0 and y = 0.1, with a window punched through
    let mut front = PolyMesh::new();
    front.push_face(&[
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 2.0),
        Point3::new(0.0, 0.0, 2.0),
    ]);
    let mut back = PolyMesh::new();
    back.push_face(&[
        Point3::new(0.0, 0.1, 0.0),
        Point3::new(1.0, 0.1, 0.0),
        Point3::new(1.0, 0.1, 2.0),
        Point3::new(0.0, 0.1, 2.0),
    ]);

    let mut profile = PolyMesh::new();
    profile.push_face(&[
        Point3::new(0.3, 0.0, 0.5),
        Point3::new(0.7, 0.0, 0.5),
        Point3::new(0.7, 0.0, 1.5),
        Point3::new(0.3, 0.0, 1.5),
    ]);
    profile.push_face(&[
        Point3::new(0.3, 0.1, 0.5),
        Point3::new(0.7, 0.1, 0.5),
        Point3::new(0.7, 0.1, 1.5),
        Point3::new(0.3, 0.1, 1.5),
    ]);
    let mut openings = vec![Opening::new(Vector3::new(0.0, 0.1, 0.0), profile)];
    let nors = vec![Vector3::new(0.0, 1.0, 0.0)];

    assert!(generate_openings(&mut openings, &nors, &mut front, true, true));
    let stored = openings[0].wall_points.len();
    assert!(stored >= 4);

    assert!(generate_openings(&mut openings, &nors, &mut back, true, true));
    assert_mesh_invariants(&back);

    // Four reveal quads connect the two sides of the wall
    let reveals = back
        .faces()
        .filter(|f| {
            let ymin = f.iter().map(|v| v.y).fold(f64::MAX, f64::min);
            let ymax = f.iter().map(|v| v.y).fold(f64::MIN, f64::max);
            ymin < 1e-6 && (ymax - 0.1).abs() < 1e-6
        })
        .count();
    assert_eq!(reveals, 4);
}
