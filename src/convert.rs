// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dispatch over the supported geometric item kinds and the conversion
//! state threaded through a whole element's processing.
//!
//! The object-graph resolver upstream turns file entities into the typed
//! records defined here; everything below is pure geometry synthesis.

use crate::halfspace::{clip_mesh_by_plane, Plane};
use crate::mesh::PolyMesh;
use crate::openings::{generate_openings, Opening};
use crate::swept::{
    process_extruded_area_solid, process_revolved_area_solid, process_swept_disk_solid,
    ExtrudedAreaSolid, RevolvedAreaSolid, SweptDiskSolid,
};
use log::{debug, error, warn};
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

/// Conversion settings affecting geometry synthesis
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// With custom triangulation the openings keep their file order;
    /// otherwise they are applied in spatial order.
    pub use_custom_triangulation: bool,
}

/// State owned by one in-flight element conversion.
///
/// Openings collected from child elements are parked here until the
/// parent wall applies them; produced meshes accumulate in `meshes` and
/// repeat items short-circuit through the cache.
#[derive(Default)]
pub struct Conversion {
    pub settings: Settings,
    /// Openings to cut into the swept solids processed next
    pub apply_openings: Option<Vec<Opening>>,
    /// When set, processed items become openings instead of geometry
    pub collect_openings: Option<Vec<Opening>>,
    /// All meshes produced so far
    pub meshes: Vec<PolyMesh>,
    cache: FxHashMap<u64, Vec<usize>>,
}

impl Conversion {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }
}

/// One face of a face set: an outer boundary loop plus inner loops
#[derive(Debug, Clone)]
pub struct FaceDef {
    pub bounds: Vec<Vec<Point3<f64>>>,
}

/// A connected set of faces
#[derive(Debug, Clone, Default)]
pub struct FaceSet {
    pub faces: Vec<FaceDef>,
}

/// The two swept-area flavors
pub enum SweptAreaSolid {
    Extruded(ExtrudedAreaSolid),
    Revolved(RevolvedAreaSolid),
}

/// A plane in point-normal form, the only supported half-space surface
#[derive(Debug, Clone, Copy)]
pub struct PlaneSurface {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

/// The infinite region on one side of an oriented surface
#[derive(Debug, Clone, Copy)]
pub struct HalfSpaceSolid {
    /// The base surface if it is planar; anything else is unsupported
    pub base_surface: Option<PlaneSurface>,
    /// Whether the solid lies on the normal side of the surface
    pub agreement: bool,
}

/// CSG operators a boolean result may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    Difference,
    Union,
    Intersection,
}

/// First operand of a boolean result
pub enum BooleanOperand {
    Boolean(Box<BooleanResult>),
    Swept(SweptAreaSolid),
}

/// Second operand of a boolean result
pub enum ClipOperand {
    HalfSpace(HalfSpaceSolid),
    Extruded(ExtrudedAreaSolid),
}

/// A CSG node combining two solids
pub struct BooleanResult {
    pub op: BooleanOperator,
    pub first: BooleanOperand,
    pub second: ClipOperand,
}

/// The geometric item kinds the synthesizer understands
pub enum GeometricItem {
    ShellModel { shells: Vec<FaceSet> },
    FaceSet(FaceSet),
    SweptAreaSolid(SweptAreaSolid),
    SweptDiskSolid(SweptDiskSolid),
    ManifoldBrep { outer: FaceSet },
    FaceBasedSurfaceModel { face_sets: Vec<FaceSet> },
    BooleanResult(BooleanResult),
    BoundingBox,
    Unknown { type_name: String },
}

/// Append a boundary loop as one mesh face.
///
/// Zero- and one-vertex loops are simply ignored; returns whether a
/// usable face was added.
pub fn process_polyloop(points: &[Point3<f64>], meshout: &mut PolyMesh) -> bool {
    meshout.verts.extend_from_slice(points);
    meshout.face_sizes.push(points.len() as u32);

    match points.len() {
        0 => {
            meshout.face_sizes.pop();
            false
        }
        1 => {
            meshout.face_sizes.pop();
            meshout.verts.pop();
            false
        }
        _ => true,
    }
}

/// Split a face with nested boundary loops into outer contour plus holes.
///
/// The outer bound is the loop with the largest Newell area unless the
/// caller names one. Every inner loop becomes a synthetic opening whose
/// extrusion direction is the outer normal, which reduces hole
/// triangulation to the quadrify pipeline on the outer contour's plane.
pub fn process_polygon_boundaries(
    result: &mut PolyMesh,
    inmesh: &PolyMesh,
    master_bounds: Option<usize>,
) {
    if inmesh.face_sizes.is_empty() {
        return;
    }
    if inmesh.face_sizes.len() == 1 {
        result.append(inmesh);
        return;
    }
    debug_assert!(!inmesh.face_sizes.contains(&0));

    let normals = inmesh.polygon_normals(false);

    let outer_index = master_bounds.unwrap_or_else(|| {
        let mut best = 0usize;
        let mut best_area = 1e-10;
        for (i, n) in normals.iter().enumerate() {
            let area = n.norm_squared();
            if area > best_area {
                best_area = area;
                best = i;
            }
        }
        best
    });
    debug_assert!(outer_index < inmesh.face_sizes.len());

    let master_normal = normals[outer_index];

    let mut fake_openings: Vec<Opening> = Vec::with_capacity(inmesh.face_sizes.len() - 1);
    let mut fake_nors: Vec<Vector3<f64>> = Vec::with_capacity(inmesh.face_sizes.len() - 1);
    let mut outer_face: Vec<Point3<f64>> = Vec::new();

    let mut offset = 0usize;
    for (fi, &fsize) in inmesh.face_sizes.iter().enumerate() {
        let fsize = fsize as usize;
        let face = &inmesh.verts[offset..offset + fsize];
        offset += fsize;

        if fi == outer_index {
            outer_face = face.to_vec();
            continue;
        }

        if normals[fi].norm_squared() < 1e-5 {
            warn!("skipping degenerate polygon while splitting nested boundaries");
            continue;
        }

        let mut profile = PolyMesh::new();
        profile.push_face(face);
        fake_openings.push(Opening::new(master_normal, profile));
        fake_nors.push(
            normals[fi]
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::zeros),
        );
    }

    let mut temp = PolyMesh::new();
    temp.push_face(&outer_face);
    generate_openings(&mut fake_openings, &fake_nors, &mut temp, false, false);
    result.append(&temp);
}

/// Assemble all faces of a connected face set
pub fn process_face_set(fset: &FaceSet, result: &mut PolyMesh) {
    for face in &fset.faces {
        let mut meshout = PolyMesh::new();
        for bound in &face.bounds {
            process_polyloop(bound, &mut meshout);
        }
        process_polygon_boundaries(result, &meshout, None);
    }
}

/// Dispatch a swept-area solid to its builder
pub fn process_swept_area_solid(swept: &SweptAreaSolid, meshout: &mut PolyMesh, conv: &mut Conversion) {
    match swept {
        SweptAreaSolid::Extruded(solid) => {
            let spatial_sort = !conv.settings.use_custom_triangulation;
            process_extruded_area_solid(
                solid,
                meshout,
                conv.apply_openings.as_deref_mut(),
                spatial_sort,
            );
        }
        SweptAreaSolid::Revolved(solid) => process_revolved_area_solid(solid, meshout),
    }
}

/// CSG difference against an extruded solid, reduced to the opening
/// pipeline.
///
/// This cannot express arbitrarily complex cases, but the first operand
/// is near-planar for the walls this shows up on.
fn process_boolean_extruded_area_solid_difference(
    solid: &ExtrudedAreaSolid,
    result: &mut PolyMesh,
    first_operand: &PolyMesh,
    _conv: &mut Conversion,
) {
    let mut meshtmp = PolyMesh::new();
    process_extruded_area_solid(solid, &mut meshtmp, None, false);

    let mut openings = vec![Opening::new(Vector3::zeros(), meshtmp)];
    let nors = vec![Vector3::x()];

    let mut temp = PolyMesh::new();
    for face in first_operand.faces() {
        temp.clear();
        temp.push_face(face);

        // The generators sometimes spit out lines and other degenerates
        // which would trip the plane derivation; the Newell length scales
        // with the polygon area, so tiny ones get filtered here.
        let normal = temp.last_polygon_normal(false);
        if normal.norm_squared() < 1e-5 {
            warn!("skipping degenerate polygon in boolean difference");
            continue;
        }

        generate_openings(&mut openings, &nors, &mut temp, true, true);
        result.append(&temp);
    }

    debug!("generating CSG geometry by geometric difference to a solid");
}

/// Resolve a boolean result node.
///
/// Only the difference operator is supported: the first operand is
/// another boolean result or a swept-area solid, the second a half-space
/// solid or an extruded solid. Everything else is reported and dropped.
pub fn process_boolean(boolean: &BooleanResult, result: &mut PolyMesh, conv: &mut Conversion) {
    if boolean.op != BooleanOperator::Difference {
        warn!("encountered unsupported boolean operator: {:?}", boolean.op);
        return;
    }

    let mut first_operand = PolyMesh::new();
    match &boolean.first {
        BooleanOperand::Boolean(inner) => process_boolean(inner, &mut first_operand, conv),
        BooleanOperand::Swept(swept) => process_swept_area_solid(swept, &mut first_operand, conv),
    }

    match &boolean.second {
        ClipOperand::HalfSpace(hs) => {
            let Some(surface) = hs.base_surface else {
                error!("expected a plane as base surface for the half-space solid");
                return;
            };
            let normal = if hs.agreement {
                surface.normal
            } else {
                -surface.normal
            };
            clip_mesh_by_plane(&first_operand, &Plane::new(surface.position, normal), result);
        }
        ClipOperand::Extruded(solid) => {
            process_boolean_extruded_area_solid_difference(solid, result, &first_operand, conv);
        }
    }
}

/// Dispatch a geometric item and register the produced mesh.
///
/// Returns whether a mesh (or collected opening) came out of the item.
/// Bounding boxes are silently skipped; unknown kinds are reported.
pub fn process_geometric_item(
    item: &GeometricItem,
    mesh_indices: &mut Vec<usize>,
    conv: &mut Conversion,
) -> bool {
    let mut meshtmp = PolyMesh::new();

    match item {
        GeometricItem::ShellModel { shells } => {
            for shell in shells {
                process_face_set(shell, &mut meshtmp);
            }
        }
        GeometricItem::FaceSet(fset) => process_face_set(fset, &mut meshtmp),
        GeometricItem::SweptAreaSolid(swept) => {
            process_swept_area_solid(swept, &mut meshtmp, conv)
        }
        GeometricItem::SweptDiskSolid(disk) => process_swept_disk_solid(disk, &mut meshtmp),
        GeometricItem::ManifoldBrep { outer } => process_face_set(outer, &mut meshtmp),
        GeometricItem::FaceBasedSurfaceModel { face_sets } => {
            for fset in face_sets {
                process_face_set(fset, &mut meshtmp);
            }
        }
        GeometricItem::BooleanResult(boolean) => process_boolean(boolean, &mut meshtmp, conv),
        GeometricItem::BoundingBox => {
            // silently skip over bounding boxes
            return false;
        }
        GeometricItem::Unknown { type_name } => {
            warn!("skipping unknown geometric item, type is {}", type_name);
            return false;
        }
    }

    // Collecting openings for a parent element: the generated mesh
    // becomes the opening's profile instead of scene geometry.
    if let Some(collector) = conv.collect_openings.as_mut() {
        collector.push(Opening::new(Vector3::zeros(), meshtmp));
        return true;
    }

    if meshtmp.is_empty() {
        return false;
    }

    mesh_indices.push(conv.meshes.len());
    conv.meshes.push(meshtmp);
    true
}

/// Cached wrapper around [`process_geometric_item`].
///
/// Representation items are routinely shared between elements; repeat
/// visits resolve to the previously produced mesh indices.
pub fn process_representation_item(
    id: u64,
    item: &GeometricItem,
    mesh_indices: &mut Vec<usize>,
    conv: &mut Conversion,
) -> bool {
    if let Some(cached) = conv.cache.get(&id) {
        mesh_indices.extend_from_slice(cached);
        return true;
    }
    if process_geometric_item(item, mesh_indices, conv) {
        if !mesh_indices.is_empty() {
            conv.cache.insert(id, mesh_indices.clone());
        }
        return true;
    }
    false
}
