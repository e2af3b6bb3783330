// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Procedural mesh synthesis for IFC building geometry.
//!
//! Turns the implicit solid descriptions a building model carries (swept
//! profiles, revolutions, disk sweeps, half-space clippings and CSG
//! differences) into explicit polygon-soup meshes. The centerpiece is
//! the opening-resolution pipeline that cuts window and door openings
//! into wall faces via planar projection, fixed-point polygon booleans
//! and a rectilinear quad subdivision.

pub mod bool2d;
pub mod contours;
pub mod convert;
pub mod error;
pub mod fixed;
pub mod halfspace;
pub mod mesh;
pub mod openings;
pub mod plane;
pub mod profile;
pub mod quadrify;
pub mod swept;
pub mod triangulation;

pub use convert::{
    process_geometric_item, process_representation_item, BooleanOperand, BooleanOperator,
    BooleanResult, ClipOperand, Conversion, FaceDef, FaceSet, GeometricItem, HalfSpaceSolid,
    PlaneSurface, Settings, SweptAreaSolid,
};
pub use error::{Error, Result};
pub use halfspace::Plane;
pub use mesh::PolyMesh;
pub use openings::{generate_openings, Opening};
pub use profile::{Curve, PolylineCurve, Profile, ProfileKind};
pub use quadrify::BoundingBox;
pub use swept::{ExtrudedAreaSolid, RevolvedAreaSolid, SweptDiskSolid};
