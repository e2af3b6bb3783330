//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D polygon triangulation. Serves as the
//! fallback path when the quadrify-based opening pipeline cannot handle a
//! face: an outer contour plus hole contours go in, triangles come out.

use crate::error::{Error, Result};
use nalgebra::Point2;

/// Triangulate a simple polygon (no holes)
/// Returns triangle indices into the input points
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    if points.len() < 3 {
        return Err(Error::Triangulation(
            "need at least 3 points to triangulate".to_string(),
        ));
    }

    let mut vertices = Vec::with_capacity(points.len() * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::Triangulation(format!("{:?}", e)))
}

/// Triangulate an outer contour with inner holes.
///
/// The outer contour is counter-clockwise, holes clockwise. Returns the
/// combined vertex list (outer followed by all holes) and triangle
/// indices into it. Bad input surfaces as a reported error; callers are
/// expected to leave the face unmodified in that case.
pub fn triangulate_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<(Vec<Point2<f64>>, Vec<usize>)> {
    if outer.len() < 3 {
        return Err(Error::Triangulation(
            "outer contour must have at least 3 vertices".to_string(),
        ));
    }

    let total = outer.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total * 2);
    let mut points = Vec::with_capacity(total);

    for p in outer {
        vertices.push(p.x);
        vertices.push(p.y);
        points.push(*p);
    }

    let mut hole_indices = Vec::with_capacity(holes.len());
    for hole in holes {
        hole_indices.push(vertices.len() / 2);
        for p in hole {
            vertices.push(p.x);
            vertices.push(p.y);
            points.push(*p);
        }
    }

    let indices = if hole_indices.is_empty() {
        earcutr::earcut(&vertices, &[], 2)
    } else {
        earcutr::earcut(&vertices, &hole_indices, 2)
    }
    .map_err(|e| Error::Triangulation(format!("{:?}", e)))?;

    if indices.is_empty() {
        return Err(Error::Triangulation(
            "triangulation produced no triangles".to_string(),
        ));
    }

    Ok((points, indices))
}
