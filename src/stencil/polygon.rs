use bevy::{log::warn, prelude::*};

use super::triangle::is_point_on_triangle;
use super::TriangleStencil;

/// A polygon made of triangle stencils. Each triangle is applied on its own at the position it was
/// created at, so a polygon is always stamped where its points lie.
#[derive(Debug, Clone, Default)]
pub struct PolygonStencil {
    fill_type: u32,
    triangles: Vec<TriangleStencil>,
}

impl PolygonStencil {
    /// An empty polygon
    pub fn new(fill_type: u32) -> Self {
        Self {
            fill_type,
            triangles: Vec::new(),
        }
    }

    /// Triangulate a simple polygon given by its outline. Either winding is accepted. Outlines with
    /// fewer than three points or without area give an empty polygon.
    pub fn from_points(points: &[Vec2], fill_type: u32) -> Self {
        let mut polygon = Self::new(fill_type);
        for [a, b, c] in ear_clip(points) {
            polygon.add_triangle(points[a], points[b], points[c], false);
        }
        polygon
    }

    /// The state written by every triangle
    pub fn fill_type(&self) -> u32 {
        self.fill_type
    }

    /// Change the state written by every triangle
    pub fn set_fill_type(&mut self, fill_type: u32) {
        self.fill_type = fill_type;
        for triangle in &mut self.triangles {
            triangle.set_fill_type(fill_type);
        }
    }

    /// The triangles of this polygon
    pub fn triangles(&self) -> &[TriangleStencil] {
        &self.triangles
    }

    /// Whether the polygon has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Remove every triangle
    pub fn clear(&mut self) {
        self.triangles.clear();
    }

    /// Add one triangle, `inversed` reverses its corner order
    pub fn add_triangle(&mut self, p0: Vec2, p1: Vec2, p2: Vec2, inversed: bool) {
        let triangle = if inversed {
            TriangleStencil::new(p2, p1, p0, self.fill_type)
        } else {
            TriangleStencil::new(p0, p1, p2, self.fill_type)
        };
        self.triangles.push(triangle);
    }

    /// Add an indexed triangle list. Triangles referring to missing positions are skipped.
    pub fn add_triangles(&mut self, positions: &[Vec2], indices: &[u32], inversed: bool) {
        for triangle in indices.chunks_exact(3) {
            let corners = (
                positions.get(triangle[0] as usize),
                positions.get(triangle[1] as usize),
                positions.get(triangle[2] as usize),
            );
            if let (Some(p0), Some(p1), Some(p2)) = corners {
                self.add_triangle(*p0, *p1, *p2, inversed);
            }
        }
    }
}

/// Split a simple polygon into counter clockwise triangles, given as indices into `points`
pub fn ear_clip(points: &[Vec2]) -> Vec<[usize; 3]> {
    let mut triangles = Vec::new();
    if points.len() < 3 {
        return triangles;
    }

    let area: f32 = (0..points.len())
        .map(|i| points[i].perp_dot(points[(i + 1) % points.len()]))
        .sum();
    if area == 0. {
        return triangles;
    }

    let mut remaining: Vec<usize> = (0..points.len()).collect();
    if area < 0. {
        remaining.reverse();
    }

    while remaining.len() > 3 {
        let Some(k) = (0..remaining.len()).find(|&k| is_ear(points, &remaining, k)) else {
            warn!(
                "polygon outline intersects itself, {} of {} points left unclipped",
                remaining.len(),
                points.len()
            );
            return triangles;
        };
        let m = remaining.len();
        triangles.push([remaining[(k + m - 1) % m], remaining[k], remaining[(k + 1) % m]]);
        remaining.remove(k);
    }

    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

fn is_ear(points: &[Vec2], remaining: &[usize], k: usize) -> bool {
    let m = remaining.len();
    let (i0, i1, i2) = (remaining[(k + m - 1) % m], remaining[k], remaining[(k + 1) % m]);
    let (a, b, c) = (points[i0], points[i1], points[i2]);

    if (b - a).perp_dot(c - b) <= 0. {
        return false;
    }

    !remaining
        .iter()
        .filter(|&&j| j != i0 && j != i1 && j != i2)
        .any(|&j| is_point_on_triangle(points[j], a, b, c))
}

#[cfg(test)]
fn triangle_area(points: &[Vec2], [a, b, c]: [usize; 3]) -> f32 {
    (points[b] - points[a]).perp_dot(points[c] - points[a]) / 2.
}

#[test]
fn square_gives_two_triangles() {
    let square = [
        Vec2::ZERO,
        Vec2::new(2., 0.),
        Vec2::new(2., 2.),
        Vec2::new(0., 2.),
    ];
    let triangles = ear_clip(&square);
    assert_eq!(2, triangles.len());

    let area: f32 = triangles.iter().map(|t| triangle_area(&square, *t)).sum();
    assert_eq!(4., area);
}

#[test]
fn concave_outline_keeps_its_area() {
    let outline = [
        Vec2::ZERO,
        Vec2::new(4., 0.),
        Vec2::new(4., 1.),
        Vec2::new(1., 1.),
        Vec2::new(1., 4.),
        Vec2::new(0., 4.),
    ];
    let triangles = ear_clip(&outline);
    assert_eq!(4, triangles.len());

    let area: f32 = triangles.iter().map(|t| triangle_area(&outline, *t)).sum();
    assert!((area - 7.).abs() < 1e-5);
    assert!(triangles.iter().all(|t| triangle_area(&outline, *t) > 0.));
}

#[test]
fn clockwise_outline_is_accepted() {
    let outline = [
        Vec2::ZERO,
        Vec2::new(0., 2.),
        Vec2::new(2., 2.),
        Vec2::new(2., 0.),
    ];
    let polygon = PolygonStencil::from_points(&outline, 1);
    assert_eq!(2, polygon.triangles().len());
}

#[test]
fn degenerate_outlines_are_empty() {
    assert!(PolygonStencil::from_points(&[Vec2::ZERO, Vec2::X], 1).is_empty());
    assert!(PolygonStencil::from_points(&[Vec2::ZERO, Vec2::X, Vec2::new(2., 0.)], 1).is_empty());
    assert!(PolygonStencil::from_points(&[], 1).is_empty());
}

#[test]
fn self_intersecting_outline_stops_clipping() {
    let outline = [
        Vec2::new(6., 6.),
        Vec2::ZERO,
        Vec2::new(0., 2.),
        Vec2::new(6., 1.),
        Vec2::new(5., 6.),
    ];
    // A simple pentagon gives three triangles, this one runs out of ears after the first
    assert_eq!(vec![[2, 3, 4]], ear_clip(&outline));
    assert_eq!(1, PolygonStencil::from_points(&outline, 1).triangles().len());
}

#[test]
fn indexed_triangles_skip_missing_positions() {
    let positions = [Vec2::ZERO, Vec2::X, Vec2::Y];
    let mut polygon = PolygonStencil::new(2);
    polygon.add_triangles(&positions, &[0, 1, 2, 0, 2, 7, 1], false);
    assert_eq!(1, polygon.triangles().len());

    polygon.add_triangle(Vec2::ZERO, Vec2::X, Vec2::Y, true);
    assert_eq!(
        [Vec2::Y, Vec2::X, Vec2::ZERO],
        polygon.triangles()[1].positions()
    );
}

#[test]
fn fill_type_reaches_every_triangle() {
    use super::VoxelStencil;

    let mut polygon = PolygonStencil::from_points(
        &[
            Vec2::ZERO,
            Vec2::new(2., 0.),
            Vec2::new(2., 2.),
            Vec2::new(0., 2.),
        ],
        1,
    );
    polygon.set_fill_type(3);
    assert!(polygon.triangles().iter().all(|t| t.fill_type() == 3));
}
