use bevy::prelude::*;

use super::{validate_horizontal_normal, validate_vertical_normal, VoxelStencil};
use crate::Voxel;

/// A single triangle. The corners are stored relative to the triangle's bounding box, so the stencil
/// can be moved around by its bounds center like every other stencil.
#[derive(Debug, Clone)]
pub struct TriangleStencil {
    fill_type: u32,
    center: Vec2,
    shift: Vec2,
    extents: Vec2,
    offsets: [Vec2; 3],
    positions: [Vec2; 3],
    normals: [Vec2; 3],
}

impl TriangleStencil {
    /// A triangle with the given corners in map space, initially centered where those corners lie.
    /// Either winding works, edge normals always point out of the triangle.
    pub fn new(p0: Vec2, p1: Vec2, p2: Vec2, fill_type: u32) -> Self {
        let min = p0.min(p1).min(p2);
        let max = p0.max(p1).max(p2);
        let points = [p0, p1, p2];

        let clockwise = (p1 - p0).perp_dot(p2 - p0) < 0.;
        let normals = [0, 1, 2].map(|k| {
            let edge = (points[(k + 1) % 3] - points[k]).normalize_or_zero();
            if clockwise {
                edge.perp()
            } else {
                -edge.perp()
            }
        });

        let mut stencil = Self {
            fill_type,
            center: Vec2::ZERO,
            shift: min,
            extents: (max - min) / 2.,
            offsets: points.map(|p| p - min),
            positions: points,
            normals,
        };
        stencil.set_center(stencil.shifted_bounds_center());
        stencil
    }

    /// The center of the triangle's bounds in map space, the position that stamps the triangle
    /// exactly onto the corners it was created with
    pub fn shifted_bounds_center(&self) -> Vec2 {
        self.shift + self.extents
    }

    /// The corners at the current center
    pub fn positions(&self) -> [Vec2; 3] {
        self.positions
    }

    /// Outward normal of each edge, edge `k` runs from corner `k` to corner `k + 1`
    pub fn normals(&self) -> [Vec2; 3] {
        self.normals
    }

    /// Change the fill type
    pub fn set_fill_type(&mut self, fill_type: u32) {
        self.fill_type = fill_type;
    }

    /// Whether `p` lies inside or on the border of the triangle at its current center
    pub fn contains(&self, p: Vec2) -> bool {
        is_point_on_triangle(p, self.positions[0], self.positions[1], self.positions[2])
    }

    /// The first edge hit by the segment from `start` to `end`, with its outward normal
    fn find_intersection(&self, start: Vec2, end: Vec2) -> Option<(Vec2, Vec2)> {
        (0..3).find_map(|k| {
            segment_intersection(start, end, self.positions[k], self.positions[(k + 1) % 3])
                .map(|point| (point, self.normals[k]))
        })
    }

    /// Edge normals point out of the filled side towards `other`
    fn normal(&self, normal: Vec2, other: &Voxel) -> Vec2 {
        if self.fill_type > other.state {
            normal
        } else {
            -normal
        }
    }
}

impl VoxelStencil for TriangleStencil {
    fn fill_type(&self) -> u32 {
        self.fill_type
    }

    fn center(&self) -> Vec2 {
        self.center
    }

    /// Move the bounds to `center` and place the corners inside them
    fn set_center(&mut self, center: Vec2) {
        self.center = center;

        let start = Vec2::new(self.x_start(), self.y_start());
        let end = Vec2::new(self.x_end(), self.y_end());
        for (position, offset) in self.positions.iter_mut().zip(self.offsets) {
            *position = (start + offset).clamp(start, end);
        }
    }

    fn x_start(&self) -> f32 {
        self.center.x - self.extents.x
    }

    fn x_end(&self) -> f32 {
        self.center.x + self.extents.x
    }

    fn y_start(&self) -> f32 {
        self.center.y - self.extents.y
    }

    fn y_end(&self) -> f32 {
        self.center.y + self.extents.y
    }

    fn apply_voxel(&self, voxel: &mut Voxel) {
        if self.contains(voxel.position) {
            voxel.state = self.fill_type;
        }
    }

    fn find_horizontal_crossing(&self, x_min: &mut Voxel, x_max: &Voxel) {
        let end = Vec2::new(x_max.position.x, x_min.position.y);
        let Some((point, normal)) = self.find_intersection(x_min.position, end) else {
            return;
        };

        let x = point.x;
        if x_min.state == self.fill_type {
            if !x_min.has_x_crossing() || x_min.x_edge < x {
                x_min.x_edge = x;
                x_min.x_normal = self.normal(normal, x_max);
            } else {
                validate_horizontal_normal(x_min, x_max);
            }
        } else if x_max.state == self.fill_type {
            if !x_min.has_x_crossing() || x_min.x_edge > x {
                let other = *x_min;
                x_min.x_edge = x;
                x_min.x_normal = self.normal(normal, &other);
            } else {
                validate_horizontal_normal(x_min, x_max);
            }
        }
    }

    fn find_vertical_crossing(&self, y_min: &mut Voxel, y_max: &Voxel) {
        let end = Vec2::new(y_min.position.x, y_max.position.y);
        let Some((point, normal)) = self.find_intersection(y_min.position, end) else {
            return;
        };

        let y = point.y;
        if y_min.state == self.fill_type {
            if !y_min.has_y_crossing() || y_min.y_edge < y {
                y_min.y_edge = y;
                y_min.y_normal = self.normal(normal, y_max);
            } else {
                validate_vertical_normal(y_min, y_max);
            }
        } else if y_max.state == self.fill_type {
            if !y_min.has_y_crossing() || y_min.y_edge > y {
                let other = *y_min;
                y_min.y_edge = y;
                y_min.y_normal = self.normal(normal, &other);
            } else {
                validate_vertical_normal(y_min, y_max);
            }
        }
    }
}

/// Barycentric sign test, points on the border count as inside
pub fn is_point_on_triangle(p: Vec2, t0: Vec2, t1: Vec2, t2: Vec2) -> bool {
    let dx = p.x - t2.x;
    let dy = p.y - t2.y;
    let dx21 = t2.x - t1.x;
    let dy12 = t1.y - t2.y;
    let d = dy12 * (t0.x - t2.x) + dx21 * (t0.y - t2.y);
    let s = dy12 * dx + dx21 * dy;
    let t = (t2.y - t0.y) * dx + (t0.x - t2.x) * dy;

    if d < 0. {
        s <= 0. && t <= 0. && s + t >= d
    } else {
        s >= 0. && t >= 0. && s + t <= d
    }
}

/// Intersection point of the segments `a_start..a_end` and `b_start..b_end`, endpoints included
pub fn segment_intersection(
    a_start: Vec2,
    a_end: Vec2,
    b_start: Vec2,
    b_end: Vec2,
) -> Option<Vec2> {
    let va = a_end - a_start;
    let vb = b_end - b_start;
    let denominator = -vb.x * va.y + va.x * vb.y;
    if denominator == 0. {
        return None;
    }

    let delta = a_start - b_start;
    let s = (-va.y * delta.x + va.x * delta.y) / denominator;
    let t = (vb.x * delta.y - vb.y * delta.x) / denominator;

    ((0. ..=1.).contains(&s) && (0. ..=1.).contains(&t)).then(|| a_start + va * t)
}

#[cfg(test)]
fn voxel_at(x: f32, y: f32, state: u32) -> Voxel {
    Voxel {
        state,
        position: Vec2::new(x, y),
        ..default()
    }
}

#[test]
fn point_on_triangle_includes_borders() {
    let (a, b, c) = (Vec2::ZERO, Vec2::new(4., 0.), Vec2::new(0., 4.));
    assert!(is_point_on_triangle(Vec2::new(1., 1.), a, b, c));
    assert!(is_point_on_triangle(Vec2::new(2., 2.), a, b, c));
    assert!(!is_point_on_triangle(Vec2::new(2.5, 2.5), a, b, c));
    // Winding doesn't matter
    assert!(is_point_on_triangle(Vec2::new(1., 1.), a, c, b));
}

#[test]
fn segments_intersect_inside_both() {
    let hit = segment_intersection(
        Vec2::new(0., 1.),
        Vec2::new(4., 1.),
        Vec2::new(2., 0.),
        Vec2::new(2., 4.),
    );
    assert_eq!(Some(Vec2::new(2., 1.)), hit);

    let miss = segment_intersection(
        Vec2::new(0., 1.),
        Vec2::new(1., 1.),
        Vec2::new(2., 0.),
        Vec2::new(2., 4.),
    );
    assert_eq!(None, miss);

    let parallel = segment_intersection(Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE);
    assert_eq!(None, parallel);
}

#[test]
fn triangle_is_centered_on_its_bounds() {
    let stencil = TriangleStencil::new(
        Vec2::new(1., 1.),
        Vec2::new(5., 1.),
        Vec2::new(1., 3.),
        1,
    );
    assert_eq!(Vec2::new(3., 2.), stencil.shifted_bounds_center());
    assert_eq!(1., stencil.x_start());
    assert_eq!(3., stencil.y_end());
    assert_eq!(
        [Vec2::new(1., 1.), Vec2::new(5., 1.), Vec2::new(1., 3.)],
        stencil.positions()
    );
}

#[test]
fn moving_the_center_moves_the_corners() {
    let mut stencil = TriangleStencil::new(Vec2::ZERO, Vec2::new(2., 0.), Vec2::new(0., 2.), 1);
    stencil.set_center(Vec2::new(11., 6.));
    assert_eq!(
        [Vec2::new(10., 5.), Vec2::new(12., 5.), Vec2::new(10., 7.)],
        stencil.positions()
    );
}

#[test]
fn normals_point_outwards_for_both_windings() {
    let ccw = TriangleStencil::new(Vec2::ZERO, Vec2::new(2., 0.), Vec2::new(0., 2.), 1);
    let cw = TriangleStencil::new(Vec2::ZERO, Vec2::new(0., 2.), Vec2::new(2., 0.), 1);

    // Bottom edge of the counter clockwise triangle
    assert!((ccw.normals()[0] - Vec2::NEG_Y).length() < 1e-6);
    // Left edge of the clockwise triangle
    assert!((cw.normals()[0] - Vec2::NEG_X).length() < 1e-6);

    let centroid = Vec2::new(2., 2.) / 3.;
    for stencil in [ccw, cw] {
        let positions = stencil.positions();
        for k in 0..3 {
            let midpoint = (positions[k] + positions[(k + 1) % 3]) / 2.;
            assert!(stencil.normals()[k].dot(midpoint - centroid) > 0.);
        }
    }
}

#[test]
fn triangle_crossing_uses_the_hit_edge() {
    let stencil = TriangleStencil::new(Vec2::ZERO, Vec2::new(4., 0.), Vec2::new(0., 4.), 1);

    let mut voxel = voxel_at(1.5, 1.5, 1);
    stencil.set_horizontal_crossing(&mut voxel, &voxel_at(2.5, 1.5, 0));
    assert!((voxel.x_edge - 2.5).abs() < 1e-5);
    let diagonal = Vec2::ONE.normalize();
    assert!((voxel.x_normal - diagonal).length() < 1e-5);

    let mut voxel = voxel_at(1.5, -0.5, 0);
    stencil.set_vertical_crossing(&mut voxel, &voxel_at(1.5, 0.5, 1));
    assert!(voxel.y_edge.abs() < 1e-5);
    assert!((voxel.y_normal - Vec2::NEG_Y).length() < 1e-5);
}

#[test]
fn triangle_fills_covered_voxels() {
    let stencil = TriangleStencil::new(Vec2::ZERO, Vec2::new(4., 0.), Vec2::new(0., 4.), 3);
    let mut inside = voxel_at(0.5, 0.5, 0);
    let mut outside = voxel_at(3.5, 3.5, 0);
    stencil.apply_voxel(&mut inside);
    stencil.apply_voxel(&mut outside);
    assert_eq!(3, inside.state);
    assert_eq!(0, outside.state);
}
