use bevy::prelude::*;

use super::{validate_horizontal_normal, validate_vertical_normal, VoxelStencil};
use crate::Voxel;

/// An axis aligned rectangle. Its size comes from the bounds it was created with, its position is
/// the center the map places it at.
#[derive(Debug, Clone)]
pub struct BoxStencil {
    fill_type: u32,
    center: Vec2,
    bounds: Rect,
    extents: Vec2,
}

impl BoxStencil {
    /// A rectangle the size of `bounds`, initially centered on the center of `bounds`
    pub fn new(bounds: Rect, fill_type: u32) -> Self {
        Self {
            fill_type,
            center: bounds.center(),
            bounds,
            extents: bounds.half_size(),
        }
    }

    /// The bounds this stencil was created from
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The center of the bounds, the position that stamps the rectangle exactly onto them
    pub fn bounds_center(&self) -> Vec2 {
        self.bounds.center()
    }

    /// Half the size of the rectangle
    pub fn extents(&self) -> Vec2 {
        self.extents
    }
}

impl VoxelStencil for BoxStencil {
    fn fill_type(&self) -> u32 {
        self.fill_type
    }

    fn center(&self) -> Vec2 {
        self.center
    }

    fn set_center(&mut self, center: Vec2) {
        self.center = center;
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

    fn find_horizontal_crossing(&self, x_min: &mut Voxel, x_max: &Voxel) {
        find_aligned_horizontal_crossing(self, x_min, x_max);
    }

    fn find_vertical_crossing(&self, y_min: &mut Voxel, y_max: &Voxel) {
        find_aligned_vertical_crossing(self, y_min, y_max);
    }
}

/// A square of side `2 * radius` around its center
#[derive(Debug, Clone)]
pub struct SquareStencil {
    fill_type: u32,
    center: Vec2,
    radius_setting: f32,
    radius: f32,
}

impl SquareStencil {
    /// A square reaching `radius` from its center in each axis direction
    pub fn new(radius: f32, fill_type: u32) -> Self {
        Self {
            fill_type,
            center: Vec2::ZERO,
            radius_setting: radius,
            radius,
        }
    }

    /// The radius in use, never below half a voxel once initialized
    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl VoxelStencil for SquareStencil {
    fn fill_type(&self) -> u32 {
        self.fill_type
    }

    fn center(&self) -> Vec2 {
        self.center
    }

    fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    fn x_start(&self) -> f32 {
        self.center.x - self.radius
    }

    fn x_end(&self) -> f32 {
        self.center.x + self.radius
    }

    fn y_start(&self) -> f32 {
        self.center.y - self.radius
    }

    fn y_end(&self) -> f32 {
        self.center.y + self.radius
    }

    fn initialize(&mut self, voxel_size: f32) {
        self.radius = self.radius_setting.max(voxel_size / 2.);
    }

    fn find_horizontal_crossing(&self, x_min: &mut Voxel, x_max: &Voxel) {
        find_aligned_horizontal_crossing(self, x_min, x_max);
    }

    fn find_vertical_crossing(&self, y_min: &mut Voxel, y_max: &Voxel) {
        find_aligned_vertical_crossing(self, y_min, y_max);
    }
}

/// The sign of an axis normal pointing out of the stencil. Erasing turns the stencil inside out.
fn outward(fill_type: u32) -> f32 {
    if fill_type > 0 {
        1.
    } else {
        -1.
    }
}

/// Crossings of a horizontal edge with the left or right side of an axis aligned rectangle. An
/// existing crossing is only replaced when the new one lies further outside the rectangle.
fn find_aligned_horizontal_crossing<S: VoxelStencil>(stencil: &S, x_min: &mut Voxel, x_max: &Voxel) {
    let y = x_min.position.y;
    if y < stencil.y_start() || y > stencil.y_end() {
        return;
    }

    let fill_type = stencil.fill_type();
    if x_min.state == fill_type {
        let x = stencil.x_end();
        if x_min.position.x <= x && x_max.position.x >= x {
            if !x_min.has_x_crossing() || x_min.x_edge < x {
                x_min.x_edge = x;
                x_min.x_normal = Vec2::new(outward(fill_type), 0.);
            } else {
                validate_horizontal_normal(x_min, x_max);
            }
        }
    } else if x_max.state == fill_type {
        let x = stencil.x_start();
        if x_min.position.x <= x && x_max.position.x >= x {
            if !x_min.has_x_crossing() || x_min.x_edge > x {
                x_min.x_edge = x;
                x_min.x_normal = Vec2::new(-outward(fill_type), 0.);
            } else {
                validate_horizontal_normal(x_min, x_max);
            }
        }
    }
}

/// Crossings of a vertical edge with the bottom or top side of an axis aligned rectangle
fn find_aligned_vertical_crossing<S: VoxelStencil>(stencil: &S, y_min: &mut Voxel, y_max: &Voxel) {
    let x = y_min.position.x;
    if x < stencil.x_start() || x > stencil.x_end() {
        return;
    }

    let fill_type = stencil.fill_type();
    if y_min.state == fill_type {
        let y = stencil.y_end();
        if y_min.position.y <= y && y_max.position.y >= y {
            if !y_min.has_y_crossing() || y_min.y_edge < y {
                y_min.y_edge = y;
                y_min.y_normal = Vec2::new(0., outward(fill_type));
            } else {
                validate_vertical_normal(y_min, y_max);
            }
        }
    } else if y_max.state == fill_type {
        let y = stencil.y_start();
        if y_min.position.y <= y && y_max.position.y >= y {
            if !y_min.has_y_crossing() || y_min.y_edge > y {
                y_min.y_edge = y;
                y_min.y_normal = Vec2::new(0., -outward(fill_type));
            } else {
                validate_vertical_normal(y_min, y_max);
            }
        }
    }
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
fn box_covers_its_bounds() {
    let stencil = BoxStencil::new(Rect::new(1., 1., 3., 2.), 2);
    assert_eq!(Vec2::new(2., 1.5), stencil.center());
    assert_eq!(Vec2::new(1., 0.5), stencil.extents());

    let mut inside = voxel_at(2.5, 1.5, 0);
    let mut outside = voxel_at(3.5, 1.5, 0);
    stencil.apply_voxel(&mut inside);
    stencil.apply_voxel(&mut outside);
    assert_eq!(2, inside.state);
    assert_eq!(0, outside.state);
}

#[test]
fn box_edges_land_on_its_sides() {
    let stencil = BoxStencil::new(Rect::new(1., 1., 3., 3.), 1);

    let mut left = voxel_at(0.5, 1.5, 0);
    stencil.set_horizontal_crossing(&mut left, &voxel_at(1.5, 1.5, 1));
    assert_eq!(1., left.x_edge);
    assert_eq!(Vec2::NEG_X, left.x_normal);

    let mut right = voxel_at(2.5, 1.5, 1);
    stencil.set_horizontal_crossing(&mut right, &voxel_at(3.5, 1.5, 0));
    assert_eq!(3., right.x_edge);
    assert_eq!(Vec2::X, right.x_normal);

    let mut top = voxel_at(1.5, 2.5, 1);
    stencil.set_vertical_crossing(&mut top, &voxel_at(1.5, 3.5, 0));
    assert_eq!(3., top.y_edge);
    assert_eq!(Vec2::Y, top.y_normal);
}

#[test]
fn rows_outside_the_box_are_untouched() {
    let stencil = BoxStencil::new(Rect::new(1., 1., 3., 3.), 1);
    let mut voxel = voxel_at(0.5, 3.5, 0);
    stencil.set_horizontal_crossing(&mut voxel, &voxel_at(1.5, 3.5, 1));
    assert!(!voxel.has_x_crossing());
}

#[test]
fn closer_crossing_is_kept() {
    let stencil = BoxStencil::new(Rect::new(1.2, 1., 3., 3.), 1);
    let mut voxel = voxel_at(0.5, 1.5, 0);
    voxel.x_edge = 1.;
    voxel.x_normal = Vec2::X;

    stencil.set_horizontal_crossing(&mut voxel, &voxel_at(1.5, 1.5, 1));
    assert_eq!(1., voxel.x_edge);
    assert_eq!(Vec2::NEG_X, voxel.x_normal);
}

#[test]
fn erasing_flips_normals() {
    let stencil = BoxStencil::new(Rect::new(1., 1., 3., 3.), 0);
    let mut voxel = voxel_at(2.5, 1.5, 0);
    stencil.set_horizontal_crossing(&mut voxel, &voxel_at(3.5, 1.5, 1));
    assert_eq!(3., voxel.x_edge);
    assert_eq!(Vec2::NEG_X, voxel.x_normal);
}

#[test]
fn square_radius_covers_at_least_one_voxel() {
    let mut stencil = SquareStencil::new(0.1, 1);
    stencil.initialize(1.);
    assert_eq!(0.5, stencil.radius());

    stencil.set_center(Vec2::new(2.5, 2.5));
    let mut voxel = voxel_at(2.5, 2.5, 0);
    stencil.apply_voxel(&mut voxel);
    assert_eq!(1, voxel.state);

    let mut stencil = SquareStencil::new(2., 1);
    stencil.initialize(1.);
    assert_eq!(2., stencil.radius());
}
