use bevy::prelude::*;

use super::{validate_horizontal_normal, validate_vertical_normal, VoxelStencil};
use crate::Voxel;

/// A circle around its center. Crossings lie exactly on the circle and carry its radial normal.
#[derive(Debug, Clone)]
pub struct CircleStencil {
    fill_type: u32,
    center: Vec2,
    radius_setting: f32,
    radius: f32,
    sqr_radius: f32,
}

impl CircleStencil {
    /// A circle of `radius`
    pub fn new(radius: f32, fill_type: u32) -> Self {
        Self {
            fill_type,
            center: Vec2::ZERO,
            radius_setting: radius,
            radius,
            sqr_radius: radius * radius,
        }
    }

    /// The radius in use, never below half a voxel once initialized
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Normal at the crossing `point`, facing from this stencil's fill towards `other`
    fn normal(&self, point: Vec2, other: &Voxel) -> Vec2 {
        if self.fill_type > other.state {
            (point - self.center).normalize_or_zero()
        } else {
            (self.center - point).normalize_or_zero()
        }
    }

    fn contains(&self, point: Vec2) -> bool {
        point.distance_squared(self.center) <= self.sqr_radius
    }
}

impl VoxelStencil for CircleStencil {
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
        self.sqr_radius = self.radius * self.radius;
    }

    fn apply_voxel(&self, voxel: &mut Voxel) {
        if self.contains(voxel.position) {
            voxel.state = self.fill_type;
        }
    }

    fn find_horizontal_crossing(&self, x_min: &mut Voxel, x_max: &Voxel) {
        let y = x_min.position.y;
        let y2 = (y - self.center.y).powi(2);

        if x_min.state == self.fill_type && self.contains(x_min.position) {
            let x = self.center.x + (self.sqr_radius - y2).sqrt();
            if !x_min.has_x_crossing() || x_min.x_edge < x {
                x_min.x_edge = x;
                x_min.x_normal = self.normal(Vec2::new(x, y), x_max);
            } else {
                validate_horizontal_normal(x_min, x_max);
            }
        } else if x_max.state == self.fill_type && self.contains(Vec2::new(x_max.position.x, y)) {
            let x = self.center.x - (self.sqr_radius - y2).sqrt();
            if !x_min.has_x_crossing() || x_min.x_edge > x {
                let other = *x_min;
                x_min.x_edge = x;
                x_min.x_normal = self.normal(Vec2::new(x, y), &other);
            } else {
                validate_horizontal_normal(x_min, x_max);
            }
        }
    }

    fn find_vertical_crossing(&self, y_min: &mut Voxel, y_max: &Voxel) {
        let x = y_min.position.x;
        let x2 = (x - self.center.x).powi(2);

        if y_min.state == self.fill_type && self.contains(y_min.position) {
            let y = self.center.y + (self.sqr_radius - x2).sqrt();
            if !y_min.has_y_crossing() || y_min.y_edge < y {
                y_min.y_edge = y;
                y_min.y_normal = self.normal(Vec2::new(x, y), y_max);
            } else {
                validate_vertical_normal(y_min, y_max);
            }
        } else if y_max.state == self.fill_type && self.contains(Vec2::new(x, y_max.position.y)) {
            let y = self.center.y - (self.sqr_radius - x2).sqrt();
            if !y_min.has_y_crossing() || y_min.y_edge > y {
                let other = *y_min;
                y_min.y_edge = y;
                y_min.y_normal = self.normal(Vec2::new(x, y), &other);
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

#[cfg(test)]
fn circle_at(center: Vec2, radius: f32, fill_type: u32) -> CircleStencil {
    let mut stencil = CircleStencil::new(radius, fill_type);
    stencil.initialize(1.);
    stencil.set_center(center);
    stencil
}

#[test]
fn circle_fills_by_distance() {
    let stencil = circle_at(Vec2::new(2., 2.), 1.5, 1);

    let mut inside = voxel_at(2.5, 2.5, 0);
    let mut corner = voxel_at(3.5, 3.5, 0);
    stencil.apply_voxel(&mut inside);
    stencil.apply_voxel(&mut corner);
    assert_eq!(1, inside.state);
    assert_eq!(0, corner.state);
}

#[test]
fn crossing_lies_on_the_circle() {
    let stencil = circle_at(Vec2::new(2., 2.), 1.5, 1);

    let mut voxel = voxel_at(2.5, 2.5, 1);
    stencil.set_horizontal_crossing(&mut voxel, &voxel_at(3.5, 2.5, 0));
    let point = voxel.x_edge_point();
    assert!((point.distance(Vec2::new(2., 2.)) - 1.5).abs() < 1e-5);
    assert!(voxel.x_normal.x > 0.);
    assert!((voxel.x_normal.length() - 1.).abs() < 1e-5);

    let mut voxel = voxel_at(2.5, 0.5, 0);
    stencil.set_vertical_crossing(&mut voxel, &voxel_at(2.5, 1.5, 1));
    let point = voxel.y_edge_point();
    assert!((point.distance(Vec2::new(2., 2.)) - 1.5).abs() < 1e-5);
    assert!(voxel.y_normal.y < 0.);
}

#[test]
fn erasing_points_normals_into_the_circle() {
    let stencil = circle_at(Vec2::new(2., 2.), 1.5, 0);

    let mut voxel = voxel_at(2.5, 2.5, 0);
    stencil.set_horizontal_crossing(&mut voxel, &voxel_at(3.5, 2.5, 1));
    assert!(voxel.has_x_crossing());
    assert!(voxel.x_normal.x < 0.);
}

#[test]
fn tiny_circle_still_fills_its_voxel() {
    let stencil = circle_at(Vec2::new(1.5, 1.5), 0.01, 1);
    assert_eq!(0.5, stencil.radius());

    let mut voxel = voxel_at(1.5, 1.5, 0);
    stencil.apply_voxel(&mut voxel);
    assert_eq!(1, voxel.state);
}
