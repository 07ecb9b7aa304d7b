//! Stencils are the edit brushes of the map. A stencil writes its fill type into every voxel it
//! covers and places the surface crossings on the edges leaving its shape.
//!
//! Stencils work in chunk-local coordinates: the map moves the stencil center into each touched
//! chunk before handing it over, and all ranges are computed from that local center.

mod circle;
mod polygon;
mod rect;
mod triangle;

pub use circle::CircleStencil;
pub use polygon::PolygonStencil;
pub use rect::{BoxStencil, SquareStencil};
pub use triangle::TriangleStencil;

use bevy::prelude::*;
use enum_dispatch::enum_dispatch;

use crate::Voxel;

/// An inclusive range of voxel or chunk coordinates. Either axis may be empty, with its start past
/// its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelRange {
    /// First column
    pub x_start: isize,
    /// Last column
    pub x_end: isize,
    /// First row
    pub y_start: isize,
    /// Last row
    pub y_end: isize,
}

impl VoxelRange {
    /// Whether the range holds no coordinate at all
    pub fn is_empty(&self) -> bool {
        self.x_start > self.x_end || self.y_start > self.y_end
    }

    /// Every coordinate in the range, starting at the last row and column
    pub fn iter_rev(&self) -> impl Iterator<Item = (usize, usize)> {
        let (x_start, x_end) = (self.x_start, self.x_end);
        (self.y_start..=self.y_end)
            .rev()
            .flat_map(move |y| (x_start..=x_end).rev().map(move |x| (x, y)))
            .filter(|(x, y)| *x >= 0 && *y >= 0)
            .map(|(x, y)| (x as usize, y as usize))
    }
}

/// A shape that can be stamped into the voxels of a map
#[enum_dispatch]
pub trait VoxelStencil {
    /// The state written into covered voxels, 0 erases
    fn fill_type(&self) -> u32;

    /// The current center, in the coordinates of the chunk being edited
    fn center(&self) -> Vec2;

    /// Move the stencil
    fn set_center(&mut self, center: Vec2);

    /// Left border of the shape
    fn x_start(&self) -> f32;

    /// Right border of the shape
    fn x_end(&self) -> f32;

    /// Bottom border of the shape
    fn y_start(&self) -> f32;

    /// Top border of the shape
    fn y_end(&self) -> f32;

    /// Prepare the stencil for a map with the given voxel size
    fn initialize(&mut self, _voxel_size: f32) {}

    /// Write the fill type into `voxel` if the shape covers it
    fn apply_voxel(&self, voxel: &mut Voxel) {
        let p = voxel.position;
        if p.x >= self.x_start() && p.x <= self.x_end() && p.y >= self.y_start() && p.y <= self.y_end()
        {
            voxel.state = self.fill_type();
        }
    }

    /// Place the crossing on the edge from `x_min` to its +X neighbor `x_max`, whose states differ
    fn find_horizontal_crossing(&self, x_min: &mut Voxel, x_max: &Voxel);

    /// Place the crossing on the edge from `y_min` to its +Y neighbor `y_max`, whose states differ
    fn find_vertical_crossing(&self, y_min: &mut Voxel, y_max: &Voxel);

    /// Update the +X edge of `x_min`. Edges between equal states lose their crossing.
    fn set_horizontal_crossing(&self, x_min: &mut Voxel, x_max: &Voxel) {
        if x_min.state != x_max.state {
            self.find_horizontal_crossing(x_min, x_max);
        } else {
            x_min.clear_x_crossing();
        }
    }

    /// Update the +Y edge of `y_min`. Edges between equal states lose their crossing.
    fn set_vertical_crossing(&self, y_min: &mut Voxel, y_max: &Voxel) {
        if y_min.state != y_max.state {
            self.find_vertical_crossing(y_min, y_max);
        } else {
            y_min.clear_y_crossing();
        }
    }

    /// Chunks touched by the shape, padded by one voxel so crossings on chunk seams are found
    fn map_range(&self, voxel_size: f32, chunk_size: f32, chunk_resolution: usize) -> VoxelRange {
        let last = chunk_resolution as isize - 1;
        VoxelRange {
            x_start: floor_index((self.x_start() - voxel_size) / chunk_size).max(0),
            x_end: floor_index((self.x_end() + voxel_size) / chunk_size).min(last),
            y_start: floor_index((self.y_start() - voxel_size) / chunk_size).max(0),
            y_end: floor_index((self.y_end() + voxel_size) / chunk_size).min(last),
        }
    }

    /// Voxels of one chunk touched by the shape
    fn chunk_range(&self, voxel_size: f32, resolution: usize) -> VoxelRange {
        let last = resolution as isize - 1;
        VoxelRange {
            x_start: floor_index(self.x_start() / voxel_size).clamp(0, last + 1),
            x_end: floor_index(self.x_end() / voxel_size).clamp(-1, last),
            y_start: floor_index(self.y_start() / voxel_size).clamp(0, last + 1),
            y_end: floor_index(self.y_end() / voxel_size).clamp(-1, last),
        }
    }
}

/// An enum with the stencil variants, used to pass stencils around without Box or dynamic dispatch
#[derive(Debug, Clone)]
#[enum_dispatch(VoxelStencil)]
pub enum Stencil {
    /// An axis aligned rectangle
    Box(BoxStencil),
    /// A square around its center
    Square(SquareStencil),
    /// A circle around its center
    Circle(CircleStencil),
    /// A single triangle
    Triangle(TriangleStencil),
}

fn floor_index(value: f32) -> isize {
    value.floor() as isize
}

/// Point the crossing normal on the +X edge of `x_min` from the filled side to the empty one, used
/// when an existing crossing is kept
pub fn validate_horizontal_normal(x_min: &mut Voxel, x_max: &Voxel) {
    if x_min.state < x_max.state {
        if x_min.x_normal.x > 0. {
            x_min.x_normal = -x_min.x_normal;
        }
    } else if x_min.x_normal.x < 0. {
        x_min.x_normal = -x_min.x_normal;
    }
}

/// Point the crossing normal on the +Y edge of `y_min` from the filled side to the empty one, used
/// when an existing crossing is kept
pub fn validate_vertical_normal(y_min: &mut Voxel, y_max: &Voxel) {
    if y_min.state < y_max.state {
        if y_min.y_normal.y > 0. {
            y_min.y_normal = -y_min.y_normal;
        }
    } else if y_min.y_normal.y < 0. {
        y_min.y_normal = -y_min.y_normal;
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
fn ranges_are_clamped_to_the_grid() {
    let stencil = Stencil::from(BoxStencil::new(Rect::new(-1., 0.5, 2.5, 9.), 1));
    let range = stencil.chunk_range(1., 4);
    assert_eq!(
        VoxelRange {
            x_start: 0,
            x_end: 2,
            y_start: 0,
            y_end: 3,
        },
        range
    );

    let map = stencil.map_range(1., 4., 2);
    assert_eq!(
        VoxelRange {
            x_start: 0,
            x_end: 0,
            y_start: 0,
            y_end: 1,
        },
        map
    );
}

#[test]
fn range_left_of_the_grid_is_empty() {
    let mut stencil = SquareStencil::new(0.4, 1);
    stencil.initialize(1.);
    stencil.set_center(Vec2::new(-3., 1.));
    assert!(stencil.chunk_range(1., 4).is_empty());
}

#[test]
fn reverse_iteration_starts_at_the_end() {
    let range = VoxelRange {
        x_start: 0,
        x_end: 1,
        y_start: 1,
        y_end: 2,
    };
    let all: Vec<_> = range.iter_rev().collect();
    assert_eq!(vec![(1, 2), (0, 2), (1, 1), (0, 1)], all);
}

#[test]
fn equal_states_clear_the_crossing() {
    let stencil = Stencil::from(CircleStencil::new(1., 1));
    let mut a = voxel_at(0.5, 0.5, 1);
    a.x_edge = 0.9;
    a.y_edge = 0.9;
    let b = voxel_at(1.5, 0.5, 1);

    stencil.set_horizontal_crossing(&mut a, &b);
    stencil.set_vertical_crossing(&mut a, &b);
    assert!(!a.has_x_crossing());
    assert!(!a.has_y_crossing());
}

#[test]
fn kept_normals_point_away_from_the_fill() {
    let mut a = voxel_at(0.5, 0.5, 0);
    a.x_normal = Vec2::X;
    validate_horizontal_normal(&mut a, &voxel_at(1.5, 0.5, 1));
    assert_eq!(Vec2::NEG_X, a.x_normal);

    let mut a = voxel_at(0.5, 0.5, 1);
    a.y_normal = Vec2::NEG_Y;
    validate_vertical_normal(&mut a, &voxel_at(0.5, 1.5, 0));
    assert_eq!(Vec2::Y, a.y_normal);
}
