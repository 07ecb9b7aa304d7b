use std::ops::Deref;

use bevy::prelude::*;

/// A Voxel is a single corner sample of a chunk. It holds the fill state of the corner and the
/// surface crossings on the edges towards its +X and +Y neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voxel {
    /// The material of this corner, 0 means empty
    pub state: u32,
    /// The chunk-local position of the corner
    pub position: Vec2,
    /// X coordinate of the crossing between this corner and the +X corner
    pub x_edge: f32,
    /// Y coordinate of the crossing between this corner and the +Y corner
    pub y_edge: f32,
    /// The surface normal at the X crossing
    pub x_normal: Vec2,
    /// The surface normal at the Y crossing
    pub y_normal: Vec2,
}

impl Default for Voxel {
    fn default() -> Self {
        Self {
            state: 0,
            position: Vec2::ZERO,
            x_edge: Self::NO_CROSSING,
            y_edge: Self::NO_CROSSING,
            x_normal: Vec2::ZERO,
            y_normal: Vec2::ZERO,
        }
    }
}

/// The side of a chunk a shifted corner was borrowed across
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seam {
    /// The corner comes from the +X neighbor
    X,
    /// The corner comes from the +Y neighbor
    Y,
    /// The corner comes from the diagonal +X+Y neighbor
    XY,
}

impl Voxel {
    /// Marks an edge that has no crossing
    pub const NO_CROSSING: f32 = f32::MIN;

    /// Create an empty voxel for grid coordinate (`x`, `y`) with the given voxel size
    pub fn new(x: u32, y: u32, size: f32) -> Self {
        Self {
            position: Vec2::new((x as f32 + 0.5) * size, (y as f32 + 0.5) * size),
            ..default()
        }
    }

    /// Whether this corner holds any material
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.state > 0
    }

    /// Whether a crossing was stored on the +X edge
    #[inline]
    pub fn has_x_crossing(&self) -> bool {
        self.x_edge != Self::NO_CROSSING
    }

    /// Whether a crossing was stored on the +Y edge
    #[inline]
    pub fn has_y_crossing(&self) -> bool {
        self.y_edge != Self::NO_CROSSING
    }

    /// The crossing point on the +X edge
    #[inline]
    pub fn x_edge_point(&self) -> Vec2 {
        Vec2::new(self.x_edge, self.position.y)
    }

    /// The crossing point on the +Y edge
    #[inline]
    pub fn y_edge_point(&self) -> Vec2 {
        Vec2::new(self.position.x, self.y_edge)
    }

    /// Clear the state and both crossings, keeping the position
    pub fn reset(&mut self) {
        self.state = 0;
        self.x_edge = Self::NO_CROSSING;
        self.y_edge = Self::NO_CROSSING;
    }

    /// Clear the crossing on the +X edge
    pub fn clear_x_crossing(&mut self) {
        self.x_edge = Self::NO_CROSSING;
    }

    /// Clear the crossing on the +Y edge
    pub fn clear_y_crossing(&mut self) {
        self.y_edge = Self::NO_CROSSING;
    }

    /// A copy of this voxel moved by `offset` across `seam`. Crossings along the moved axes move
    /// with it, missing crossings stay missing.
    pub fn shifted(&self, seam: Seam, offset: f32) -> Voxel {
        let mut voxel = *self;
        if matches!(seam, Seam::X | Seam::XY) {
            voxel.position.x += offset;
            if voxel.has_x_crossing() {
                voxel.x_edge += offset;
            }
        }
        if matches!(seam, Seam::Y | Seam::XY) {
            voxel.position.y += offset;
            if voxel.has_y_crossing() {
                voxel.y_edge += offset;
            }
        }
        voxel
    }
}

/// A corner seen by the chunk sweep, either stored in the chunk itself or borrowed from a neighbor
/// chunk and moved into this chunk's coordinate space.
#[derive(Debug, Clone, Copy)]
pub enum Corner<'a> {
    /// A voxel of the chunk being processed
    Local(&'a Voxel),
    /// A neighbor's voxel moved across the seam
    Shifted(Voxel),
}

impl<'a> Corner<'a> {
    /// Borrow `voxel` from a neighbor chunk, moving it across `seam` by `offset`
    pub fn shifted(voxel: &Voxel, seam: Seam, offset: f32) -> Self {
        Corner::Shifted(voxel.shifted(seam, offset))
    }

    /// The voxel value of this corner
    pub fn voxel(&self) -> Voxel {
        **self
    }
}

impl<'a> Deref for Corner<'a> {
    type Target = Voxel;

    fn deref(&self) -> &Voxel {
        match self {
            Corner::Local(voxel) => voxel,
            Corner::Shifted(voxel) => voxel,
        }
    }
}

#[test]
fn voxel_position_is_cell_center() {
    let voxel = Voxel::new(2, 3, 0.5);
    assert_eq!(Vec2::new(1.25, 1.75), voxel.position);
    assert!(!voxel.is_filled());
    assert!(!voxel.has_x_crossing());
    assert!(!voxel.has_y_crossing());
}

#[test]
fn reset_clears_state_and_edges() {
    let mut voxel = Voxel::new(0, 0, 1.);
    voxel.state = 3;
    voxel.x_edge = 0.7;
    voxel.y_edge = 0.2;
    voxel.reset();

    assert_eq!(0, voxel.state);
    assert_eq!(Voxel::NO_CROSSING, voxel.x_edge);
    assert_eq!(Voxel::NO_CROSSING, voxel.y_edge);
    assert_eq!(Vec2::new(0.5, 0.5), voxel.position);
}

#[test]
fn shifted_moves_only_the_seam_axes() {
    let mut voxel = Voxel::new(0, 0, 1.);
    voxel.state = 1;
    voxel.x_edge = 0.8;
    voxel.x_normal = Vec2::X;
    voxel.y_normal = Vec2::Y;

    let x = voxel.shifted(Seam::X, 4.);
    assert_eq!(Vec2::new(4.5, 0.5), x.position);
    assert_eq!(4.8, x.x_edge);
    assert!(!x.has_y_crossing());
    assert_eq!(Vec2::Y, x.y_normal);

    let y = voxel.shifted(Seam::Y, 4.);
    assert_eq!(Vec2::new(0.5, 4.5), y.position);
    assert_eq!(0.8, y.x_edge);

    let xy = voxel.shifted(Seam::XY, 4.);
    assert_eq!(Vec2::new(4.5, 4.5), xy.position);
    assert_eq!(4.8, xy.x_edge);
    assert_eq!(1, xy.state);
}

#[test]
fn corner_views_deref_to_voxel() {
    let voxel = Voxel::new(1, 1, 1.);
    let local = Corner::Local(&voxel);
    let shifted = Corner::shifted(&voxel, Seam::X, 2.);

    assert_eq!(voxel.position, local.position);
    assert_eq!(Vec2::new(3.5, 1.5), shifted.voxel().position);
}
