//! This crate holds a 2D voxel map that is meshed with dual contouring.
//! Like most voxel systems it works with chunks. Every chunk is a square grid of voxels, and the
//! meshes of a chunk read the first row and column of its +X, +Y and diagonal neighbors to close
//! the seams between them.
//!
//! Voxels hold two things:
//! - A state, 0 is empty space and every other value is a material with its own mesh
//! - The crossings on their +X and +Y edges, with the surface normal at each crossing
//!
//! Edits go through stencils, shapes that write a state into the voxels they cover and place the
//! crossings on the edges leaving them. Cells whose crossings meet at a sharp enough angle get a
//! feature point, which keeps corners sharp in the generated meshes.

#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

mod feature_point;
pub use feature_point::FeaturePoint;

mod voxel;
pub use voxel::{Corner, Seam, Voxel};

mod cell;
pub use cell::{intersection, is_below_line, CellCase, VoxelCell};

mod mesh;
pub use mesh::{LocalBounds, MeshSection};

mod sampling;
pub use sampling::{GradientSampler, HeightGrid, HeightLayer, HeightSampler, MeshSimplifier};

mod error;
pub use error::SettingsError;

mod settings;
pub use settings::{normalize_extrusion_height, SimplifierOptions, SurfaceState, VoxelMapSettings};

mod surface;
pub use surface::{SurfaceConfig, VoxelSurface};

mod renderer;
pub use renderer::VoxelRenderer;

mod grid;
pub use grid::{ChunkNeighbors, GridConfig, VoxelGrid};

pub mod stencil;
pub use stencil::{
    BoxStencil, CircleStencil, PolygonStencil, SquareStencil, Stencil, TriangleStencil,
    VoxelRange, VoxelStencil,
};

mod map;
pub use map::{
    prefab_bounds_from_sockets, ChunkIndices, EditResult, PrefabBounds, SurfaceSamplers, VoxelMap,
};

pub use fast_surface_nets::ndshape::{RuntimeShape, Shape};

/// The largest angle between two crossing normals, in degrees, that still forms a sharp feature
pub const DEFAULT_MAX_FEATURE_ANGLE: f32 = 135.;
/// The largest angle between two normals, in degrees, at which they count as parallel
pub const DEFAULT_MAX_PARALLEL_ANGLE: f32 = 8.;
