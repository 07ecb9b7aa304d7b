//! Interfaces to the height, color and simplification passes applied to a finished mesh section

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{MeshSection, SimplifierOptions};

/// The height layers a [HeightSampler] can provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeightLayer {
    /// Fallback layer used by both surface and extrusion vertices
    Shape,
    /// Height of the top surface
    Surface,
    /// Height of the extruded bottom
    Extrude,
}

/// Samples a height and surface normal at a map position
pub trait HeightSampler: Send + Sync {
    /// Whether the sampler has data for `layer`
    fn has_layer(&self, layer: HeightLayer) -> bool;

    /// Height and normal of `layer` at `(x, y)`
    fn height_normal(&self, x: f32, y: f32, layer: HeightLayer) -> (f32, Vec3);

    /// The layer a vertex should use, if any
    fn layer_for(&self, extrusion: bool) -> Option<HeightLayer> {
        let preferred = if extrusion {
            HeightLayer::Extrude
        } else {
            HeightLayer::Surface
        };
        [preferred, HeightLayer::Shape]
            .into_iter()
            .find(|layer| self.has_layer(*layer))
    }
}

/// Samples a vertex color at a map position
pub trait GradientSampler: Send + Sync {
    /// The color at `(x, y)`
    fn color(&self, x: f32, y: f32) -> [u8; 4];
}

/// Decimates a mesh section in place
pub trait MeshSimplifier: Send + Sync {
    /// Replace the contents of `section` with a simplified mesh
    fn simplify(&self, section: &mut MeshSection, options: &SimplifierOptions);
}

/// A height sampler backed by regular rasters, one per layer, with one sample per voxel
#[derive(Debug, Clone, Default)]
pub struct HeightGrid {
    dim_x: usize,
    dim_y: usize,
    layers: bevy::utils::HashMap<HeightLayer, Vec<f32>>,
}

impl HeightGrid {
    /// Create an empty grid of `dim_x` by `dim_y` samples
    pub fn new(dim_x: usize, dim_y: usize) -> Self {
        Self {
            dim_x,
            dim_y,
            layers: default(),
        }
    }

    /// Set the samples of a layer, row major. Panics if the raster size doesn't match the grid.
    pub fn set_layer(&mut self, layer: HeightLayer, samples: Vec<f32>) {
        assert_eq!(
            self.dim_x * self.dim_y,
            samples.len(),
            "height raster doesn't match grid dimension"
        );
        self.layers.insert(layer, samples);
    }

    /// Fill a layer by evaluating `f` at every sample
    pub fn generate(&mut self, layer: HeightLayer, f: impl Fn(usize, usize) -> f32) {
        let samples = (0..self.dim_y)
            .flat_map(|y| (0..self.dim_x).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        self.set_layer(layer, samples);
    }

    fn sample(&self, samples: &[f32], x: usize, y: usize) -> f32 {
        samples[y * self.dim_x + x]
    }
}

impl HeightSampler for HeightGrid {
    fn has_layer(&self, layer: HeightLayer) -> bool {
        self.dim_x >= 4 && self.dim_y >= 4 && self.layers.contains_key(&layer)
    }

    fn height_normal(&self, x: f32, y: f32, layer: HeightLayer) -> (f32, Vec3) {
        let Some(samples) = self.layers.get(&layer) else {
            return (0., Vec3::Z);
        };
        if self.dim_x < 4 || self.dim_y < 4 {
            return (0., Vec3::Z);
        }

        // Keep a one sample border for the central differences
        let ix = (x.floor() as isize).clamp(1, self.dim_x as isize - 3) as usize;
        let iy = (y.floor() as isize).clamp(1, self.dim_y as isize - 3) as usize;
        let fx = (x - ix as f32).clamp(0., 1.);
        let fy = (y - iy as f32).clamp(0., 1.);

        let h00 = self.sample(samples, ix, iy);
        let h10 = self.sample(samples, ix + 1, iy);
        let h01 = self.sample(samples, ix, iy + 1);
        let h11 = self.sample(samples, ix + 1, iy + 1);
        let height = lerp(lerp(h00, h10, fx), lerp(h01, h11, fx), fy);

        let dx = self.sample(samples, ix + 1, iy) - self.sample(samples, ix - 1, iy);
        let dy = self.sample(samples, ix, iy + 1) - self.sample(samples, ix, iy - 1);
        let normal = Vec3::new(-dx, -dy, 2.).normalize();

        (height, normal)
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[test]
fn flat_grid_points_up() {
    let mut grid = HeightGrid::new(8, 8);
    grid.generate(HeightLayer::Shape, |_, _| 2.);

    let (height, normal) = grid.height_normal(3.5, 4.2, HeightLayer::Shape);
    assert_eq!(2., height);
    assert!((normal - Vec3::Z).length() < 1e-6);
}

#[test]
fn slope_tilts_normal() {
    let mut grid = HeightGrid::new(8, 8);
    grid.generate(HeightLayer::Surface, |x, _| x as f32);

    let (height, normal) = grid.height_normal(2.5, 3., HeightLayer::Surface);
    assert!((height - 2.5).abs() < 1e-5);
    assert!(normal.x < 0.);
    assert!(normal.y.abs() < 1e-6);
}

#[test]
fn layer_selection_falls_back_to_shape() {
    let mut grid = HeightGrid::new(4, 4);
    assert_eq!(None, grid.layer_for(false));

    grid.generate(HeightLayer::Shape, |_, _| 0.);
    assert_eq!(Some(HeightLayer::Shape), grid.layer_for(false));
    assert_eq!(Some(HeightLayer::Shape), grid.layer_for(true));

    grid.generate(HeightLayer::Extrude, |_, _| 0.);
    assert_eq!(Some(HeightLayer::Extrude), grid.layer_for(true));
    assert_eq!(Some(HeightLayer::Shape), grid.layer_for(false));
}
