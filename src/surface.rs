//! Mesh emission for one material of one chunk.
//!
//! The chunk sweep visits cells row by row. Every corner and edge vertex is created exactly once and
//! its index is cached: `corners_max`/`x_edges_max` hold the row being built, `corners_min`/`x_edges_min`
//! the row below it, and `y_edge_min`/`y_edge_max` the vertical edges left and right of the current cell.
//!
//! With wall extrusion enabled every vertex `v` is followed by its extrusion twin `v + 1`, placed at the
//! extrusion height right below it. Walls and the bottom cap rely on that pairing.

use std::sync::Arc;

use bevy::{prelude::*, utils::HashSet};

use crate::{
    GradientSampler, HeightSampler, MeshSection, MeshSimplifier, SimplifierOptions, SurfaceState,
    Voxel,
};

/// Everything a [VoxelSurface] needs to know about its chunk and material
#[derive(Clone, Default)]
pub struct SurfaceConfig {
    /// Chunk origin in map space
    pub position: Vec2,
    /// Side length of the chunk
    pub grid_size: f32,
    /// Voxels per chunk side
    pub resolution: usize,
    /// Depth of the extrusion, negative
    pub extrusion_height: f32,
    /// Material settings
    pub state: SurfaceState,
    /// Optional height source
    pub height: Option<Arc<dyn HeightSampler>>,
    /// Optional color source
    pub gradient: Option<Arc<dyn GradientSampler>>,
    /// Optional mesh simplifier, used when the material enables it
    pub simplifier: Option<Arc<dyn MeshSimplifier>>,
}

/// The mesh of one material inside one chunk, plus the caches used while sweeping the chunk
#[derive(Clone, Default)]
pub struct VoxelSurface {
    position: Vec2,
    voxel_size_half: f32,

    generate_extrusion: bool,
    extrusion_surface: bool,
    extrusion_height: f32,
    simplifier_options: SimplifierOptions,

    corners_min: Vec<u32>,
    corners_max: Vec<u32>,
    x_edges_min: Vec<u32>,
    x_edges_max: Vec<u32>,
    y_edge_min: u32,
    y_edge_max: u32,

    edge_index_set: HashSet<u32>,
    edge_pairs: Vec<(u32, u32)>,

    height: Option<Arc<dyn HeightSampler>>,
    gradient: Option<Arc<dyn GradientSampler>>,
    simplifier: Option<Arc<dyn MeshSimplifier>>,

    section: MeshSection,
}

impl VoxelSurface {
    /// Create an empty surface
    pub fn new(config: SurfaceConfig) -> Self {
        let resolution = config.resolution;
        let voxel_size = config.grid_size / resolution.max(1) as f32;
        Self {
            position: config.position,
            voxel_size_half: voxel_size / 2.,
            generate_extrusion: config.state.generate_extrusion,
            extrusion_surface: config.state.is_extrusion_surface(),
            extrusion_height: crate::settings::normalize_extrusion_height(config.extrusion_height),
            simplifier_options: config.state.simplifier,
            corners_min: vec![0; resolution + 1],
            corners_max: vec![0; resolution + 1],
            x_edges_min: vec![0; resolution],
            x_edges_max: vec![0; resolution],
            y_edge_min: 0,
            y_edge_max: 0,
            edge_index_set: default(),
            edge_pairs: Vec::new(),
            height: config.height,
            gradient: config.gradient,
            simplifier: config.simplifier,
            section: MeshSection::default(),
        }
    }

    /// The generated mesh
    pub fn section(&self) -> &MeshSection {
        &self.section
    }

    /// Take the generated mesh out of the surface, leaving it empty
    pub fn take_section(&mut self) -> MeshSection {
        std::mem::take(&mut self.section)
    }

    /// The number of emitted vertices
    pub fn vertex_count(&self) -> usize {
        self.section.vertex_count()
    }

    /// Whether walls are generated
    pub fn generates_extrusion(&self) -> bool {
        self.generate_extrusion
    }

    /// Depth of generated walls
    pub fn extrusion_height(&self) -> f32 {
        self.extrusion_height
    }

    /// Wall edges emitted so far, as pairs of surface vertex indices
    pub fn edge_pairs(&self) -> &[(u32, u32)] {
        &self.edge_pairs
    }

    /// Drop all geometry and wall bookkeeping
    pub fn clear(&mut self) {
        self.section.clear();
        self.edge_index_set.clear();
        self.edge_pairs.clear();
    }

    /// Run the post passes over the finished mesh and compact its buffers
    pub fn apply(&mut self) {
        self.apply_vertex();
        self.section.shrink_to_fit();
    }

    pub(crate) fn cache_first_corner(&mut self, voxel: &Voxel) {
        self.corners_max[0] = self.add_vertex(voxel.position);
    }

    pub(crate) fn cache_next_corner(&mut self, i: usize, voxel: &Voxel) {
        self.corners_max[i + 1] = self.add_vertex(voxel.position);
    }

    pub(crate) fn cache_x_edge(&mut self, i: usize, voxel: &Voxel) {
        let point = if voxel.has_x_crossing() {
            voxel.x_edge_point()
        } else {
            voxel.position + Vec2::new(self.voxel_size_half, 0.)
        };
        self.x_edges_max[i] = self.add_vertex(point);
    }

    pub(crate) fn cache_y_edge(&mut self, voxel: &Voxel) {
        let point = if voxel.has_y_crossing() {
            voxel.y_edge_point()
        } else {
            voxel.position + Vec2::new(0., self.voxel_size_half)
        };
        self.y_edge_max = self.add_vertex(point);
    }

    pub(crate) fn prepare_cache_for_next_cell(&mut self) {
        self.y_edge_min = self.y_edge_max;
    }

    pub(crate) fn prepare_cache_for_next_row(&mut self) {
        std::mem::swap(&mut self.corners_min, &mut self.corners_max);
        std::mem::swap(&mut self.x_edges_min, &mut self.x_edges_max);
    }

    /// The whole cell
    pub fn add_quad_abcd(&mut self, i: usize) {
        self.add_polygon(&[
            self.corners_min[i],
            self.corners_max[i],
            self.corners_max[i + 1],
            self.corners_min[i + 1],
        ]);
    }

    /// Corner A cut off by a straight edge
    pub fn add_triangle_a(&mut self, i: usize, wall: bool) {
        let (ym, xm) = (self.y_edge_min, self.x_edges_min[i]);
        self.add_polygon(&[self.corners_min[i], ym, xm]);
        if wall {
            self.add_section(ym, xm);
        }
    }

    /// Corner A cut off through a feature point
    pub fn add_quad_a(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (ym, xm) = (self.y_edge_min, self.x_edges_min[i]);
        self.add_polygon(&[f, xm, self.corners_min[i], ym]);
        if wall0 {
            self.add_section(ym, f);
        }
        if wall1 {
            self.add_section(f, xm);
        }
    }

    /// Corner B cut off by a straight edge
    pub fn add_triangle_b(&mut self, i: usize, wall: bool) {
        let (xm, ym) = (self.x_edges_min[i], self.y_edge_max);
        self.add_polygon(&[self.corners_min[i + 1], xm, ym]);
        if wall {
            self.add_section(xm, ym);
        }
    }

    /// Corner B cut off through a feature point
    pub fn add_quad_b(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (xm, ym) = (self.x_edges_min[i], self.y_edge_max);
        self.add_polygon(&[f, ym, self.corners_min[i + 1], xm]);
        if wall0 {
            self.add_section(xm, f);
        }
        if wall1 {
            self.add_section(f, ym);
        }
    }

    /// Corner C cut off by a straight edge
    pub fn add_triangle_c(&mut self, i: usize, wall: bool) {
        let (xm, ym) = (self.x_edges_max[i], self.y_edge_min);
        self.add_polygon(&[self.corners_max[i], xm, ym]);
        if wall {
            self.add_section(xm, ym);
        }
    }

    /// Corner C cut off through a feature point
    pub fn add_quad_c(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (xm, ym) = (self.x_edges_max[i], self.y_edge_min);
        self.add_polygon(&[f, ym, self.corners_max[i], xm]);
        if wall0 {
            self.add_section(xm, f);
        }
        if wall1 {
            self.add_section(f, ym);
        }
    }

    /// Corner D cut off by a straight edge
    pub fn add_triangle_d(&mut self, i: usize, wall: bool) {
        let (ym, xm) = (self.y_edge_max, self.x_edges_max[i]);
        self.add_polygon(&[self.corners_max[i + 1], ym, xm]);
        if wall {
            self.add_section(ym, xm);
        }
    }

    /// Corner D cut off through a feature point
    pub fn add_quad_d(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (ym, xm) = (self.y_edge_max, self.x_edges_max[i]);
        self.add_polygon(&[f, xm, self.corners_max[i + 1], ym]);
        if wall0 {
            self.add_section(ym, f);
        }
        if wall1 {
            self.add_section(f, xm);
        }
    }

    /// Everything but corner D, straight cut
    pub fn add_pentagon_abc(&mut self, i: usize, wall: bool) {
        let (xm, ym) = (self.x_edges_max[i], self.y_edge_max);
        self.add_polygon(&[
            self.corners_min[i],
            self.corners_max[i],
            xm,
            ym,
            self.corners_min[i + 1],
        ]);
        if wall {
            self.add_section(xm, ym);
        }
    }

    /// Everything but corner D, cut through a feature point
    pub fn add_hexagon_abc(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (xm, ym) = (self.x_edges_max[i], self.y_edge_max);
        self.add_polygon(&[
            f,
            ym,
            self.corners_min[i + 1],
            self.corners_min[i],
            self.corners_max[i],
            xm,
        ]);
        if wall {
            self.add_section3(xm, ym, f);
        }
    }

    /// Everything but corner C, straight cut
    pub fn add_pentagon_abd(&mut self, i: usize, wall: bool) {
        let (ym, xm) = (self.y_edge_min, self.x_edges_max[i]);
        self.add_polygon(&[
            self.corners_min[i + 1],
            self.corners_min[i],
            ym,
            xm,
            self.corners_max[i + 1],
        ]);
        if wall {
            self.add_section(ym, xm);
        }
    }

    /// Everything but corner C, cut through a feature point
    pub fn add_hexagon_abd(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (ym, xm) = (self.y_edge_min, self.x_edges_max[i]);
        self.add_polygon(&[
            f,
            xm,
            self.corners_max[i + 1],
            self.corners_min[i + 1],
            self.corners_min[i],
            ym,
        ]);
        if wall {
            self.add_section3(ym, xm, f);
        }
    }

    /// Everything but corner B, straight cut
    pub fn add_pentagon_acd(&mut self, i: usize, wall: bool) {
        let (ym, xm) = (self.y_edge_max, self.x_edges_min[i]);
        self.add_polygon(&[
            self.corners_max[i],
            self.corners_max[i + 1],
            ym,
            xm,
            self.corners_min[i],
        ]);
        if wall {
            self.add_section(ym, xm);
        }
    }

    /// Everything but corner B, cut through a feature point
    pub fn add_hexagon_acd(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (ym, xm) = (self.y_edge_max, self.x_edges_min[i]);
        self.add_polygon(&[
            f,
            xm,
            self.corners_min[i],
            self.corners_max[i],
            self.corners_max[i + 1],
            ym,
        ]);
        if wall {
            self.add_section3(ym, xm, f);
        }
    }

    /// Everything but corner A, straight cut
    pub fn add_pentagon_bcd(&mut self, i: usize, wall: bool) {
        let (xm, ym) = (self.x_edges_min[i], self.y_edge_min);
        self.add_polygon(&[
            self.corners_max[i + 1],
            self.corners_min[i + 1],
            xm,
            ym,
            self.corners_max[i],
        ]);
        if wall {
            self.add_section(xm, ym);
        }
    }

    /// Everything but corner A, cut through a feature point
    pub fn add_hexagon_bcd(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (xm, ym) = (self.x_edges_min[i], self.y_edge_min);
        self.add_polygon(&[
            f,
            ym,
            self.corners_max[i],
            self.corners_max[i + 1],
            self.corners_min[i + 1],
            xm,
        ]);
        if wall {
            self.add_section3(xm, ym, f);
        }
    }

    /// The south half
    pub fn add_quad_ab(&mut self, i: usize, wall: bool) {
        let (y0, y1) = (self.y_edge_min, self.y_edge_max);
        self.add_polygon(&[self.corners_min[i], y0, y1, self.corners_min[i + 1]]);
        if wall {
            self.add_section(y0, y1);
        }
    }

    /// The south half, bent through a feature point
    pub fn add_pentagon_ab(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (y0, y1) = (self.y_edge_min, self.y_edge_max);
        self.add_polygon(&[f, y1, self.corners_min[i + 1], self.corners_min[i], y0]);
        if wall0 {
            self.add_section(y0, f);
        }
        if wall1 {
            self.add_section(f, y1);
        }
    }

    /// The west half
    pub fn add_quad_ac(&mut self, i: usize, wall: bool) {
        let (x0, x1) = (self.x_edges_min[i], self.x_edges_max[i]);
        self.add_polygon(&[self.corners_min[i], self.corners_max[i], x1, x0]);
        if wall {
            self.add_section(x1, x0);
        }
    }

    /// The west half, bent through a feature point
    pub fn add_pentagon_ac(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (x0, x1) = (self.x_edges_min[i], self.x_edges_max[i]);
        self.add_polygon(&[f, x0, self.corners_min[i], self.corners_max[i], x1]);
        if wall0 {
            self.add_section(x1, f);
        }
        if wall1 {
            self.add_section(f, x0);
        }
    }

    /// The east half
    pub fn add_quad_bd(&mut self, i: usize, wall: bool) {
        let (x0, x1) = (self.x_edges_min[i], self.x_edges_max[i]);
        self.add_polygon(&[x0, x1, self.corners_max[i + 1], self.corners_min[i + 1]]);
        if wall {
            self.add_section(x0, x1);
        }
    }

    /// The east half, bent through a feature point
    pub fn add_pentagon_bd(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (x0, x1) = (self.x_edges_min[i], self.x_edges_max[i]);
        self.add_polygon(&[f, x1, self.corners_max[i + 1], self.corners_min[i + 1], x0]);
        if wall0 {
            self.add_section(x0, f);
        }
        if wall1 {
            self.add_section(f, x1);
        }
    }

    /// The north half
    pub fn add_quad_cd(&mut self, i: usize, wall: bool) {
        let (y0, y1) = (self.y_edge_min, self.y_edge_max);
        self.add_polygon(&[y0, self.corners_max[i], self.corners_max[i + 1], y1]);
        if wall {
            self.add_section(y1, y0);
        }
    }

    /// The north half, bent through a feature point
    pub fn add_pentagon_cd(&mut self, i: usize, extra: Vec2, wall0: bool, wall1: bool) {
        let f = self.add_vertex(extra);
        let (y0, y1) = (self.y_edge_min, self.y_edge_max);
        self.add_polygon(&[f, y0, self.corners_max[i], self.corners_max[i + 1], y1]);
        if wall0 {
            self.add_section(y1, f);
        }
        if wall1 {
            self.add_section(f, y0);
        }
    }

    /// The connected B-C diagonal, cut off on the A side
    pub fn add_quad_bc_to_a(&mut self, i: usize, wall: bool) {
        let (ym, xm) = (self.y_edge_min, self.x_edges_min[i]);
        self.add_polygon(&[ym, self.corners_max[i], self.corners_min[i + 1], xm]);
        if wall {
            self.add_section(xm, ym);
        }
    }

    /// The connected B-C diagonal, cut off on the A side through a feature point
    pub fn add_pentagon_bc_to_a(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (ym, xm) = (self.y_edge_min, self.x_edges_min[i]);
        self.add_polygon(&[f, ym, self.corners_max[i], self.corners_min[i + 1], xm]);
        if wall {
            self.add_section3(xm, ym, f);
        }
    }

    /// The connected B-C diagonal, cut off on the D side
    pub fn add_quad_bc_to_d(&mut self, i: usize, wall: bool) {
        let (ym, xm) = (self.y_edge_max, self.x_edges_max[i]);
        self.add_polygon(&[ym, self.corners_min[i + 1], self.corners_max[i], xm]);
        if wall {
            self.add_section(xm, ym);
        }
    }

    /// The connected B-C diagonal, cut off on the D side through a feature point
    pub fn add_pentagon_bc_to_d(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (ym, xm) = (self.y_edge_max, self.x_edges_max[i]);
        self.add_polygon(&[f, ym, self.corners_min[i + 1], self.corners_max[i], xm]);
        if wall {
            self.add_section3(xm, ym, f);
        }
    }

    /// The connected A-D diagonal, cut off on the B side
    pub fn add_quad_ad_to_b(&mut self, i: usize, wall: bool) {
        let (xm, ym) = (self.x_edges_min[i], self.y_edge_max);
        self.add_polygon(&[xm, self.corners_min[i], self.corners_max[i + 1], ym]);
        if wall {
            self.add_section(ym, xm);
        }
    }

    /// The connected A-D diagonal, cut off on the B side through a feature point
    pub fn add_pentagon_ad_to_b(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (xm, ym) = (self.x_edges_min[i], self.y_edge_max);
        self.add_polygon(&[f, xm, self.corners_min[i], self.corners_max[i + 1], ym]);
        if wall {
            self.add_section3(ym, xm, f);
        }
    }

    /// The connected A-D diagonal, cut off on the C side
    pub fn add_quad_ad_to_c(&mut self, i: usize, wall: bool) {
        let (xm, ym) = (self.x_edges_max[i], self.y_edge_min);
        self.add_polygon(&[xm, self.corners_max[i + 1], self.corners_min[i], ym]);
        if wall {
            self.add_section(ym, xm);
        }
    }

    /// The connected A-D diagonal, cut off on the C side through a feature point
    pub fn add_pentagon_ad_to_c(&mut self, i: usize, extra: Vec2, wall: bool) {
        let f = self.add_vertex(extra);
        let (xm, ym) = (self.x_edges_max[i], self.y_edge_min);
        self.add_polygon(&[f, xm, self.corners_max[i + 1], self.corners_min[i], ym]);
        if wall {
            self.add_section3(ym, xm, f);
        }
    }

    /// Add a vertex in chunk-local coordinates, with its extrusion twin when walls are on
    fn add_vertex(&mut self, point: Vec2) -> u32 {
        let index = self.section.vertex_count() as u32;
        let x = self.position.x + point.x - self.voxel_size_half;
        let y = self.position.y + point.y - self.voxel_size_half;

        if self.extrusion_surface {
            self.section
                .push_vertex(Vec3::new(x, y, self.extrusion_height), Vec3::NEG_Z);
        } else {
            self.section.push_vertex(Vec3::new(x, y, 0.), Vec3::Z);
        }

        if self.generate_extrusion {
            self.section
                .push_vertex(Vec3::new(x, y, self.extrusion_height), Vec3::NEG_Z);
        }

        index
    }

    /// Fan a convex polygon from its first vertex
    fn add_polygon(&mut self, vertices: &[u32]) {
        let first = vertices[0];
        for pair in vertices[1..].windows(2) {
            let (b, c) = (pair[0], pair[1]);
            if self.extrusion_surface {
                self.section.push_triangle(c, b, first);
            } else {
                self.section.push_triangle(first, b, c);
            }
            if self.generate_extrusion {
                self.section.push_triangle(c + 1, b + 1, first + 1);
            }
        }
    }

    /// A wall quad below the surface edge from `a` to `b`
    fn add_section(&mut self, a: u32, b: u32) {
        if !self.generate_extrusion {
            return;
        }

        self.section.push_triangle(b + 1, b, a);
        self.section.push_triangle(a + 1, b + 1, a);

        self.edge_index_set.insert(a);
        self.edge_index_set.insert(b);
        self.edge_pairs.push((a, b));
    }

    /// Walls from `a` to `c` and from `c` to `b`
    fn add_section3(&mut self, a: u32, b: u32, c: u32) {
        if self.generate_extrusion {
            self.add_section(a, c);
            self.add_section(c, b);
        }
    }

    fn apply_vertex(&mut self) {
        let half = self.voxel_size_half;

        if let Some(height) = &self.height {
            let section = &mut self.section;
            for (position, normal) in section.positions.iter_mut().zip(&mut section.normals) {
                let extrusion = normal.z < 0.;
                let Some(layer) = height.layer_for(extrusion) else {
                    continue;
                };

                let (mut h, mut n) = height.height_normal(position.x + half, position.y + half, layer);
                if extrusion {
                    h += self.extrusion_height;
                    n = -n;
                }
                position.z = h;
                *normal = n;
            }
            section.recompute_bounds();
        }

        if self.generate_extrusion {
            self.generate_edge_normals();
        }

        if self.simplifier_options.enabled {
            if let Some(simplifier) = &self.simplifier {
                simplifier.simplify(&mut self.section, &self.simplifier_options);
                self.section.recompute_bounds();
            }
        }

        if let Some(gradient) = &self.gradient {
            let section = &mut self.section;
            for (position, color) in section.positions.iter().zip(&mut section.colors) {
                *color = gradient.color(position.x + half, position.y + half);
            }
        }
    }

    /// Smooth wall normals: every wall edge adds its outward direction to both its endpoints and
    /// their extrusion twins
    fn generate_edge_normals(&mut self) {
        let section = &mut self.section;
        for &(a, b) in &self.edge_pairs {
            let (a, b) = (a as usize, b as usize);
            let direction = (section.positions[a] - section.positions[b]).normalize_or_zero();
            let cross = direction.cross(Vec3::Z);
            section.normals[a] += cross;
            section.normals[b] += cross;
            section.normals[a + 1] += cross;
            section.normals[b + 1] += cross;
        }

        for &i in &self.edge_index_set {
            let i = i as usize;
            section.normals[i] = section.normals[i].normalize_or_zero();
            section.normals[i + 1] = section.normals[i + 1].normalize_or_zero();
        }
    }
}

#[cfg(test)]
fn test_surface(state: SurfaceState) -> VoxelSurface {
    VoxelSurface::new(SurfaceConfig {
        grid_size: 4.,
        resolution: 4,
        extrusion_height: -2.,
        state,
        ..Default::default()
    })
}

#[cfg(test)]
fn seed_cell(surface: &mut VoxelSurface) {
    // One cell spanning voxels (0,0)..(1,1) with crossings halfway on every edge
    let mut a = Voxel::new(0, 0, 1.);
    a.x_edge = 1.;
    a.y_edge = 1.;
    let mut b = Voxel::new(1, 0, 1.);
    b.y_edge = 1.;
    let mut c = Voxel::new(0, 1, 1.);
    c.x_edge = 1.;
    let d = Voxel::new(1, 1, 1.);

    surface.cache_first_corner(&a);
    surface.cache_x_edge(0, &a);
    surface.cache_next_corner(0, &b);
    surface.prepare_cache_for_next_row();
    surface.cache_first_corner(&c);
    surface.cache_y_edge(&a);
    surface.cache_x_edge(0, &c);
    surface.cache_next_corner(0, &d);
    surface.prepare_cache_for_next_cell();
    surface.cache_y_edge(&b);
}

#[test]
fn caches_are_sized_by_resolution() {
    let surface = VoxelSurface::new(SurfaceConfig {
        grid_size: 6.,
        resolution: 3,
        ..Default::default()
    });
    assert_eq!(1., surface.voxel_size_half);
    assert_eq!(4, surface.corners_min.len());
    assert_eq!(4, surface.corners_max.len());
    assert_eq!(3, surface.x_edges_min.len());
    assert_eq!(3, surface.x_edges_max.len());
}

#[test]
fn full_quad_has_two_triangles() {
    let mut surface = test_surface(SurfaceState::default());
    seed_cell(&mut surface);
    surface.add_quad_abcd(0);

    let section = surface.section();
    assert_eq!(8, section.vertex_count());
    assert_eq!(6, section.index_count());
    assert!(section.positions.iter().all(|p| p.z == 0.));
    // Voxel centers are moved back by half a voxel
    assert_eq!(Vec3::ZERO, section.positions[0]);
}

#[test]
fn extrusion_twins_follow_every_vertex() {
    let mut surface = test_surface(SurfaceState {
        generate_extrusion: true,
        ..Default::default()
    });
    seed_cell(&mut surface);
    surface.add_quad_a(0, Vec2::new(0.8, 0.8), true, true);
    surface.add_hexagon_bcd(0, Vec2::new(0.8, 0.8), true);

    let section = surface.section();
    assert_eq!(0, section.vertex_count() % 2);
    for i in (0..section.vertex_count()).step_by(2) {
        let top = section.positions[i];
        let bottom = section.positions[i + 1];
        assert_eq!(top.truncate(), bottom.truncate());
        assert_eq!(0., top.z);
        assert_eq!(-2., bottom.z);
    }

    for &(a, b) in surface.edge_pairs() {
        assert!(((a + 1) as usize) < section.vertex_count());
        assert!(((b + 1) as usize) < section.vertex_count());
    }
    assert_eq!(4, surface.edge_pairs().len());
    assert!(section.indices.iter().all(|i| (*i as usize) < section.vertex_count()));
}

#[test]
fn walls_need_extrusion() {
    let mut surface = test_surface(SurfaceState::default());
    seed_cell(&mut surface);
    surface.add_triangle_a(0, true);

    assert_eq!(3, surface.section().index_count());
    assert!(surface.edge_pairs().is_empty());
}

#[test]
fn extrusion_surface_reverses_winding() {
    let mut top = test_surface(SurfaceState::default());
    seed_cell(&mut top);
    top.add_triangle_a(0, false);

    let mut bottom = test_surface(SurfaceState {
        extrusion_surface: true,
        ..Default::default()
    });
    seed_cell(&mut bottom);
    bottom.add_triangle_a(0, false);

    let t = &top.section().indices;
    let b = &bottom.section().indices;
    assert_eq!(vec![t[2], t[1], t[0]], *b);
    assert!(bottom.section().positions.iter().all(|p| p.z == -2.));
}

#[test]
fn wall_normals_point_away_from_fill() {
    let mut surface = test_surface(SurfaceState {
        generate_extrusion: true,
        ..Default::default()
    });
    seed_cell(&mut surface);
    surface.add_triangle_a(0, true);
    surface.apply();

    let section = surface.section();
    let (ym, xm) = surface.edge_pairs()[0];
    for index in [ym, xm] {
        let normal = section.normals[index as usize];
        assert!(normal.x > 0. && normal.y > 0.);
        assert!((normal.length() - 1.).abs() < 1e-5);
    }
}

#[test]
fn missing_crossing_uses_edge_midpoint() {
    let mut surface = test_surface(SurfaceState::default());
    let voxel = Voxel::new(1, 1, 1.);
    surface.cache_x_edge(0, &voxel);
    surface.cache_y_edge(&voxel);

    let section = surface.section();
    assert_eq!(Vec3::new(1.5, 1., 0.), section.positions[0]);
    assert_eq!(Vec3::new(1., 1.5, 0.), section.positions[1]);
}
