//! One chunk of the map: a square of voxels, one renderer per material and the sweep that turns the
//! voxels into meshes.
//!
//! Cells are formed by four neighboring voxels, so the last row and column of a chunk only form cells
//! together with the voxels of the +X, +Y and diagonal neighbor chunks. Those corners are borrowed and
//! shifted by the chunk size into this chunk's space, the neighbors themselves are never modified.

use bevy::prelude::*;
use fast_surface_nets::ndshape::{RuntimeShape, Shape};

use crate::{
    CellCase, Corner, FeaturePoint, MeshSection, Seam, SurfaceConfig, Voxel, VoxelCell,
    VoxelRange, VoxelRenderer, VoxelStencil,
};

/// Voxels of the chunks bordering a chunk on its +X, +Y and diagonal sides
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkNeighbors<'a> {
    /// The chunk to the right
    pub x: Option<&'a [Voxel]>,
    /// The chunk above
    pub y: Option<&'a [Voxel]>,
    /// The chunk to the upper right
    pub xy: Option<&'a [Voxel]>,
}

/// Everything needed to build a [VoxelGrid]
#[derive(Clone, Default)]
pub struct GridConfig {
    /// Chunk origin in map space
    pub position: Vec2,
    /// Side length of the chunk
    pub grid_size: f32,
    /// Voxels per side
    pub resolution: u32,
    /// Template cell holding the feature angle limits
    pub cell: VoxelCell,
    /// One surface per material, material `n` uses entry `n - 1`
    pub surfaces: Vec<SurfaceConfig>,
}

/// A chunk of voxels and its meshes
#[derive(Clone)]
pub struct VoxelGrid {
    position: Vec2,
    grid_size: f32,
    voxel_size: f32,
    shape: RuntimeShape<u32, 2>,
    voxels: Vec<Voxel>,
    renderers: Vec<VoxelRenderer>,
    cell: VoxelCell,
}

impl VoxelGrid {
    /// Create a chunk with all voxels empty. Renderer 0 stands for empty space and never draws.
    pub fn new(config: GridConfig) -> Self {
        let resolution = config.resolution.max(1);
        let shape = RuntimeShape::<u32, 2>::new([resolution, resolution]);
        let voxel_size = config.grid_size / resolution as f32;

        let voxels = (0..shape.size())
            .map(|i| {
                let [x, y] = shape.delinearize(i);
                Voxel::new(x, y, voxel_size)
            })
            .collect();

        let renderers = std::iter::once(VoxelRenderer::default())
            .chain(config.surfaces.into_iter().map(VoxelRenderer::new))
            .collect();

        Self {
            position: config.position,
            grid_size: config.grid_size,
            voxel_size,
            shape,
            voxels,
            renderers,
            cell: config.cell,
        }
    }

    /// Chunk origin in map space
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Side length of the chunk
    pub fn grid_size(&self) -> f32 {
        self.grid_size
    }

    /// Side length of one voxel
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Voxels per side
    pub fn resolution(&self) -> usize {
        self.shape.as_array()[0] as usize
    }

    /// All voxels, row major
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Mutable access to all voxels, row major. Meshes are only updated by the next triangulation.
    pub fn voxels_mut(&mut self) -> &mut [Voxel] {
        &mut self.voxels
    }

    /// The voxel at grid coordinate (`x`, `y`)
    pub fn voxel(&self, x: u32, y: u32) -> Option<&Voxel> {
        let resolution = self.resolution() as u32;
        if x >= resolution || y >= resolution {
            return None;
        }
        self.voxels.get(self.shape.linearize([x, y]) as usize)
    }

    /// The number of renderers, including the unused one for empty space
    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    /// Whether `state` has a renderer that can draw it
    pub fn has_renderer(&self, state: u32) -> bool {
        (state as usize) < self.renderers.len()
    }

    /// All renderers, index 0 is empty space
    pub fn renderers(&self) -> &[VoxelRenderer] {
        &self.renderers
    }

    /// The mesh of one material
    pub fn section(&self, state: u32) -> Option<&MeshSection> {
        match state {
            0 => None,
            state => self.renderers.get(state as usize).map(VoxelRenderer::section),
        }
    }

    /// Empty every voxel and drop all crossings
    pub fn reset_states(&mut self) {
        for voxel in &mut self.voxels {
            voxel.reset();
        }
    }

    /// Apply `stencil` to every voxel in `range`
    pub fn set_states<S: VoxelStencil>(&mut self, stencil: &S, range: VoxelRange) {
        if !self.has_renderer(stencil.fill_type()) {
            return;
        }

        for y in range.y_start..=range.y_end {
            for x in range.x_start..=range.x_end {
                let i = self.shape.linearize([x as u32, y as u32]) as usize;
                stencil.apply_voxel(&mut self.voxels[i]);
            }
        }
    }

    /// Recompute the crossings touched by `stencil`. The range grows by one voxel towards the origin
    /// so edges leading into the edited area are refreshed, and edges into the +X and +Y neighbors
    /// are handled when the range reaches the chunk border.
    pub fn set_crossings<S: VoxelStencil>(
        &mut self,
        stencil: &S,
        range: VoxelRange,
        neighbors: ChunkNeighbors,
    ) {
        if !self.has_renderer(stencil.fill_type()) {
            return;
        }

        let resolution = self.resolution() as isize;
        let VoxelRange {
            mut x_start,
            mut x_end,
            mut y_start,
            mut y_end,
        } = range;
        let mut include_last_row = false;
        let mut cross_x = false;
        let mut cross_y = false;

        if x_start > 0 {
            x_start -= 1;
        }
        if x_end == resolution - 1 {
            x_end -= 1;
            cross_x = neighbors.x.is_some();
        }
        if y_start > 0 {
            y_start -= 1;
        }
        if y_end == resolution - 1 {
            y_end -= 1;
            include_last_row = true;
            cross_y = neighbors.y.is_some();
        }

        let stride = resolution as usize;

        for y in y_start..=y_end {
            let mut i = (y * resolution + x_start) as usize;
            for _ in x_start..=x_end {
                self.set_horizontal(stencil, i, self.voxels[i + 1]);
                self.set_vertical(stencil, i, self.voxels[i + stride]);
                i += 1;
            }
            self.set_vertical(stencil, i, self.voxels[i + stride]);

            if cross_x {
                let neighbor = neighbors.x.and_then(|voxels| voxels.get(y as usize * stride));
                if let Some(neighbor) = neighbor {
                    self.set_horizontal(stencil, i, neighbor.shifted(Seam::X, self.grid_size));
                }
            }
        }

        if include_last_row {
            let mut i = self.voxels.len() - stride + x_start as usize;
            for x in x_start..=x_end {
                self.set_horizontal(stencil, i, self.voxels[i + 1]);
                if cross_y {
                    let neighbor = neighbors.y.and_then(|voxels| voxels.get(x as usize));
                    if let Some(neighbor) = neighbor {
                        self.set_vertical(stencil, i, neighbor.shifted(Seam::Y, self.grid_size));
                    }
                }
                i += 1;
            }

            if cross_y {
                let neighbor = neighbors
                    .y
                    .and_then(|voxels| voxels.get((x_end + 1) as usize));
                if let Some(neighbor) = neighbor {
                    self.set_vertical(stencil, i, neighbor.shifted(Seam::Y, self.grid_size));
                }
            }

            if cross_x {
                let neighbor = neighbors
                    .x
                    .and_then(|voxels| voxels.get(self.voxels.len() - stride));
                if let Some(neighbor) = neighbor {
                    self.set_horizontal(stencil, i, neighbor.shifted(Seam::X, self.grid_size));
                }
            }
        }
    }

    fn set_horizontal<S: VoxelStencil>(&mut self, stencil: &S, i: usize, x_max: Voxel) {
        stencil.set_horizontal_crossing(&mut self.voxels[i], &x_max);
    }

    fn set_vertical<S: VoxelStencil>(&mut self, stencil: &S, i: usize, y_max: Voxel) {
        stencil.set_vertical_crossing(&mut self.voxels[i], &y_max);
    }

    /// Rebuild every mesh of this chunk
    pub fn triangulate(&mut self, neighbors: ChunkNeighbors) {
        self.sweep().run(neighbors);
    }

    /// Split the chunk into its voxels and a sweep over its renderers
    pub(crate) fn sweep(&mut self) -> Sweep<'_> {
        let resolution = self.resolution();
        Sweep {
            voxels: &self.voxels,
            renderers: &mut self.renderers,
            neighbors: ChunkNeighbors::default(),
            cell: self.cell,
            resolution,
            grid_size: self.grid_size,
        }
    }
}

/// A single pass over all cells of a chunk. Borrows the chunk's voxels immutably and its renderers
/// mutably, so sweeps of different chunks can run at the same time.
pub(crate) struct Sweep<'a> {
    voxels: &'a [Voxel],
    renderers: &'a mut [VoxelRenderer],
    neighbors: ChunkNeighbors<'a>,
    cell: VoxelCell,
    resolution: usize,
    grid_size: f32,
}

impl<'a> Sweep<'a> {
    /// The voxels of the swept chunk
    pub fn voxels(&self) -> &'a [Voxel] {
        self.voxels
    }

    /// Clear, rebuild and finish every material mesh
    pub fn run(mut self, neighbors: ChunkNeighbors<'a>) {
        self.neighbors = neighbors;

        for renderer in &mut self.renderers[1..] {
            renderer.clear();
        }

        self.fill_first_row_cache();
        self.triangulate_cell_rows();

        if self.neighbors.y.is_some() {
            self.triangulate_gap_row();
        }

        for renderer in &mut self.renderers[1..] {
            renderer.apply();
        }
    }

    fn shifted(&self, voxels: &[Voxel], i: usize, seam: Seam) -> Voxel {
        voxels[i].shifted(seam, self.grid_size)
    }

    fn fill_first_row_cache(&mut self) {
        let voxels = self.voxels;
        let cells = self.resolution - 1;

        self.cache_first_corner(&voxels[0]);
        for i in 0..cells {
            self.cache_next_edge_and_corner(i, &voxels[i], &voxels[i + 1]);
        }

        if let Some(x) = self.neighbors.x {
            let dummy = self.shifted(x, 0, Seam::X);
            self.cache_next_edge_and_corner(cells, &voxels[cells], &dummy);
        }
    }

    fn triangulate_cell_rows(&mut self) {
        let voxels = self.voxels;
        let resolution = self.resolution;
        let cells = resolution - 1;

        for y in 0..cells {
            let mut i = y * resolution;
            self.swap_row_caches();
            self.cache_first_corner(&voxels[i + resolution]);
            self.cache_next_middle_edge(&voxels[i], &voxels[i + resolution]);

            for x in 0..cells {
                let a = Corner::Local(&voxels[i]);
                let b = Corner::Local(&voxels[i + 1]);
                let c = Corner::Local(&voxels[i + resolution]);
                let d = Corner::Local(&voxels[i + resolution + 1]);
                self.cache_next_edge_and_corner(x, &c, &d);
                self.cache_next_middle_edge(&b, &d);
                self.triangulate_cell(x, a, b, c, d);
                i += 1;
            }

            if let Some(x) = self.neighbors.x {
                self.triangulate_gap_cell(i, x);
            }
        }
    }

    /// The cell between the last column of this chunk and the first column of the +X neighbor
    fn triangulate_gap_cell(&mut self, i: usize, x_neighbor: &[Voxel]) {
        let voxels = self.voxels;
        let resolution = self.resolution;
        let cache_index = resolution - 1;

        let b = Corner::shifted(&x_neighbor[i + 1 - resolution], Seam::X, self.grid_size);
        let d = Corner::shifted(&x_neighbor[i + 1], Seam::X, self.grid_size);
        let a = Corner::Local(&voxels[i]);
        let c = Corner::Local(&voxels[i + resolution]);

        self.cache_next_edge_and_corner(cache_index, &c, &d);
        self.cache_next_middle_edge(&b, &d);
        self.triangulate_cell(cache_index, a, b, c, d);
    }

    /// The row of cells between the last row of this chunk and the first row of the +Y neighbor
    fn triangulate_gap_row(&mut self) {
        let Some(y_neighbor) = self.neighbors.y else {
            return;
        };
        let voxels = self.voxels;
        let resolution = self.resolution;
        let cells = resolution - 1;
        let offset = cells * resolution;

        let mut top = self.shifted(y_neighbor, 0, Seam::Y);
        self.swap_row_caches();
        self.cache_first_corner(&top);
        self.cache_next_middle_edge(&voxels[offset], &top);

        for x in 0..cells {
            let c = top;
            top = self.shifted(y_neighbor, x + 1, Seam::Y);

            self.cache_next_edge_and_corner(x, &c, &top);
            self.cache_next_middle_edge(&voxels[x + offset + 1], &top);
            self.triangulate_cell(
                x,
                Corner::Local(&voxels[x + offset]),
                Corner::Local(&voxels[x + offset + 1]),
                Corner::Shifted(c),
                Corner::Shifted(top),
            );
        }

        if let (Some(x_neighbor), Some(xy_neighbor)) = (self.neighbors.x, self.neighbors.xy) {
            let b = self.shifted(x_neighbor, offset, Seam::X);
            let d = self.shifted(xy_neighbor, 0, Seam::XY);

            self.cache_next_edge_and_corner(cells, &top, &d);
            self.cache_next_middle_edge(&b, &d);
            self.triangulate_cell(
                cells,
                Corner::Local(&voxels[voxels.len() - 1]),
                Corner::Shifted(b),
                Corner::Shifted(top),
                Corner::Shifted(d),
            );
        }
    }

    fn renderer(&mut self, state: u32) -> &mut VoxelRenderer {
        assert!(
            (state as usize) < self.renderers.len(),
            "voxel state {state} has no renderer"
        );
        &mut self.renderers[state as usize]
    }

    fn cache_first_corner(&mut self, voxel: &Voxel) {
        if voxel.is_filled() {
            self.renderer(voxel.state)
                .surface_mut()
                .cache_first_corner(voxel);
        }
    }

    /// Edge vertices always come from the lower corner, so both materials on an edge share the
    /// crossing the lower corner stores
    fn cache_next_edge_and_corner(&mut self, i: usize, x_min: &Voxel, x_max: &Voxel) {
        if x_min.state != x_max.state {
            if x_min.is_filled() {
                self.renderer(x_min.state)
                    .surface_mut()
                    .cache_x_edge(i, x_min);
            }
            if x_max.is_filled() {
                self.renderer(x_max.state)
                    .surface_mut()
                    .cache_x_edge(i, x_min);
            }
        }
        if x_max.is_filled() {
            self.renderer(x_max.state)
                .surface_mut()
                .cache_next_corner(i, x_max);
        }
    }

    fn cache_next_middle_edge(&mut self, y_min: &Voxel, y_max: &Voxel) {
        for renderer in &mut self.renderers[1..] {
            renderer.prepare_cache_for_next_cell();
        }
        if y_min.state != y_max.state {
            if y_min.is_filled() {
                self.renderer(y_min.state).surface_mut().cache_y_edge(y_min);
            }
            if y_max.is_filled() {
                self.renderer(y_max.state).surface_mut().cache_y_edge(y_min);
            }
        }
    }

    fn swap_row_caches(&mut self) {
        for renderer in &mut self.renderers[1..] {
            renderer.prepare_cache_for_next_row();
        }
    }

    fn triangulate_cell(&mut self, i: usize, a: Corner, b: Corner, c: Corner, d: Corner) {
        let (a, b, c, d) = (a.voxel(), b.voxel(), c.voxel(), d.voxel());
        self.cell.set(i, a, b, c, d);
        let (sa, sb, sc, sd) = (a.state, b.state, c.state, d.state);

        match CellCase::classify(sa, sb, sc, sd) {
            CellCase::C0000 => self.fill(sa, |r, cell| r.fill_abcd(cell)),
            CellCase::C0001 => {
                let f = self.cell.feature_ne();
                self.fill(sa, |r, cell| r.fill_abc(cell, f));
                self.fill(sd, |r, cell| r.fill_d(cell, f));
            }
            CellCase::C0010 => {
                let f = self.cell.feature_nw();
                self.fill(sa, |r, cell| r.fill_abd(cell, f));
                self.fill(sc, |r, cell| r.fill_c(cell, f));
            }
            CellCase::C0100 => {
                let f = self.cell.feature_se();
                self.fill(sa, |r, cell| r.fill_acd(cell, f));
                self.fill(sb, |r, cell| r.fill_b(cell, f));
            }
            CellCase::C0111 => {
                let f = self.cell.feature_sw();
                self.fill(sa, |r, cell| r.fill_a(cell, f));
                self.fill(sb, |r, cell| r.fill_bcd(cell, f));
            }
            CellCase::C0011 => {
                let f = self.cell.feature_ew();
                self.fill(sa, |r, cell| r.fill_ab(cell, f));
                self.fill(sc, |r, cell| r.fill_cd(cell, f));
            }
            CellCase::C0101 => {
                let f = self.cell.feature_ns();
                self.fill(sa, |r, cell| r.fill_ac(cell, f));
                self.fill(sb, |r, cell| r.fill_bd(cell, f));
            }
            CellCase::C0012 => {
                let f = self.cell.feature_new();
                self.fill(sa, |r, cell| r.fill_ab(cell, f));
                self.fill(sc, |r, cell| r.fill_c(cell, f));
                self.fill(sd, |r, cell| r.fill_d(cell, f));
            }
            CellCase::C0102 => {
                let f = self.cell.feature_nse();
                self.fill(sa, |r, cell| r.fill_ac(cell, f));
                self.fill(sb, |r, cell| r.fill_b(cell, f));
                self.fill(sd, |r, cell| r.fill_d(cell, f));
            }
            CellCase::C0121 => {
                let f = self.cell.feature_nsw();
                self.fill(sa, |r, cell| r.fill_a(cell, f));
                self.fill(sb, |r, cell| r.fill_bd(cell, f));
                self.fill(sc, |r, cell| r.fill_c(cell, f));
            }
            CellCase::C0122 => {
                let f = self.cell.feature_sew();
                self.fill(sa, |r, cell| r.fill_a(cell, f));
                self.fill(sb, |r, cell| r.fill_b(cell, f));
                self.fill(sc, |r, cell| r.fill_cd(cell, f));
            }
            CellCase::C0110 => self.triangulate_0110(),
            CellCase::C0112 => self.triangulate_0112(),
            CellCase::C0120 => self.triangulate_0120(),
            CellCase::C0123 => {
                let [fa, fb, fc, fd] = self.corner_features();
                self.fill_joined_corners(fa, fb, fc, fd);
            }
        }
    }

    fn corner_features(&self) -> [FeaturePoint; 4] {
        [
            self.cell.feature_sw(),
            self.cell.feature_se(),
            self.cell.feature_nw(),
            self.cell.feature_ne(),
        ]
    }

    /// Saddle with `a`, `d` on one state and `b`, `c` on another
    fn triangulate_0110(&mut self) {
        let [fa, fb, fc, fd] = self.corner_features();

        if self.cell.has_connection_ad(&fa, &fd) {
            self.fill_ad_connection(fb, fc);
        } else if self.cell.has_connection_bc(&fb, &fc) {
            self.fill_bc_connection(fa, fd);
        } else if self.cell.a.is_filled() && self.cell.b.is_filled() {
            self.fill_joined_corners(fa, fb, fc, fd);
        } else {
            let (sa, sb, sc, sd) = self.states();
            self.fill(sa, |r, cell| r.fill_a(cell, fa));
            self.fill(sb, |r, cell| r.fill_b(cell, fb));
            self.fill(sc, |r, cell| r.fill_c(cell, fc));
            self.fill(sd, |r, cell| r.fill_d(cell, fd));
        }
    }

    /// `b` and `c` share a state, `d` has a third one
    fn triangulate_0112(&mut self) {
        let [fa, fb, fc, fd] = self.corner_features();

        if self.cell.has_connection_bc(&fb, &fc) {
            self.fill_bc_connection(fa, fd);
        } else if self.cell.b.is_filled() || self.cell.has_connection_ad(&fa, &fd) {
            self.fill_joined_corners(fa, fb, fc, fd);
        } else {
            let (sa, _, _, sd) = self.states();
            self.fill(sa, |r, cell| r.fill_a(cell, fa));
            self.fill(sd, |r, cell| r.fill_d(cell, fd));
        }
    }

    /// `a` and `d` share a state, `c` has a third one
    fn triangulate_0120(&mut self) {
        let [fa, fb, fc, fd] = self.corner_features();

        if self.cell.has_connection_ad(&fa, &fd) {
            self.fill_ad_connection(fb, fc);
        } else if self.cell.a.is_filled() || self.cell.has_connection_bc(&fb, &fc) {
            self.fill_joined_corners(fa, fb, fc, fd);
        } else {
            let (_, sb, sc, _) = self.states();
            self.fill(sb, |r, cell| r.fill_b(cell, fb));
            self.fill(sc, |r, cell| r.fill_c(cell, fc));
        }
    }

    /// The A-D diagonal is connected, `b` and `c` are cut off
    fn fill_ad_connection(&mut self, mut fb: FeaturePoint, mut fc: FeaturePoint) {
        fb.exists &= self.cell.is_inside_abd(fb.position);
        fc.exists &= self.cell.is_inside_acd(fc.position);

        let (sa, sb, sc, _) = self.states();
        self.fill(sa, |r, cell| r.fill_ad_to_b(cell, fb));
        self.fill(sa, |r, cell| r.fill_ad_to_c(cell, fc));
        self.fill(sb, |r, cell| r.fill_b(cell, fb));
        self.fill(sc, |r, cell| r.fill_c(cell, fc));
    }

    /// The B-C diagonal is connected, `a` and `d` are cut off
    fn fill_bc_connection(&mut self, mut fa: FeaturePoint, mut fd: FeaturePoint) {
        fa.exists &= self.cell.is_inside_abc(fa.position);
        fd.exists &= self.cell.is_inside_bcd(fd.position);

        let (sa, sb, _, sd) = self.states();
        self.fill(sa, |r, cell| r.fill_a(cell, fa));
        self.fill(sd, |r, cell| r.fill_d(cell, fd));
        self.fill(sb, |r, cell| r.fill_bc_to_a(cell, fa));
        self.fill(sb, |r, cell| r.fill_bc_to_d(cell, fd));
    }

    /// Every corner meets in one shared point
    fn fill_joined_corners(
        &mut self,
        fa: FeaturePoint,
        fb: FeaturePoint,
        fc: FeaturePoint,
        fd: FeaturePoint,
    ) {
        let point = FeaturePoint::average4(fa, fb, fc, fd);
        let point = if point.exists {
            point
        } else {
            FeaturePoint::new(self.cell.average_nesw())
        };

        let (sa, sb, sc, sd) = self.states();
        self.fill(sa, |r, cell| r.fill_a(cell, point));
        self.fill(sb, |r, cell| r.fill_b(cell, point));
        self.fill(sc, |r, cell| r.fill_c(cell, point));
        self.fill(sd, |r, cell| r.fill_d(cell, point));
    }

    fn states(&self) -> (u32, u32, u32, u32) {
        (
            self.cell.a.state,
            self.cell.b.state,
            self.cell.c.state,
            self.cell.d.state,
        )
    }

    /// Run `fill` on the renderer of `state`, empty space draws nothing
    fn fill(&mut self, state: u32, fill: impl FnOnce(&mut VoxelRenderer, &VoxelCell)) {
        if state > 0 {
            fill(&mut self.renderers[state as usize], &self.cell);
        }
    }
}

#[cfg(test)]
fn test_grid(resolution: u32, materials: usize) -> VoxelGrid {
    VoxelGrid::new(GridConfig {
        grid_size: resolution as f32,
        resolution,
        surfaces: (0..materials)
            .map(|_| SurfaceConfig {
                grid_size: resolution as f32,
                resolution: resolution as usize,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    })
}

#[cfg(test)]
fn set_cell_states(grid: &mut VoxelGrid, states: [u32; 4]) {
    for (voxel, state) in grid.voxels_mut().iter_mut().zip(states) {
        voxel.state = state;
    }
}

#[cfg(test)]
fn triangle_counts(grid: &VoxelGrid) -> Vec<usize> {
    grid.renderers()[1..]
        .iter()
        .map(|r| r.section().triangle_count())
        .collect()
}

#[test]
fn voxels_are_laid_out_row_major() {
    let grid = test_grid(4, 1);
    assert_eq!(16, grid.voxels().len());
    assert_eq!(Vec2::new(1.5, 0.5), grid.voxels()[1].position);
    assert_eq!(Vec2::new(0.5, 1.5), grid.voxels()[4].position);
    assert_eq!(grid.voxels()[13], *grid.voxel(1, 3).unwrap());
    assert!(grid.voxel(4, 0).is_none());
}

#[test]
fn renderer_zero_is_empty_space() {
    let grid = test_grid(2, 2);
    assert_eq!(3, grid.renderer_count());
    assert!(grid.has_renderer(2));
    assert!(!grid.has_renderer(3));
    assert!(grid.section(0).is_none());
    assert!(grid.section(2).is_some());
}

#[test]
fn full_cell_is_one_quad() {
    let mut grid = test_grid(2, 1);
    set_cell_states(&mut grid, [1; 4]);
    grid.triangulate(ChunkNeighbors::default());

    let section = grid.section(1).unwrap();
    assert_eq!(4, section.vertex_count());
    assert_eq!(2, section.triangle_count());
}

#[test]
fn empty_chunk_has_no_geometry() {
    let mut grid = test_grid(4, 1);
    grid.triangulate(ChunkNeighbors::default());
    assert!(grid.section(1).unwrap().is_empty());
}

#[test]
fn every_cell_case_triangulates() {
    for case in CellCase::ALL {
        let mut states = [0u32; 4];
        let labels = (0..4u32)
            .flat_map(|a| (0..4u32).map(move |b| (a, b)))
            .flat_map(|(a, b)| (0..4u32).map(move |c| (a, b, c)))
            .flat_map(|(a, b, c)| (0..4u32).map(move |d| [a, b, c, d]))
            .find(|s| CellCase::classify(s[0], s[1], s[2], s[3]) == case)
            .unwrap();

        // Once with label 0 as empty space and once with every corner filled
        for shift in [0, 1] {
            for (state, label) in states.iter_mut().zip(labels) {
                *state = label + shift;
            }

            let mut grid = test_grid(2, 4);
            set_cell_states(&mut grid, states);
            grid.triangulate(ChunkNeighbors::default());

            for state in states.into_iter().filter(|s| *s > 0) {
                let section = grid.section(state).unwrap();
                assert!(
                    section.triangle_count() > 0,
                    "{case:?} drew nothing for state {state} of {states:?}"
                );
                assert_eq!(0, section.index_count() % 3);
            }
        }
    }
}

#[test]
fn saddle_output_is_deterministic() {
    let build = || {
        let mut grid = test_grid(2, 2);
        set_cell_states(&mut grid, [1, 2, 2, 1]);
        grid.triangulate(ChunkNeighbors::default());
        grid
    };

    let first = build();
    let second = build();
    for state in [1, 2] {
        assert_eq!(
            first.section(state).unwrap().positions,
            second.section(state).unwrap().positions
        );
        assert_eq!(
            first.section(state).unwrap().indices,
            second.section(state).unwrap().indices
        );
    }
}

#[test]
fn retriangulating_gives_identical_meshes() {
    let mut grid = test_grid(4, 2);
    set_cell_states(&mut grid, [1, 1, 2, 0]);
    grid.voxels_mut()[5].state = 2;
    grid.voxels_mut()[10].state = 1;

    grid.triangulate(ChunkNeighbors::default());
    let counts = triangle_counts(&grid);
    let positions = grid.section(1).unwrap().positions.clone();

    grid.triangulate(ChunkNeighbors::default());
    assert_eq!(counts, triangle_counts(&grid));
    assert_eq!(positions, grid.section(1).unwrap().positions);
}

#[test]
fn gap_cells_use_neighbor_voxels() {
    let mut grid = test_grid(2, 1);
    set_cell_states(&mut grid, [1; 4]);

    let mut neighbor = test_grid(2, 1);
    set_cell_states(&mut neighbor, [1; 4]);

    grid.triangulate(ChunkNeighbors {
        x: Some(neighbor.voxels()),
        ..Default::default()
    });
    // The own cell plus the gap cell towards +X
    assert_eq!(4, grid.section(1).unwrap().triangle_count());

    grid.triangulate(ChunkNeighbors {
        x: Some(neighbor.voxels()),
        y: Some(neighbor.voxels()),
        xy: Some(neighbor.voxels()),
    });
    // Plus the gap row and its corner cell
    assert_eq!(8, grid.section(1).unwrap().triangle_count());

    let max_x = grid
        .section(1)
        .unwrap()
        .positions
        .iter()
        .fold(f32::MIN, |max, p| max.max(p.x));
    assert_eq!(2., max_x);
}

#[test]
fn reset_clears_every_voxel() {
    let mut grid = test_grid(2, 1);
    set_cell_states(&mut grid, [1; 4]);
    grid.voxels_mut()[0].x_edge = 0.7;
    grid.reset_states();
    assert!(grid
        .voxels()
        .iter()
        .all(|v| v.state == 0 && !v.has_x_crossing() && !v.has_y_crossing()));
}
