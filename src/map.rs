//! The map owns every chunk and routes edits and triangulation to them.
//!
//! Chunks live in one row major arena. A chunk's +X, +Y and diagonal neighbors always sit at higher
//! indices, so a chunk and the voxels of its neighbors can be borrowed together by splitting the arena
//! right after the chunk.

use std::sync::Arc;

use bevy::{
    log::{debug, info, trace, warn},
    prelude::*,
    tasks::TaskPool,
    utils::{HashMap, HashSet},
};
use fast_surface_nets::ndshape::{RuntimeShape, Shape};
use smallvec::SmallVec;

use crate::{
    ChunkNeighbors, GradientSampler, GridConfig, HeightSampler, MeshSection, MeshSimplifier,
    PolygonStencil, SettingsError, Stencil, SurfaceConfig, Voxel, VoxelCell, VoxelGrid,
    VoxelMapSettings, VoxelStencil,
};

/// Indices of chunks, usually only a handful
pub type ChunkIndices = SmallVec<[usize; 8]>;

/// Samplers shared by every chunk of a map
#[derive(Clone, Default)]
pub struct SurfaceSamplers {
    /// Height source for every material
    pub height: Option<Arc<dyn HeightSampler>>,
    /// Color source per material, material `n` uses entry `n - 1`
    pub gradients: Vec<Option<Arc<dyn GradientSampler>>>,
    /// Simplifier used by materials that enable it
    pub simplifier: Option<Arc<dyn MeshSimplifier>>,
}

/// The chunks touched by an edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditResult {
    /// Chunks whose voxels changed
    pub chunks: ChunkIndices,
    /// Chunks whose meshes are out of date: the edited ones and the chunks reading them across a seam
    pub dirty: ChunkIndices,
}

impl EditResult {
    /// Whether the edit touched nothing
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// The footprint of a placed prefab, one rectangle per bounds pair
#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut)]
pub struct PrefabBounds(pub Vec<Rect>);

impl PrefabBounds {
    /// The same footprint moved by `offset`
    pub fn shifted(&self, offset: Vec2) -> Self {
        Self(
            self.0
                .iter()
                .map(|rect| Rect::from_corners(rect.min + offset, rect.max + offset))
                .collect(),
        )
    }

    /// Whether any rectangle overlaps a rectangle of `other`. Rectangles that only touch, within a
    /// small tolerance, don't overlap.
    pub fn intersects(&self, other: &PrefabBounds) -> bool {
        const TOUCH_TOLERANCE: f32 = 1e-3;
        let near = |a: f32, b: f32| (a - b).abs() <= TOUCH_TOLERANCE;

        self.iter().any(|b0| {
            other.iter().any(|b1| {
                let overlaps = b0.min.x <= b1.max.x
                    && b1.min.x <= b0.max.x
                    && b0.min.y <= b1.max.y
                    && b1.min.y <= b0.max.y;
                let touches = near(b0.min.x, b1.max.x)
                    || near(b1.min.x, b0.max.x)
                    || near(b0.min.y, b1.max.y)
                    || near(b1.min.y, b0.max.y);
                overlaps && !touches
            })
        })
    }
}

/// Build prefab bounds from named points. Every `Bounds_MIN_<name>` point, matched case insensitively,
/// pairs with the `Bounds_MAX_<name>` point of the same suffix. Coordinates are rounded to whole units.
pub fn prefab_bounds_from_sockets(sockets: &[(&str, Vec2)]) -> PrefabBounds {
    const MIN_PREFIX: &str = "Bounds_MIN_";
    const MAX_PREFIX: &str = "Bounds_MAX_";

    let rects = sockets
        .iter()
        .filter_map(|(name, min)| {
            let prefix = name.get(..MIN_PREFIX.len())?;
            if !prefix.eq_ignore_ascii_case(MIN_PREFIX) {
                return None;
            }
            let max_name = format!("{MAX_PREFIX}{}", &name[MIN_PREFIX.len()..]);
            let (_, max) = sockets.iter().find(|(name, _)| *name == max_name)?;
            Some(Rect::from_corners(min.round(), max.round()))
        })
        .collect();

    PrefabBounds(rects)
}

/// A square map of chunks
#[derive(Resource, Clone)]
pub struct VoxelMap {
    settings: VoxelMapSettings,
    samplers: SurfaceSamplers,
    chunk_size: f32,
    voxel_size: f32,
    chunks: Vec<VoxelGrid>,
    applied_prefabs: Vec<PrefabBounds>,
}

impl VoxelMap {
    /// Create a map without chunks, call [VoxelMap::initialize] to build them
    pub fn new(settings: VoxelMapSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size(),
            voxel_size: settings.voxel_size(),
            settings,
            samplers: SurfaceSamplers::default(),
            chunks: Vec::new(),
            applied_prefabs: Vec::new(),
        }
    }

    /// Validate `settings` and create an initialized map
    pub fn try_new(settings: VoxelMapSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let mut map = Self::new(settings);
        map.initialize();
        Ok(map)
    }

    /// Use `samplers` for every chunk built by the next [VoxelMap::initialize]
    pub fn with_samplers(mut self, samplers: SurfaceSamplers) -> Self {
        self.samplers = samplers;
        self
    }

    /// Replace the samplers, used by the next [VoxelMap::initialize]
    pub fn set_samplers(&mut self, samplers: SurfaceSamplers) {
        self.samplers = samplers;
    }

    /// The settings of this map
    pub fn settings(&self) -> &VoxelMapSettings {
        &self.settings
    }

    /// Replace the settings, used by the next [VoxelMap::initialize]
    pub fn set_settings(&mut self, settings: VoxelMapSettings) {
        self.settings = settings;
    }

    /// Rebuild every chunk from the settings. Invalid settings leave the map without chunks.
    pub fn initialize(&mut self) {
        let Some(configs) = self.prepare_chunks() else {
            return;
        };
        self.chunks = configs.into_iter().map(VoxelGrid::new).collect();
        self.log_initialized();
    }

    /// Same as [VoxelMap::initialize], building one chunk per task
    pub fn initialize_parallel(&mut self, pool: &TaskPool) {
        let Some(configs) = self.prepare_chunks() else {
            return;
        };

        let mut chunks = pool.scope(|scope| {
            for (i, config) in configs.into_iter().enumerate() {
                scope.spawn(async move { (i, VoxelGrid::new(config)) });
            }
        });
        chunks.sort_by_key(|(i, _)| *i);

        self.chunks = chunks.into_iter().map(|(_, chunk)| chunk).collect();
        self.log_initialized();
    }

    /// Drop the chunks and validate the settings, returning the config of every chunk to build
    fn prepare_chunks(&mut self) -> Option<Vec<GridConfig>> {
        self.clear();

        if let Err(error) = self.settings.validate() {
            warn!("voxel map left empty: {error}");
            return None;
        }

        self.chunk_size = self.settings.chunk_size();
        self.voxel_size = self.settings.voxel_size();

        let shape = self.chunk_shape();
        let configs = (0..shape.size())
            .map(|i| {
                let [x, y] = shape.delinearize(i);
                self.grid_config(x, y)
            })
            .collect();
        Some(configs)
    }

    fn log_initialized(&self) {
        info!(
            "initialized voxel map with {} chunks, chunk size {}, voxel size {}, {} materials",
            self.chunks.len(),
            self.chunk_size,
            self.voxel_size,
            self.material_count()
        );
    }

    fn grid_config(&self, x: u32, y: u32) -> GridConfig {
        let position = Vec2::new(x as f32, y as f32) * self.chunk_size;
        let surfaces = self
            .settings
            .surface_states
            .iter()
            .enumerate()
            .map(|(n, state)| SurfaceConfig {
                position,
                grid_size: self.chunk_size,
                resolution: self.settings.voxel_resolution as usize,
                extrusion_height: self.settings.extrusion_height,
                state: *state,
                height: self.samplers.height.clone(),
                gradient: self.samplers.gradients.get(n).cloned().flatten(),
                simplifier: self.samplers.simplifier.clone(),
            })
            .collect();

        GridConfig {
            position,
            grid_size: self.chunk_size,
            resolution: self.settings.voxel_resolution,
            cell: VoxelCell::new(
                self.settings.max_feature_angle,
                self.settings.max_parallel_angle,
            ),
            surfaces,
        }
    }

    /// Drop every chunk
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Whether the map has chunks
    pub fn is_initialized(&self) -> bool {
        !self.chunks.is_empty()
    }

    fn chunk_shape(&self) -> RuntimeShape<u32, 2> {
        let resolution = self.settings.chunk_resolution.max(1);
        RuntimeShape::<u32, 2>::new([resolution, resolution])
    }

    /// Chunks per map side
    pub fn chunk_resolution(&self) -> usize {
        self.settings.chunk_resolution as usize
    }

    /// The number of chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether `index` names a chunk
    pub fn has_chunk(&self, index: usize) -> bool {
        index < self.chunks.len()
    }

    /// The chunk at `index`
    pub fn chunk(&self, index: usize) -> Option<&VoxelGrid> {
        self.chunks.get(index)
    }

    /// All chunks, row major
    pub fn chunks(&self) -> &[VoxelGrid] {
        &self.chunks
    }

    /// Origin of the chunk at `index` in map space
    pub fn chunk_position(&self, index: usize) -> Option<Vec2> {
        self.chunk(index).map(VoxelGrid::position)
    }

    /// The mesh of material `state` in the chunk at `index`
    pub fn section(&self, index: usize, state: u32) -> Option<&MeshSection> {
        self.chunk(index)?.section(state)
    }

    /// Voxels per chunk side
    pub fn voxel_count(&self) -> u32 {
        self.settings.voxel_resolution
    }

    /// Voxels per map side
    pub fn voxel_dimension(&self) -> u32 {
        self.settings.voxel_resolution * self.settings.chunk_resolution
    }

    /// Side length of a chunk
    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Side length of a voxel
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// The number of materials
    pub fn material_count(&self) -> usize {
        self.settings.material_count()
    }

    /// Whether `fill_type` can be drawn, 0 always can as it erases
    pub fn has_renderer(&self, fill_type: u32) -> bool {
        fill_type as usize <= self.material_count()
    }

    /// Apply one stencil centered at `center`
    pub fn apply_edit(&mut self, stencil: &Stencil, center: Vec2) -> EditResult {
        self.edit(&[(stencil.clone(), center)])
    }

    /// Apply several stencils as one edit: the states of all of them are written before any
    /// crossing is computed
    pub fn apply_edits(&mut self, edits: &[(Stencil, Vec2)]) -> EditResult {
        self.edit(edits)
    }

    /// Apply every triangle of `polygon` where it was defined
    pub fn apply_polygon(&mut self, polygon: &PolygonStencil) -> EditResult {
        let edits: Vec<_> = polygon
            .triangles()
            .iter()
            .map(|triangle| (triangle.clone(), triangle.shifted_bounds_center()))
            .collect();
        self.edit(&edits)
    }

    fn edit<S: VoxelStencil + Clone>(&mut self, edits: &[(S, Vec2)]) -> EditResult {
        let mut result = EditResult::default();
        if !self.is_initialized() {
            return result;
        }

        let voxel_size = self.voxel_size;
        let chunk_size = self.chunk_size;
        let resolution = self.settings.voxel_resolution as usize;

        let mut placed: Vec<_> = edits
            .iter()
            .filter_map(|(stencil, center)| self.place(stencil, *center))
            .collect();

        for (stencil, center, range) in &mut placed {
            for (x, y) in range.iter_rev() {
                let i = self.chunk_index(x, y);
                stencil.set_center(*center - Vec2::new(x as f32, y as f32) * chunk_size);
                let voxels = stencil.chunk_range(voxel_size, resolution);
                self.chunks[i].set_states(stencil, voxels);

                if !result.chunks.contains(&i) {
                    result.chunks.push(i);
                }
            }
        }

        for (stencil, center, range) in &mut placed {
            for (x, y) in range.iter_rev() {
                let i = self.chunk_index(x, y);
                stencil.set_center(*center - Vec2::new(x as f32, y as f32) * chunk_size);
                let voxels = stencil.chunk_range(voxel_size, resolution);
                self.set_chunk_crossings(i, stencil, voxels);
            }
        }

        result.dirty = self.dirty_chunks(&result.chunks);
        debug!(
            "applied {} stencils to {} chunks, {} dirty",
            placed.len(),
            result.chunks.len(),
            result.dirty.len()
        );
        result
    }

    /// Prepare a copy of `stencil` for this map, `None` when its fill type can't be drawn
    fn place<S: VoxelStencil + Clone>(
        &self,
        stencil: &S,
        center: Vec2,
    ) -> Option<(S, Vec2, crate::VoxelRange)> {
        if !self.has_renderer(stencil.fill_type()) {
            warn!(
                "skipping stencil with fill type {}, the map has {} materials",
                stencil.fill_type(),
                self.material_count()
            );
            return None;
        }

        let mut stencil = stencil.clone();
        stencil.initialize(self.voxel_size);
        stencil.set_center(center);
        let range = stencil.map_range(self.voxel_size, self.chunk_size, self.chunk_resolution());
        Some((stencil, center, range))
    }

    fn set_chunk_crossings<S: VoxelStencil>(
        &mut self,
        i: usize,
        stencil: &S,
        range: crate::VoxelRange,
    ) {
        let indices = chunk_neighbors(self.chunk_resolution(), i);
        let (head, tail) = self.chunks.split_at_mut(i + 1);
        let neighbors = neighbors_in(tail, i + 1, indices);
        head[i].set_crossings(stencil, range, neighbors);
    }

    fn chunk_index(&self, x: usize, y: usize) -> usize {
        self.chunk_shape().linearize([x as u32, y as u32]) as usize
    }

    /// `chunks` plus the chunks left, below and diagonally below-left of them
    fn dirty_chunks(&self, chunks: &[usize]) -> ChunkIndices {
        let resolution = self.chunk_resolution();
        let mut dirty = ChunkIndices::new();
        let mut mark = |i: usize| {
            if !dirty.contains(&i) {
                dirty.push(i);
            }
        };

        for &i in chunks {
            let (x, y) = (i % resolution, i / resolution);
            mark(i);
            if x > 0 {
                mark(i - 1);
            }
            if y > 0 {
                mark(i - resolution);
                if x > 0 {
                    mark(i - resolution - 1);
                }
            }
        }
        dirty
    }

    /// The chunks `stencil` centered at `center` would touch, last row and column first
    pub fn chunk_indices(&self, stencil: &Stencil, center: Vec2) -> ChunkIndices {
        if !self.is_initialized() {
            return ChunkIndices::new();
        }

        let mut stencil = stencil.clone();
        stencil.initialize(self.voxel_size);
        stencil.set_center(center);
        stencil
            .map_range(self.voxel_size, self.chunk_size, self.chunk_resolution())
            .iter_rev()
            .map(|(x, y)| self.chunk_index(x, y))
            .collect()
    }

    /// The chunks any triangle of `polygon` would touch
    pub fn polygon_chunk_indices(&self, polygon: &PolygonStencil) -> ChunkIndices {
        let mut indices = ChunkIndices::new();
        for triangle in polygon.triangles() {
            let stencil = Stencil::from(triangle.clone());
            for i in self.chunk_indices(&stencil, triangle.shifted_bounds_center()) {
                if !indices.contains(&i) {
                    indices.push(i);
                }
            }
        }
        indices
    }

    /// Rebuild the meshes of one chunk
    pub fn triangulate_chunk(&mut self, index: usize) {
        if !self.has_chunk(index) {
            return;
        }

        let indices = chunk_neighbors(self.chunk_resolution(), index);
        let (head, tail) = self.chunks.split_at_mut(index + 1);
        let neighbors = neighbors_in(tail, index + 1, indices);
        let chunk = &mut head[index];
        chunk.triangulate(neighbors);

        trace!(
            "triangulated chunk {index}: {} vertices, {} indices",
            chunk
                .renderers()
                .iter()
                .map(|r| r.section().vertex_count())
                .sum::<usize>(),
            chunk
                .renderers()
                .iter()
                .map(|r| r.section().index_count())
                .sum::<usize>()
        );
    }

    /// Rebuild the meshes of several chunks
    pub fn triangulate_chunks(&mut self, indices: &[usize]) {
        for &i in indices {
            self.triangulate_chunk(i);
        }
    }

    /// Rebuild the meshes an edit invalidated
    pub fn refresh(&mut self, result: &EditResult) {
        self.triangulate_chunks(&result.dirty);
    }

    /// Rebuild every mesh of the map
    pub fn refresh_all_chunks(&mut self) {
        for i in 0..self.chunks.len() {
            self.triangulate_chunk(i);
        }
    }

    /// Rebuild every mesh of the map, one task per chunk. Every task writes its own chunk's meshes
    /// and only reads the voxels of other chunks.
    pub fn refresh_all_chunks_parallel(&mut self, pool: &TaskPool) {
        let resolution = self.chunk_resolution();
        let sweeps: Vec<_> = self.chunks.iter_mut().map(VoxelGrid::sweep).collect();
        let voxels: Vec<&[Voxel]> = sweeps.iter().map(|sweep| sweep.voxels()).collect();
        let voxels = &voxels;

        pool.scope(|scope| {
            for (i, sweep) in sweeps.into_iter().enumerate() {
                let [x, y, xy] = chunk_neighbors(resolution, i);
                let neighbors = ChunkNeighbors {
                    x: x.map(|n| voxels[n]),
                    y: y.map(|n| voxels[n]),
                    xy: xy.map(|n| voxels[n]),
                };
                scope.spawn(async move { sweep.run(neighbors) });
            }
        });

        debug!("triangulated {} chunks in parallel", self.chunks.len());
    }

    /// Empty every voxel of the given chunks
    pub fn reset_chunk_states(&mut self, indices: &[usize]) {
        for &i in indices {
            if let Some(chunk) = self.chunks.get_mut(i) {
                chunk.reset_states();
            }
        }
    }

    /// Empty every voxel of the map
    pub fn reset_all_chunk_states(&mut self) {
        for chunk in &mut self.chunks {
            chunk.reset_states();
        }
    }

    /// Whether `bounds` overlap any placed prefab
    pub fn has_intersecting_bounds(&self, bounds: &PrefabBounds) -> bool {
        self.applied_prefabs
            .iter()
            .any(|applied| bounds.intersects(applied))
    }

    /// Record a prefab with footprint `bounds` at `center`, unless it would overlap a placed one
    pub fn try_place_prefab(&mut self, bounds: &PrefabBounds, center: Vec2) -> bool {
        let bounds = bounds.shifted(center);
        if self.has_intersecting_bounds(&bounds) {
            return false;
        }
        self.applied_prefabs.push(bounds);
        true
    }

    /// Copy the triangles of `prefab` into `out`, moved to `center`, if its footprint doesn't overlap
    /// a placed prefab. Shared vertices are copied once. Vertices whose color has a red channel of at
    /// least 127 lie on the prefab border.
    ///
    /// With `apply_height` the copy follows the height sampler: every vertex is raised by the sampled
    /// height of the surface layer, or the extrusion layer with `inverse_height`. Border vertices take
    /// the sampled normal so they blend into the terrain, the others mix it into their own normal.
    pub fn apply_prefab(
        &mut self,
        prefab: &MeshSection,
        bounds: &PrefabBounds,
        center: Vec3,
        apply_height: bool,
        inverse_height: bool,
        out: &mut MeshSection,
    ) -> bool {
        let vertex_count = prefab.positions.len();
        if prefab.indices.is_empty() || prefab.indices.iter().any(|&i| i as usize >= vertex_count) {
            warn!(
                "skipping prefab with {} indices over {vertex_count} vertices",
                prefab.indices.len()
            );
            return false;
        }

        if !self.try_place_prefab(bounds, center.truncate()) {
            return false;
        }

        let offset = out.positions.len();
        let mut remap = HashMap::<u32, u32>::new();
        let mut border = HashSet::<u32>::new();

        for &index in &prefab.indices {
            let new_index = *remap.entry(index).or_insert_with(|| {
                let m = index as usize;
                let new_index = out.positions.len() as u32;
                out.positions.push(center + prefab.positions[m]);
                out.normals
                    .push(prefab.normals.get(m).copied().unwrap_or(Vec3::Z));
                let color = prefab.colors.get(m).copied().unwrap_or_default();
                out.colors.push(color);
                if color[0] >= 127 {
                    border.insert(new_index);
                }
                new_index
            });
            out.indices.push(new_index);
        }

        if apply_height {
            let half = self.voxel_size / 2.;
            let height = self.samplers.height.as_deref();
            let layer = height.and_then(|height| height.layer_for(inverse_height));
            let default_normal = if inverse_height { Vec3::NEG_Z } else { Vec3::Z };

            for i in offset..out.positions.len() {
                let position = &mut out.positions[i];
                let (h, n) = match (height, layer) {
                    (Some(height), Some(layer)) => {
                        let (h, n) = height.height_normal(position.x + half, position.y + half, layer);
                        (h, if inverse_height { -n } else { n })
                    }
                    _ => (0., default_normal),
                };

                position.z += h;
                let normal = &mut out.normals[i];
                *normal = if border.contains(&(i as u32)) {
                    n
                } else {
                    (*normal + n).normalize_or_zero()
                };
            }
        }

        for position in &out.positions[offset..] {
            out.bounds.include(*position);
        }

        debug!(
            "applied prefab with {} vertices and {} triangles at {center}",
            out.positions.len() - offset,
            prefab.indices.len() / 3
        );
        true
    }

    /// Footprints of every placed prefab
    pub fn applied_prefabs(&self) -> &[PrefabBounds] {
        &self.applied_prefabs
    }

    /// Forget every placed prefab
    pub fn clear_applied_prefabs(&mut self) {
        self.applied_prefabs.clear();
    }
}

/// Indices of the +X, +Y and diagonal neighbors of chunk `i`
fn chunk_neighbors(resolution: usize, i: usize) -> [Option<usize>; 3] {
    let (x, y) = (i % resolution, i / resolution);
    let has_x = x + 1 < resolution;
    let has_y = y + 1 < resolution;
    [
        has_x.then_some(i + 1),
        has_y.then_some(i + resolution),
        (has_x && has_y).then_some(i + resolution + 1),
    ]
}

/// Neighbor voxels out of `tail`, the part of the arena starting at chunk index `offset`
fn neighbors_in(tail: &[VoxelGrid], offset: usize, indices: [Option<usize>; 3]) -> ChunkNeighbors<'_> {
    let [x, y, xy] = indices.map(|n| n.map(|n| tail[n - offset].voxels()));
    ChunkNeighbors { x, y, xy }
}

#[cfg(test)]
fn test_map(map_size: u32, voxel_resolution: u32, chunk_resolution: u32) -> VoxelMap {
    VoxelMap::try_new(VoxelMapSettings {
        map_size,
        voxel_resolution,
        chunk_resolution,
        surface_states: vec![Default::default()],
        ..Default::default()
    })
    .unwrap()
}

#[cfg(test)]
fn circle(radius: f32, fill_type: u32) -> Stencil {
    crate::CircleStencil::new(radius, fill_type).into()
}

#[test]
fn circle_on_a_single_chunk() {
    let mut map = test_map(4, 4, 1);
    let stencil = circle(1.5, 1);
    let center = Vec2::new(2., 2.);

    assert_eq!(&[0], map.chunk_indices(&stencil, center).as_slice());

    let result = map.apply_edit(&stencil, center);
    assert_eq!(&[0], result.chunks.as_slice());
    map.refresh(&result);

    let section = map.section(0, 1).unwrap();
    assert!(section.vertex_count() > 0);
    assert_eq!(0, section.index_count() % 3);
    for position in &section.positions {
        assert!(position.truncate().distance(center) <= 1.5 + map.voxel_size());
    }
}

#[test]
fn box_fills_its_center() {
    let mut map = test_map(8, 8, 1);
    let stencil = crate::BoxStencil::new(Rect::new(2., 2., 5., 4.), 1);
    let center = stencil.bounds_center();
    map.apply_edit(&stencil.into(), center);

    // Voxel (3, 2) sits at (3.5, 2.5), right in the box
    assert_eq!(1, map.chunk(0).unwrap().voxel(3, 2).unwrap().state);
    assert_eq!(0, map.chunk(0).unwrap().voxel(6, 2).unwrap().state);
}

#[test]
fn box_corner_has_sharp_feature() {
    let mut map = test_map(8, 8, 1);
    let stencil = crate::BoxStencil::new(Rect::new(2.2, 2.2, 5.2, 5.2), 1);
    map.apply_edit(&stencil.clone().into(), stencil.bounds_center());

    // Only the south west corner of the cell from voxel (4, 4) to (5, 5) is inside the box, the
    // box's upper right corner at (5.2, 5.2) lies between its crossings
    let chunk = map.chunk(0).unwrap();
    let mut cell = VoxelCell::default();
    cell.set(
        4,
        *chunk.voxel(4, 4).unwrap(),
        *chunk.voxel(5, 4).unwrap(),
        *chunk.voxel(4, 5).unwrap(),
        *chunk.voxel(5, 5).unwrap(),
    );
    let feature = cell.feature_sw();
    assert!(feature.exists);
    assert!((feature.position - Vec2::new(5.2, 5.2)).length() < 1e-4);
    assert!(feature.position.x > cell.a.position.x && feature.position.x < cell.d.position.x);
}

#[test]
fn seam_vertices_match_across_chunks() {
    // Vertices of a chunk on the line x = 4 or y = 4, keyed by the other coordinate
    fn seam(map: &VoxelMap, index: usize, vertical: bool) -> Vec<(u32, u32)> {
        let mut points: Vec<_> = map
            .section(index, 1)
            .unwrap()
            .positions
            .iter()
            .filter(|p| if vertical { p.x == 4. } else { p.y == 4. })
            .map(|p| ((if vertical { p.y } else { p.x }).to_bits(), p.z.to_bits()))
            .collect();
        points.sort();
        points.dedup();
        points
    }

    for (center, radius, crosses_y) in [
        (Vec2::new(4., 2.), 1.5, false),
        (Vec2::new(4.3, 2.2), 1.5, false),
        (Vec2::new(4., 4.), 2.5, true),
        (Vec2::new(4., 4.), 1., true),
    ] {
        let mut map = test_map(8, 4, 2);
        let result = map.apply_edit(&circle(radius, 1), center);
        assert!(result.chunks.contains(&0) && result.chunks.contains(&1));
        map.refresh_all_chunks();

        let left = seam(&map, 0, true);
        assert!(!left.is_empty(), "{center}");
        assert_eq!(left, seam(&map, 1, true), "{center}");

        if crosses_y {
            let bottom = seam(&map, 0, false);
            assert!(!bottom.is_empty(), "{center}");
            assert_eq!(bottom, seam(&map, 2, false), "{center}");
        }
    }
}

#[test]
fn dirty_chunks_include_seam_readers() {
    let mut map = test_map(8, 4, 2);
    let result = map.apply_edit(&circle(0.5, 1), Vec2::new(6., 6.));
    assert_eq!(&[3], result.chunks.as_slice());

    let mut dirty = result.dirty.to_vec();
    dirty.sort();
    assert_eq!(vec![0, 1, 2, 3], dirty);
}

#[test]
fn states_are_written_before_crossings() {
    let mut map = test_map(8, 8, 1);
    let edits = [
        (
            Stencil::from(crate::BoxStencil::new(Rect::new(1., 1., 4., 4.), 1)),
            Vec2::new(2.5, 2.5),
        ),
        (
            Stencil::from(crate::BoxStencil::new(Rect::new(4., 1., 7., 4.), 1)),
            Vec2::new(5.5, 2.5),
        ),
    ];
    map.apply_edits(&edits);

    // Both boxes fill the voxels around x = 4, so no crossing may remain between them
    let chunk = map.chunk(0).unwrap();
    let voxel = chunk.voxel(3, 2).unwrap();
    assert_eq!(1, voxel.state);
    assert_eq!(1, chunk.voxel(4, 2).unwrap().state);
    assert!(!voxel.has_x_crossing());
}

#[test]
fn erasing_restores_empty_space() {
    let mut map = test_map(4, 4, 1);
    map.apply_edit(&circle(1.5, 1), Vec2::new(2., 2.));
    map.apply_edit(&circle(3., 0), Vec2::new(2., 2.));
    map.refresh_all_chunks();

    assert!(map.chunk(0).unwrap().voxels().iter().all(|v| v.state == 0));
    assert!(map.section(0, 1).unwrap().is_empty());
}

#[test]
fn unknown_fill_type_is_ignored() {
    let mut map = test_map(4, 4, 1);
    let result = map.apply_edit(&circle(1.5, 5), Vec2::new(2., 2.));
    assert!(result.is_empty());
    assert!(map.chunk(0).unwrap().voxels().iter().all(|v| v.state == 0));
}

#[test]
fn polygon_is_applied_where_it_was_defined() {
    let mut map = test_map(8, 4, 2);
    let polygon = PolygonStencil::from_points(
        &[
            Vec2::new(1., 1.),
            Vec2::new(7., 1.),
            Vec2::new(7., 3.),
            Vec2::new(1., 3.),
        ],
        1,
    );

    let mut expected = map.polygon_chunk_indices(&polygon).to_vec();
    let result = map.apply_polygon(&polygon);
    let mut chunks = result.chunks.to_vec();
    expected.sort();
    chunks.sort();
    assert_eq!(expected, chunks);

    // Chunk 1 starts at x = 4, its voxel (2, 1) sits at (6.5, 1.5)
    assert_eq!(1, map.chunk(1).unwrap().voxel(2, 1).unwrap().state);
    assert_eq!(0, map.chunk(2).unwrap().voxel(1, 1).unwrap().state);
}

#[test]
fn parallel_refresh_matches_sequential() {
    let mut map = test_map(8, 4, 2);
    map.apply_edit(&circle(2., 1), Vec2::new(4., 4.));

    let mut parallel = map.clone();
    map.refresh_all_chunks();
    parallel.refresh_all_chunks_parallel(&TaskPool::new());

    for i in 0..map.chunk_count() {
        let a = map.section(i, 1).unwrap();
        let b = parallel.section(i, 1).unwrap();
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.indices, b.indices);
    }
}

#[test]
fn parallel_initialize_matches_sequential() {
    let pool = TaskPool::new();
    let sequential = test_map(9, 3, 3);
    let mut parallel = VoxelMap::new(sequential.settings().clone());
    parallel.initialize_parallel(&pool);

    assert_eq!(9, parallel.chunk_count());
    for i in 0..sequential.chunk_count() {
        assert_eq!(sequential.chunk_position(i), parallel.chunk_position(i));
        assert_eq!(
            sequential.chunk(i).unwrap().voxels(),
            parallel.chunk(i).unwrap().voxels()
        );
        assert_eq!(2, parallel.chunk(i).unwrap().renderer_count());
    }

    let mut invalid = VoxelMap::new(VoxelMapSettings {
        map_size: 0,
        ..Default::default()
    });
    invalid.initialize_parallel(&pool);
    assert!(!invalid.is_initialized());
}

#[test]
fn wall_extrusion_pairs_every_vertex() {
    let mut map = VoxelMap::try_new(VoxelMapSettings {
        map_size: 4,
        voxel_resolution: 4,
        chunk_resolution: 1,
        extrusion_height: 2.,
        surface_states: vec![crate::SurfaceState {
            generate_extrusion: true,
            ..Default::default()
        }],
        ..Default::default()
    })
    .unwrap();
    map.apply_edit(&circle(1.5, 1), Vec2::new(2., 2.));
    map.refresh_all_chunks();

    let section = map.section(0, 1).unwrap();
    assert_eq!(0, section.vertex_count() % 2);
    for pair in section.positions.chunks(2) {
        assert_eq!(pair[0].truncate(), pair[1].truncate());
        assert_eq!(pair[0].z - 2., pair[1].z);
    }
    assert!(section
        .indices
        .iter()
        .all(|&i| (i as usize) < section.vertex_count()));
}

#[test]
fn reset_empties_chunks() {
    let mut map = test_map(8, 4, 2);
    map.apply_edit(&circle(3., 1), Vec2::new(4., 4.));
    map.reset_chunk_states(&[0, 99]);
    assert!(map.chunk(0).unwrap().voxels().iter().all(|v| v.state == 0));
    assert!(map.chunk(3).unwrap().voxels().iter().any(|v| v.state == 1));

    map.reset_all_chunk_states();
    assert!(map
        .chunks()
        .iter()
        .all(|c| c.voxels().iter().all(|v| v.state == 0)));
}

#[test]
fn invalid_settings_give_an_empty_map() {
    let mut map = VoxelMap::new(VoxelMapSettings {
        voxel_resolution: 0,
        ..Default::default()
    });
    map.initialize();
    assert!(!map.is_initialized());
    assert_eq!(0, map.chunk_count());
    assert!(map.apply_edit(&circle(1., 0), Vec2::ONE).is_empty());

    assert!(VoxelMap::try_new(VoxelMapSettings {
        chunk_resolution: 0,
        ..Default::default()
    })
    .is_err());
}

#[test]
fn map_queries() {
    let map = test_map(8, 4, 2);
    assert_eq!(4, map.chunk_count());
    assert_eq!(4., map.chunk_size());
    assert_eq!(1., map.voxel_size());
    assert_eq!(4, map.voxel_count());
    assert_eq!(8, map.voxel_dimension());
    assert_eq!(Some(Vec2::new(4., 4.)), map.chunk_position(3));
    assert!(map.has_chunk(3) && !map.has_chunk(4));
    assert!(map.has_renderer(1) && !map.has_renderer(2));
}

#[test]
fn prefab_bounds_pair_sockets() {
    let bounds = prefab_bounds_from_sockets(&[
        ("bounds_min_a", Vec2::new(-1.2, -1.)),
        ("Bounds_MAX_a", Vec2::new(1., 2.6)),
        ("Bounds_MIN_b", Vec2::ZERO),
        ("Socket", Vec2::ONE),
    ]);
    assert_eq!(1, bounds.len());
    assert_eq!(Rect::new(-1., -1., 1., 3.), bounds[0]);
}

#[test]
fn prefabs_do_not_overlap() {
    let mut map = test_map(8, 4, 2);
    let bounds = PrefabBounds(vec![Rect::new(-1., -1., 1., 1.)]);

    assert!(map.try_place_prefab(&bounds, Vec2::new(2., 2.)));
    assert!(!map.try_place_prefab(&bounds, Vec2::new(3., 2.)));
    // Touching edges are fine
    assert!(map.try_place_prefab(&bounds, Vec2::new(4., 2.)));
    assert_eq!(2, map.applied_prefabs().len());

    map.clear_applied_prefabs();
    assert!(map.try_place_prefab(&bounds, Vec2::new(3., 2.)));
}

#[cfg(test)]
fn quad_prefab() -> MeshSection {
    let mut prefab = MeshSection::default();
    for (x, y) in [(-1., -1.), (1., -1.), (1., 1.), (-1., 1.), (9., 9.)] {
        prefab.push_vertex(Vec3::new(x, y, 0.), Vec3::X);
    }
    prefab.colors[0] = [255, 0, 0, 255];
    prefab.indices = vec![0, 1, 2, 0, 2, 3];
    prefab
}

#[test]
fn prefab_is_copied_onto_the_height_map() {
    let mut grid = crate::HeightGrid::new(8, 8);
    grid.generate(crate::HeightLayer::Shape, |_, _| 2.);
    let mut map = test_map(8, 8, 1);
    map.set_samplers(SurfaceSamplers {
        height: Some(Arc::new(grid)),
        ..Default::default()
    });

    let prefab = quad_prefab();
    let bounds = PrefabBounds(vec![Rect::new(-1., -1., 1., 1.)]);
    let mut out = MeshSection::default();
    out.push_vertex(Vec3::ZERO, Vec3::Z);

    let center = Vec3::new(3., 3., 1.);
    assert!(map.apply_prefab(&prefab, &bounds, center, true, false, &mut out));

    // The unused vertex is dropped and shared ones are copied once
    assert_eq!(5, out.positions.len());
    assert_eq!(vec![1, 2, 3, 1, 3, 4], out.indices);
    assert_eq!(out.positions.len(), out.colors.len());
    assert_eq!(Vec3::new(2., 2., 3.), out.positions[1]);
    assert_eq!(Vec3::new(4., 4., 3.), out.positions[3]);

    // The red vertex is on the border and takes the terrain normal
    assert!(out.normals[1].abs_diff_eq(Vec3::Z, 1e-5));
    let blended = (Vec3::X + Vec3::Z).normalize();
    for normal in &out.normals[2..] {
        assert!(normal.abs_diff_eq(blended, 1e-5));
    }
    assert_eq!(Vec3::ZERO, out.bounds.min);
    assert_eq!(Vec3::new(4., 4., 3.), out.bounds.max);

    // Overlapping the placed prefab leaves the output untouched
    let before = out.clone();
    assert!(!map.apply_prefab(&prefab, &bounds, Vec3::new(4., 3., 1.), true, false, &mut out));
    assert_eq!(before.positions, out.positions);
    assert_eq!(before.indices, out.indices);
    assert_eq!(1, map.applied_prefabs().len());

    // Without height the prefab keeps its own heights and normals
    assert!(map.apply_prefab(&prefab, &bounds, Vec3::new(6., 6., 1.), false, false, &mut out));
    assert_eq!(9, out.positions.len());
    assert_eq!(Vec3::new(5., 5., 1.), out.positions[5]);
    assert_eq!(Vec3::X, out.normals[5]);

    // Indices past the vertices are rejected before the footprint is placed
    let mut broken = prefab.clone();
    broken.indices = vec![0, 1, 7];
    let mut empty = MeshSection::default();
    assert!(!map.apply_prefab(&broken, &bounds, Vec3::new(3., 6., 0.), false, false, &mut empty));
    assert!(empty.positions.is_empty());
    assert_eq!(2, map.applied_prefabs().len());
}
