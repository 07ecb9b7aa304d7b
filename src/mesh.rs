use bevy::prelude::*;

/// A running axis aligned bounding box in local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBounds {
    /// Smallest corner
    pub min: Vec3,
    /// Largest corner
    pub max: Vec3,
}

impl Default for LocalBounds {
    fn default() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }
}

impl LocalBounds {
    /// Grow the bounds to contain `point`
    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Whether any point was included since the last reset
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Forget every included point
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The output mesh of one material inside one chunk
#[derive(Debug, Clone, Default)]
pub struct MeshSection {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals
    pub normals: Vec<Vec3>,
    /// Vertex colors
    pub colors: Vec<[u8; 4]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Bounds of every vertex position
    pub bounds: LocalBounds,
}

impl MeshSection {
    /// Remove every vertex and index, keeping the allocations
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.colors.clear();
        self.indices.clear();
        self.bounds.reset();
    }

    /// Append a vertex and return its index
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.colors.push([0; 4]);
        self.bounds.include(position);
        index
    }

    /// Append one triangle
    #[inline]
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// The number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// The number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// The number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the section holds no geometry
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Recompute the bounds from the current positions
    pub fn recompute_bounds(&mut self) {
        self.bounds.reset();
        for p in &self.positions {
            self.bounds.include(*p);
        }
    }

    /// Release unused buffer capacity
    pub fn shrink_to_fit(&mut self) {
        self.positions.shrink_to_fit();
        self.normals.shrink_to_fit();
        self.colors.shrink_to_fit();
        self.indices.shrink_to_fit();
    }
}

#[test]
fn bounds_follow_vertices() {
    let mut section = MeshSection::default();
    assert!(!section.bounds.is_valid());

    section.push_vertex(Vec3::new(1., 2., 0.), Vec3::Z);
    let i = section.push_vertex(Vec3::new(-1., 4., -1.), Vec3::Z);
    assert_eq!(1, i);
    assert!(section.bounds.is_valid());
    assert_eq!(Vec3::new(-1., 2., -1.), section.bounds.min);
    assert_eq!(Vec3::new(1., 4., 0.), section.bounds.max);

    section.clear();
    assert_eq!(0, section.vertex_count());
    assert!(!section.bounds.is_valid());
}

#[test]
fn triangles_count_indices() {
    let mut section = MeshSection::default();
    for _ in 0..3 {
        section.push_vertex(Vec3::ZERO, Vec3::Z);
    }
    section.push_triangle(0, 1, 2);
    assert_eq!(3, section.index_count());
    assert_eq!(1, section.triangle_count());
    assert!(!section.is_empty());
}
