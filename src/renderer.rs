use crate::{FeaturePoint, MeshSection, SurfaceConfig, VoxelCell, VoxelSurface};

/// Renders one material of a chunk. Each fill picks the straight or the feature variant of a
/// shape and asks for walls wherever the neighboring corner is empty.
#[derive(Clone, Default)]
pub struct VoxelRenderer {
    surface: VoxelSurface,
}

impl VoxelRenderer {
    /// Create a renderer for one material
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            surface: VoxelSurface::new(config),
        }
    }

    /// The surface this renderer writes to
    pub fn surface(&self) -> &VoxelSurface {
        &self.surface
    }

    pub(crate) fn surface_mut(&mut self) -> &mut VoxelSurface {
        &mut self.surface
    }

    /// The generated mesh
    pub fn section(&self) -> &MeshSection {
        self.surface.section()
    }

    /// Drop the generated mesh
    pub fn clear(&mut self) {
        self.surface.clear();
    }

    /// Finish the mesh after a sweep
    pub fn apply(&mut self) {
        self.surface.apply();
    }

    /// Start the next cell of the current row
    pub fn prepare_cache_for_next_cell(&mut self) {
        self.surface.prepare_cache_for_next_cell();
    }

    /// Start the next row
    pub fn prepare_cache_for_next_row(&mut self) {
        self.surface.prepare_cache_for_next_row();
    }

    /// Corner A
    pub fn fill_a(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_quad_a(cell.i, f.position, !cell.c.is_filled(), !cell.b.is_filled());
        } else {
            self.surface.add_triangle_a(cell.i, !cell.b.is_filled());
        }
    }

    /// Corner B
    pub fn fill_b(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_quad_b(cell.i, f.position, !cell.a.is_filled(), !cell.d.is_filled());
        } else {
            self.surface.add_triangle_b(cell.i, !cell.a.is_filled());
        }
    }

    /// Corner C
    pub fn fill_c(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_quad_c(cell.i, f.position, !cell.d.is_filled(), !cell.a.is_filled());
        } else {
            self.surface.add_triangle_c(cell.i, !cell.a.is_filled());
        }
    }

    /// Corner D
    pub fn fill_d(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_quad_d(cell.i, f.position, !cell.b.is_filled(), !cell.c.is_filled());
        } else {
            self.surface.add_triangle_d(cell.i, !cell.b.is_filled());
        }
    }

    /// Corners A, B and C
    pub fn fill_abc(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_hexagon_abc(cell.i, f.position, !cell.d.is_filled());
        } else {
            self.surface.add_pentagon_abc(cell.i, !cell.d.is_filled());
        }
    }

    /// Corners A, B and D
    pub fn fill_abd(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_hexagon_abd(cell.i, f.position, !cell.c.is_filled());
        } else {
            self.surface.add_pentagon_abd(cell.i, !cell.c.is_filled());
        }
    }

    /// Corners A, C and D
    pub fn fill_acd(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_hexagon_acd(cell.i, f.position, !cell.b.is_filled());
        } else {
            self.surface.add_pentagon_acd(cell.i, !cell.b.is_filled());
        }
    }

    /// Corners B, C and D
    pub fn fill_bcd(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_hexagon_bcd(cell.i, f.position, !cell.a.is_filled());
        } else {
            self.surface.add_pentagon_bcd(cell.i, !cell.a.is_filled());
        }
    }

    /// Corners A and B
    pub fn fill_ab(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface.add_pentagon_ab(
                cell.i,
                f.position,
                !cell.c.is_filled(),
                !cell.d.is_filled(),
            );
        } else {
            self.surface.add_quad_ab(cell.i, !cell.c.is_filled());
        }
    }

    /// Corners A and C
    pub fn fill_ac(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface.add_pentagon_ac(
                cell.i,
                f.position,
                !cell.d.is_filled(),
                !cell.b.is_filled(),
            );
        } else {
            self.surface.add_quad_ac(cell.i, !cell.b.is_filled());
        }
    }

    /// Corners B and D
    pub fn fill_bd(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface.add_pentagon_bd(
                cell.i,
                f.position,
                !cell.a.is_filled(),
                !cell.c.is_filled(),
            );
        } else {
            self.surface.add_quad_bd(cell.i, !cell.a.is_filled());
        }
    }

    /// Corners C and D
    pub fn fill_cd(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface.add_pentagon_cd(
                cell.i,
                f.position,
                !cell.b.is_filled(),
                !cell.a.is_filled(),
            );
        } else {
            self.surface.add_quad_cd(cell.i, !cell.a.is_filled());
        }
    }

    /// The A-D diagonal, cut off towards B
    pub fn fill_ad_to_b(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_pentagon_ad_to_b(cell.i, f.position, !cell.b.is_filled());
        } else {
            self.surface.add_quad_ad_to_b(cell.i, !cell.b.is_filled());
        }
    }

    /// The A-D diagonal, cut off towards C
    pub fn fill_ad_to_c(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_pentagon_ad_to_c(cell.i, f.position, !cell.c.is_filled());
        } else {
            self.surface.add_quad_ad_to_c(cell.i, !cell.c.is_filled());
        }
    }

    /// The B-C diagonal, cut off towards A
    pub fn fill_bc_to_a(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_pentagon_bc_to_a(cell.i, f.position, !cell.a.is_filled());
        } else {
            self.surface.add_quad_bc_to_a(cell.i, !cell.a.is_filled());
        }
    }

    /// The B-C diagonal, cut off towards D
    pub fn fill_bc_to_d(&mut self, cell: &VoxelCell, f: FeaturePoint) {
        if f.exists {
            self.surface
                .add_pentagon_bc_to_d(cell.i, f.position, !cell.d.is_filled());
        } else {
            self.surface.add_quad_bc_to_d(cell.i, !cell.d.is_filled());
        }
    }

    /// The whole cell
    pub fn fill_abcd(&mut self, cell: &VoxelCell) {
        self.surface.add_quad_abcd(cell.i);
    }
}
