use serde::{Deserialize, Serialize};

use crate::SettingsError;

/// Options handed to the mesh simplifier of a material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifierOptions {
    /// Whether the simplifier runs at all
    pub enabled: bool,
    /// Seed for randomized edge selection
    pub seed: u32,
    /// Fraction of edges considered per iteration
    pub edge_fraction: f32,
    /// Upper bound on collapse iterations
    pub max_iteration: u32,
    /// Fraction of triangles to keep
    pub target_percentage: f32,
    /// Largest allowed collapse error
    pub max_error: f32,
    /// Longest edge that may still be collapsed
    pub max_edge_size: f32,
    /// Smallest cosine between face normals before and after a collapse
    pub min_angle_cosine: f32,
}

impl Default for SimplifierOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: 1337,
            edge_fraction: 0.125,
            max_iteration: 10,
            target_percentage: 0.05,
            max_error: 5.,
            max_edge_size: 2.5,
            min_angle_cosine: 0.8,
        }
    }
}

/// Configuration of one material
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceState {
    /// Emit walls below every boundary and a mirrored bottom cap
    pub generate_extrusion: bool,
    /// Render the surface as a bottom cap at extrusion height. Ignored when walls are generated.
    pub extrusion_surface: bool,
    /// Simplification options
    pub simplifier: SimplifierOptions,
}

impl SurfaceState {
    /// Whether the surface itself is placed at the extrusion height
    pub fn is_extrusion_surface(&self) -> bool {
        !self.generate_extrusion && self.extrusion_surface
    }
}

/// Settings of a [crate::VoxelMap]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelMapSettings {
    /// The side length of the whole map
    pub map_size: u32,
    /// The number of voxels per chunk side
    pub voxel_resolution: u32,
    /// The number of chunks per map side
    pub chunk_resolution: u32,
    /// Largest angle between two edges, in degrees, that still forms a sharp feature
    pub max_feature_angle: f32,
    /// Largest angle between two normals, in degrees, at which they count as parallel
    pub max_parallel_angle: f32,
    /// Depth of generated walls
    pub extrusion_height: f32,
    /// One entry per material, material `n` uses entry `n - 1`
    pub surface_states: Vec<SurfaceState>,
}

impl Default for VoxelMapSettings {
    fn default() -> Self {
        Self {
            map_size: 2,
            voxel_resolution: 8,
            chunk_resolution: 2,
            max_feature_angle: crate::DEFAULT_MAX_FEATURE_ANGLE,
            max_parallel_angle: crate::DEFAULT_MAX_PARALLEL_ANGLE,
            extrusion_height: -1.,
            surface_states: Vec::new(),
        }
    }
}

impl VoxelMapSettings {
    /// Parse and validate settings from a RON document
    pub fn from_ron(source: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings describe a map with at least one voxel
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.map_size < 1 {
            return Err(SettingsError::InvalidMapSize);
        }
        if self.voxel_resolution < 1 {
            return Err(SettingsError::InvalidResolution {
                name: "voxel_resolution",
                value: self.voxel_resolution,
            });
        }
        if self.chunk_resolution < 1 {
            return Err(SettingsError::InvalidResolution {
                name: "chunk_resolution",
                value: self.chunk_resolution,
            });
        }
        Ok(())
    }

    /// Side length of a chunk
    pub fn chunk_size(&self) -> f32 {
        self.map_size as f32 / self.chunk_resolution as f32
    }

    /// Side length of a voxel
    pub fn voxel_size(&self) -> f32 {
        self.chunk_size() / self.voxel_resolution as f32
    }

    /// The number of materials, which is one less than the number of renderers per chunk
    pub fn material_count(&self) -> usize {
        self.surface_states.len()
    }

    /// Extrusion depth, always negative
    pub fn normalized_extrusion_height(&self) -> f32 {
        normalize_extrusion_height(self.extrusion_height)
    }
}

/// Walls always extend downwards, a height too close to zero falls back to one unit
pub fn normalize_extrusion_height(height: f32) -> f32 {
    if height.abs() > 0.01 {
        -height.abs()
    } else {
        -1.
    }
}

#[test]
fn default_settings_are_valid() {
    let settings = VoxelMapSettings::default();
    assert!(settings.validate().is_ok());
    assert_eq!(1., settings.chunk_size());
    assert_eq!(0.125, settings.voxel_size());
    assert_eq!(-1., settings.normalized_extrusion_height());
}

#[test]
fn zero_resolution_is_rejected() {
    let settings = VoxelMapSettings {
        chunk_resolution: 0,
        ..Default::default()
    };
    assert!(matches!(
        settings.validate(),
        Err(SettingsError::InvalidResolution {
            name: "chunk_resolution",
            value: 0
        })
    ));

    let settings = VoxelMapSettings {
        map_size: 0,
        ..Default::default()
    };
    assert!(matches!(
        settings.validate(),
        Err(SettingsError::InvalidMapSize)
    ));
}

#[test]
fn parse_ron_settings() {
    let settings = VoxelMapSettings::from_ron(
        "(map_size: 4, voxel_resolution: 4, chunk_resolution: 1, \
         surface_states: [(generate_extrusion: true)])",
    )
    .unwrap();

    assert_eq!(4, settings.map_size);
    assert_eq!(135., settings.max_feature_angle);
    assert_eq!(1, settings.material_count());
    assert!(settings.surface_states[0].generate_extrusion);
    assert!(!settings.surface_states[0].simplifier.enabled);
    assert_eq!(1337, settings.surface_states[0].simplifier.seed);
}

#[test]
fn parse_rejects_invalid_documents() {
    assert!(matches!(
        VoxelMapSettings::from_ron("(voxel_resolution: 0)"),
        Err(SettingsError::InvalidResolution { .. })
    ));
    assert!(matches!(
        VoxelMapSettings::from_ron("(map_size: \"big\")"),
        Err(SettingsError::Parse(_))
    ));
}

#[test]
fn extrusion_height_points_down() {
    assert_eq!(-2., normalize_extrusion_height(2.));
    assert_eq!(-3., normalize_extrusion_height(-3.));
    assert_eq!(-1., normalize_extrusion_height(0.001));
}

#[test]
fn extrusion_surface_requires_no_walls() {
    let mut state = SurfaceState {
        extrusion_surface: true,
        ..Default::default()
    };
    assert!(state.is_extrusion_surface());
    state.generate_extrusion = true;
    assert!(!state.is_extrusion_surface());
}
