use thiserror::Error;

/// Reasons a [crate::VoxelMapSettings] can be rejected
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The map needs a size of at least one unit
    #[error("map size must be at least 1")]
    InvalidMapSize,
    /// A voxel or chunk resolution is below one
    #[error("{name} must be at least 1, got {value}")]
    InvalidResolution {
        /// Which resolution is invalid
        name: &'static str,
        /// The rejected value
        value: u32,
    },
    /// The settings document could not be parsed
    #[error("failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
