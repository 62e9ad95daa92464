use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_COT_RADIUS_PX: u16 = 1;
pub const MAX_COT_RADIUS_PX: u16 = 1000;
const DEFAULT_COT_RADIUS_PX: u16 = 100;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read render profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse render profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("circle_of_transparency_radius must be in {min}..={max}, got {value}")]
    CotRadiusOutOfRange { value: u16, min: u16, max: u16 },
}

/// User toggles read once per frame. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderProfile {
    pub use_objects_fading: bool,
    pub use_circle_of_transparency: bool,
    /// Radius in screen pixels around the avatar.
    pub circle_of_transparency_radius: u16,
    pub use_colored_lights: bool,
    pub use_lights: bool,
    pub use_alt_lights: bool,
    pub hide_vegetation: bool,
    pub tree_to_stumps: bool,
    pub shadows_enabled: bool,
    pub shadows_statics: bool,
    pub draw_roofs: bool,
    /// Keep an off-screen world target sized to the zoomed window.
    pub use_world_render_target: bool,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            use_objects_fading: true,
            use_circle_of_transparency: false,
            circle_of_transparency_radius: DEFAULT_COT_RADIUS_PX,
            use_colored_lights: true,
            use_lights: false,
            use_alt_lights: false,
            hide_vegetation: false,
            tree_to_stumps: false,
            shadows_enabled: true,
            shadows_statics: true,
            draw_roofs: true,
            use_world_render_target: false,
        }
    }
}

impl RenderProfile {
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let raw = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let profile =
            serde_json::from_str::<RenderProfile>(&raw).map_err(|source| ProfileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let radius = self.circle_of_transparency_radius;
        if !(MIN_COT_RADIUS_PX..=MAX_COT_RADIUS_PX).contains(&radius) {
            return Err(ProfileError::CotRadiusOutOfRange {
                value: radius,
                min: MIN_COT_RADIUS_PX,
                max: MAX_COT_RADIUS_PX,
            });
        }
        Ok(())
    }

    pub fn lighting_enabled(&self) -> bool {
        self.use_lights || self.use_alt_lights
    }

    pub(crate) fn static_shadows(&self) -> bool {
        self.shadows_enabled && self.shadows_statics
    }
}
