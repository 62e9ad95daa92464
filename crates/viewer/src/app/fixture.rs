use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use iso_engine::scene::{CameraState, FrameInput, ProfileError, RenderProfile, Season};
use iso_engine::world::{
    Direction, GraphicTraits, ItemInfo, LightColor, MapError, MobileInfo, MultiInfo,
    ObjectHandle, ScreenPoint, SpriteBounds, StaticTileData, TileDataTable, WorldMap,
    WorldObject,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_FRAME_MS: u64 = 16;
const DEFAULT_STEP_FRAMES: u64 = 10;

#[derive(Debug, Error)]
pub(crate) enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse fixture {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid fixture {path}: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("fixture {path} object #{index} could not be placed: {source}")]
    Place {
        path: PathBuf,
        index: usize,
        #[source]
        source: MapError,
    },
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// On-disk scene description for the headless viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Fixture {
    pub(crate) width: u16,
    pub(crate) height: u16,
    #[serde(default)]
    pub(crate) profile: RenderProfile,
    #[serde(default)]
    pub(crate) camera: FixtureCamera,
    #[serde(default)]
    pub(crate) season: Season,
    #[serde(default)]
    pub(crate) use_object_handles: bool,
    /// Window pixel the cursor rests on.
    #[serde(default)]
    pub(crate) cursor: Option<[i32; 2]>,
    #[serde(default = "default_frame_ms")]
    pub(crate) frame_ms: u64,
    #[serde(default)]
    pub(crate) tiledata: Vec<TileEntry>,
    pub(crate) objects: Vec<FixtureObject>,
    /// Tiles the player steps through, one every `step_frames` frames.
    #[serde(default)]
    pub(crate) walk: Vec<[u16; 2]>,
    #[serde(default = "default_step_frames")]
    pub(crate) step_frames: u64,
}

fn default_frame_ms() -> u64 {
    DEFAULT_FRAME_MS
}

fn default_step_frames() -> u64 {
    DEFAULT_STEP_FRAMES
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct FixtureCamera {
    pub(crate) window_width: i32,
    pub(crate) window_height: i32,
    pub(crate) zoom: f32,
    pub(crate) pan: [i32; 2],
}

impl Default for FixtureCamera {
    fn default() -> Self {
        let camera = CameraState::default();
        Self {
            window_width: camera.window_width,
            window_height: camera.window_height,
            zoom: camera.zoom,
            pan: [0, 0],
        }
    }
}

impl From<FixtureCamera> for CameraState {
    fn from(camera: FixtureCamera) -> Self {
        CameraState {
            window_width: camera.window_width,
            window_height: camera.window_height,
            zoom: camera.zoom,
            pan: ScreenPoint {
                x: camera.pan[0],
                y: camera.pan[1],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TileEntry {
    pub(crate) graphic: u16,
    #[serde(default)]
    pub(crate) data: StaticTileData,
    #[serde(default)]
    pub(crate) bounds: Option<SpriteBounds>,
    #[serde(default)]
    pub(crate) traits: GraphicTraits,
    #[serde(default)]
    pub(crate) light_color: Option<LightColor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FixtureObject {
    pub(crate) graphic: u16,
    pub(crate) x: u16,
    pub(crate) y: u16,
    #[serde(default)]
    pub(crate) z: i8,
    #[serde(default)]
    pub(crate) hue: u16,
    #[serde(flatten)]
    pub(crate) kind: FixtureKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum FixtureKind {
    Terrain {
        /// Present on stretched terrain.
        #[serde(default)]
        stretch: Option<[i8; 2]>,
    },
    Static,
    Multi {
        #[serde(default)]
        internal: bool,
        #[serde(default)]
        preview: bool,
    },
    Mobile {
        #[serde(default)]
        player: bool,
        #[serde(default)]
        direction: Direction,
        #[serde(default)]
        frame: SpriteBounds,
        #[serde(default)]
        held_light: Option<u16>,
    },
    Item {
        #[serde(default)]
        corpse: bool,
        #[serde(default)]
        multi_graphic: Option<u16>,
        #[serde(default)]
        locked: bool,
        #[serde(default)]
        light_id: u8,
    },
    Effect {
        #[serde(default)]
        moving: bool,
    },
}

impl FixtureObject {
    fn to_world_object(&self) -> WorldObject {
        let (graphic, x, y, z) = (self.graphic, self.x, self.y, self.z);
        let mut object = match self.kind {
            FixtureKind::Terrain { stretch: None } => WorldObject::terrain(graphic, x, y, z),
            FixtureKind::Terrain {
                stretch: Some([min_z, average_z]),
            } => WorldObject::stretched_terrain(graphic, x, y, z, min_z, average_z),
            FixtureKind::Static => WorldObject::static_tile(graphic, x, y, z),
            FixtureKind::Multi { internal, preview } => {
                WorldObject::multi(graphic, x, y, z, MultiInfo { internal, preview })
            }
            FixtureKind::Mobile {
                direction,
                frame,
                held_light,
                ..
            } => WorldObject::mobile(
                graphic,
                x,
                y,
                z,
                MobileInfo {
                    direction,
                    frame,
                    held_light,
                },
            ),
            FixtureKind::Item {
                corpse,
                multi_graphic,
                locked,
                light_id,
            } => WorldObject::item(
                graphic,
                x,
                y,
                z,
                ItemInfo {
                    corpse,
                    multi_graphic,
                    locked,
                    light_id,
                },
            ),
            FixtureKind::Effect { moving } => WorldObject::effect(graphic, x, y, z, moving),
        };
        object.hue = self.hue;
        object
    }

    fn is_player(&self) -> bool {
        matches!(self.kind, FixtureKind::Mobile { player: true, .. })
    }
}

/// A fixture placed into a live map, ready to drive frames.
#[derive(Debug)]
pub(crate) struct LoadedScene {
    pub(crate) map: WorldMap,
    pub(crate) table: TileDataTable,
    pub(crate) input: FrameInput,
    pub(crate) frame_ms: u64,
    pub(crate) walk: Vec<(u16, u16)>,
    pub(crate) step_frames: u64,
}

impl Fixture {
    pub(crate) fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw, path)
    }

    pub(crate) fn from_json(raw: &str, origin: &Path) -> Result<Self, FixtureError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let field = error.path().to_string();
            FixtureError::Parse {
                path: origin.to_path_buf(),
                field: if field.is_empty() { ".".to_string() } else { field },
                source: error.into_inner(),
            }
        })
    }

    pub(crate) fn into_scene(self, origin: &Path) -> Result<LoadedScene, FixtureError> {
        let invalid = |message: String| FixtureError::Invalid {
            path: origin.to_path_buf(),
            message,
        };
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "map size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if self.step_frames == 0 {
            return Err(invalid("step_frames must be at least 1".to_string()));
        }
        let players = self.objects.iter().filter(|object| object.is_player()).count();
        if players != 1 {
            return Err(invalid(format!(
                "expected exactly one player mobile, found {players}"
            )));
        }
        if let Some([x, y]) = self
            .walk
            .iter()
            .copied()
            .find(|[x, y]| *x >= self.width || *y >= self.height)
        {
            return Err(invalid(format!("walk step ({x}, {y}) is off the map")));
        }
        self.profile.validate()?;

        let mut table = TileDataTable::new();
        for entry in &self.tiledata {
            table.insert_static(entry.graphic, entry.data);
            if let Some(bounds) = entry.bounds {
                table.insert_bounds(entry.graphic, bounds);
            }
            if !entry.traits.is_empty() {
                table.insert_traits(entry.graphic, entry.traits);
            }
            if let Some(color) = entry.light_color {
                table.insert_light_color(entry.graphic, color);
            }
        }

        let mut map = WorldMap::new(self.width, self.height);
        let mut player: Option<ObjectHandle> = None;
        for (index, object) in self.objects.iter().enumerate() {
            let handle = map
                .insert(object.to_world_object(), &table)
                .map_err(|source| FixtureError::Place {
                    path: origin.to_path_buf(),
                    index,
                    source,
                })?;
            if object.is_player() {
                player = Some(handle);
            }
        }
        let Some(player) = player else {
            return Err(invalid("player mobile was not placed".to_string()));
        };

        let mut input = FrameInput::new(player);
        input.profile = self.profile;
        input.camera = self.camera.into();
        input.season = self.season;
        input.use_object_handles = self.use_object_handles;
        input.cursor = self.cursor.map(|[x, y]| ScreenPoint { x, y });

        Ok(LoadedScene {
            map,
            table,
            input,
            frame_ms: self.frame_ms,
            walk: self.walk.iter().map(|[x, y]| (*x, *y)).collect(),
            step_frames: self.step_frames,
        })
    }
}
