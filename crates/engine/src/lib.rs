//! Visibility and depth sorting for an isometric tile world.
//!
//! [`world`] owns the objects and the per-tile cells they sit in;
//! [`scene::SceneRenderer`] walks the visible tiles once per frame and
//! produces bucketed draw lists, the object under the cursor and the
//! visible lights.

pub mod scene;
pub mod world;

pub use scene::{
    Bucket, CameraState, FrameError, FrameInput, FrameStats, FrameStatsHandle, FrameSummary,
    LightEntry, ProfileError, RenderLists, RenderProfile, SceneRenderer, Season,
};
pub use world::{
    MapError, ObjectHandle, ObjectKind, ScreenPoint, StaticTileData, TileDataTable, TileFlags,
    TileMetadata, WorldMap, WorldObject,
};
