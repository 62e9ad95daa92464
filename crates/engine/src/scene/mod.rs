mod alpha;
mod bounds;
mod builder;
mod filter;
mod foliage;
mod frame_stats;
mod lights;
mod max_draw_z;
mod pick;
mod profile;
mod render_list;
mod scan;
mod viewport;

pub use alpha::{
    advance_alpha, fade_toward, FadeClock, ALPHA_TIME_MS, FADE_STEP, FOLIAGE_ALPHA, OPAQUE,
    TRANSLUCENT_ALPHA,
};
pub use bounds::SpriteBoundsCache;
pub use builder::{FrameError, FrameInput, FrameSummary, SceneRenderer, DEFAULT_HARD_CEILING};
pub use filter::{
    cot_alpha, has_surface_overhead, object_top, transparent_test, visible_at_season,
    FilterOutcome, FrameContext, Season,
};
pub use foliage::{player_behind_quadrant, tree_union, FoliageTracker, FOLIAGE_EPOCH_WRAP};
pub use frame_stats::{FrameStats, FrameStatsHandle, RollingMsStats, BUILD_WINDOW_LEN};
pub use lights::{LightBuffer, LightEntry, LightOrigin, LightOutcome, LightScene, MAX_LIGHTS};
pub use max_draw_z::{compute_max_draw_z, MaxDrawZ, MaxDrawZTracker, DEFAULT_MAX_Z};
pub use pick::{hit_test, PickResolver, PickState};
pub use profile::{ProfileError, RenderProfile, MAX_COT_RADIUS_PX, MIN_COT_RADIUS_PX};
pub use render_list::{Bucket, RenderEntry, RenderLists};
pub use scan::ScanOrder;
pub use viewport::{
    CameraState, PixelRect, RenderTargetKind, RenderTargetResize, TileRect, ViewAnchor,
    ViewportCalculator, ViewportState, ViewportUpdate, MAX_ZOOM, MIN_ZOOM,
};
