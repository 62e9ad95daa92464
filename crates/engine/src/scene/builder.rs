use std::time::Instant;

use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use super::alpha::FadeClock;
use super::bounds::SpriteBoundsCache;
use super::filter::{cell_snapshot, filter_object, FilterOutcome, FrameContext, Season, COT_LIFT_Z};
use super::foliage::FoliageTracker;
use super::frame_stats::{FrameStats, FrameStatsHandle, RollingWindowMs};
use super::lights::{LightBuffer, LightEntry};
use super::max_draw_z::{MaxDrawZ, MaxDrawZTracker};
use super::pick::PickResolver;
use super::profile::RenderProfile;
use super::render_list::{Bucket, RenderLists};
use super::scan::ScanOrder;
use super::viewport::{
    CameraState, RenderTargetResize, TileRect, ViewAnchor, ViewportCalculator, ViewportState,
};
use crate::world::{ObjectHandle, ScreenPoint, ScreenRect, TileMetadata, WorldMap};

/// Objects whose top exceeds this are never drawn, whatever the roof state.
pub const DEFAULT_HARD_CEILING: i32 = 150;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("player handle {index}:{generation} does not refer to a live object")]
    PlayerMissing { index: u32, generation: u32 },
    #[error("player handle {index}:{generation} refers to a {kind}, not a mobile")]
    PlayerNotMobile {
        index: u32,
        generation: u32,
        kind: &'static str,
    },
}

/// Everything that varies between frames apart from the world itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    pub profile: RenderProfile,
    pub camera: CameraState,
    pub player: ObjectHandle,
    /// Cursor in window pixels, if it is over the game view.
    pub cursor: Option<ScreenPoint>,
    pub now_ms: u64,
    pub season: Season,
    pub use_object_handles: bool,
}

impl FrameInput {
    pub fn new(player: ObjectHandle) -> Self {
        Self {
            profile: RenderProfile::default(),
            camera: CameraState::default(),
            player,
            cursor: None,
            now_ms: 0,
            season: Season::default(),
            use_object_handles: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameSummary {
    pub stats: FrameStats,
    pub max_draw_z: MaxDrawZ,
    pub foliage_epoch: u8,
    pub fade_tick: bool,
    pub resized: SmallVec<[RenderTargetResize; 2]>,
}

/// Per-frame results the filter writes into.
#[derive(Debug, Default)]
pub(crate) struct FrameOutputs {
    pub(crate) lists: RenderLists,
    pub(crate) picker: PickResolver,
    pub(crate) lights: LightBuffer,
    pub(crate) foliage: FoliageTracker,
    pub(crate) bounds: SpriteBoundsCache,
    pub(crate) labeled: Vec<ObjectHandle>,
    pub(crate) objects_considered: usize,
}

impl FrameOutputs {
    fn begin_frame(&mut self) -> u8 {
        self.lists.clear();
        self.picker.reset();
        self.lights.clear();
        self.labeled.clear();
        self.objects_considered = 0;
        self.foliage.begin_frame()
    }
}

/// Builds the draw lists for one frame and keeps the state that carries
/// over between frames: viewport, ceilings, fade cadence and foliage epoch.
#[derive(Debug)]
pub struct SceneRenderer {
    viewport: ViewportCalculator,
    max_draw_z: MaxDrawZTracker,
    fade_clock: FadeClock,
    outputs: FrameOutputs,
    stats: FrameStatsHandle,
    build_window: RollingWindowMs,
    last_scan: Option<(ScreenPoint, TileRect)>,
    hard_ceiling: i32,
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self {
            viewport: ViewportCalculator::new(),
            max_draw_z: MaxDrawZTracker::new(),
            fade_clock: FadeClock::new(),
            outputs: FrameOutputs::default(),
            stats: FrameStatsHandle::default(),
            build_window: RollingWindowMs::default(),
            last_scan: None,
            hard_ceiling: DEFAULT_HARD_CEILING,
        }
    }

    pub fn with_hard_ceiling(mut self, hard_ceiling: i32) -> Self {
        self.hard_ceiling = hard_ceiling;
        self
    }

    /// Call after editing the map around the player so the next frame
    /// rescans for roofs.
    pub fn invalidate_max_draw_z(&mut self) {
        self.max_draw_z.invalidate();
    }

    pub fn build_frame(
        &mut self,
        map: &mut WorldMap,
        metadata: &dyn TileMetadata,
        input: &FrameInput,
    ) -> Result<FrameSummary, FrameError> {
        let started = Instant::now();
        let player = input.player;
        let anchor = {
            let object = map.get(player).ok_or(FrameError::PlayerMissing {
                index: player.index(),
                generation: player.generation(),
            })?;
            if !object.kind.is_mobile() {
                return Err(FrameError::PlayerNotMobile {
                    index: player.index(),
                    generation: player.generation(),
                    kind: object.kind.name(),
                });
            }
            ViewAnchor {
                x: object.x(),
                y: object.y(),
                z: object.z(),
                offset: object.offset,
            }
        };

        let profile = &input.profile;
        let fade_tick = self.fade_clock.tick(input.now_ms);
        let foliage_epoch = self.outputs.begin_frame();
        let update = self
            .viewport
            .update(&input.camera, &anchor, profile.use_world_render_target);
        let view: ViewportState = *self.viewport.state();
        self.max_draw_z
            .update(map, metadata, (anchor.x, anchor.y, anchor.z), profile.draw_roofs);
        let limits = self.max_draw_z.state();

        let tiles = view.tiles.clamped_to(map.width(), map.height());
        let scan_key = (view.draw_offset, tiles);
        let update_draw_position =
            update.draw_position_changed || self.last_scan != Some(scan_key);
        self.last_scan = Some(scan_key);

        let (player_rect, player_anchor) = match map.get_mut(player) {
            Some(object) => {
                if update_draw_position || object.render.position_dirty {
                    object.update_screen_position(view.draw_offset);
                }
                let screen = object.screen_position();
                let offset = object.offset;
                (
                    object.frame_rect().unwrap_or_default(),
                    (
                        screen.x as f32 + offset.x,
                        screen.y as f32 + offset.y - offset.z,
                    ),
                )
            }
            None => (ScreenRect::default(), (0.0, 0.0)),
        };

        let ctx = FrameContext {
            profile,
            metadata,
            limits,
            hard_ceiling: self.hard_ceiling,
            fade_tick,
            season: input.season,
            pixels: view.pixels,
            draw_offset: view.draw_offset,
            update_draw_position,
            player,
            player_tile: (i32::from(anchor.x), i32::from(anchor.y)),
            player_rect,
            player_anchor,
            cot_z: i32::from(anchor.z) + COT_LIFT_Z,
            cursor: input.cursor.map(|cursor| input.camera.screen_to_world(cursor)),
            use_object_handles: input.use_object_handles,
        };

        let mut tiles_visited = 0;
        for (x, y) in ScanOrder::new(tiles) {
            tiles_visited += 1;
            for handle in cell_snapshot(map, x, y) {
                if filter_object(&ctx, &mut self.outputs, map, handle) == FilterOutcome::StopCell {
                    break;
                }
            }
        }

        if fade_tick {
            self.outputs
                .foliage
                .fade_registered(map, profile.use_objects_fading);
        }

        self.build_window.push(started.elapsed());
        let stats = self.collect_stats(tiles_visited);
        self.stats.publish(stats);
        debug!(
            tiles_visited,
            objects_considered = stats.objects_considered,
            pushed = stats.pushed(),
            transparent = stats.bucket(Bucket::Transparent),
            lights = stats.lights,
            picked = ?stats.picked,
            max_z = limits.max_z,
            fade_tick,
            "frame_built"
        );

        Ok(FrameSummary {
            stats,
            max_draw_z: limits,
            foliage_epoch,
            fade_tick,
            resized: update.resized,
        })
    }

    fn collect_stats(&self, tiles_visited: usize) -> FrameStats {
        let outputs = &self.outputs;
        FrameStats {
            tiles_visited,
            objects_considered: outputs.objects_considered,
            buckets: Bucket::DRAW_ORDER.map(|bucket| outputs.lists.bucket(bucket).len()),
            lights: outputs.lights.len(),
            lights_dropped: outputs.lights.dropped(),
            picked: outputs.picker.picked(),
            build: self.build_window.snapshot(),
        }
    }

    pub fn render_lists(&self) -> &RenderLists {
        &self.outputs.lists
    }

    pub fn picked(&self) -> Option<ObjectHandle> {
        self.outputs.picker.picked()
    }

    pub fn lights(&self) -> &[LightEntry] {
        self.outputs.lights.entries()
    }

    /// Objects that get a name label this frame.
    pub fn labeled(&self) -> &[ObjectHandle] {
        &self.outputs.labeled
    }

    pub fn viewport(&self) -> &ViewportState {
        self.viewport.state()
    }

    pub fn world_target_size(&self) -> Option<(i32, i32)> {
        self.viewport.world_target_size()
    }

    pub fn max_draw_z(&self) -> MaxDrawZ {
        self.max_draw_z.state()
    }

    pub fn stats_handle(&self) -> FrameStatsHandle {
        self.stats.clone()
    }
}
