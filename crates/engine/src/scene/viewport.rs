use smallvec::SmallVec;
use tracing::debug;

use crate::world::{MoveOffset, ScreenPoint, TILE_HALF_PX, TILE_SIZE_PX};

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.5;

/// Camera inputs for one frame. `pan` is the free-look offset in screen
/// pixels, applied on top of the player-centred view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub window_width: i32,
    pub window_height: i32,
    pub zoom: f32,
    pub pan: ScreenPoint,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            zoom: 1.0,
            pan: ScreenPoint::default(),
        }
    }
}

impl CameraState {
    /// Zoom clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`]; unusable values mean 1.
    fn safe_zoom(&self) -> f32 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        }
    }

    /// Maps a window pixel into the unscaled world pixel space objects are
    /// positioned in.
    pub fn screen_to_world(&self, point: ScreenPoint) -> ScreenPoint {
        let zoom = self.safe_zoom();
        let half_w = (self.window_width >> 1) as f32;
        let half_h = (self.window_height >> 1) as f32;
        ScreenPoint {
            x: (((point.x as f32 - half_w) * zoom + half_w) as i32).saturating_add(self.pan.x),
            y: (((point.y as f32 - half_h) * zoom + half_h) as i32).saturating_add(self.pan.y),
        }
    }
}

/// Where the camera is anchored: the player's tile and smooth offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAnchor {
    pub x: u16,
    pub y: u16,
    pub z: i8,
    pub offset: MoveOffset,
}

/// Inclusive tile rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl TileRect {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn tile_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        ((self.max_x - self.min_x + 1) as usize) * ((self.max_y - self.min_y + 1) as usize)
    }

    pub fn clamped_to(&self, width: u16, height: u16) -> TileRect {
        TileRect {
            min_x: self.min_x.max(0),
            min_y: self.min_y.max(0),
            max_x: self.max_x.min(i32::from(width) - 1),
            max_y: self.max_y.min(i32::from(height) - 1),
        }
    }
}

/// Inclusive pixel clip rectangle in world pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl PixelRect {
    pub fn contains_x(&self, x: i32) -> bool {
        x >= self.min_x && x <= self.max_x
    }

    pub fn contains_y(&self, y: i32) -> bool {
        y >= self.min_y && y <= self.max_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportState {
    pub tiles: TileRect,
    pub pixels: PixelRect,
    pub zoom: f32,
    /// Subtracted from projected tile positions to get screen positions.
    pub draw_offset: ScreenPoint,
    pub scaled_offset: ScreenPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTargetKind {
    World,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetResize {
    pub kind: RenderTargetKind,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewportUpdate {
    /// Every cached screen position must be recomputed this frame.
    pub draw_position_changed: bool,
    pub resized: SmallVec<[RenderTargetResize; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewportInputs {
    camera: CameraState,
    anchor: ViewAnchor,
    use_world_target: bool,
}

#[derive(Debug, Default)]
pub struct ViewportCalculator {
    state: ViewportState,
    last_inputs: Option<ViewportInputs>,
    world_target: Option<(i32, i32)>,
    light_target: Option<(i32, i32)>,
}

impl ViewportCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn world_target_size(&self) -> Option<(i32, i32)> {
        self.world_target
    }

    pub fn light_target_size(&self) -> Option<(i32, i32)> {
        self.light_target
    }

    /// Recomputes the viewport if any input changed since the last call.
    /// Unchanged inputs leave the state untouched and report no work.
    pub fn update(
        &mut self,
        camera: &CameraState,
        anchor: &ViewAnchor,
        use_world_target: bool,
    ) -> ViewportUpdate {
        let inputs = ViewportInputs {
            camera: *camera,
            anchor: *anchor,
            use_world_target,
        };
        if self.last_inputs == Some(inputs) {
            return ViewportUpdate::default();
        }
        let previous = self.last_inputs.replace(inputs);
        let next = compute_viewport(camera, anchor);

        let window_changed = previous.map_or(true, |previous| {
            previous.camera.window_width != camera.window_width
                || previous.camera.window_height != camera.window_height
                || previous.camera.pan != camera.pan
        });
        let mut update = ViewportUpdate {
            draw_position_changed: window_changed
                || next.draw_offset != self.state.draw_offset
                || next.scaled_offset != self.state.scaled_offset,
            resized: SmallVec::new(),
        };
        self.state = next;

        // Sizes are compared inside, so only real changes are reported.
        self.resize_targets(camera, use_world_target, &mut update);
        update
    }

    fn resize_targets(
        &mut self,
        camera: &CameraState,
        use_world_target: bool,
        update: &mut ViewportUpdate,
    ) {
        let zoom = camera.safe_zoom();
        if use_world_target {
            let size = (
                (camera.window_width as f32 * zoom) as i32,
                (camera.window_height as f32 * zoom) as i32,
            );
            if self.world_target != Some(size) {
                self.world_target = Some(size);
                update.resized.push(resized(RenderTargetKind::World, size));
            }
        } else {
            self.world_target = None;
        }

        let light = (camera.window_width, camera.window_height);
        if self.light_target != Some(light) {
            self.light_target = Some(light);
            update.resized.push(resized(RenderTargetKind::Light, light));
        }
    }
}

fn resized(kind: RenderTargetKind, (width, height): (i32, i32)) -> RenderTargetResize {
    debug!(?kind, width, height, "render_target_resized");
    RenderTargetResize {
        kind,
        width,
        height,
    }
}

fn compute_viewport(camera: &CameraState, anchor: &ViewAnchor) -> ViewportState {
    let zoom = camera.safe_zoom();
    let width = camera.window_width.max(1);
    let height = camera.window_height.max(1);

    let center_x = (width >> 1) - anchor.offset.x as i32;
    let center_y =
        (height >> 1) + (i32::from(anchor.z) << 2) - (anchor.offset.y - anchor.offset.z) as i32;

    let mut tile_x = i32::from(anchor.x);
    let mut tile_y = i32::from(anchor.y);
    let draw_offset = ScreenPoint {
        x: (tile_x - tile_y) * TILE_HALF_PX - center_x,
        y: (tile_x + tile_y) * TILE_HALF_PX - center_y,
    };

    let scaled_offset = if zoom != 1.0 {
        let right = width as f32;
        let bottom = height as f32;
        ScreenPoint {
            x: (-(right * zoom - right)) as i32,
            y: (-(bottom * zoom - bottom)) as i32,
        }
    } else {
        ScreenPoint::default()
    };

    let tile_px = TILE_SIZE_PX as f32;
    let size = ((width as f32 / tile_px + 1.0).max(height as f32 / tile_px + 1.0) * zoom) as i32;

    let pan = camera.pan;
    if pan.x != 0 || pan.y != 0 {
        tile_x += (zoom * (pan.x + pan.y) as f32 / tile_px) as i32;
        tile_y += (zoom * (pan.y - pan.x) as f32 / tile_px) as i32;
    }

    let tiles = TileRect {
        min_x: tile_x.saturating_sub(size).max(0),
        min_y: tile_y.saturating_sub(size).max(0),
        max_x: tile_x.saturating_add(size),
        max_y: tile_y.saturating_add(size),
    };

    let slop = (tile_px / zoom) as i32;
    let min = camera.screen_to_world(ScreenPoint { x: -slop, y: -slop });
    let max = camera.screen_to_world(ScreenPoint {
        x: width + slop,
        y: height + slop,
    });

    ViewportState {
        tiles,
        pixels: PixelRect {
            min_x: min.x,
            min_y: min.y,
            max_x: max.x,
            max_y: max.y,
        },
        zoom,
        draw_offset,
        scaled_offset,
    }
}
