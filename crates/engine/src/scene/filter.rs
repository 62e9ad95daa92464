use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::alpha::{fade_toward, OPAQUE, TRANSLUCENT_ALPHA};
use super::builder::FrameOutputs;
use super::lights::{LightOrigin, LightScene};
use super::max_draw_z::MaxDrawZ;
use super::pick::hit_test;
use super::profile::RenderProfile;
use super::render_list::Bucket;
use super::viewport::PixelRect;
use crate::world::{
    GraphicTraits, ItemInfo, MobileInfo, ObjectHandle, ObjectKind, ScreenPoint, ScreenRect,
    StaticTileData, TerrainInfo, TileFlags, TileMetadata, WorldMap, WorldObject,
    CHARACTER_HEIGHT, TILE_HALF_PX, TILE_SIZE_PX,
};

/// Largest amount the cell sort raises an object's priority above its Z.
const MAX_PRIORITY_RAISE: i32 = 3;
pub(crate) const COT_LIFT_Z: i32 = 5;
const COT_SELECT_MIN_ALPHA: u8 = 127;
const SURFACE_OVERHEAD_SLACK: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Fall,
    Winter,
    Desolation,
}

/// What the scan walker does after an object was filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Continue,
    /// No later object in this cell can be drawn.
    StopCell,
}

/// Read-only state shared by every filter call in one frame.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    pub profile: &'a RenderProfile,
    pub metadata: &'a dyn TileMetadata,
    pub limits: MaxDrawZ,
    /// Nothing whose top exceeds this is considered at all.
    pub hard_ceiling: i32,
    pub fade_tick: bool,
    pub season: Season,
    pub pixels: PixelRect,
    pub draw_offset: ScreenPoint,
    pub update_draw_position: bool,
    pub player: ObjectHandle,
    pub player_tile: (i32, i32),
    pub player_rect: ScreenRect,
    /// Player's on-screen anchor including smooth movement.
    pub player_anchor: (f32, f32),
    pub cot_z: i32,
    /// Cursor in world pixel space.
    pub cursor: Option<ScreenPoint>,
    pub use_object_handles: bool,
}

impl FrameContext<'_> {
    fn light_scene<'m>(&'m self, map: &'m WorldMap) -> LightScene<'m> {
        LightScene {
            map,
            metadata: self.metadata,
            profile: self.profile,
            max_z: self.limits.max_z,
        }
    }
}

pub fn object_top(z: i8, data: &StaticTileData) -> i32 {
    i32::from(z) + i32::from(data.object_height().unwrap_or(0))
}

pub fn visible_at_season(data: &StaticTileData, season: Season) -> bool {
    !(data.is_foliage() && !data.is_multi_movable() && season >= Season::Winter)
}

/// Whether the circle of transparency may touch an object at `z` when the
/// circle sits at `cot_z`.
pub fn transparent_test(z: i8, data: &StaticTileData, cot_z: i32) -> bool {
    let z = i32::from(z);
    if z <= cot_z - i32::from(data.height) {
        return false;
    }
    !(cot_z < z && !data.can_be_transparent())
}

/// Alpha for an object inside the circle of transparency, fading linearly
/// from the rim to fully clear near the player. `None` outside the circle.
pub fn cot_alpha(radius_px: u16, player: (f32, f32), screen: ScreenPoint) -> Option<u8> {
    let max_dist = f32::from(radius_px);
    let dx = screen.x as f32 - player.0;
    let dy = (screen.y - TILE_SIZE_PX) as f32 - player.1;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist > max_dist {
        return None;
    }
    let delta = (max_dist - TILE_SIZE_PX as f32) * 0.5;
    let fraction = (dist - delta) / (max_dist - delta);
    Some((fraction * 255.0).clamp(0.0, 255.0) as u8)
}

/// A mobile boxed in by solid overhead surfaces on the 4x4 block around it.
pub fn has_surface_overhead(
    map: &WorldMap,
    metadata: &dyn TileMetadata,
    object: &WorldObject,
    max_z: i32,
) -> bool {
    let (ox, oy, oz) = (i32::from(object.x()), i32::from(object.y()), i32::from(object.z()));
    for dy in -1..=2 {
        for dx in -1..=2 {
            let covered = map
                .cell(ox + dx, oy + dy)
                .iter()
                .filter_map(|handle| map.get(*handle))
                .filter(|tile| tile.kind.is_scenery() && i32::from(tile.z()) > oz)
                .any(|tile| {
                    let data = metadata.static_data(tile.graphic);
                    let tile_z = i32::from(tile.z());
                    data.flags.intersects(TileFlags::NO_SHOOT | TileFlags::WINDOW)
                        && max_z - tile_z + SURFACE_OVERHEAD_SLACK >= tile_z - oz
                });
            if !covered {
                return false;
            }
        }
    }
    true
}

/// Runs one object through the visibility rules, updating its alpha and
/// pushing it to the frame outputs when it survives.
pub(crate) fn filter_object(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &mut WorldMap,
    handle: ObjectHandle,
) -> FilterOutcome {
    let Some(object) = map.get_mut(handle) else {
        return FilterOutcome::Continue;
    };
    if ctx.update_draw_position || object.render.position_dirty {
        object.update_screen_position(ctx.draw_offset);
    }
    if !ctx.pixels.contains_x(object.screen_position().x) {
        // Every object in a cell shares the same screen X.
        return FilterOutcome::StopCell;
    }
    out.objects_considered += 1;

    let kind = object.kind;
    match kind {
        ObjectKind::Terrain(info) => filter_terrain(ctx, out, map, handle, info),
        ObjectKind::Static => filter_scenery(ctx, out, map, handle, false),
        ObjectKind::MultiComponent(_) => filter_scenery(ctx, out, map, handle, true),
        ObjectKind::Mobile(info) => filter_mobile(ctx, out, map, handle, info),
        ObjectKind::Item(info) => filter_item(ctx, out, map, handle, info),
        ObjectKind::Effect(_) => filter_effect(ctx, out, map, handle),
    }
}

/// Whether an object sits wholly under the draw ceiling. Anything else
/// fades toward invisible, foliage included.
fn under_ceiling(limits: MaxDrawZ, z: i8, top: i32) -> bool {
    i32::from(z) < limits.max_z && top <= limits.max_z
}

fn above_hard_ceiling(ctx: &FrameContext<'_>, object: &WorldObject, top: i32) -> Option<FilterOutcome> {
    if top <= ctx.hard_ceiling {
        return None;
    }
    let priority = i32::from(object.priority_z());
    Some(if priority - MAX_PRIORITY_RAISE > ctx.hard_ceiling {
        FilterOutcome::StopCell
    } else {
        FilterOutcome::Continue
    })
}

/// Alpha rules in priority order. Returns `None` to drop the object this
/// frame, else whether it may be picked.
fn process_alpha(
    ctx: &FrameContext<'_>,
    object: &mut WorldObject,
    data: &StaticTileData,
    use_cot: bool,
    top: i32,
) -> Option<bool> {
    let fading = ctx.profile.use_objects_fading;
    let limits = ctx.limits;
    let alpha = object.render.alpha;

    if !under_ceiling(limits, object.z(), top) {
        // A first step is taken off-tick too so nothing above the ceiling
        // is ever opaque.
        let changed = if ctx.fade_tick || alpha == OPAQUE {
            fade_toward(&mut object.render.alpha, 0, fading)
        } else {
            alpha != 0
        };
        return changed.then_some(true);
    }

    if limits.no_draw_roofs && data.is_roof() {
        if ctx.fade_tick && !fade_toward(&mut object.render.alpha, 0, fading) {
            return None;
        }
        return (object.render.alpha != 0).then_some(true);
    }

    if data.is_translucent() {
        if ctx.fade_tick {
            fade_toward(&mut object.render.alpha, TRANSLUCENT_ALPHA, fading);
        }
        return Some(true);
    }

    if !data.is_foliage() {
        let in_circle = if use_cot
            && ctx.profile.use_circle_of_transparency
            && transparent_test(object.z(), data, ctx.cot_z)
        {
            cot_alpha(
                ctx.profile.circle_of_transparency_radius,
                ctx.player_anchor,
                object.screen_position(),
            )
        } else {
            None
        };

        if let Some(cot) = in_circle {
            object.render.alpha = cot;
            return Some(cot >= COT_SELECT_MIN_ALPHA);
        }
        if ctx.fade_tick && alpha != OPAQUE {
            fade_toward(&mut object.render.alpha, OPAQUE, fading);
        }
    }
    Some(true)
}

fn screen_y_visible(ctx: &FrameContext<'_>, object: &WorldObject) -> bool {
    ctx.pixels.contains_y(object.screen_position().y)
}

fn filter_terrain(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &mut WorldMap,
    handle: ObjectHandle,
    info: TerrainInfo,
) -> FilterOutcome {
    let Some(object) = map.get_mut(handle) else {
        return FilterOutcome::Continue;
    };
    let top = i32::from(object.elevation());
    if let Some(outcome) = above_hard_ceiling(ctx, object, top) {
        return outcome;
    }
    if process_alpha(ctx, object, &StaticTileData::default(), false, top).is_none() {
        return FilterOutcome::Continue;
    }

    let mut screen_y = object.screen_position().y;
    if screen_y > ctx.pixels.max_y {
        return FilterOutcome::Continue;
    }
    if info.stretched {
        screen_y += (i32::from(object.z()) - i32::from(info.min_z)) << 2;
    }
    if screen_y < ctx.pixels.min_y {
        return FilterOutcome::Continue;
    }

    let bucket = if info.stretched {
        Bucket::TerrainStretched
    } else {
        Bucket::TerrainFlat
    };
    push_to_render_list(ctx, out, map, handle, bucket, true);
    FilterOutcome::Continue
}

fn filter_scenery(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &mut WorldMap,
    handle: ObjectHandle,
    is_multi: bool,
) -> FilterOutcome {
    let profile = ctx.profile;
    let Some(object) = map.get_mut(handle) else {
        return FilterOutcome::Continue;
    };
    let graphic = object.graphic;
    let data = ctx.metadata.static_data(graphic);
    if data.is_internal() {
        return FilterOutcome::Continue;
    }
    if !is_multi && !visible_at_season(&data, ctx.season) {
        return FilterOutcome::Continue;
    }

    let top = object_top(object.z(), &data);
    if let Some(outcome) = above_hard_ceiling(ctx, object, top) {
        return outcome;
    }
    let Some(allow_selection) = process_alpha(ctx, object, &data, true, top) else {
        return FilterOutcome::Continue;
    };

    let traits = ctx.metadata.graphic_traits(graphic);
    if !data.is_multi_movable() {
        if data.is_foliage() && profile.tree_to_stumps {
            return FilterOutcome::Continue;
        }
        if traits.contains(GraphicTraits::VEGETATION) && profile.hide_vegetation {
            return FilterOutcome::Continue;
        }
    }
    if !screen_y_visible(ctx, object) {
        return FilterOutcome::Continue;
    }

    if data.is_foliage() && under_ceiling(ctx.limits, object.z(), top) {
        let bounds = out.bounds.resolve(ctx.metadata, graphic);
        out.foliage
            .check_behind_tree(map, handle, ctx.player_tile, ctx.player_rect, bounds);
    }

    let casts_shadow = data.is_foliage() || traits.intersects(GraphicTraits::TREE | GraphicTraits::ROCK);
    let bucket = if profile.static_shadows() && casts_shadow {
        Bucket::Transparent
    } else {
        Bucket::Statics
    };
    if push_to_render_list(ctx, out, map, handle, bucket, allow_selection).is_some()
        && data.is_light_source()
    {
        add_light(ctx, out, map, handle, LightOrigin::Caster);
    }
    FilterOutcome::Continue
}

fn filter_mobile(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &mut WorldMap,
    handle: ObjectHandle,
    info: MobileInfo,
) -> FilterOutcome {
    let Some(object) = map.get_mut(handle) else {
        return FilterOutcome::Continue;
    };
    let top = i32::from(object.z()) + CHARACTER_HEIGHT;
    if let Some(outcome) = above_hard_ceiling(ctx, object, top) {
        return outcome;
    }
    let Some(allow_selection) =
        process_alpha(ctx, object, &StaticTileData::default(), false, top)
    else {
        return FilterOutcome::Continue;
    };
    if !screen_y_visible(ctx, object) {
        return FilterOutcome::Continue;
    }

    let allowed_to_draw = handle == ctx.player
        || map
            .get(handle)
            .is_some_and(|object| !has_surface_overhead(map, ctx.metadata, object, ctx.limits.max_z));
    if let Some(object) = map.get_mut(handle) {
        object.render.allowed_to_draw = allowed_to_draw;
    }

    if push_to_render_list(ctx, out, map, handle, Bucket::Animations, allow_selection).is_some() {
        if ctx.use_object_handles && allowed_to_draw {
            out.labeled.push(handle);
        }
        if let Some(graphic) = info.held_light {
            add_light(ctx, out, map, handle, LightOrigin::Equipped { graphic });
        }
    }
    FilterOutcome::Continue
}

fn filter_item(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &mut WorldMap,
    handle: ObjectHandle,
    info: ItemInfo,
) -> FilterOutcome {
    let Some(object) = map.get_mut(handle) else {
        return FilterOutcome::Continue;
    };
    let is_multi = info.multi_graphic.is_some();
    let graphic = object.display_graphic();
    let data = ctx.metadata.static_data(graphic);
    if !info.corpse && data.is_internal() {
        return FilterOutcome::Continue;
    }
    if !is_multi && !visible_at_season(&data, ctx.season) {
        return FilterOutcome::Continue;
    }

    let top = object_top(object.z(), &data);
    if let Some(outcome) = above_hard_ceiling(ctx, object, top) {
        return outcome;
    }
    let Some(allow_selection) = process_alpha(ctx, object, &data, false, top) else {
        return FilterOutcome::Continue;
    };
    if !data.is_multi_movable() && data.is_foliage() && ctx.profile.tree_to_stumps {
        return FilterOutcome::Continue;
    }
    if !screen_y_visible(ctx, object) {
        return FilterOutcome::Continue;
    }

    if !info.corpse && data.is_foliage() && under_ceiling(ctx.limits, object.z(), top) {
        let bounds = out.bounds.resolve(ctx.metadata, graphic);
        out.foliage
            .check_behind_tree(map, handle, ctx.player_tile, ctx.player_rect, bounds);
    }

    let pushed = if info.corpse {
        push_to_render_list(ctx, out, map, handle, Bucket::Animations, allow_selection)
    } else {
        push_to_render_list(ctx, out, map, handle, Bucket::Statics, true)
    };
    if pushed.is_none() {
        return FilterOutcome::Continue;
    }

    let labelled = info.corpse || (!is_multi && (!info.locked || data.is_container()));
    let allowed_to_draw = map
        .get(handle)
        .is_some_and(|object| object.render.allowed_to_draw);
    if ctx.use_object_handles && labelled && allowed_to_draw {
        out.labeled.push(handle);
    }
    if data.is_light_source() {
        add_light(ctx, out, map, handle, LightOrigin::Caster);
    }
    FilterOutcome::Continue
}

fn filter_effect(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &mut WorldMap,
    handle: ObjectHandle,
) -> FilterOutcome {
    let Some(object) = map.get_mut(handle) else {
        return FilterOutcome::Continue;
    };
    let data = ctx.metadata.static_data(object.graphic);
    let top = object_top(object.z(), &data);
    if let Some(outcome) = above_hard_ceiling(ctx, object, top) {
        return outcome;
    }
    if process_alpha(ctx, object, &data, false, top).is_none() {
        return FilterOutcome::Continue;
    }
    if !screen_y_visible(ctx, object) {
        return FilterOutcome::Continue;
    }

    if push_to_render_list(ctx, out, map, handle, Bucket::Effects, false).is_some()
        && data.is_light_source()
    {
        add_light(ctx, out, map, handle, LightOrigin::Caster);
    }
    FilterOutcome::Continue
}

/// Appends the object to its bucket and offers it to the pick resolver
/// when the cursor is on it.
fn push_to_render_list(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &WorldMap,
    handle: ObjectHandle,
    hint: Bucket,
    allow_selection: bool,
) -> Option<Bucket> {
    let object = map.get(handle)?;
    let alpha = object.render.alpha;
    if alpha == 0 {
        return None;
    }
    let depth = object.depth_z();

    if let Some(cursor) = ctx.cursor {
        let pickable = allow_selection
            && i32::from(object.z()) <= ctx.limits.max_ground_z
            && object.render.allowed_to_draw;
        if pickable {
            let bounds = match object.kind {
                ObjectKind::Terrain(_) | ObjectKind::Mobile(_) => None,
                _ => out.bounds.resolve(ctx.metadata, object.display_graphic()),
            };
            if hit_test(object, bounds, cursor) {
                out.picker.offer(handle, depth);
            }
        }
    }

    out.lists.push(handle, alpha, depth, hint)
}

fn add_light(
    ctx: &FrameContext<'_>,
    out: &mut FrameOutputs,
    map: &WorldMap,
    handle: ObjectHandle,
    origin: LightOrigin,
) {
    let Some(caster) = map.get(handle) else {
        return;
    };
    let screen = caster.screen_position();
    let draw = ScreenPoint {
        x: screen.x + TILE_HALF_PX,
        y: screen.y + TILE_HALF_PX,
    };
    out.lights
        .add_light(&ctx.light_scene(map), caster, origin, draw);
}

/// Copies a cell's handles so objects can be mutated while it is walked.
pub(crate) fn cell_snapshot(map: &WorldMap, x: i32, y: i32) -> SmallVec<[ObjectHandle; 16]> {
    map.cell(x, y).iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(flags: TileFlags, height: u8) -> StaticTileData {
        StaticTileData {
            flags,
            height,
            ..StaticTileData::default()
        }
    }

    #[test]
    fn object_top_uses_adjusted_height() {
        assert_eq!(object_top(10, &data(TileFlags::empty(), 20)), 30);
        assert_eq!(object_top(10, &data(TileFlags::BRIDGE, 20)), 20);
        assert_eq!(object_top(10, &data(TileFlags::empty(), 0)), 20);
        assert_eq!(object_top(10, &data(TileFlags::empty(), 0xFF)), 10);
    }

    #[test]
    fn winter_hides_plain_foliage_only() {
        let leaves = data(TileFlags::FOLIAGE, 20);
        let boat_leaves = data(TileFlags::FOLIAGE | TileFlags::MULTI_MOVABLE, 20);
        assert!(visible_at_season(&leaves, Season::Fall));
        assert!(!visible_at_season(&leaves, Season::Winter));
        assert!(!visible_at_season(&leaves, Season::Desolation));
        assert!(visible_at_season(&boat_leaves, Season::Winter));
        assert!(visible_at_season(&data(TileFlags::empty(), 5), Season::Winter));
    }

    #[test]
    fn transparent_test_needs_object_to_reach_above_circle() {
        let tall = data(TileFlags::empty(), 20);
        // cot_z 5: an object at z 0 with height 20 reaches past it.
        assert!(transparent_test(0, &tall, 5));
        // Entirely below the circle.
        assert!(!transparent_test(-20, &tall, 5));
        // Above the circle and too flat to fade.
        assert!(!transparent_test(10, &data(TileFlags::empty(), 2), 5));
        assert!(transparent_test(10, &tall, 5));
    }

    #[test]
    fn cot_alpha_fades_toward_player() {
        let player = (100.0, 100.0);
        let rim = cot_alpha(100, player, ScreenPoint { x: 199, y: 144 }).expect("inside");
        let near = cot_alpha(100, player, ScreenPoint { x: 120, y: 144 }).expect("inside");
        let centre = cot_alpha(100, player, ScreenPoint { x: 100, y: 144 }).expect("inside");
        assert!(rim > near);
        assert_eq!(centre, 0);
        assert_eq!(rim, 251);
        assert!(cot_alpha(100, player, ScreenPoint { x: 201, y: 144 }).is_none());
    }
}
