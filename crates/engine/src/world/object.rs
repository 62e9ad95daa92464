use serde::{Deserialize, Serialize};

use super::tiledata::SpriteBounds;

pub const TILE_HALF_PX: i32 = 22;
pub const TILE_SIZE_PX: i32 = 44;
pub const CHARACTER_HEIGHT: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjectHandle {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    North,
    Right,
    East,
    Down,
    South,
    Left,
    West,
    Up,
}

/// Smooth movement offset in screen pixels, applied between tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveOffset {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainInfo {
    pub stretched: bool,
    pub min_z: i8,
    pub average_z: i8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiInfo {
    pub internal: bool,
    pub preview: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MobileInfo {
    pub direction: Direction,
    /// Current animation frame: `x`/`y` are the frame anchor, `width`/`height`
    /// its size. Supplied by the animation layer.
    pub frame: SpriteBounds,
    /// Graphic of an equipped light source, if any.
    pub held_light: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemInfo {
    pub corpse: bool,
    pub multi_graphic: Option<u16>,
    pub locked: bool,
    pub light_id: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectInfo {
    pub moving: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Terrain(TerrainInfo),
    Static,
    MultiComponent(MultiInfo),
    Mobile(MobileInfo),
    Item(ItemInfo),
    Effect(EffectInfo),
}

impl ObjectKind {
    pub fn is_terrain(&self) -> bool {
        matches!(self, ObjectKind::Terrain(_))
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, ObjectKind::Mobile(_))
    }

    /// Statics and multi components: the fixed scenery the roof and light
    /// tests look at.
    pub fn is_scenery(&self) -> bool {
        matches!(self, ObjectKind::Static | ObjectKind::MultiComponent(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Terrain(_) => "terrain",
            ObjectKind::Static => "static",
            ObjectKind::MultiComponent(_) => "multi",
            ObjectKind::Mobile(_) => "mobile",
            ObjectKind::Item(_) => "item",
            ObjectKind::Effect(_) => "effect",
        }
    }
}

/// Per-object state owned by the frame pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub alpha: u8,
    pub foliage_epoch: u8,
    /// Cleared for mobiles standing under a solid overhead surface; hides
    /// them from the label layer and from picking, not from drawing.
    pub allowed_to_draw: bool,
    pub(crate) priority_z: i16,
    pub(crate) screen: ScreenPoint,
    pub(crate) position_dirty: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            alpha: u8::MAX,
            foliage_epoch: 0,
            allowed_to_draw: true,
            priority_z: 0,
            screen: ScreenPoint::default(),
            position_dirty: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub graphic: u16,
    pub hue: u16,
    x: u16,
    y: u16,
    z: i8,
    pub kind: ObjectKind,
    pub offset: MoveOffset,
    pub render: RenderState,
}

impl WorldObject {
    pub fn new(graphic: u16, x: u16, y: u16, z: i8, kind: ObjectKind) -> Self {
        Self {
            graphic,
            hue: 0,
            x,
            y,
            z,
            kind,
            offset: MoveOffset::default(),
            render: RenderState::default(),
        }
    }

    pub fn terrain(graphic: u16, x: u16, y: u16, z: i8) -> Self {
        Self::new(
            graphic,
            x,
            y,
            z,
            ObjectKind::Terrain(TerrainInfo {
                stretched: false,
                min_z: z,
                average_z: z,
            }),
        )
    }

    pub fn stretched_terrain(graphic: u16, x: u16, y: u16, z: i8, min_z: i8, average_z: i8) -> Self {
        Self::new(
            graphic,
            x,
            y,
            z,
            ObjectKind::Terrain(TerrainInfo {
                stretched: true,
                min_z,
                average_z,
            }),
        )
    }

    pub fn static_tile(graphic: u16, x: u16, y: u16, z: i8) -> Self {
        Self::new(graphic, x, y, z, ObjectKind::Static)
    }

    pub fn multi(graphic: u16, x: u16, y: u16, z: i8, info: MultiInfo) -> Self {
        Self::new(graphic, x, y, z, ObjectKind::MultiComponent(info))
    }

    pub fn mobile(graphic: u16, x: u16, y: u16, z: i8, info: MobileInfo) -> Self {
        Self::new(graphic, x, y, z, ObjectKind::Mobile(info))
    }

    pub fn item(graphic: u16, x: u16, y: u16, z: i8, info: ItemInfo) -> Self {
        Self::new(graphic, x, y, z, ObjectKind::Item(info))
    }

    pub fn effect(graphic: u16, x: u16, y: u16, z: i8, moving: bool) -> Self {
        Self::new(graphic, x, y, z, ObjectKind::Effect(EffectInfo { moving }))
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u16 {
        self.y
    }

    pub fn z(&self) -> i8 {
        self.z
    }

    /// Only the map may move an object: its cell and priority order follow
    /// the position.
    pub(super) fn move_to(&mut self, x: u16, y: u16, z: i8) {
        self.x = x;
        self.y = y;
        self.z = z;
        self.render.position_dirty = true;
    }

    /// Graphic whose tile data describes this object. Multi items preview
    /// their multi graphic instead of their own.
    pub fn display_graphic(&self) -> u16 {
        match self.kind {
            ObjectKind::Item(ItemInfo {
                multi_graphic: Some(graphic),
                ..
            }) => graphic,
            _ => self.graphic,
        }
    }

    /// Z used for ground tests: stretched terrain reports its average.
    pub fn elevation(&self) -> i8 {
        match self.kind {
            ObjectKind::Terrain(info) if info.stretched => info.average_z,
            _ => self.z,
        }
    }

    pub fn priority_z(&self) -> i16 {
        self.render.priority_z
    }

    pub fn screen_position(&self) -> ScreenPoint {
        self.render.screen
    }

    /// Call after editing `offset` so the next frame re-projects the object.
    pub fn mark_position_dirty(&mut self) {
        self.render.position_dirty = true;
    }

    pub(crate) fn update_screen_position(&mut self, draw_offset: ScreenPoint) {
        let x = i32::from(self.x);
        let y = i32::from(self.y);
        let z = i32::from(self.z);
        self.render.screen = ScreenPoint {
            x: (x - y) * TILE_HALF_PX - draw_offset.x - TILE_HALF_PX,
            y: (x + y) * TILE_HALF_PX - (z << 2) - draw_offset.y - TILE_HALF_PX,
        };
        self.render.position_dirty = false;
    }

    /// Rectangle covered by a mobile's current animation frame.
    pub fn frame_rect(&self) -> Option<ScreenRect> {
        let ObjectKind::Mobile(info) = self.kind else {
            return None;
        };
        let screen = self.render.screen;
        Some(ScreenRect {
            x: screen.x - info.frame.x + TILE_HALF_PX + self.offset.x as i32,
            y: screen.y - info.frame.y + TILE_HALF_PX + (self.offset.y - self.offset.z) as i32,
            width: info.frame.width,
            height: info.frame.height,
        })
    }

    /// Scalar draw depth shared by transparent blending and picking.
    pub fn depth_z(&self) -> f32 {
        let mut x = i32::from(self.x);
        let mut y = i32::from(self.y);
        let mut z = i32::from(self.render.priority_z);
        let raised = (self.offset.z as i32).max(0);

        match (axis_sign(self.offset.x), axis_sign(self.offset.y)) {
            (1, 0) => x += 1,
            (1, 1) => {
                x += 1;
                z += raised;
            }
            (0, 1) => {
                x += 1;
                y += 1;
            }
            (-1, 1) => {
                y += 1;
                z += raised;
            }
            (-1, 0) => y += 1,
            _ => {}
        }

        (x + y) as f32 + (127 + z) as f32 * 0.01
    }
}

fn axis_sign(value: f32) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Screen rectangle of an art sprite's opaque content when drawn at `screen`.
pub fn art_screen_rect(screen: ScreenPoint, bounds: SpriteBounds) -> ScreenRect {
    ScreenRect {
        x: screen.x - (bounds.width >> 1) + bounds.x,
        y: screen.y - bounds.height + bounds.y,
        width: bounds.width,
        height: bounds.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_position_follows_isometric_projection() {
        let mut object = WorldObject::static_tile(1, 10, 4, 5);
        object.update_screen_position(ScreenPoint { x: 100, y: 50 });
        assert_eq!(object.screen_position(), ScreenPoint { x: 10, y: 216 });
        assert!(!object.render.position_dirty);
    }

    #[test]
    fn depth_grows_with_diagonal_and_priority() {
        let mut near = WorldObject::static_tile(1, 5, 5, 0);
        let mut far = WorldObject::static_tile(1, 4, 5, 0);
        near.render.priority_z = 0;
        far.render.priority_z = 50;
        assert!(near.depth_z() > far.depth_z());

        let mut high = WorldObject::static_tile(1, 5, 5, 0);
        high.render.priority_z = 10;
        assert!(high.depth_z() > near.depth_z());
    }

    #[test]
    fn depth_bumps_tile_along_movement_offset() {
        let mut still = WorldObject::mobile(0x190, 3, 3, 0, MobileInfo::default());
        still.render.priority_z = 1;
        let mut moving = still.clone();
        moving.offset = MoveOffset {
            x: 0.0,
            y: 4.0,
            z: 0.0,
        };
        assert!((moving.depth_z() - still.depth_z() - 2.0).abs() < 0.0001);
    }

    #[test]
    fn multi_item_displays_multi_graphic() {
        let item = WorldObject::item(
            0x4000,
            1,
            1,
            0,
            ItemInfo {
                multi_graphic: Some(0x0064),
                ..ItemInfo::default()
            },
        );
        assert_eq!(item.display_graphic(), 0x0064);
        assert_eq!(WorldObject::static_tile(9, 0, 0, 0).display_graphic(), 9);
    }

    #[test]
    fn stretched_terrain_elevation_uses_average() {
        let land = WorldObject::stretched_terrain(3, 0, 0, 10, 2, 6);
        assert_eq!(land.elevation(), 6);
        assert_eq!(WorldObject::terrain(3, 0, 0, 10).elevation(), 10);
    }

    #[test]
    fn rect_intersection_is_exclusive_at_edges() {
        let a = ScreenRect {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        let touching = ScreenRect {
            x: 10,
            y: 0,
            width: 5,
            height: 5,
        };
        let overlapping = ScreenRect {
            x: 9,
            y: 9,
            width: 5,
            height: 5,
        };
        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert!(a.contains(ScreenPoint { x: 0, y: 9 }));
        assert!(!a.contains(ScreenPoint { x: 10, y: 0 }));
    }
}
