use tracing::trace;

use super::profile::RenderProfile;
use crate::world::{Direction, ObjectKind, ScreenPoint, TileMetadata, WorldMap, WorldObject};

pub const MAX_LIGHTS: usize = 100;
const COLORED_LIGHT_BASE: u8 = 200;
const LIGHT_BLOCK_CLEARANCE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightEntry {
    /// Light shape template.
    pub id: u8,
    /// Zero means uncoloured.
    pub color: u16,
    pub is_hue: bool,
    pub draw: ScreenPoint,
}

/// What emits the light for a caster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightOrigin {
    /// The caster itself glows.
    Caster,
    /// A light source the caster is holding.
    Equipped { graphic: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightOutcome {
    Added,
    Disabled,
    Full,
    Blocked,
    UnknownShape,
}

/// Read-only frame state a light needs to place itself.
#[derive(Clone, Copy)]
pub struct LightScene<'a> {
    pub map: &'a WorldMap,
    pub metadata: &'a dyn TileMetadata,
    pub profile: &'a RenderProfile,
    pub max_z: i32,
}

/// Fixed-capacity list of the lights visible this frame.
#[derive(Debug, Clone)]
pub struct LightBuffer {
    entries: Vec<LightEntry>,
    dropped: usize,
}

impl Default for LightBuffer {
    fn default() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_LIGHTS),
            dropped: 0,
        }
    }
}

impl LightBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
    }

    pub fn entries(&self) -> &[LightEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lights refused this frame because the buffer was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn add_light(
        &mut self,
        scene: &LightScene<'_>,
        caster: &WorldObject,
        origin: LightOrigin,
        draw: ScreenPoint,
    ) -> LightOutcome {
        let LightScene {
            map,
            metadata,
            profile,
            max_z,
        } = *scene;
        if !profile.lighting_enabled() {
            return LightOutcome::Disabled;
        }
        if self.entries.len() >= MAX_LIGHTS {
            self.dropped += 1;
            trace!(graphic = caster.graphic, "light_buffer_full");
            return LightOutcome::Full;
        }
        if light_blocked(map, metadata, caster, max_z) {
            return LightOutcome::Blocked;
        }

        let light_graphic = match origin {
            LightOrigin::Caster => caster.graphic,
            LightOrigin::Equipped { graphic } => graphic,
        };
        let (mut id, draw) = light_shape(metadata, caster, origin, light_graphic, draw);

        let mut color = 0u16;
        let mut is_hue = false;
        if profile.use_colored_lights {
            if id > COLORED_LIGHT_BASE {
                color = u16::from(id - COLORED_LIGHT_BASE);
                id = 1;
            }
            if let Some(tinted) = metadata.light_color(light_graphic) {
                color = tinted.color;
                is_hue = tinted.is_hue;
            }
        }

        if usize::from(id) >= MAX_LIGHTS {
            return LightOutcome::UnknownShape;
        }
        if color != 0 {
            color = color.saturating_add(1);
        }

        self.entries.push(LightEntry {
            id,
            color,
            is_hue,
            draw,
        });
        LightOutcome::Added
    }
}

/// A solid static or multi piece on the tile diagonally ahead, between the
/// caster's head height and the draw ceiling, swallows the light.
fn light_blocked(
    map: &WorldMap,
    metadata: &dyn TileMetadata,
    caster: &WorldObject,
    max_z: i32,
) -> bool {
    let z5 = i32::from(caster.z()) + LIGHT_BLOCK_CLEARANCE;
    let (x, y) = (i32::from(caster.x()) + 1, i32::from(caster.y()) + 1);

    map.cell(x, y)
        .iter()
        .filter_map(|handle| map.get(*handle))
        .filter(|object| object.kind.is_scenery() && object.render.allowed_to_draw)
        .filter(|object| !metadata.static_data(object.graphic).is_transparent())
        .any(|object| {
            let z = i32::from(object.z());
            z < max_z && z >= z5
        })
}

fn light_shape(
    metadata: &dyn TileMetadata,
    caster: &WorldObject,
    origin: LightOrigin,
    light_graphic: u16,
    mut draw: ScreenPoint,
) -> (u8, ScreenPoint) {
    if matches!(light_graphic, 0x3E02..=0x3E0B | 0x3914..=0x3929 | 0x0B1D) {
        return (2, draw);
    }

    let id = match (origin, caster.kind) {
        (LightOrigin::Caster, ObjectKind::Item(info)) => info.light_id,
        (LightOrigin::Equipped { graphic }, kind) => {
            if let ObjectKind::Mobile(info) = kind {
                let (dx, dy) = held_light_offset(info.direction);
                draw.x += dx;
                draw.y += dy;
            }
            metadata.static_data(graphic).light_index
        }
        (LightOrigin::Caster, ObjectKind::Mobile(_)) => 1,
        (LightOrigin::Caster, _) => metadata.static_data(caster.graphic).layer,
    };
    (id, draw)
}

fn held_light_offset(direction: Direction) -> (i32, i32) {
    match direction {
        Direction::Right => (22, 33),
        Direction::Left => (-22, 33),
        Direction::East => (22, 55),
        Direction::Down => (0, 55),
        Direction::South => (-22, 55),
        Direction::North | Direction::West | Direction::Up => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{
        ItemInfo, LightColor, MobileInfo, StaticTileData, TileDataTable, TileFlags,
    };

    const LANTERN: u16 = 0x0A22;
    const WALL: u16 = 0x0080;
    const GLASS: u16 = 0x0081;

    fn lit_profile() -> RenderProfile {
        RenderProfile {
            use_lights: true,
            ..RenderProfile::default()
        }
    }

    fn table() -> TileDataTable {
        let mut table = TileDataTable::new();
        table.insert_static(
            LANTERN,
            StaticTileData {
                flags: TileFlags::LIGHT_SOURCE,
                light_index: 7,
                ..StaticTileData::default()
            },
        );
        table.insert_static(
            WALL,
            StaticTileData {
                flags: TileFlags::WALL,
                height: 20,
                ..StaticTileData::default()
            },
        );
        table.insert_static(
            GLASS,
            StaticTileData {
                flags: TileFlags::WALL | TileFlags::TRANSPARENT,
                height: 20,
                ..StaticTileData::default()
            },
        );
        table
    }

    fn scene<'a>(
        map: &'a WorldMap,
        table: &'a TileDataTable,
        profile: &'a RenderProfile,
        max_z: i32,
    ) -> LightScene<'a> {
        LightScene {
            map,
            metadata: table,
            profile,
            max_z,
        }
    }

    fn lamp(light_id: u8) -> WorldObject {
        WorldObject::item(
            LANTERN,
            4,
            4,
            0,
            ItemInfo {
                light_id,
                ..ItemInfo::default()
            },
        )
    }

    #[test]
    fn disabled_lighting_adds_nothing() {
        let table = table();
        let map = WorldMap::new(8, 8);
        let mut lights = LightBuffer::new();
        let outcome = lights.add_light(
            &scene(&map, &table, &RenderProfile::default(), 127),
            &lamp(3),
            LightOrigin::Caster,
            ScreenPoint::default(),
        );
        assert_eq!(outcome, LightOutcome::Disabled);
        assert!(lights.is_empty());
    }

    #[test]
    fn self_lit_item_uses_its_light_id() {
        let table = table();
        let map = WorldMap::new(8, 8);
        let mut lights = LightBuffer::new();
        lights.add_light(
            &scene(&map, &table, &lit_profile(), 127),
            &lamp(3),
            LightOrigin::Caster,
            ScreenPoint { x: 10, y: 20 },
        );
        assert_eq!(
            lights.entries(),
            &[LightEntry {
                id: 3,
                color: 0,
                is_hue: false,
                draw: ScreenPoint { x: 10, y: 20 },
            }]
        );
    }

    #[test]
    fn special_graphics_use_shape_two() {
        let table = table();
        let map = WorldMap::new(8, 8);
        let mut lights = LightBuffer::new();
        let brazier = WorldObject::static_tile(0x0B1D, 1, 1, 0);
        lights.add_light(
            &scene(&map, &table, &lit_profile(), 127),
            &brazier,
            LightOrigin::Caster,
            ScreenPoint::default(),
        );
        assert_eq!(lights.entries()[0].id, 2);
    }

    #[test]
    fn held_light_shifts_with_mobile_direction() {
        let table = table();
        let map = WorldMap::new(8, 8);
        let mut lights = LightBuffer::new();
        let mobile = WorldObject::mobile(
            0x190,
            2,
            2,
            0,
            MobileInfo {
                direction: Direction::South,
                ..MobileInfo::default()
            },
        );
        lights.add_light(
            &scene(&map, &table, &lit_profile(), 127),
            &mobile,
            LightOrigin::Equipped { graphic: LANTERN },
            ScreenPoint { x: 100, y: 100 },
        );
        let entry = lights.entries()[0];
        assert_eq!(entry.id, 7);
        assert_eq!(entry.draw, ScreenPoint { x: 78, y: 155 });
    }

    #[test]
    fn colored_ids_and_color_table() {
        let mut table = table();
        let map = WorldMap::new(8, 8);
        let mut lights = LightBuffer::new();
        let profile = RenderProfile {
            use_lights: true,
            use_colored_lights: true,
            ..RenderProfile::default()
        };
        lights.add_light(
            &scene(&map, &table, &profile, 127),
            &lamp(205),
            LightOrigin::Caster,
            ScreenPoint::default(),
        );
        assert_eq!((lights.entries()[0].id, lights.entries()[0].color), (1, 6));

        table.insert_light_color(
            LANTERN,
            LightColor {
                color: 40,
                is_hue: true,
            },
        );
        lights.add_light(
            &scene(&map, &table, &profile, 127),
            &lamp(3),
            LightOrigin::Caster,
            ScreenPoint::default(),
        );
        let tinted = lights.entries()[1];
        assert_eq!((tinted.id, tinted.color, tinted.is_hue), (3, 41, true));
    }

    #[test]
    fn out_of_range_shape_is_dropped() {
        let table = table();
        let map = WorldMap::new(8, 8);
        let mut lights = LightBuffer::new();
        let outcome = lights.add_light(
            &scene(&map, &table, &RenderProfile {
                use_colored_lights: false,
                ..lit_profile()
            }, 127),
            &lamp(150),
            LightOrigin::Caster,
            ScreenPoint::default(),
        );
        assert_eq!(outcome, LightOutcome::UnknownShape);
        assert!(lights.is_empty());
    }

    #[test]
    fn solid_wall_ahead_blocks_light_but_transparent_does_not() {
        let table = table();
        let mut map = WorldMap::new(8, 8);
        let glass = map
            .insert(WorldObject::static_tile(GLASS, 5, 5, 10), &table)
            .expect("glass");
        let mut lights = LightBuffer::new();
        assert_eq!(
            lights.add_light(
                &scene(&map, &table, &lit_profile(), 127),
                &lamp(3),
                LightOrigin::Caster,
                ScreenPoint::default(),
            ),
            LightOutcome::Added
        );

        map.remove(glass).expect("remove");
        map.insert(WorldObject::static_tile(WALL, 5, 5, 10), &table)
            .expect("wall");
        assert_eq!(
            lights.add_light(
                &scene(&map, &table, &lit_profile(), 127),
                &lamp(3),
                LightOrigin::Caster,
                ScreenPoint::default(),
            ),
            LightOutcome::Blocked
        );
        // Above the draw ceiling the wall no longer counts.
        assert_eq!(
            lights.add_light(
                &scene(&map, &table, &lit_profile(), 10),
                &lamp(3),
                LightOrigin::Caster,
                ScreenPoint::default(),
            ),
            LightOutcome::Added
        );
    }

    #[test]
    fn full_buffer_counts_drops() {
        let table = table();
        let map = WorldMap::new(8, 8);
        let mut lights = LightBuffer::new();
        for _ in 0..MAX_LIGHTS + 3 {
            lights.add_light(
                &scene(&map, &table, &lit_profile(), 127),
                &lamp(3),
                LightOrigin::Caster,
                ScreenPoint::default(),
            );
        }
        assert_eq!(lights.len(), MAX_LIGHTS);
        assert_eq!(lights.dropped(), 3);

        lights.clear();
        assert!(lights.is_empty());
        assert_eq!(lights.dropped(), 0);
    }
}
