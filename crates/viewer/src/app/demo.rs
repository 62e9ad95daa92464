use iso_engine::scene::{RenderProfile, Season};
use iso_engine::world::{Direction, GraphicTraits, SpriteBounds, StaticTileData, TileFlags};

use super::fixture::{Fixture, FixtureCamera, FixtureKind, FixtureObject, TileEntry};

const SIZE: u16 = 48;
const GRASS: u16 = 0x0003;
const WALL: u16 = 0x0064;
const ROOF: u16 = 0x05F0;
const TREE_FIRST: u16 = 0x0D45;
const TREE_LAST: u16 = 0x0D4C;
const BUSH: u16 = 0x0C8E;
const LAMP: u16 = 0x0A15;
const CHEST: u16 = 0x0E43;
const BODY: u16 = 0x0190;
const CORPSE: u16 = 0x2006;
const TORCH: u16 = 0x0A12;
const FIRE: u16 = 0x36BD;

const HOUSE_MIN: u16 = 20;
const HOUSE_MAX: u16 = 26;
const HOUSE_HEIGHT: i8 = 20;

fn bounds(width: i32, height: i32) -> Option<SpriteBounds> {
    Some(SpriteBounds {
        x: 0,
        y: 0,
        width,
        height,
    })
}

fn tile(graphic: u16, flags: TileFlags, height: u8, layer: u8) -> TileEntry {
    TileEntry {
        graphic,
        data: StaticTileData {
            flags,
            height,
            light_index: 0,
            layer,
        },
        bounds: bounds(44, 44 + i32::from(height) * 4),
        traits: GraphicTraits::empty(),
        light_color: None,
    }
}

fn object(graphic: u16, x: u16, y: u16, z: i8, kind: FixtureKind) -> FixtureObject {
    FixtureObject {
        graphic,
        x,
        y,
        z,
        hue: 0,
        kind,
    }
}

fn mobile(x: u16, y: u16, player: bool, held_light: Option<u16>) -> FixtureObject {
    object(
        BODY,
        x,
        y,
        0,
        FixtureKind::Mobile {
            player,
            direction: Direction::South,
            frame: SpriteBounds {
                x: 22,
                y: 60,
                width: 44,
                height: 60,
            },
            held_light,
        },
    )
}

/// Built-in scene used when no fixture file is configured: open grass, a
/// roofed house the player walks into, a multi-tile tree and a few lights.
pub(crate) fn demo_fixture() -> Fixture {
    let mut tiledata = vec![
        tile(WALL, TileFlags::WALL | TileFlags::IMPASSABLE, 20, 0),
        tile(ROOF, TileFlags::ROOF, 0, 0),
        tile(BUSH, TileFlags::empty(), 6, 0),
        tile(LAMP, TileFlags::LIGHT_SOURCE, 5, 3),
        tile(CHEST, TileFlags::CONTAINER, 10, 0),
        tile(CORPSE, TileFlags::empty(), 2, 0),
        tile(TORCH, TileFlags::LIGHT_SOURCE, 5, 0),
        tile(FIRE, TileFlags::LIGHT_SOURCE, 0, 0),
    ];
    if let Some(bush) = tiledata.iter_mut().find(|entry| entry.graphic == BUSH) {
        bush.traits = GraphicTraits::VEGETATION;
    }
    if let Some(torch) = tiledata.iter_mut().find(|entry| entry.graphic == TORCH) {
        torch.data.light_index = 2;
    }
    tiledata.extend((TREE_FIRST..=TREE_LAST).map(|graphic| TileEntry {
        traits: GraphicTraits::TREE,
        bounds: bounds(44, 160),
        ..tile(graphic, TileFlags::FOLIAGE, 20, 0)
    }));

    let mut objects = Vec::new();
    for y in 0..SIZE {
        for x in 0..SIZE {
            objects.push(object(GRASS, x, y, 0, FixtureKind::Terrain { stretch: None }));
        }
    }

    for i in HOUSE_MIN..=HOUSE_MAX {
        for (x, y) in [(i, HOUSE_MIN), (HOUSE_MIN, i), (i, HOUSE_MAX), (HOUSE_MAX, i)] {
            // Doorway on the north-west corner so the walk can enter.
            if (x, y) == (HOUSE_MIN, HOUSE_MIN) {
                continue;
            }
            objects.push(object(WALL, x, y, 0, FixtureKind::Static));
        }
        for j in HOUSE_MIN..=HOUSE_MAX {
            objects.push(object(ROOF, i, j, HOUSE_HEIGHT, FixtureKind::Static));
        }
    }
    objects.push(object(LAMP, 24, 22, 0, FixtureKind::Static));
    objects.push(object(
        CHEST,
        22,
        24,
        0,
        FixtureKind::Item {
            corpse: false,
            multi_graphic: None,
            locked: true,
            light_id: 0,
        },
    ));

    for (step, graphic) in (TREE_FIRST..=TREE_LAST).enumerate() {
        let step = step as u16;
        objects.push(object(graphic, 12 + step, 24 - step, 0, FixtureKind::Static));
    }
    for (x, y) in [(8, 30), (9, 31), (30, 8)] {
        objects.push(object(BUSH, x, y, 0, FixtureKind::Static));
    }
    objects.push(object(
        CORPSE,
        18,
        15,
        0,
        FixtureKind::Item {
            corpse: true,
            multi_graphic: None,
            locked: false,
            light_id: 0,
        },
    ));
    objects.push(object(FIRE, 16, 19, 0, FixtureKind::Effect { moving: false }));
    objects.push(mobile(28, 18, false, Some(TORCH)));
    objects.push(mobile(14, 14, true, None));

    Fixture {
        width: SIZE,
        height: SIZE,
        profile: RenderProfile {
            use_lights: true,
            use_circle_of_transparency: true,
            ..RenderProfile::default()
        },
        camera: FixtureCamera::default(),
        season: Season::Summer,
        use_object_handles: true,
        cursor: Some([400, 300]),
        frame_ms: 16,
        tiledata,
        objects,
        walk: (15..=HOUSE_MAX - 3).map(|i| [i, i]).collect(),
        step_frames: 10,
    }
}
