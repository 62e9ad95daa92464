use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Height value the tile data uses for "no height information".
pub const HEIGHT_UNKNOWN: u8 = 0xFF;
const IMPLICIT_OBJECT_HEIGHT: u8 = 10;

bitflags! {
    /// Per-graphic flags, laid out like the classic tiledata bitfield.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TileFlags: u64 {
        const BACKGROUND = 0x1;
        const WEAPON = 0x2;
        const TRANSPARENT = 0x4;
        const TRANSLUCENT = 0x8;
        const WALL = 0x10;
        const DAMAGING = 0x20;
        const IMPASSABLE = 0x40;
        const WET = 0x80;
        const SURFACE = 0x200;
        const BRIDGE = 0x400;
        const GENERIC = 0x800;
        const WINDOW = 0x1000;
        const NO_SHOOT = 0x2000;
        const INTERNAL = 0x10000;
        const FOLIAGE = 0x20000;
        const PARTIAL_HUE = 0x40000;
        const CONTAINER = 0x200000;
        const WEARABLE = 0x400000;
        const LIGHT_SOURCE = 0x800000;
        const ANIMATION = 0x1000000;
        const ROOF = 0x10000000;
        const DOOR = 0x20000000;
        const STAIR_BACK = 0x40000000;
        const STAIR_RIGHT = 0x80000000;
        const NO_SHADOW = 0x10_0000_0000;
        const MULTI_MOVABLE = 0x100_0000_0000;
    }
}

bitflags! {
    /// Graphic classes that are not part of the tiledata flags but drive
    /// profile-dependent filtering (shadows, vegetation hiding).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GraphicTraits: u8 {
        const TREE = 0x1;
        const ROCK = 0x2;
        const VEGETATION = 0x4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StaticTileData {
    pub flags: TileFlags,
    pub height: u8,
    pub light_index: u8,
    pub layer: u8,
}

impl StaticTileData {
    pub fn is_roof(&self) -> bool {
        self.flags.contains(TileFlags::ROOF)
    }

    pub fn is_surface(&self) -> bool {
        self.flags.contains(TileFlags::SURFACE)
    }

    pub fn is_foliage(&self) -> bool {
        self.flags.contains(TileFlags::FOLIAGE)
    }

    pub fn is_wet(&self) -> bool {
        self.flags.contains(TileFlags::WET)
    }

    pub fn is_translucent(&self) -> bool {
        self.flags.contains(TileFlags::TRANSLUCENT)
    }

    pub fn is_transparent(&self) -> bool {
        self.flags.contains(TileFlags::TRANSPARENT)
    }

    pub fn is_multi_movable(&self) -> bool {
        self.flags.contains(TileFlags::MULTI_MOVABLE)
    }

    pub fn is_internal(&self) -> bool {
        self.flags.contains(TileFlags::INTERNAL)
    }

    pub fn is_background(&self) -> bool {
        self.flags.contains(TileFlags::BACKGROUND)
    }

    pub fn is_wall(&self) -> bool {
        self.flags.contains(TileFlags::WALL)
    }

    pub fn is_window(&self) -> bool {
        self.flags.contains(TileFlags::WINDOW)
    }

    pub fn is_no_shoot(&self) -> bool {
        self.flags.contains(TileFlags::NO_SHOOT)
    }

    pub fn is_bridge(&self) -> bool {
        self.flags.contains(TileFlags::BRIDGE)
    }

    pub fn is_container(&self) -> bool {
        self.flags.contains(TileFlags::CONTAINER)
    }

    pub fn is_light_source(&self) -> bool {
        self.flags.contains(TileFlags::LIGHT_SOURCE)
    }

    /// Height this graphic adds on top of its base Z, or `None` when the tile
    /// data carries no height information.
    ///
    /// A zero height on anything that is neither background nor surface
    /// counts as [`IMPLICIT_OBJECT_HEIGHT`]; bridges count half.
    pub fn object_height(&self) -> Option<u8> {
        if self.height == HEIGHT_UNKNOWN {
            return None;
        }

        let mut height = self.height;
        if height == 0 && !self.is_background() && !self.is_surface() {
            height = IMPLICIT_OBJECT_HEIGHT;
        }
        if self.is_bridge() {
            height /= 2;
        }
        Some(height)
    }

    /// Whether the circle of transparency may fade this graphic at all.
    pub fn can_be_transparent(&self) -> bool {
        if self.height > 5 {
            return true;
        }
        if self.is_roof() || (self.is_surface() && self.is_background()) || self.is_wall() {
            return true;
        }
        self.height == 5 && self.is_surface() && !self.is_background()
    }
}

/// Opaque content rectangle of a sprite, relative to its texture origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpriteBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightColor {
    pub color: u16,
    pub is_hue: bool,
}

/// Read-only lookup into the asset layer. Every call returns by value.
pub trait TileMetadata {
    fn static_data(&self, graphic: u16) -> StaticTileData;

    fn sprite_bounds(&self, graphic: u16) -> Option<SpriteBounds>;

    fn light_color(&self, _graphic: u16) -> Option<LightColor> {
        None
    }

    fn graphic_traits(&self, _graphic: u16) -> GraphicTraits {
        GraphicTraits::empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TileDataTable {
    statics: HashMap<u16, StaticTileData>,
    bounds: HashMap<u16, SpriteBounds>,
    light_colors: HashMap<u16, LightColor>,
    traits: HashMap<u16, GraphicTraits>,
}

impl TileDataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_static(&mut self, graphic: u16, data: StaticTileData) {
        self.statics.insert(graphic, data);
    }

    pub fn insert_bounds(&mut self, graphic: u16, bounds: SpriteBounds) {
        self.bounds.insert(graphic, bounds);
    }

    pub fn insert_light_color(&mut self, graphic: u16, color: LightColor) {
        self.light_colors.insert(graphic, color);
    }

    pub fn insert_traits(&mut self, graphic: u16, traits: GraphicTraits) {
        self.traits.insert(graphic, traits);
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }
}

impl TileMetadata for TileDataTable {
    fn static_data(&self, graphic: u16) -> StaticTileData {
        self.statics.get(&graphic).copied().unwrap_or_default()
    }

    fn sprite_bounds(&self, graphic: u16) -> Option<SpriteBounds> {
        self.bounds.get(&graphic).copied()
    }

    fn light_color(&self, graphic: u16) -> Option<LightColor> {
        self.light_colors.get(&graphic).copied()
    }

    fn graphic_traits(&self, graphic: u16) -> GraphicTraits {
        self.traits.get(&graphic).copied().unwrap_or_default()
    }
}
