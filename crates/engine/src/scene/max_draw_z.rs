use tracing::debug;

use crate::world::{TileFlags, TileMetadata, WorldMap};

pub const DEFAULT_MAX_Z: i32 = 127;
const ROOF_CLEARANCE_LOW: i32 = 14;
const ROOF_CLEARANCE_HIGH: i32 = 16;
const NEAR_ROOF_Z_BAND: i32 = 6;
const NEAR_Z_WINDOW: i32 = 64;

/// Draw ceilings derived from what hangs over the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxDrawZ {
    /// Objects at or above this fade out.
    pub max_z: i32,
    /// Objects above this cannot be picked.
    pub max_ground_z: i32,
    pub no_draw_roofs: bool,
}

impl Default for MaxDrawZ {
    fn default() -> Self {
        Self {
            max_z: DEFAULT_MAX_Z,
            max_ground_z: DEFAULT_MAX_Z,
            no_draw_roofs: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackerKey {
    x: u16,
    y: u16,
    z: i8,
    draw_roofs: bool,
}

/// Caches [`MaxDrawZ`] and recomputes it only when the player moves.
#[derive(Debug, Default)]
pub struct MaxDrawZTracker {
    state: MaxDrawZ,
    last_key: Option<TrackerKey>,
}

impl MaxDrawZTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MaxDrawZ {
        self.state
    }

    /// Forces the next update to rescan, e.g. after the map changed around
    /// the player.
    pub fn invalidate(&mut self) {
        self.last_key = None;
    }

    /// Returns `true` when the ceilings were recomputed.
    pub fn update(
        &mut self,
        map: &WorldMap,
        metadata: &dyn TileMetadata,
        player: (u16, u16, i8),
        draw_roofs: bool,
    ) -> bool {
        let key = TrackerKey {
            x: player.0,
            y: player.1,
            z: player.2,
            draw_roofs,
        };
        if self.last_key == Some(key) {
            return false;
        }
        self.last_key = Some(key);

        let next = compute_max_draw_z(map, metadata, player, draw_roofs);
        if next != self.state {
            debug!(
                max_z = next.max_z,
                max_ground_z = next.max_ground_z,
                no_draw_roofs = next.no_draw_roofs,
                "max_draw_z_updated"
            );
        }
        self.state = next;
        true
    }
}

/// Scans the player's tile and the tile diagonally ahead for anything that
/// should cap drawing: overhead terrain, solid overhangs and roofs.
pub fn compute_max_draw_z(
    map: &WorldMap,
    metadata: &dyn TileMetadata,
    (px, py, pz): (u16, u16, i8),
    draw_roofs: bool,
) -> MaxDrawZ {
    let px = i32::from(px);
    let py = i32::from(py);
    let pz = i32::from(pz);
    let pz14 = pz + ROOF_CLEARANCE_LOW;
    let pz16 = pz + ROOF_CLEARANCE_HIGH;

    let mut max_ground_z = DEFAULT_MAX_Z;
    let mut max_z = DEFAULT_MAX_Z;
    let mut no_draw_roofs = !draw_roofs;

    for handle in map.cell(px, py) {
        let Some(object) = map.get(*handle) else {
            continue;
        };
        let tile_z = i32::from(object.elevation());
        if object.kind.is_terrain() {
            if pz16 <= tile_z {
                max_ground_z = pz16;
                max_z = pz16;
                break;
            }
            continue;
        }
        if object.kind.is_mobile() {
            continue;
        }
        if tile_z > pz14 && max_z > tile_z {
            let data = metadata.static_data(object.display_graphic());
            let see_through = data
                .flags
                .intersects(TileFlags::FOLIAGE | TileFlags::TRANSPARENT);
            if !see_through && (!data.is_roof() || data.is_surface()) {
                max_z = tile_z;
                no_draw_roofs = true;
            }
        }
    }

    let mut ground_z = max_z;
    let (ax, ay) = (px + 1, py + 1);
    for handle in map.cell(ax, ay) {
        let Some(object) = map.get(*handle) else {
            continue;
        };
        if object.kind.is_mobile() || object.kind.is_terrain() {
            continue;
        }
        let tile_z = i32::from(object.z());
        if tile_z > pz14 && max_z > tile_z {
            let data = metadata.static_data(object.display_graphic());
            let open = data
                .flags
                .intersects(TileFlags::SURFACE | TileFlags::TRANSPARENT);
            if !open && data.is_roof() {
                max_z = tile_z;
                ground_z = near_roof_z(map, metadata, tile_z, ax, ay);
                no_draw_roofs = true;
            }
        }
    }

    max_z = ground_z;
    if ground_z < pz16 {
        max_z = pz16;
    }

    MaxDrawZ {
        max_z,
        max_ground_z,
        no_draw_roofs,
    }
}

/// Lowest Z of the roof patch connected to `(x, y)`, where neighbouring roof
/// tiles join when within a few Z units of each other. The visited set wraps
/// at a 64x64 window, which also bounds the flood.
fn near_roof_z(map: &WorldMap, metadata: &dyn TileMetadata, default_z: i32, x: i32, y: i32) -> i32 {
    let window = NEAR_Z_WINDOW as usize;
    let mut visited = vec![false; window * window];
    let mut pending = vec![(x, y, default_z)];
    let mut lowest = default_z;

    while let Some((x, y, z)) = pending.pop() {
        let key = (x & (NEAR_Z_WINDOW - 1)) as usize + (((y & (NEAR_Z_WINDOW - 1)) as usize) * window);
        if visited[key] {
            continue;
        }
        visited[key] = true;

        let roof_z = map
            .cell(x, y)
            .iter()
            .filter_map(|handle| map.get(*handle))
            .filter(|object| object.kind.is_scenery())
            .filter(|object| (i32::from(object.z()) - z).abs() <= NEAR_ROOF_Z_BAND)
            .find(|object| metadata.static_data(object.graphic).is_roof())
            .map(|object| i32::from(object.z()));
        let Some(roof_z) = roof_z else {
            continue;
        };

        lowest = lowest.min(roof_z);
        pending.extend([
            (x - 1, y, roof_z),
            (x + 1, y, roof_z),
            (x, y - 1, roof_z),
            (x, y + 1, roof_z),
        ]);
    }

    lowest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{MobileInfo, StaticTileData, TileDataTable, WorldObject};

    const ROOF: u16 = 0x05F0;
    const BEAM: u16 = 0x0700;
    const BUSH: u16 = 0x0C80;

    fn table() -> TileDataTable {
        let mut table = TileDataTable::new();
        table.insert_static(
            ROOF,
            StaticTileData {
                flags: TileFlags::ROOF | TileFlags::IMPASSABLE,
                height: 3,
                ..StaticTileData::default()
            },
        );
        table.insert_static(
            BEAM,
            StaticTileData {
                flags: TileFlags::IMPASSABLE,
                height: 5,
                ..StaticTileData::default()
            },
        );
        table.insert_static(
            BUSH,
            StaticTileData {
                flags: TileFlags::FOLIAGE,
                height: 20,
                ..StaticTileData::default()
            },
        );
        table
    }

    fn world_with_ground(table: &TileDataTable) -> WorldMap {
        let mut map = WorldMap::new(32, 32);
        for x in 0..32 {
            for y in 0..32 {
                map.insert(WorldObject::terrain(0x3, x, y, 0), table)
                    .expect("terrain");
            }
        }
        map.insert(
            WorldObject::mobile(0x190, 10, 10, 0, MobileInfo::default()),
            table,
        )
        .expect("player");
        map
    }

    #[test]
    fn open_sky_keeps_default_ceilings() {
        let table = table();
        let map = world_with_ground(&table);
        let state = compute_max_draw_z(&map, &table, (10, 10, 0), true);
        assert_eq!(state, MaxDrawZ::default());
    }

    #[test]
    fn roof_ahead_lowers_max_z_and_hides_roofs() {
        let table = table();
        let mut map = world_with_ground(&table);
        map.insert(WorldObject::static_tile(ROOF, 11, 11, 20), &table)
            .expect("roof");

        let state = compute_max_draw_z(&map, &table, (10, 10, 0), true);
        assert_eq!(state.max_z, 20);
        assert_eq!(state.max_ground_z, DEFAULT_MAX_Z);
        assert!(state.no_draw_roofs);
    }

    #[test]
    fn connected_roof_patch_reports_its_lowest_tile() {
        let table = table();
        let mut map = world_with_ground(&table);
        map.insert(WorldObject::static_tile(ROOF, 11, 11, 20), &table)
            .expect("roof");
        map.insert(WorldObject::static_tile(ROOF, 12, 11, 23), &table)
            .expect("roof");
        map.insert(WorldObject::static_tile(ROOF, 13, 11, 18), &table)
            .expect("roof");
        // Too far in Z to join the patch.
        map.insert(WorldObject::static_tile(ROOF, 11, 12, 5), &table)
            .expect("roof");

        let state = compute_max_draw_z(&map, &table, (10, 10, 0), true);
        assert_eq!(state.max_z, 18);
    }

    #[test]
    fn low_roof_is_raised_to_player_clearance() {
        let table = table();
        let mut map = world_with_ground(&table);
        map.insert(WorldObject::static_tile(ROOF, 11, 11, 20), &table)
            .expect("roof");
        map.insert(WorldObject::static_tile(ROOF, 12, 11, 15), &table)
            .expect("roof");

        let state = compute_max_draw_z(&map, &table, (10, 10, 0), true);
        assert_eq!(state.max_z, 16);
    }

    #[test]
    fn overhang_on_player_tile_caps_max_z() {
        let table = table();
        let mut map = world_with_ground(&table);
        map.insert(WorldObject::static_tile(BEAM, 10, 10, 30), &table)
            .expect("beam");
        map.insert(WorldObject::static_tile(BUSH, 10, 10, 25), &table)
            .expect("bush");

        let state = compute_max_draw_z(&map, &table, (10, 10, 0), true);
        assert_eq!(state.max_z, 30);
        assert!(state.no_draw_roofs);
    }

    #[test]
    fn terrain_overhead_caps_both_ceilings() {
        let table = table();
        let mut map = WorldMap::new(16, 16);
        map.insert(WorldObject::terrain(0x3, 4, 4, 40), &table)
            .expect("cave ceiling");
        let state = compute_max_draw_z(&map, &table, (4, 4, 10), true);
        assert_eq!(state.max_z, 26);
        assert_eq!(state.max_ground_z, 26);
    }

    #[test]
    fn disabled_roofs_flag_is_carried_without_overhead() {
        let table = table();
        let map = world_with_ground(&table);
        let state = compute_max_draw_z(&map, &table, (10, 10, 0), false);
        assert!(state.no_draw_roofs);
        assert_eq!(state.max_z, DEFAULT_MAX_Z);
    }

    #[test]
    fn tracker_recomputes_only_when_player_moves() {
        let table = table();
        let mut map = world_with_ground(&table);
        let mut tracker = MaxDrawZTracker::new();

        assert!(tracker.update(&map, &table, (10, 10, 0), true));
        assert!(!tracker.update(&map, &table, (10, 10, 0), true));

        map.insert(WorldObject::static_tile(ROOF, 11, 11, 20), &table)
            .expect("roof");
        assert!(!tracker.update(&map, &table, (10, 10, 0), true));
        assert_eq!(tracker.state().max_z, DEFAULT_MAX_Z);

        tracker.invalidate();
        assert!(tracker.update(&map, &table, (10, 10, 0), true));
        assert_eq!(tracker.state().max_z, 20);
    }
}
