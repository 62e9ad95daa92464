use smallvec::SmallVec;

use super::alpha::{fade_toward, FOLIAGE_ALPHA, OPAQUE};
use crate::world::{art_screen_rect, ObjectHandle, ScreenRect, SpriteBounds, WorldMap};

pub const FOLIAGE_EPOCH_WRAP: u8 = 100;

/// Multi-sprite trees: each run of graphics is laid out along a diagonal,
/// one graphic per tile, and fades as a single unit.
const TREE_UNIONS: [(u16, u16); 9] = [
    (0x0D45, 0x0D4C),
    (0x0D5C, 0x0D62),
    (0x0D73, 0x0D79),
    (0x0D87, 0x0D8B),
    (0x12BE, 0x12C7),
    (0x0D4D, 0x0D53),
    (0x0D63, 0x0D69),
    (0x0D7A, 0x0D7F),
    (0x0D8C, 0x0D90),
];

pub fn tree_union(graphic: u16) -> Option<(u16, u16)> {
    TREE_UNIONS
        .iter()
        .copied()
        .find(|(start, end)| (*start..=*end).contains(&graphic))
}

/// Whether the player stands in the quadrant from which an object at
/// `(ox, oy)` can hide them.
pub fn player_behind_quadrant(player: (i32, i32), object: (i32, i32)) -> bool {
    let (px, py) = player;
    let (ox, oy) = object;
    (px <= ox && py <= oy) || (py <= oy && px <= ox + 1) || (px <= ox && py <= oy + 1)
}

/// Per-frame foliage bookkeeping: the epoch stamped on foliage hiding the
/// player this frame, and every foliage object the scan touched.
#[derive(Debug, Default)]
pub struct FoliageTracker {
    epoch: u8,
    registered: Vec<ObjectHandle>,
}

impl FoliageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u8 {
        self.epoch
    }

    pub fn registered(&self) -> &[ObjectHandle] {
        &self.registered
    }

    /// Advances the epoch (cycling through 1..=99) and forgets last frame's
    /// registrations.
    pub(crate) fn begin_frame(&mut self) -> u8 {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch >= FOLIAGE_EPOCH_WRAP || self.epoch == 0 {
            self.epoch = 1;
        }
        self.registered.clear();
        self.epoch
    }

    /// Tests a foliage object under the draw ceiling against the player's
    /// sprite rectangle and stamps it (and its tree union) when it covers
    /// the player. The object is registered for the fade pass either way.
    pub(crate) fn check_behind_tree(
        &mut self,
        map: &mut WorldMap,
        handle: ObjectHandle,
        player_tile: (i32, i32),
        player_rect: ScreenRect,
        bounds: Option<SpriteBounds>,
    ) {
        let epoch = self.epoch;
        let Some(object) = map.get(handle) else {
            return;
        };

        if object.render.foliage_epoch != epoch {
            let tile = (i32::from(object.x()), i32::from(object.y()));
            let covers_player = player_behind_quadrant(player_tile, tile)
                && bounds.is_some_and(|bounds| {
                    art_screen_rect(object.screen_position(), bounds).intersects(&player_rect)
                });
            let (graphic, z) = (object.graphic, object.z());

            if covers_player {
                if let Some(object) = map.get_mut(handle) {
                    object.render.foliage_epoch = epoch;
                }
                propagate_union(map, graphic, tile, z, epoch);
            } else if let Some(object) = map.get_mut(handle) {
                object.render.foliage_epoch = 0;
            }
        }

        self.registered.push(handle);
    }

    /// On a fade tick, moves registered foliage toward foliage alpha when it
    /// hides the player this frame, or back toward opaque otherwise. Only
    /// foliage wholly under the draw ceiling is ever registered.
    pub(crate) fn fade_registered(&self, map: &mut WorldMap, fading: bool) {
        for handle in &self.registered {
            let Some(object) = map.get_mut(*handle) else {
                continue;
            };
            let target = if object.render.foliage_epoch == self.epoch {
                FOLIAGE_ALPHA
            } else {
                OPAQUE
            };
            fade_toward(&mut object.render.alpha, target, fading);
        }
    }
}

/// Stamps `epoch` on every member of the tree union containing `graphic`.
/// Members sit one tile apart along the `(+1, -1)` diagonal in graphic order
/// and must share the elevation `z`.
pub(crate) fn propagate_union(
    map: &mut WorldMap,
    graphic: u16,
    (x, y): (i32, i32),
    z: i8,
    epoch: u8,
) {
    let Some((start, end)) = tree_union(graphic) else {
        return;
    };
    let back = i32::from(graphic - start);
    let (mut tx, mut ty) = (x - back, y + back);

    for member in start..=end {
        let handles: SmallVec<[ObjectHandle; 8]> = map.cell(tx, ty).iter().copied().collect();
        for handle in handles {
            if let Some(object) = map.get_mut(handle) {
                if object.graphic == member && object.z() == z {
                    object.render.foliage_epoch = epoch;
                }
            }
        }
        tx += 1;
        ty -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ScreenPoint, TileDataTable, WorldObject};

    #[test]
    fn union_lookup_covers_runs_inclusively() {
        assert_eq!(tree_union(0x0D45), Some((0x0D45, 0x0D4C)));
        assert_eq!(tree_union(0x0D4C), Some((0x0D45, 0x0D4C)));
        assert_eq!(tree_union(0x12C0), Some((0x12BE, 0x12C7)));
        assert_eq!(tree_union(0x0D44), None);
    }

    #[test]
    fn epoch_cycles_through_one_to_ninety_nine() {
        let mut tracker = FoliageTracker::new();
        assert_eq!(tracker.begin_frame(), 1);
        for _ in 0..97 {
            tracker.begin_frame();
        }
        assert_eq!(tracker.epoch(), 98);
        assert_eq!(tracker.begin_frame(), 99);
        assert_eq!(tracker.begin_frame(), 1);
    }

    #[test]
    fn quadrant_accepts_tiles_south_east_of_player() {
        assert!(player_behind_quadrant((5, 5), (5, 5)));
        assert!(player_behind_quadrant((5, 5), (7, 9)));
        assert!(player_behind_quadrant((6, 5), (5, 5)));
        assert!(player_behind_quadrant((5, 6), (5, 5)));
        assert!(!player_behind_quadrant((6, 6), (5, 5)));
        assert!(!player_behind_quadrant((9, 2), (5, 5)));
    }

    #[test]
    fn propagation_marks_whole_union_at_same_elevation() {
        let table = TileDataTable::new();
        let mut map = WorldMap::new(32, 32);
        let mut members = Vec::new();
        for (index, graphic) in (0x0D45..=0x0D4C).enumerate() {
            let offset = index as u16;
            members.push(
                map.insert(WorldObject::static_tile(graphic, 10 + offset, 20 - offset, 0), &table)
                    .expect("member"),
            );
        }
        let other_z = map
            .insert(WorldObject::static_tile(0x0D47, 12, 18, 5), &table)
            .expect("other z");

        propagate_union(&mut map, 0x0D48, (13, 17), 0, 7);

        for handle in &members {
            assert_eq!(map.get(*handle).expect("member").render.foliage_epoch, 7);
        }
        assert_eq!(map.get(other_z).expect("other").render.foliage_epoch, 0);
    }

    #[test]
    fn fade_pass_moves_stamped_foliage_down_and_others_up() {
        let table = TileDataTable::new();
        let mut map = WorldMap::new(8, 8);
        let hiding = map
            .insert(WorldObject::static_tile(0x0CE0, 1, 1, 0), &table)
            .expect("insert");
        let clear = map
            .insert(WorldObject::static_tile(0x0CE0, 2, 2, 0), &table)
            .expect("insert");
        map.get_mut(clear).expect("clear").render.alpha = FOLIAGE_ALPHA;

        let mut tracker = FoliageTracker::new();
        let epoch = tracker.begin_frame();
        map.get_mut(hiding).expect("hiding").render.foliage_epoch = epoch;
        tracker.registered.extend([hiding, clear]);
        tracker.fade_registered(&mut map, true);

        assert_eq!(map.get(hiding).expect("hiding").render.alpha, 230);
        assert_eq!(map.get(clear).expect("clear").render.alpha, 101);
    }

    #[test]
    fn foliage_without_bounds_is_registered_but_not_stamped() {
        let table = TileDataTable::new();
        let mut map = WorldMap::new(8, 8);
        let bush = map
            .insert(WorldObject::static_tile(0x0CE0, 4, 4, 0), &table)
            .expect("insert");
        let mut tracker = FoliageTracker::new();
        tracker.begin_frame();

        let player_rect = ScreenRect {
            x: -1000,
            y: -1000,
            width: 5000,
            height: 5000,
        };
        tracker.check_behind_tree(&mut map, bush, (3, 3), player_rect, None);
        assert_eq!(tracker.registered(), &[bush]);
        assert_eq!(map.get(bush).expect("bush").render.foliage_epoch, 0);

        let bounds = SpriteBounds {
            x: 0,
            y: 0,
            width: 44,
            height: 80,
        };
        map.get_mut(bush).expect("bush").render.screen = ScreenPoint { x: 100, y: 100 };
        tracker.check_behind_tree(&mut map, bush, (3, 3), player_rect, Some(bounds));
        assert_eq!(
            map.get(bush).expect("bush").render.foliage_epoch,
            tracker.epoch()
        );
    }
}
