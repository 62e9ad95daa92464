use smallvec::SmallVec;
use thiserror::Error;

use super::object::{ObjectHandle, ObjectKind, WorldObject};
use super::tiledata::{StaticTileData, TileMetadata};

pub const CHUNK_SIZE: u16 = 8;
const CELLS_PER_CHUNK: usize = (CHUNK_SIZE as usize) * (CHUNK_SIZE as usize);

type Cell = SmallVec<[ObjectHandle; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("tile ({x}, {y}) is outside the {width}x{height} map")]
    OutOfBounds {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },
    #[error("object handle {index}:{generation} does not refer to a live object")]
    StaleHandle { index: u32, generation: u32 },
}

/// An 8x8 block of cells.
#[derive(Debug)]
pub struct Chunk {
    cells: [Cell; CELLS_PER_CHUNK],
}

impl Default for Chunk {
    fn default() -> Self {
        Self {
            cells: std::array::from_fn(|_| Cell::new()),
        }
    }
}

impl Chunk {
    pub fn cell(&self, local_x: u16, local_y: u16) -> &[ObjectHandle] {
        if local_x >= CHUNK_SIZE || local_y >= CHUNK_SIZE {
            return &[];
        }
        &self.cells[local_index(local_x, local_y)]
    }

    pub fn object_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.len()).sum()
    }
}

fn local_index(local_x: u16, local_y: u16) -> usize {
    usize::from(local_y) * usize::from(CHUNK_SIZE) + usize::from(local_x)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertRule {
    Terrain,
    Multi,
    Preview,
    Other,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    object: Option<WorldObject>,
}

/// Arena of world objects plus the per-tile chains that reference them.
///
/// Each cell holds handles sorted by priority Z, so walking a cell visits
/// objects bottom-up. Cell membership is owned here: move objects with
/// [`WorldMap::relocate`], never by writing `x`/`y`/`z` through
/// [`WorldMap::get_mut`].
#[derive(Debug)]
pub struct WorldMap {
    width: u16,
    height: u16,
    chunks_wide: u16,
    chunks: Vec<Option<Box<Chunk>>>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl WorldMap {
    pub fn new(width: u16, height: u16) -> Self {
        let chunks_wide = width.div_ceil(CHUNK_SIZE);
        let chunks_high = height.div_ceil(CHUNK_SIZE);
        let chunk_count = usize::from(chunks_wide) * usize::from(chunks_high);
        let mut chunks = Vec::with_capacity(chunk_count);
        chunks.resize_with(chunk_count, || None);
        Self {
            width,
            height,
            chunks_wide,
            chunks,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < i32::from(self.width) && y < i32::from(self.height)
    }

    pub fn insert(
        &mut self,
        object: WorldObject,
        metadata: &dyn TileMetadata,
    ) -> Result<ObjectHandle, MapError> {
        self.check_bounds(object.x(), object.y())?;

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.object = Some(object);
                ObjectHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    object: Some(object),
                });
                ObjectHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        self.link(handle, metadata);
        Ok(handle)
    }

    pub fn remove(&mut self, handle: ObjectHandle) -> Result<WorldObject, MapError> {
        let (x, y) = {
            let object = self.get(handle).ok_or_else(|| stale(handle))?;
            (object.x(), object.y())
        };
        self.unlink(handle, x, y);

        let slot = &mut self.slots[handle.index as usize];
        let object = slot.object.take().ok_or_else(|| stale(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Ok(object)
    }

    /// Moves an object to a new tile and elevation, re-sorting its cell.
    pub fn relocate(
        &mut self,
        handle: ObjectHandle,
        x: u16,
        y: u16,
        z: i8,
        metadata: &dyn TileMetadata,
    ) -> Result<(), MapError> {
        self.check_bounds(x, y)?;
        let (old_x, old_y) = {
            let object = self.get(handle).ok_or_else(|| stale(handle))?;
            (object.x(), object.y())
        };
        self.unlink(handle, old_x, old_y);

        if let Some(object) = self.get_mut(handle) {
            object.move_to(x, y, z);
        }
        self.link(handle, metadata);
        Ok(())
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&WorldObject> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut WorldObject> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.object.as_mut()
    }

    /// Objects on a tile, bottom-up. Missing or out-of-range tiles are empty.
    pub fn cell(&self, x: i32, y: i32) -> &[ObjectHandle] {
        if !self.contains(x, y) {
            return &[];
        }
        let (x, y) = (x as u16, y as u16);
        match self.chunk_at(x, y) {
            Some(chunk) => chunk.cell(x % CHUNK_SIZE, y % CHUNK_SIZE),
            None => &[],
        }
    }

    pub fn chunk(&self, x: i32, y: i32) -> Option<&Chunk> {
        if !self.contains(x, y) {
            return None;
        }
        self.chunk_at(x as u16, y as u16)
    }

    /// Elevation of the terrain on a tile, if the tile has terrain.
    pub fn tile_elevation(&self, x: i32, y: i32) -> Option<i8> {
        self.cell(x, y)
            .iter()
            .filter_map(|handle| self.get(*handle))
            .find(|object| object.kind.is_terrain())
            .map(|object| object.z())
    }

    pub fn handles(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.object.as_ref().map(|_| ObjectHandle {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    fn check_bounds(&self, x: u16, y: u16) -> Result<(), MapError> {
        if x >= self.width || y >= self.height {
            return Err(MapError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn chunk_index(&self, x: u16, y: u16) -> usize {
        usize::from(y / CHUNK_SIZE) * usize::from(self.chunks_wide) + usize::from(x / CHUNK_SIZE)
    }

    fn chunk_at(&self, x: u16, y: u16) -> Option<&Chunk> {
        self.chunks
            .get(self.chunk_index(x, y))
            .and_then(|chunk| chunk.as_deref())
    }

    fn link(&mut self, handle: ObjectHandle, metadata: &dyn TileMetadata) {
        let Some(object) = self.get(handle) else {
            return;
        };
        let (x, y) = (object.x(), object.y());
        let (priority, rule) = priority_for(object, metadata);

        let position = {
            let cell = self.cell(i32::from(x), i32::from(y));
            let mut position = 0;
            for (index, other_handle) in cell.iter().enumerate() {
                let Some(other) = self.get(*other_handle) else {
                    continue;
                };
                let other_priority = other.render.priority_z;
                let goes_before = other_priority > priority
                    || (other_priority == priority
                        && (rule == InsertRule::Terrain
                            || (rule == InsertRule::Multi && !other.kind.is_terrain())));
                if goes_before {
                    break;
                }
                position = index + 1;
            }
            position
        };

        if let Some(object) = self.get_mut(handle) {
            object.render.priority_z = priority;
        }
        let chunk_index = self.chunk_index(x, y);
        let chunk = self.chunks[chunk_index].get_or_insert_with(Box::default);
        chunk.cells[local_index(x % CHUNK_SIZE, y % CHUNK_SIZE)].insert(position, handle);
    }

    fn unlink(&mut self, handle: ObjectHandle, x: u16, y: u16) {
        let chunk_index = self.chunk_index(x, y);
        if let Some(chunk) = self
            .chunks
            .get_mut(chunk_index)
            .and_then(|chunk| chunk.as_deref_mut())
        {
            chunk.cells[local_index(x % CHUNK_SIZE, y % CHUNK_SIZE)]
                .retain(|candidate| *candidate != handle);
        }
    }
}

fn stale(handle: ObjectHandle) -> MapError {
    MapError::StaleHandle {
        index: handle.index,
        generation: handle.generation,
    }
}

fn priority_for(object: &WorldObject, metadata: &dyn TileMetadata) -> (i16, InsertRule) {
    let z = i16::from(object.z());
    match object.kind {
        ObjectKind::Terrain(info) => {
            let base = if info.stretched {
                i16::from(info.average_z)
            } else {
                z
            };
            (base - 2, InsertRule::Terrain)
        }
        ObjectKind::Mobile(_) => (z + 1, InsertRule::Other),
        ObjectKind::Item(info) if info.corpse => (z + 1, InsertRule::Other),
        ObjectKind::Effect(_) => (z + 2, InsertRule::Other),
        ObjectKind::MultiComponent(info) if info.internal => (z - 1, InsertRule::Multi),
        ObjectKind::MultiComponent(info) => {
            let (base, rule) = if info.preview {
                (z + 1, InsertRule::Preview)
            } else {
                (z, InsertRule::Multi)
            };
            let data = metadata.static_data(object.graphic);
            (scenery_priority(base, &data), rule)
        }
        ObjectKind::Static | ObjectKind::Item(_) => {
            let data = metadata.static_data(object.display_graphic());
            (scenery_priority(z, &data), InsertRule::Other)
        }
    }
}

fn scenery_priority(mut priority: i16, data: &StaticTileData) -> i16 {
    if data.is_background() {
        priority -= 1;
    }
    if data.height != 0 {
        priority += 1;
    }
    if data.is_multi_movable() {
        priority += 1;
    }
    priority
}
