mod map;
mod object;
mod tiledata;

pub use map::{Chunk, MapError, WorldMap, CHUNK_SIZE};
pub use object::{
    art_screen_rect, Direction, EffectInfo, ItemInfo, MobileInfo, MoveOffset, MultiInfo,
    ObjectHandle, ObjectKind, RenderState, ScreenPoint, ScreenRect, TerrainInfo, WorldObject,
    CHARACTER_HEIGHT, TILE_HALF_PX, TILE_SIZE_PX,
};
pub use tiledata::{
    GraphicTraits, LightColor, SpriteBounds, StaticTileData, TileDataTable, TileFlags,
    TileMetadata, HEIGHT_UNKNOWN,
};
