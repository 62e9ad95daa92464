use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::world::{SpriteBounds, TileMetadata};

/// Memoised sprite-bounds lookups. A graphic with no bounds is warned about
/// once and then treated as unpickable and unable to occlude.
#[derive(Debug, Default)]
pub struct SpriteBoundsCache {
    cache: HashMap<u16, Option<SpriteBounds>>,
    warned_missing: HashSet<u16>,
}

impl SpriteBoundsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, metadata: &dyn TileMetadata, graphic: u16) -> Option<SpriteBounds> {
        if let Some(cached) = self.cache.get(&graphic) {
            return *cached;
        }
        let bounds = metadata.sprite_bounds(graphic);
        if bounds.is_none() {
            warn_missing_bounds_once(&mut self.warned_missing, graphic);
        }
        self.cache.insert(graphic, bounds);
        bounds
    }

    /// Drops memoised entries, keeping the warned set so a still-missing
    /// graphic stays quiet.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn warned_count(&self) -> usize {
        self.warned_missing.len()
    }
}

fn warn_missing_bounds_once(warned: &mut HashSet<u16>, graphic: u16) {
    if warned.insert(graphic) {
        warn!(graphic = format_args!("{graphic:#06x}"), "sprite_bounds_missing");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::world::{StaticTileData, TileDataTable};

    struct CountingTable {
        inner: TileDataTable,
        lookups: Cell<usize>,
    }

    impl TileMetadata for CountingTable {
        fn static_data(&self, graphic: u16) -> StaticTileData {
            self.inner.static_data(graphic)
        }

        fn sprite_bounds(&self, graphic: u16) -> Option<SpriteBounds> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.sprite_bounds(graphic)
        }
    }

    #[test]
    fn lookups_are_memoised_and_missing_warned_once() {
        let mut inner = TileDataTable::new();
        inner.insert_bounds(
            1,
            SpriteBounds {
                x: 0,
                y: 0,
                width: 44,
                height: 44,
            },
        );
        let table = CountingTable {
            inner,
            lookups: Cell::new(0),
        };
        let mut cache = SpriteBoundsCache::new();

        assert!(cache.resolve(&table, 1).is_some());
        assert!(cache.resolve(&table, 1).is_some());
        assert!(cache.resolve(&table, 2).is_none());
        assert!(cache.resolve(&table, 2).is_none());
        assert_eq!(table.lookups.get(), 2);
        assert_eq!(cache.warned_count(), 1);

        cache.clear();
        assert!(cache.resolve(&table, 2).is_none());
        assert_eq!(table.lookups.get(), 3);
        assert_eq!(cache.warned_count(), 1);
    }
}
