use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::world::ObjectHandle;

/// Draw buckets in the order the batcher drains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    TerrainFlat,
    TerrainStretched,
    Statics,
    Animations,
    Effects,
    Transparent,
}

impl Bucket {
    pub const DRAW_ORDER: [Bucket; 6] = [
        Bucket::TerrainFlat,
        Bucket::TerrainStretched,
        Bucket::Statics,
        Bucket::Animations,
        Bucket::Effects,
        Bucket::Transparent,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Bucket::TerrainFlat => 0,
            Bucket::TerrainStretched => 1,
            Bucket::Statics => 2,
            Bucket::Animations => 3,
            Bucket::Effects => 4,
            Bucket::Transparent => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Bucket::TerrainFlat => "terrain_flat",
            Bucket::TerrainStretched => "terrain_stretched",
            Bucket::Statics => "statics",
            Bucket::Animations => "animations",
            Bucket::Effects => "effects",
            Bucket::Transparent => "transparent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEntry {
    pub handle: ObjectHandle,
    /// Depth used by the transparent pass's secondary depth test.
    pub depth: f32,
}

/// Per-frame draw lists. Entries keep scan order inside every bucket.
#[derive(Debug, Default, Clone)]
pub struct RenderLists {
    buckets: [Vec<RenderEntry>; 6],
}

impl RenderLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Appends an entry. Zero alpha is a no-op, and anything not fully
    /// opaque goes to the transparent bucket whatever the hint. Returns the
    /// bucket used.
    pub fn push(
        &mut self,
        handle: ObjectHandle,
        alpha: u8,
        depth: f32,
        hint: Bucket,
    ) -> Option<Bucket> {
        if alpha == 0 {
            return None;
        }
        let bucket = if alpha != u8::MAX {
            Bucket::Transparent
        } else {
            hint
        };
        self.buckets[bucket.index()].push(RenderEntry { handle, depth });
        Some(bucket)
    }

    pub fn bucket(&self, bucket: Bucket) -> &[RenderEntry] {
        &self.buckets[bucket.index()]
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn counts(&self) -> [(Bucket, usize); 6] {
        Bucket::DRAW_ORDER.map(|bucket| (bucket, self.bucket(bucket).len()))
    }

    /// Every entry in batcher order.
    pub fn iter_draw_order(&self) -> impl Iterator<Item = (Bucket, &RenderEntry)> + '_ {
        Bucket::DRAW_ORDER
            .into_iter()
            .flat_map(move |bucket| self.bucket(bucket).iter().map(move |entry| (bucket, entry)))
    }

    /// Lower-case SHA-256 hex digest of the lists in draw order; equal lists
    /// give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for bucket in Bucket::DRAW_ORDER {
            hasher.update(bucket.name().as_bytes());
            hasher.update([0u8]);
            for entry in self.bucket(bucket) {
                hasher.update(entry.handle.index().to_le_bytes());
                hasher.update(entry.handle.generation().to_le_bytes());
                hasher.update(entry.depth.to_bits().to_le_bytes());
            }
        }
        to_hex_lower(&hasher.finalize())
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
