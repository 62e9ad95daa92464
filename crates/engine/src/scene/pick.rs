use crate::world::{
    art_screen_rect, ObjectHandle, ObjectKind, ScreenPoint, SpriteBounds, WorldObject,
    TILE_HALF_PX, TILE_SIZE_PX,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PickState {
    #[default]
    NoSelection,
    Candidate { handle: ObjectHandle, depth: f32 },
}

/// Tracks the topmost object under the cursor during one scan.
#[derive(Debug, Default, Clone)]
pub struct PickResolver {
    state: PickState,
}

impl PickResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state = PickState::NoSelection;
    }

    pub fn state(&self) -> PickState {
        self.state
    }

    pub fn picked(&self) -> Option<ObjectHandle> {
        match self.state {
            PickState::NoSelection => None,
            PickState::Candidate { handle, .. } => Some(handle),
        }
    }

    /// Replaces the candidate when `depth` is at least the current one, so
    /// the later of two equal-depth hits wins. Returns whether it replaced.
    pub fn offer(&mut self, handle: ObjectHandle, depth: f32) -> bool {
        let take = match self.state {
            PickState::NoSelection => true,
            PickState::Candidate { depth: current, .. } => depth >= current,
        };
        if take {
            self.state = PickState::Candidate { handle, depth };
        }
        take
    }
}

/// Whether `cursor` (world pixel space) lands on the object as drawn.
///
/// Terrain is hit inside its tile diamond; mobiles inside their animation
/// frame; everything else inside its art bounds. Objects without bounds are
/// never hit.
pub fn hit_test(object: &WorldObject, bounds: Option<SpriteBounds>, cursor: ScreenPoint) -> bool {
    let screen = object.screen_position();
    match object.kind {
        ObjectKind::Terrain(_) => {
            let dx = (cursor.x - (screen.x + TILE_HALF_PX)).abs();
            let dy = (cursor.y - (screen.y + TILE_HALF_PX)).abs();
            dx + dy <= TILE_HALF_PX
        }
        ObjectKind::Mobile(_) => object
            .frame_rect()
            .is_some_and(|rect| rect.width > 0 && rect.height > 0 && rect.contains(cursor)),
        _ => bounds.is_some_and(|bounds| {
            let anchor = ScreenPoint {
                x: screen.x + TILE_HALF_PX,
                y: screen.y + TILE_SIZE_PX,
            };
            art_screen_rect(anchor, bounds).contains(cursor)
        }),
    }
}
