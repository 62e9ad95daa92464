use super::viewport::TileRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    LeftEdge,
    BottomEdge,
    Done,
}

/// Back-to-front walk over a tile rectangle.
///
/// Tiles are visited one screen row at a time: each row is an anti-diagonal
/// (`x + y` constant) walked with `x` increasing. Rows start on the left
/// edge (`x = min_x`) for the first pass and on the bottom edge
/// (`y = max_y`) for the second, so every tile is produced exactly once
/// and rows come out in increasing `x + y`.
#[derive(Debug, Clone)]
pub struct ScanOrder {
    rect: TileRect,
    pass: Pass,
    lead: i32,
    cursor: Option<(i32, i32)>,
}

impl ScanOrder {
    pub fn new(rect: TileRect) -> Self {
        let pass = if rect.is_empty() {
            Pass::Done
        } else {
            Pass::LeftEdge
        };
        Self {
            rect,
            pass,
            lead: rect.min_y,
            cursor: None,
        }
    }

    fn next_row_start(&mut self) -> Option<(i32, i32)> {
        loop {
            match self.pass {
                Pass::LeftEdge => {
                    if self.lead < self.rect.max_y {
                        let start = (self.rect.min_x, self.lead);
                        self.lead += 1;
                        return Some(start);
                    }
                    self.pass = Pass::BottomEdge;
                    self.lead = self.rect.min_x;
                }
                Pass::BottomEdge => {
                    if self.lead <= self.rect.max_x {
                        let start = (self.lead, self.rect.max_y);
                        self.lead += 1;
                        return Some(start);
                    }
                    self.pass = Pass::Done;
                }
                Pass::Done => return None,
            }
        }
    }
}

impl Iterator for ScanOrder {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((x, y)) = self.cursor {
                if self.rect.contains(x, y) {
                    self.cursor = Some((x + 1, y - 1));
                    return Some((x, y));
                }
            }
            self.cursor = Some(self.next_row_start()?);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn rect(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> TileRect {
        TileRect {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[test]
    fn visits_every_tile_exactly_once() {
        let area = rect(3, 5, 9, 8);
        let tiles: Vec<_> = ScanOrder::new(area).collect();
        let unique: HashSet<_> = tiles.iter().copied().collect();

        assert_eq!(tiles.len(), area.tile_count());
        assert_eq!(unique.len(), tiles.len());
        assert!(unique.contains(&(9, 8)));
        assert!(unique.contains(&(3, 5)));
    }

    #[test]
    fn rows_come_out_back_to_front() {
        let tiles: Vec<_> = ScanOrder::new(rect(0, 0, 4, 6)).collect();
        for pair in tiles.windows(2) {
            let (ax, ay) = pair[0];
            let (bx, by) = pair[1];
            assert!(ax + ay <= bx + by, "{:?} before {:?}", pair[0], pair[1]);
            if ax + ay == bx + by {
                assert_eq!(bx, ax + 1);
            }
        }
    }

    #[test]
    fn small_square_order_is_exact() {
        let tiles: Vec<_> = ScanOrder::new(rect(0, 0, 1, 1)).collect();
        assert_eq!(tiles, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn single_tile_and_single_row() {
        assert_eq!(ScanOrder::new(rect(4, 4, 4, 4)).collect::<Vec<_>>(), vec![(4, 4)]);
        assert_eq!(
            ScanOrder::new(rect(0, 2, 2, 2)).collect::<Vec<_>>(),
            vec![(0, 2), (1, 2), (2, 2)]
        );
        assert_eq!(
            ScanOrder::new(rect(1, 0, 1, 2)).collect::<Vec<_>>(),
            vec![(1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn empty_rect_yields_nothing() {
        assert_eq!(ScanOrder::new(rect(5, 5, 4, 9)).count(), 0);
    }
}
