//! Confidence-weighted occupancy grid

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tm::Tile;
use ndarray::Array2;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{CONFIDENCE_MIN, MAP_SIZE};
use crate::nav::TILE_SIZE_MM;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const CLASS_BITS: u32 = 8;
const VOTE_BITS: u32 = 28;
const CLASS_MASK: u64 = (1 << CLASS_BITS) - 1;
const VOTE_MASK: u64 = (1 << VOTE_BITS) - 1;
const EMPTY_SHIFT: u32 = CLASS_BITS;
const WALL_SHIFT: u32 = CLASS_BITS + VOTE_BITS;

/// Vote counters saturate at this value.
pub const MAX_VOTES: u32 = VOTE_MASK as u32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GridCell {
    pub class: Tile,
    pub empty_votes: u32,
    pub wall_votes: u32,
}

/// Square occupancy grid centred on the start tile.
///
/// Each cell is packed into a single atomic word, so votes from any thread are applied with one
/// compare-and-swap and readers always see a whole cell.
#[derive(Debug)]
pub struct OccupancyGrid {
    cells: Array2<AtomicU64>,
    threshold: u32,
}

/// Owned copy of the grid, used for saving.
#[derive(Debug, Clone, Serialize)]
pub struct GridSnapshot {
    pub tile_size_mm: i32,
    pub origin: usize,
    pub cells: Array2<GridCell>,
}

/// A committed change of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileChange {
    pub col: usize,
    pub row: usize,
    pub tile: Tile,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("Cell ({0}, {1}) is outside the grid")]
    OutOfBounds(usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GridCell {
    fn pack(&self) -> u64 {
        u8::from(self.class) as u64
            | ((self.empty_votes as u64 & VOTE_MASK) << EMPTY_SHIFT)
            | ((self.wall_votes as u64 & VOTE_MASK) << WALL_SHIFT)
    }

    fn unpack(word: u64) -> Self {
        let class = match word & CLASS_MASK {
            1 => Tile::Empty,
            2 => Tile::Wall,
            _ => Tile::Unknown,
        };

        Self {
            class,
            empty_votes: ((word >> EMPTY_SHIFT) & VOTE_MASK) as u32,
            wall_votes: ((word >> WALL_SHIFT) & VOTE_MASK) as u32,
        }
    }

    /// The cell after one more vote for `observed`.
    fn with_vote(mut self, observed: Tile, threshold: u32) -> Self {
        let (mine, other) = match observed {
            Tile::Empty => {
                self.empty_votes = (self.empty_votes + 1).min(MAX_VOTES);
                (self.empty_votes, self.wall_votes)
            }
            Tile::Wall => {
                self.wall_votes = (self.wall_votes + 1).min(MAX_VOTES);
                (self.wall_votes, self.empty_votes)
            }
            Tile::Unknown => return self,
        };

        if mine > other && mine >= threshold {
            self.class = observed;
        }

        self
    }
}

impl Default for OccupancyGrid {
    fn default() -> Self {
        Self::new(MAP_SIZE, CONFIDENCE_MIN)
    }
}

impl OccupancyGrid {
    /// Create an empty `size` x `size` grid.
    pub fn new(size: usize, threshold: u32) -> Self {
        Self {
            cells: Array2::from_shape_fn((size, size), |_| AtomicU64::new(0)),
            threshold,
        }
    }

    /// Number of cells along each side.
    pub fn size(&self) -> usize {
        self.cells.nrows()
    }

    /// Index of the start tile along each axis.
    pub fn origin(&self) -> usize {
        self.size() / 2
    }

    /// The `(col, row)` of the cell containing a point given in tiles from the start tile corner,
    /// or `None` outside the grid.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let origin = self.origin() as f64;
        let col = (x + origin).floor();
        let row = (y + origin).floor();
        let size = self.size() as f64;

        if col < 0.0 || row < 0.0 || col >= size || row >= size {
            None
        } else {
            Some((col as usize, row as usize))
        }
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<GridCell> {
        self.cells
            .get((row, col))
            .map(|c| GridCell::unpack(c.load(Ordering::Acquire)))
    }

    /// Record one observation of a cell.
    ///
    /// The classification is committed when its counter beats the other one and has reached the
    /// confidence threshold. Returns the new classification if it changed. `Unknown` is never
    /// observed and is ignored.
    pub fn vote(&self, col: usize, row: usize, observed: Tile) -> Result<Option<Tile>, GridError> {
        let cell = self
            .cells
            .get((row, col))
            .ok_or(GridError::OutOfBounds(col, row))?;

        if observed == Tile::Unknown {
            return Ok(None);
        }

        let threshold = self.threshold;

        // The closure always returns Some so the update can't fail
        let prev = match cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
            Some(GridCell::unpack(word).with_vote(observed, threshold).pack())
        }) {
            Ok(w) => w,
            Err(w) => w,
        };

        let before = GridCell::unpack(prev);
        let after = before.with_vote(observed, threshold);

        if after.class != before.class {
            Ok(Some(after.class))
        } else {
            Ok(None)
        }
    }

    /// Classification of every cell, row-major.
    pub fn tiles(&self) -> Vec<Tile> {
        self.cells
            .iter()
            .map(|c| GridCell::unpack(c.load(Ordering::Acquire)).class)
            .collect()
    }

    /// Copy the whole grid.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            tile_size_mm: TILE_SIZE_MM,
            origin: self.origin(),
            cells: self
                .cells
                .map(|c| GridCell::unpack(c.load(Ordering::Acquire))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::MAP_ORIGIN;
    use std::{sync::Arc, thread};

    #[test]
    fn test_pack() {
        let cell = GridCell {
            class: Tile::Wall,
            empty_votes: 123_456,
            wall_votes: MAX_VOTES,
        };

        assert_eq!(GridCell::unpack(cell.pack()), cell);
        assert_eq!(GridCell::unpack(0), GridCell::default());
    }

    #[test]
    fn test_cell_at() {
        let grid = OccupancyGrid::default();

        assert_eq!(grid.cell_at(0.5, 0.5), Some((MAP_ORIGIN, MAP_ORIGIN)));
        assert_eq!(grid.cell_at(1.0, -0.25), Some((MAP_ORIGIN + 1, MAP_ORIGIN - 1)));

        // Negative half tiles floor away from zero
        assert_eq!(grid.cell_at(-0.5, 0.0), Some((MAP_ORIGIN - 1, MAP_ORIGIN)));

        assert_eq!(grid.cell_at(-(MAP_ORIGIN as f64) - 0.1, 0.0), None);
        assert_eq!(grid.cell_at(0.0, (MAP_ORIGIN + 1) as f64), None);
    }

    #[test]
    fn test_vote_threshold() {
        let grid = OccupancyGrid::default();

        for i in 1..CONFIDENCE_MIN {
            assert_eq!(grid.vote(3, 4, Tile::Wall).unwrap(), None);
            assert_eq!(grid.cell(3, 4).unwrap().wall_votes, i);
            assert_eq!(grid.cell(3, 4).unwrap().class, Tile::Unknown);
        }

        // Tenth vote commits
        assert_eq!(grid.vote(3, 4, Tile::Wall).unwrap(), Some(Tile::Wall));
        assert_eq!(grid.cell(3, 4).unwrap().class, Tile::Wall);

        // Empty has to strictly overtake wall
        for _ in 0..CONFIDENCE_MIN {
            grid.vote(3, 4, Tile::Empty).unwrap();
        }
        assert_eq!(grid.cell(3, 4).unwrap().class, Tile::Wall);
        assert_eq!(grid.vote(3, 4, Tile::Empty).unwrap(), Some(Tile::Empty));

        // Unknown does nothing
        let before = grid.cell(3, 4).unwrap();
        assert_eq!(grid.vote(3, 4, Tile::Unknown).unwrap(), None);
        assert_eq!(grid.cell(3, 4).unwrap(), before);
    }

    #[test]
    fn test_votes_monotonic() {
        let grid = OccupancyGrid::default();
        let pattern = [Tile::Wall, Tile::Empty, Tile::Wall, Tile::Unknown, Tile::Empty];

        let mut prev = grid.cell(0, 0).unwrap();
        for i in 0..100 {
            grid.vote(0, 0, pattern[i % pattern.len()]).unwrap();
            let now = grid.cell(0, 0).unwrap();

            assert!(now.empty_votes >= prev.empty_votes);
            assert!(now.wall_votes >= prev.wall_votes);

            if now.class != prev.class {
                let (mine, other) = match now.class {
                    Tile::Empty => (now.empty_votes, now.wall_votes),
                    Tile::Wall => (now.wall_votes, now.empty_votes),
                    Tile::Unknown => panic!("cell went back to unknown"),
                };
                assert!(mine > other && mine >= CONFIDENCE_MIN);
            }

            prev = now;
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = OccupancyGrid::default();

        assert!(grid.vote(MAP_SIZE, 0, Tile::Wall).is_err());
        assert!(grid.cell(0, MAP_SIZE).is_none());
    }

    #[test]
    fn test_concurrent_votes() {
        let grid = Arc::new(OccupancyGrid::default());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let g = grid.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        g.vote(MAP_ORIGIN, MAP_ORIGIN, Tile::Empty).unwrap();
                        g.vote(MAP_ORIGIN, MAP_ORIGIN, Tile::Wall).unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let cell = grid.cell(MAP_ORIGIN, MAP_ORIGIN).unwrap();
        assert_eq!(cell.empty_votes, 4000);
        assert_eq!(cell.wall_votes, 4000);
    }

    #[test]
    fn test_tiles_row_major() {
        let grid = OccupancyGrid::new(3, 1);
        grid.vote(2, 0, Tile::Wall).unwrap();
        grid.vote(0, 1, Tile::Empty).unwrap();

        use Tile::*;
        assert_eq!(
            grid.tiles(),
            vec![Unknown, Unknown, Wall, Empty, Unknown, Unknown, Unknown, Unknown, Unknown]
        );

        let snap = grid.snapshot();
        assert_eq!(snap.cells[[0, 2]].class, Wall);
        assert_eq!(snap.origin, 1);
    }
}
