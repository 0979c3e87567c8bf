//! Ray casting of rangefinder samples into the grid

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{eqpt::rplidar::ScanSample, tm::Tile};
use nalgebra::Vector2;

use super::{GridError, OccupancyGrid, TileChange, RAY_STEP_TILES};
use crate::nav::{Pose, TILE_SIZE_MM};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Where a scan was taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayOrigin {
    /// Units: millimeters
    pub x: i32,

    /// Units: millimeters
    pub y: i32,

    /// Measured heading when the scan was taken, not the target heading.
    ///
    /// Units: degrees
    pub heading: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RayOrigin {
    pub fn new(pose: &Pose, heading: f64) -> Self {
        Self {
            x: pose.x,
            y: pose.y,
            heading,
        }
    }

    /// Position in tiles, with the start tile's centre at `(0.5, 0.5)`.
    fn tile_position(&self) -> Vector2<f64> {
        let tile = TILE_SIZE_MM as f64;
        Vector2::new(self.x as f64 / tile + 0.5, self.y as f64 / tile + 0.5)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Cast one sample into the grid.
///
/// Every cell the ray passes through before reaching the cell of the hit gets an `Empty` vote,
/// the cell containing the hit gets a single `Wall` vote. Samples without a return are skipped.
/// Parts of the ray outside the grid are not voted on.
///
/// Committed classification changes are appended to `changes`.
pub fn ray_cast(
    grid: &OccupancyGrid,
    origin: &RayOrigin,
    sample: &ScanSample,
    changes: &mut Vec<TileChange>,
) -> Result<(), GridError> {
    if sample.distance == 0 {
        return Ok(());
    }

    // Bearing 0 looks along +y, bearing 90 along +x
    let angle = (-sample.bearing + origin.heading - 90.0).to_radians();
    let dist_tiles = sample.distance as f64 / TILE_SIZE_MM as f64;
    let delta = Vector2::new(-angle.cos(), -angle.sin()) * dist_tiles;

    let src = origin.tile_position();
    let dst = src + delta;
    let length = delta.norm();
    let dir = delta / length;

    let hit_cell = cell_of(grid, &dst);

    let mut last_cell = None;
    let mut step = 0u32;
    loop {
        let t = step as f64 * RAY_STEP_TILES;
        if t >= length {
            break;
        }

        let cell = match cell_of(grid, &(src + dir * t)) {
            Some(c) => c,
            None => break,
        };

        if Some(cell) == hit_cell {
            break;
        }

        if Some(cell) != last_cell {
            vote(grid, cell, Tile::Empty, changes)?;
            last_cell = Some(cell);
        }

        step += 1;
    }

    if let Some(cell) = hit_cell {
        vote(grid, cell, Tile::Wall, changes)?;
    }

    Ok(())
}

/// Cast a whole revolution into the grid, returning the committed changes.
pub fn ray_cast_scan(
    grid: &OccupancyGrid,
    origin: &RayOrigin,
    scan: &[ScanSample],
) -> Result<Vec<TileChange>, GridError> {
    let mut changes = Vec::new();

    for sample in scan {
        ray_cast(grid, origin, sample, &mut changes)?;
    }

    Ok(changes)
}

fn cell_of(grid: &OccupancyGrid, point: &Vector2<f64>) -> Option<(usize, usize)> {
    grid.cell_at(point.x, point.y)
}

fn vote(
    grid: &OccupancyGrid,
    (col, row): (usize, usize),
    observed: Tile,
    changes: &mut Vec<TileChange>,
) -> Result<(), GridError> {
    if let Some(tile) = grid.vote(col, row, observed)? {
        changes.push(TileChange { col, row, tile });
    }

    Ok(())
}
