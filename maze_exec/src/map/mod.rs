//! # Map
//!
//! Occupancy grid of the maze, built by casting every rangefinder sample from the vehicle's
//! position. The grid is updated by a single background worker and read by telemetry while it is
//! being written.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod occupancy_grid;
mod ray_cast;
mod worker;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use occupancy_grid::*;
pub use ray_cast::*;
pub use worker::*;

use crate::nav::TILE_SIZE_MM;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Side of the square area the grid may have to cover on either side of the start.
///
/// Units: millimeters
pub const AREA_SIZE_MM: i32 = 10_000;

/// Number of cells along each side of the grid.
pub const MAP_SIZE: usize = 2 * (AREA_SIZE_MM / TILE_SIZE_MM) as usize + 1;

/// Index of the start tile along each axis.
pub const MAP_ORIGIN: usize = MAP_SIZE / 2;

/// Votes a classification needs before it is committed.
pub const CONFIDENCE_MIN: u32 = 10;

/// Step between the points sampled along a ray.
///
/// Units: tiles
pub const RAY_STEP_TILES: f64 = 0.25;
