//! # Navigation
//!
//! Wall-following navigation through the maze. The vehicle keeps a wall on its right, turning
//! right whenever that wall ends and left whenever a wall blocks the way ahead.
//!
//! - [`ScanCache`] keeps the freshest rangefinder revolution.
//! - [`distance_at`] projects an absolute bearing into the scan.
//! - [`PoseTracker`] integrates forward distance changes into a position.
//! - [`NavCtrl`] is the state machine deciding what to drive.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod distance;
mod params;
mod pose;
mod scan_cache;
mod state;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use distance::*;
pub use params::*;
pub use pose::*;
pub use scan_cache::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Side of one maze tile.
///
/// Units: millimeters
pub const TILE_SIZE_MM: i32 = 400;
