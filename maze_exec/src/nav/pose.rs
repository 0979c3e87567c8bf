//! Pose and pose tracking

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::rplidar::ScanSample;
use log::{trace, warn};
use serde::Serialize;
use util::maths::round_to_multiple;

use super::{distance_at, NavCtrlParams, NavState, TILE_SIZE_MM};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and orientation of the vehicle relative to its start.
///
/// `+y` is the direction the vehicle faced at the start (north), `+x` is to its right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    /// Units: millimeters
    pub x: i32,

    /// Units: millimeters
    pub y: i32,

    /// Heading the vehicle is being turned to, changed by 90 degrees per turn.
    ///
    /// Units: degrees
    pub heading_target: f64,

    /// The grid direction the vehicle is driving along.
    pub facing: Facing,
}

/// Integrates changes in the distance ahead into the pose.
#[derive(Debug, Clone)]
pub struct PoseTracker {
    max_delta_mm: i32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A grid-aligned direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Facing {
    North,
    East,
    South,
    West,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Facing {
    /// The direction after a 90 degree left turn.
    pub fn left(self) -> Self {
        match self {
            Facing::North => Facing::West,
            Facing::West => Facing::South,
            Facing::South => Facing::East,
            Facing::East => Facing::North,
        }
    }

    /// The direction after a 90 degree right turn.
    pub fn right(self) -> Self {
        match self {
            Facing::North => Facing::East,
            Facing::East => Facing::South,
            Facing::South => Facing::West,
            Facing::West => Facing::North,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            heading_target: 0.0,
            facing: Facing::North,
        }
    }
}

impl Pose {
    /// Snap the position to the nearest tile corner.
    ///
    /// Called at turns only, so drift never accumulates over more than one straight.
    pub fn correct_position(&mut self) {
        let tile = TILE_SIZE_MM as f64;

        self.x = round_to_multiple(self.x as f64, tile) as i32;
        self.y = round_to_multiple(self.y as f64, tile) as i32;
    }

    /// Position in tile units, with the start tile's centre at `(0.5, 0.5)`.
    pub fn tile_position(&self) -> (f64, f64) {
        let tile = TILE_SIZE_MM as f64;

        (self.x as f64 / tile + 0.5, self.y as f64 / tile + 0.5)
    }
}

impl PoseTracker {
    pub fn new(params: &NavCtrlParams) -> Self {
        Self {
            max_delta_mm: params.max_pos_delta_mm,
        }
    }

    /// Update the pose from the distance ahead in this cycle's scan.
    ///
    /// The distance closed since the previous reading is applied along the current facing, and
    /// counted off any active `target_dist`. Jumps of `max_delta_mm` or more only move the
    /// reference.
    pub fn update(
        &self,
        scan: &[ScanSample],
        heading: f64,
        pose: &mut Pose,
        nav_state: &mut NavState,
    ) {
        let dist = match distance_at(0.0, scan, heading, pose.heading_target) {
            Some(d) => d as i32,
            None => return,
        };

        if let Some(prev_dist) = nav_state.prev_dist {
            let delta = prev_dist - dist;

            // Moving away from what's ahead is suspicious but still applied
            if delta < 0 {
                warn!(
                    "New distance {} mm was bigger than the previous {} mm",
                    dist, prev_dist
                );
            }

            if delta.abs() < self.max_delta_mm {
                if nav_state.target_dist > 0 {
                    nav_state.target_dist -= delta;
                }

                match pose.facing {
                    Facing::North => pose.y += delta,
                    Facing::East => pose.x += delta,
                    Facing::South => pose.y -= delta,
                    Facing::West => pose.x -= delta,
                }
            } else {
                trace!("Forward distance jumped by {} mm, new reference", delta);
            }
        }

        nav_state.prev_dist = Some(dist);
    }
}
