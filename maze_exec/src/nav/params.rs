//! Navigation control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the navigation state machine and pose tracker.
///
/// All distances are in millimeters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavCtrlParams {
    /// A wall closer than this ahead starts a left turn.
    pub stop_dist_mm: i32,

    /// Distance driven past the end of the right wall before turning right.
    pub right_turn_clearance_mm: i32,

    /// Distance driven after a right turn before following the wall again.
    pub right_turn_approach_mm: i32,

    /// Half width of the band around the target heading in which a rotation is complete.
    ///
    /// Units: degrees
    pub heading_tolerance_deg: f64,

    /// Forward distance changes at or above this are treated as a new reference rather than
    /// motion.
    pub max_pos_delta_mm: i32,

    /// Half width of the zone around the start position which ends the run.
    pub finish_zone_half_width_mm: i32,

    /// Distance from the start at which the run counts as started.
    pub start_exit_dist_mm: i32,
}

impl Default for NavCtrlParams {
    fn default() -> Self {
        Self {
            stop_dist_mm: 225,
            right_turn_clearance_mm: 150,
            right_turn_approach_mm: 275,
            heading_tolerance_deg: 1.0,
            max_pos_delta_mm: 100,
            finish_zone_half_width_mm: 300,
            start_exit_dist_mm: 400,
        }
    }
}
