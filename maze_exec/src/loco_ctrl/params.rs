//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Locomotion control.
///
/// Speeds are normalised to `[0, 1]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- REGULATOR ----
    /// Proportional gain on the side distance error
    pub kp: f32,

    /// Gain on the heading error
    pub kd: f32,

    /// Side distance the regulator holds.
    ///
    /// Units: millimeters
    pub side_target_mm: f32,

    /// Side distance error beyond which the error is clamped.
    ///
    /// Units: millimeters
    pub side_range_mm: f32,

    /// Side distance assumed when the side sensor sees no wall.
    ///
    /// Units: millimeters
    pub side_lost_mm: f32,

    /// Heading error beyond which the error is clamped.
    ///
    /// Units: degrees
    pub heading_range_deg: f32,

    // ---- SPEEDS ----
    /// Regulated cruise speed
    pub max_speed: f32,

    /// Regulated speed with a wall close ahead
    pub near_wall_speed: f32,

    /// Distance ahead below which `near_wall_speed` is used.
    ///
    /// Units: millimeters
    pub near_wall_dist_mm: f32,

    /// Speed of both sides while unregulated
    pub creep_speed: f32,

    /// Speed when starting to drive forward after a turn
    pub forward_speed: f32,

    /// Speed when starting a turn
    pub rot_speed: f32,

    /// Bounds of the proportional rotation speed
    pub rot_min_speed: f32,
    pub rot_max_speed: f32,

    // ---- MANUAL ----
    /// Speed of manual rotations
    pub manual_rot_speed: f32,

    /// Speed of manual drives
    pub manual_drive_speed: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            kp: 1.5,
            kd: 1.0,
            side_target_mm: 130.0,
            side_range_mm: 80.0,
            side_lost_mm: 299.0,
            heading_range_deg: 5.0,
            max_speed: 0.15,
            near_wall_speed: 0.03,
            near_wall_dist_mm: 650.0,
            creep_speed: 0.0001,
            forward_speed: 0.1,
            rot_speed: 0.15,
            rot_min_speed: 0.1,
            rot_max_speed: 0.3,
            manual_rot_speed: 0.15,
            manual_drive_speed: 0.5,
        }
    }
}
