//! Locomotion control module
//!
//! Converts the navigation controller's demands (turns, wall regulation, proportional rotation)
//! and the operator's manual commands into speed and direction demands for the two sides of the
//! vehicle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Added to regulated speeds so a side never gets a zero demand while driving.
pub const SPEED_EPSILON: f32 = 1e-6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum LocoCtrlError {
    #[error("Invalid calibration gains kp = {0}, kd = {1}")]
    InvalidCalibration(f32, f32),
}
