//! Distance projection into a rangefinder scan

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::rplidar::ScanSample;
use util::maths::wrap_deg_360;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Half width of the window a sample's bearing must fall strictly inside.
///
/// Units: degrees
pub const BEARING_WINDOW_DEG: f64 = 1.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the distance measured along `target_bearing`, given relative to the current target
/// heading of the vehicle.
///
/// The bearing is compensated by how far the vehicle currently is from `heading_target`, so
/// that bearing `0` always looks along the corridor being followed.
///
/// Returns `None` if no sample lies within [`BEARING_WINDOW_DEG`] of the bearing, or if the
/// matched sample carries no return.
pub fn distance_at(
    target_bearing: f64,
    scan: &[ScanSample],
    heading: f64,
    heading_target: f64,
) -> Option<u32> {
    let angle = wrap_deg_360(target_bearing + heading - heading_target);

    // The first sample of a revolution is often slightly past 0, so take it for any angle
    // below the window
    let sample = if angle < BEARING_WINDOW_DEG {
        scan.first()
    } else {
        let lower = angle - BEARING_WINDOW_DEG;
        let upper = angle + BEARING_WINDOW_DEG;

        scan.iter()
            .find(|s| lower < s.bearing && s.bearing < upper)
    };

    match sample {
        Some(s) if s.distance != 0 => Some(s.distance),
        _ => None,
    }
}
