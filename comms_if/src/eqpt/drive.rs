//! # Drive module protocol
//!
//! The drive module takes two three-byte frames: one with the PWM duty of each side and one with
//! the direction of each side.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Byte transmitted by the module until it is identified.
pub const MODULE_ID: u8 = 0x01;

/// Byte sent to the module once identified.
pub const IDENTIFIED: u8 = 0x03;

/// Frame type carrying the PWM duty of each side.
pub const FRAME_PWM: u8 = 0x01;

/// Frame type carrying the direction of each side.
pub const FRAME_DIR: u8 = 0x02;

/// PWM duty of the lowest non-zero speed.
pub const PWM_MIN: f32 = 100.0;

/// PWM duty range above `PWM_MIN` covered by speeds in `(0, 1]`.
pub const PWM_RANGE: f32 = 155.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Steering demand for the two sides of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SteeringControl {
    /// Normalised left side speed in `[0, 1]`
    pub left_speed: f32,

    /// Normalised right side speed in `[0, 1]`
    pub right_speed: f32,

    pub left_forward: bool,

    pub right_forward: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a normalised speed into the PWM duty byte.
///
/// A speed of zero stays zero, everything else is mapped onto `[100, 255]` so the motors never
/// receive a duty too small to turn them.
pub fn speed_to_pwm(speed: f32) -> u8 {
    let speed = speed.max(0.0).min(1.0);

    if speed == 0.0 {
        0
    } else {
        (speed * PWM_RANGE + PWM_MIN) as u8
    }
}

/// Encode a steering demand as the PWM frame followed by the direction frame.
pub fn encode(ctrl: &SteeringControl) -> [u8; 6] {
    [
        FRAME_PWM,
        speed_to_pwm(ctrl.left_speed),
        speed_to_pwm(ctrl.right_speed),
        FRAME_DIR,
        ctrl.left_forward as u8,
        ctrl.right_forward as u8,
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_speed_to_pwm() {
        assert_eq!(speed_to_pwm(0.0), 0);
        assert_eq!(speed_to_pwm(1.0), 255);
        assert_eq!(speed_to_pwm(3.0), 255);
        assert_eq!(speed_to_pwm(0.0001), 100);
        assert_eq!(speed_to_pwm(0.5), 177);
    }

    #[test]
    fn test_encode() {
        let ctrl = SteeringControl {
            left_speed: 0.0,
            right_speed: 1.0,
            left_forward: false,
            right_forward: true,
        };

        assert_eq!(encode(&ctrl), [0x01, 0, 255, 0x02, 0, 1]);
    }
}
