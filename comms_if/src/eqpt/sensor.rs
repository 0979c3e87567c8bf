//! # Sensor module protocol
//!
//! The sensor module streams type-prefixed messages. A measurement carries the gyroscope heading
//! and the two side distances, a mode button message has no payload.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{BigEndian, ByteOrder};
use log::trace;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Byte transmitted by the module until it is identified.
pub const MODULE_ID: u8 = 0x00;

/// Byte sent to the module once identified.
pub const IDENTIFIED: u8 = 0x01;

/// Message type of the mode button event.
pub const MSG_MODE_BUTTON: u8 = 0x02;

/// Message type of a measurement.
pub const MSG_MEASUREMENT: u8 = 0x07;

/// Length of the measurement payload.
pub const MEASUREMENT_LEN: usize = 6;

/// Offset added to the raw heading so that it stays positive.
pub const HEADING_OFFSET_DEG: f64 = 720.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A raw measurement as sent by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMeasurement {
    /// Integrated gyroscope heading in degrees.
    pub heading_raw: i16,

    /// Right side distance in millimeters, `0` when no wall is in range.
    pub right: u16,

    /// Left side distance in millimeters, `0` when no wall is in range.
    pub left: u16,
}

/// Incremental decoder for the module's byte stream.
///
/// Bytes may be pushed in any chunking, a message split across two reads is completed by the
/// second.
#[derive(Debug, Default)]
pub struct SensorDecoder {
    msg_type: Option<u8>,
    payload: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Events decoded from the sensor module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    Measurement(RawMeasurement),
    ModeButton,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RawMeasurement {
    /// Parse the 6 byte measurement payload.
    pub fn from_payload(payload: &[u8; MEASUREMENT_LEN]) -> Self {
        Self {
            heading_raw: BigEndian::read_i16(&payload[0..2]),
            right: BigEndian::read_u16(&payload[2..4]),
            left: BigEndian::read_u16(&payload[4..6]),
        }
    }

    /// The heading relative to the given reference, in degrees.
    pub fn heading_deg(&self, reference_deg: f64) -> f64 {
        self.heading_raw as f64 + HEADING_OFFSET_DEG - reference_deg
    }
}

impl SensorDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push received bytes into the decoder, returning every complete event.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SensorEvent> {
        let mut events = Vec::new();

        for &b in bytes {
            match self.msg_type {
                None => match b {
                    MSG_MEASUREMENT => {
                        self.msg_type = Some(b);
                        self.payload.clear();
                    }
                    MSG_MODE_BUTTON => events.push(SensorEvent::ModeButton),
                    other => trace!("Discarding unknown sensor message type {:#04x}", other),
                },
                Some(_) => {
                    self.payload.push(b);

                    if self.payload.len() == MEASUREMENT_LEN {
                        let mut buf = [0u8; MEASUREMENT_LEN];
                        buf.copy_from_slice(&self.payload);
                        events.push(SensorEvent::Measurement(RawMeasurement::from_payload(&buf)));

                        self.msg_type = None;
                        self.payload.clear();
                    }
                }
            }
        }

        events
    }
}
