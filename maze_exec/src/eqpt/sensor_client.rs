//! Sensor module client

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    sensor::{RawMeasurement, SensorDecoder, SensorEvent, HEADING_OFFSET_DEG},
    ModuleId,
};
use log::debug;
use serde::Serialize;

use super::{EqptError, Link};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A decoded sensor measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorMeasurement {
    /// Heading relative to the last zeroing, positive to the left.
    ///
    /// Units: degrees
    pub heading: f64,

    /// Units: millimeters, `0` when no wall is in range
    pub left: u16,

    /// Units: millimeters, `0` when no wall is in range
    pub right: u16,
}

/// Client of the heading and side distance sensor module.
pub struct SensorClient<L: Link> {
    link: L,
    decoder: SensorDecoder,

    /// Heading reference subtracted from the module's heading.
    ///
    /// Units: degrees
    reference_deg: f64,

    latest_raw: Option<RawMeasurement>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Updates from the sensor module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorUpdate {
    Measurement(SensorMeasurement),

    /// The mode button was pressed.
    ModeButton,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L: Link> SensorClient<L> {
    /// Create the client, telling the module it has been identified.
    pub fn new(mut link: L) -> Result<Self, EqptError> {
        link.write_all(&[ModuleId::Sensor.identified_byte()])?;

        Ok(Self {
            link,
            decoder: SensorDecoder::new(),
            reference_deg: 0.0,
            latest_raw: None,
        })
    }

    /// Read and decode everything pending from the module.
    pub fn poll(&mut self) -> Result<Vec<SensorUpdate>, EqptError> {
        let bytes = self.link.read_pending()?;

        let updates = self
            .decoder
            .push(&bytes)
            .into_iter()
            .map(|event| match event {
                SensorEvent::Measurement(raw) => {
                    self.latest_raw = Some(raw);
                    SensorUpdate::Measurement(self.convert(&raw))
                }
                SensorEvent::ModeButton => SensorUpdate::ModeButton,
            })
            .collect();

        Ok(updates)
    }

    /// The most recent measurement, if any has been received.
    pub fn latest(&self) -> Option<SensorMeasurement> {
        self.latest_raw.map(|raw| self.convert(&raw))
    }

    /// Make the current heading the zero heading.
    ///
    /// Without a measurement yet the reference is the module's own zero.
    pub fn zero_heading(&mut self) {
        self.reference_deg = match self.latest_raw {
            Some(raw) => raw.heading_raw as f64 + HEADING_OFFSET_DEG,
            None => HEADING_OFFSET_DEG,
        };
        debug!("Heading reference set to {:.1} deg", self.reference_deg);
    }

    fn convert(&self, raw: &RawMeasurement) -> SensorMeasurement {
        SensorMeasurement {
            heading: raw.heading_deg(self.reference_deg),
            left: raw.left,
            right: raw.right,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
