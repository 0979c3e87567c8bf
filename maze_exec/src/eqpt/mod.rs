//! # Equipment
//!
//! Clients for the equipment attached over serial links: the sensor module, the drive module and
//! the rangefinder. Clients are generic over [`Link`] so the executive can be driven by in-memory
//! links in tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod drive_client;
mod identify;
mod lidar_client;
pub mod mock;
mod sensor_client;
mod serial;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use drive_client::DriveClient;
pub use identify::{identify, Identified, IdentifyError};
pub use lidar_client::LidarClient;
pub use sensor_client::{SensorClient, SensorMeasurement, SensorUpdate};
pub use serial::SerialLink;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A byte link to a piece of equipment.
///
/// Reads never block: a read with nothing pending returns `Ok(0)`.
pub trait Link {
    /// Name of the link, the device path for serial ports.
    fn name(&self) -> &str;

    /// Read whatever bytes are pending into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EqptError>;

    /// Write all of `bytes` to the link.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), EqptError>;

    /// Switch the rangefinder motor, only meaningful for the rangefinder link.
    fn set_motor(&mut self, _on: bool) -> Result<(), EqptError> {
        Ok(())
    }

    /// Read everything currently pending on the link.
    fn read_pending(&mut self) -> Result<Vec<u8>, EqptError> {
        let mut bytes = Vec::new();
        let mut buf = [0u8; 256];

        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&buf[..n]);
        }

        Ok(bytes)
    }
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EqptError {
    #[error("Could not open {0}: {1}")]
    OpenError(String, serialport::Error),

    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    #[error("Link I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("The link's shared state was poisoned")]
    LinkPoisoned,
}
