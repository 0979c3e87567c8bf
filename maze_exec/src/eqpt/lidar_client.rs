//! Rangefinder client

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::rplidar::{ScanDecoder, ScanSample, REQ_SCAN, REQ_STOP};
use log::{info, warn};

use super::{EqptError, Link};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Client of the scanning rangefinder.
pub struct LidarClient<L: Link> {
    link: L,
    decoder: ScanDecoder,
    scanning: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L: Link> LidarClient<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            decoder: ScanDecoder::new(),
            scanning: false,
        }
    }

    /// Start the motor and request a continuous scan.
    pub fn start(&mut self) -> Result<(), EqptError> {
        self.link.set_motor(true)?;
        self.link.write_all(&REQ_SCAN)?;
        self.decoder.reset();
        self.scanning = true;

        info!("Rangefinder scanning on {}", self.link.name());
        Ok(())
    }

    /// Stop scanning and the motor.
    pub fn stop(&mut self) -> Result<(), EqptError> {
        self.link.write_all(&REQ_STOP)?;
        self.link.set_motor(false)?;
        self.scanning = false;

        info!("Rangefinder stopped");
        Ok(())
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Read pending bytes and return the newest complete revolution, if any completed.
    ///
    /// Older revolutions completed in the same poll are superseded by the newest one.
    pub fn poll(&mut self) -> Result<Option<Vec<ScanSample>>, EqptError> {
        let bytes = self.link.read_pending()?;
        if bytes.is_empty() {
            return Ok(None);
        }

        let resyncs = self.decoder.num_resyncs();
        let mut revolutions = self.decoder.push(&bytes);
        if self.decoder.num_resyncs() > resyncs {
            warn!(
                "Rangefinder stream lost alignment, {} bytes skipped",
                self.decoder.num_resyncs() - resyncs
            );
        }

        Ok(revolutions.pop())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::mock::MockLink;
    use comms_if::eqpt::rplidar::{encode_node, SCAN_DESCRIPTOR};

    fn sample(bearing: f64, distance: u32) -> ScanSample {
        ScanSample {
            distance,
            bearing,
            quality: 15,
        }
    }

    #[test]
    fn test_start_stop() {
        let link = MockLink::new("lidar");
        let mut client = LidarClient::new(link.clone());

        client.start().unwrap();
        assert!(link.motor_on());
        assert!(client.is_scanning());
        assert_eq!(link.take_tx(), REQ_SCAN.to_vec());

        client.stop().unwrap();
        assert!(!link.motor_on());
        assert_eq!(link.take_tx(), REQ_STOP.to_vec());
    }

    #[test]
    fn test_newest_revolution() {
        let link = MockLink::new("lidar");
        let mut client = LidarClient::new(link.clone());
        client.start().unwrap();

        assert_eq!(client.poll().unwrap(), None);

        let mut bytes = SCAN_DESCRIPTOR.to_vec();
        bytes.extend_from_slice(&encode_node(&sample(10.0, 1000), true));
        bytes.extend_from_slice(&encode_node(&sample(200.0, 1100), false));
        bytes.extend_from_slice(&encode_node(&sample(5.0, 1200), true));
        bytes.extend_from_slice(&encode_node(&sample(90.0, 1300), false));
        bytes.extend_from_slice(&encode_node(&sample(1.0, 1400), true));
        link.push_rx(&bytes);

        let scan = client.poll().unwrap().unwrap();
        assert_eq!(scan.len(), 2);
        assert_eq!(scan[0].distance, 1200);
        assert_eq!(scan[1].distance, 1300);
    }
}
