//! Drive module client

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    drive::{self, SteeringControl},
    ModuleId,
};
use log::trace;

use super::{EqptError, Link};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Client of the motor drive module.
pub struct DriveClient<L: Link> {
    link: L,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L: Link> DriveClient<L> {
    /// Create the client, telling the module it has been identified.
    pub fn new(mut link: L) -> Result<Self, EqptError> {
        link.write_all(&[ModuleId::Drive.identified_byte()])?;
        Ok(Self { link })
    }

    /// Send a steering demand to the module.
    pub fn send(&mut self, ctrl: &SteeringControl) -> Result<(), EqptError> {
        trace!("Drive demand {:?}", ctrl);
        self.link.write_all(&drive::encode(ctrl))
    }

    /// Stop both sides.
    pub fn halt(&mut self) -> Result<(), EqptError> {
        self.send(&SteeringControl {
            left_speed: 0.0,
            right_speed: 0.0,
            left_forward: true,
            right_forward: true,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::mock::MockLink;

    #[test]
    fn test_drive_frames() {
        let link = MockLink::new("drive");
        let mut client = DriveClient::new(link.clone()).unwrap();
        assert_eq!(link.take_tx(), vec![drive::IDENTIFIED]);

        client
            .send(&SteeringControl {
                left_speed: 1.0,
                right_speed: 0.0,
                left_forward: false,
                right_forward: true,
            })
            .unwrap();
        assert_eq!(link.take_tx(), vec![0x01, 255, 0, 0x02, 0, 1]);

        client.halt().unwrap();
        assert_eq!(link.take_tx(), vec![0x01, 0, 0, 0x02, 1, 1]);
    }
}
