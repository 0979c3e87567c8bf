//! Identification of which serial port each piece of equipment is attached to.
//!
//! Both microcontroller modules repeatedly transmit their module id after power-up. The drive
//! module is searched for first, then the sensor module among the remaining ports. The port left
//! over is the rangefinder.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use comms_if::eqpt::ModuleId;
use log::{debug, info};

use super::{EqptError, Link};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Links sorted by the equipment found on them.
pub struct Identified<L: Link> {
    pub drive: L,
    pub sensor: L,
    pub rangefinder: L,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IdentifyError {
    #[error("Expected 3 serial ports but got {0}")]
    WrongNumberOfPorts(usize),

    #[error("Identification aborted before the {0:?} module was found")]
    Aborted(ModuleId),

    #[error("Could not read from a port during identification: {0}")]
    LinkError(#[from] EqptError),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Sort the given links into the drive module, the sensor module and the rangefinder.
///
/// Retries every `poll_interval` until both modules announced themselves, or until `quit` is
/// set.
pub fn identify<L: Link>(
    mut links: Vec<L>,
    poll_interval: Duration,
    quit: &AtomicBool,
) -> Result<Identified<L>, IdentifyError> {
    if links.len() != 3 {
        return Err(IdentifyError::WrongNumberOfPorts(links.len()));
    }

    info!("Identifying the drive module...");
    let drive = find_module(&mut links, ModuleId::Drive, poll_interval, quit)?;
    info!("Drive module identified at {}", drive.name());

    info!("Identifying the sensor module...");
    let sensor = find_module(&mut links, ModuleId::Sensor, poll_interval, quit)?;
    info!("Sensor module identified at {}", sensor.name());

    let rangefinder = links.remove(0);
    info!("Rangefinder identified at {}", rangefinder.name());

    Ok(Identified {
        drive,
        sensor,
        rangefinder,
    })
}

/// Remove and return the first link on which `module` announces itself.
fn find_module<L: Link>(
    links: &mut Vec<L>,
    module: ModuleId,
    poll_interval: Duration,
    quit: &AtomicBool,
) -> Result<L, IdentifyError> {
    loop {
        if quit.load(Ordering::Relaxed) {
            return Err(IdentifyError::Aborted(module));
        }

        for i in 0..links.len() {
            let bytes = links[i].read_pending()?;
            if module.is_announced_in(&bytes) {
                return Ok(links.remove(i));
            }
            if !bytes.is_empty() {
                debug!(
                    "{} bytes from {} while looking for {:?}",
                    bytes.len(),
                    links[i].name(),
                    module
                );
            }
        }

        thread::sleep(poll_interval);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
