//! # Equipment Interface
//!
//! Byte-level codecs for the equipment attached to the vehicle over serial links. Each module
//! only converts between bytes and typed values, the serial ports themselves are owned by
//! `maze_exec`.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
pub mod rplidar;
pub mod sensor;

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// The microcontroller modules which announce themselves by id on power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleId {
    /// The heading/side-distance sensor module.
    Sensor,

    /// The drive (motor) module.
    Drive,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ModuleId {
    /// The id byte the module transmits while waiting to be identified.
    pub fn announce_byte(&self) -> u8 {
        match self {
            ModuleId::Sensor => sensor::MODULE_ID,
            ModuleId::Drive => drive::MODULE_ID,
        }
    }

    /// The byte the host replies with once the module has been identified.
    pub fn identified_byte(&self) -> u8 {
        match self {
            ModuleId::Sensor => sensor::IDENTIFIED,
            ModuleId::Drive => drive::IDENTIFIED,
        }
    }

    /// Returns true if any byte in the buffer is this module's announce byte.
    pub fn is_announced_in(&self, bytes: &[u8]) -> bool {
        bytes.contains(&self.announce_byte())
    }
}
