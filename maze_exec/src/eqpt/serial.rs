//! Serial port link

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::{ErrorKind, Read, Write},
    time::Duration,
};

use log::info;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::{EqptError, Link};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Timeout of a single read, kept short since reads only happen with bytes pending.
const READ_TIMEOUT: Duration = Duration::from_millis(1);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A raw 8N1 serial port without flow control.
pub struct SerialLink {
    path: String,
    port: Box<dyn SerialPort>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SerialLink {
    /// Open the serial port at `path`.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, EqptError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| EqptError::OpenError(path.to_string(), e))?;

        info!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self {
            path: path.to_string(),
            port,
        })
    }
}

impl Link for SerialLink {
    fn name(&self) -> &str {
        &self.path
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EqptError> {
        if self.port.bytes_to_read()? == 0 {
            return Ok(0);
        }

        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), EqptError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    /// The rangefinder motor runs while DTR is deasserted.
    fn set_motor(&mut self, on: bool) -> Result<(), EqptError> {
        self.port.write_data_terminal_ready(!on)?;
        Ok(())
    }
}
