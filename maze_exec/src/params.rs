//! # Maze Executable Parameters
//!
//! This module provides parameters for the maze executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MazeExecParams {
    /// Serial ports the equipment may be attached to.
    pub serial_ports: Vec<String>,

    /// Baud rate of the sensor and drive modules
    pub module_baud: u32,

    /// Baud rate of the rangefinder
    pub lidar_baud: u32,

    /// Time between reads of the ports while identifying the modules.
    ///
    /// Units: seconds
    pub identify_poll_interval_s: f64,

    /// Operator link parameters
    pub net: NetParams,

    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Minimum time between two full map telemetry messages.
    ///
    /// Units: seconds
    pub map_tm_period_s: f64,

    /// Number of scans the grid worker may have queued before new ones are dropped.
    pub grid_queue_depth: usize,

    /// Time to wait after a mode change before autonomy initialises.
    ///
    /// Units: seconds
    pub mode_switch_settle_s: f64,
}

impl Default for MazeExecParams {
    fn default() -> Self {
        Self {
            serial_ports: vec![
                String::from("/dev/ttyUSB0"),
                String::from("/dev/ttyUSB1"),
                String::from("/dev/ttyUSB2"),
            ],
            module_baud: 38400,
            lidar_baud: 115200,
            identify_poll_interval_s: 0.1,
            net: NetParams::default(),
            cycle_period_s: 0.02,
            map_tm_period_s: 1.0,
            grid_queue_depth: 8,
            mode_switch_settle_s: 1.0,
        }
    }
}
