//! # Maze library.
//!
//! This library allows the executable, its integration tests and benchmarks to access items
//! defined inside the maze crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - the state shared between modules during a cycle
pub mod data_store;

/// Equipment clients - serial links to the sensor module, drive module and rangefinder
pub mod eqpt;

/// Executive - runs one cycle of the whole vehicle
pub mod exec;

/// Locomotion control module - converts navigation demands into drive speeds
pub mod loco_ctrl;

/// Map - occupancy grid built from rangefinder scans
pub mod map;

/// Navigation - wall following state machine and pose tracking
pub mod nav;

/// Executable parameters
pub mod params;

/// Telecommand processor
mod tc_processor;

/// Telemetry server - the operator link
pub mod tm_server;
