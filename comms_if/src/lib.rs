//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the maze runner: the operator link and the
//! byte-level protocols of the on-board equipment.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands sent by the operator
pub mod tc;

/// Telemetry sent to the operator
pub mod tm;

/// Codecs for equipment (sensor module, drive module, rangefinder)
pub mod eqpt;

/// Network module
pub mod net;
