//! # Telecommand module
//!
//! Telecommands are the JSON messages sent by the operator to the vehicle. Every message is an
//! object tagged by its `id` field.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod drive;

pub use drive::DriveCommand;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the vehicle by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "lowercase")]
pub enum Tc {
    /// A manual drive command, only executed in manual mode.
    Command {
        #[serde(rename = "type")]
        cmd: DriveCommand,
    },

    /// New drive regulator gains, accepted in any mode.
    Calibration { kp: f32, kd: f32 },
}
