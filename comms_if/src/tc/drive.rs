//! # Manual drive telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A manual drive command. Serialised as its integer code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, StructOpt)]
#[serde(try_from = "u8", into = "u8")]
pub enum DriveCommand {
    /// Rotate on the spot to the left.
    #[structopt(name = "rl")]
    RotateLeft,

    /// Rotate on the spot to the right.
    #[structopt(name = "rr")]
    RotateRight,

    /// Drive straight forwards.
    #[structopt(name = "fwd")]
    Forward,

    /// Drive straight backwards.
    #[structopt(name = "back")]
    Backward,

    /// Drive forwards bearing left.
    #[structopt(name = "left")]
    Left,

    /// Drive forwards bearing right.
    #[structopt(name = "right")]
    Right,

    /// Stop both sides.
    #[structopt(name = "halt")]
    Halt,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TryFrom<u8> for DriveCommand {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DriveCommand::RotateLeft),
            1 => Ok(DriveCommand::RotateRight),
            2 => Ok(DriveCommand::Forward),
            3 => Ok(DriveCommand::Backward),
            4 => Ok(DriveCommand::Left),
            5 => Ok(DriveCommand::Right),
            6 => Ok(DriveCommand::Halt),
            v => Err(format!("{} is not a valid drive command", v)),
        }
    }
}

impl From<DriveCommand> for u8 {
    fn from(cmd: DriveCommand) -> Self {
        match cmd {
            DriveCommand::RotateLeft => 0,
            DriveCommand::RotateRight => 1,
            DriveCommand::Forward => 2,
            DriveCommand::Backward => 3,
            DriveCommand::Left => 4,
            DriveCommand::Right => 5,
            DriveCommand::Halt => 6,
        }
    }
}
