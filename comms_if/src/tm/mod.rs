//! # Telemetry module
//!
//! Telemetry is the JSON sent by the vehicle to every connected operator. Each message is an
//! object tagged by its `id` field.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::eqpt::{drive::SteeringControl, rplidar::ScanSample};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Classification of a map tile, serialised as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tile {
    Unknown,
    Empty,
    Wall,
}

/// A telemetry message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "lowercase")]
pub enum Tm {
    /// Vehicle pose, position in tiles from the start tile corner, heading in radians.
    Robot { x: f64, y: f64, r: f64 },

    /// The whole occupancy grid, row-major.
    Map { tiles: Vec<Tile> },

    /// The latest rangefinder revolution.
    Rplidar { nodes: Vec<ScanSample> },

    /// A sensor module measurement.
    Sensor { left: u16, right: u16, rot: f64 },

    /// The demand last sent to the drive module.
    Steering(SteeringControl),

    /// Free text for the operator.
    Message { text: String },

    /// A single tile changed classification.
    #[serde(rename = "tile")]
    TileUpdate {
        col: usize,
        row: usize,
        #[serde(rename = "type")]
        tile: Tile,
    },

    /// A debug marker on the map.
    Point { col: usize, row: usize },
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for Tile {
    fn default() -> Self {
        Tile::Unknown
    }
}

impl TryFrom<u8> for Tile {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tile::Unknown),
            1 => Ok(Tile::Empty),
            2 => Ok(Tile::Wall),
            v => Err(format!("{} is not a valid tile type", v)),
        }
    }
}

impl From<Tile> for u8 {
    fn from(tile: Tile) -> Self {
        match tile {
            Tile::Unknown => 0,
            Tile::Empty => 1,
            Tile::Wall => 2,
        }
    }
}

impl Tm {
    /// Shorthand for a message to the operator.
    pub fn message<S: Into<String>>(text: S) -> Self {
        Tm::Message { text: text.into() }
    }
}
