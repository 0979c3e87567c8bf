//! # TM Server
//!
//! Serves telemetry to, and receives telecommands from, the operators connected over the operator
//! link.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::net::SocketAddr;

use log::warn;

use comms_if::{
    net::{NetParams, PcServer, PcServerError},
    tc::Tc,
    tm::Tm,
};

use crate::{
    map::{OccupancyGrid, TileChange},
    nav::Pose,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    server: PcServer,

    /// Minimum time between two map messages
    map_period_s: f64,

    /// Time the last map message was sent
    last_map_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Operator server error: {0}")]
    ServerError(#[from] PcServerError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block until an operator connects.
    pub fn new(params: &NetParams, map_period_s: f64) -> Result<Self, TmServerError> {
        Ok(Self {
            server: PcServer::new(params)?,
            map_period_s,
            last_map_s: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TmServerError> {
        Ok(self.server.local_addr()?)
    }

    pub fn num_clients(&self) -> usize {
        self.server.num_clients()
    }

    /// Accept new operators and get every telecommand received since the last poll.
    pub fn poll_tcs(&mut self) -> Vec<Tc> {
        self.server.poll()
    }

    /// Send a telemetry message to every operator.
    ///
    /// Telemetry is best effort, failures are only logged.
    pub fn send(&mut self, tm: &Tm) {
        if let Err(e) = self.server.broadcast(tm) {
            warn!("Could not send telemetry: {}", e);
        }
    }

    /// Send the vehicle's position in tiles and its measured heading.
    pub fn send_robot(&mut self, pose: &Pose, heading_deg: f64) {
        let (x, y) = pose.tile_position();
        self.send(&Tm::Robot {
            x,
            y,
            r: heading_deg.to_radians(),
        });
    }

    /// Send classification changes of single cells.
    pub fn send_tile_changes(&mut self, changes: &[TileChange]) {
        for change in changes {
            self.send(&Tm::TileUpdate {
                col: change.col,
                row: change.row,
                tile: change.tile,
            });
        }
    }

    /// Send the whole map if `map_period_s` has passed since it was last sent.
    ///
    /// Returns true if the map was sent.
    pub fn send_map(&mut self, grid: &OccupancyGrid, time_s: f64) -> bool {
        if let Some(last) = self.last_map_s {
            if time_s - last < self.map_period_s {
                return false;
            }
        }

        self.send(&Tm::Map { tiles: grid.tiles() });
        self.last_map_s = Some(time_s);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn server() -> TmServer {
        TmServer::new(
            &NetParams {
                bind_address: String::from("127.0.0.1:0"),
                max_clients: 2,
                ..Default::default()
            },
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_map_throttle() {
        let mut tm = server();
        let grid = OccupancyGrid::new(5, 10);

        assert!(tm.send_map(&grid, 0.0));
        assert!(!tm.send_map(&grid, 0.5));
        assert!(tm.send_map(&grid, 1.0));
        assert!(!tm.send_map(&grid, 1.9));
    }

    #[test]
    fn test_no_clients() {
        let mut tm = server();
        assert!(tm.poll_tcs().is_empty());
        assert_eq!(tm.num_clients(), 0);
        tm.send(&Tm::message("nobody listening"));
    }
}
