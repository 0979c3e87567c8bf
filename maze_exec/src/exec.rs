//! # Maze executive
//!
//! One cycle of the executive:
//!
//! ```text
//!     - Telecommand processing
//!     - Sensor module input, mode button handling
//!     - Rangefinder input
//!     - Manual mode: manual commands only
//!     - Autonomous mode:
//!         - Staged initialisation after start-up or a mode change
//!         - Navigation state machine
//!         - Map update hand-off to the grid worker
//!     - Locomotion control and drive output
//!     - Telemetry
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::{
    eqpt::{drive::SteeringControl, rplidar::ScanSample},
    tm::Tm,
};
use log::{debug, info, trace, warn};

use crate::{
    data_store::{DataStore, RobotMode},
    eqpt::{DriveClient, EqptError, Identified, LidarClient, Link, SensorClient, SensorUpdate},
    loco_ctrl::LocoCtrl,
    map::{
        GridSnapshot, GridWorker, GridWorkerError, OccupancyGrid, RayOrigin, ScanJob,
        CONFIDENCE_MIN, MAP_SIZE,
    },
    nav::{NavCtrl, NavCtrlParams, NavInput, NavState, Pose, Turn},
    params::MazeExecParams,
    tc_processor,
    tm_server::{TmServer, TmServerError},
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The maze executive, owning the equipment, the operator link and the grid worker.
pub struct MazeExec<L: Link> {
    params: MazeExecParams,
    nav_ctrl: NavCtrl,

    ds: DataStore,

    sensor: SensorClient<L>,
    drive: DriveClient<L>,
    lidar: LidarClient<L>,

    tm_server: TmServer,
    grid_worker: GridWorker,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Running,

    /// The vehicle is back at its start, the executive should shut down.
    Complete,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Equipment error: {0}")]
    EqptError(#[from] EqptError),

    #[error("Grid worker error: {0}")]
    GridWorkerError(#[from] GridWorkerError),

    #[error("TM server error: {0}")]
    TmServerError(#[from] TmServerError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<L: Link> MazeExec<L> {
    /// Create the executive on identified equipment and start the rangefinder.
    pub fn new(
        params: MazeExecParams,
        nav_params: NavCtrlParams,
        loco_ctrl: LocoCtrl,
        eqpt: Identified<L>,
    ) -> Result<Self, ExecError> {
        let sensor = SensorClient::new(eqpt.sensor)?;
        let drive = DriveClient::new(eqpt.drive)?;

        let mut lidar = LidarClient::new(eqpt.rangefinder);
        lidar.start()?;

        let tm_server = TmServer::new(&params.net, params.map_tm_period_s)?;

        let grid = Arc::new(OccupancyGrid::new(MAP_SIZE, CONFIDENCE_MIN));
        let grid_worker = GridWorker::new(grid, params.grid_queue_depth)?;

        Ok(Self {
            params,
            nav_ctrl: NavCtrl::new(nav_params),
            ds: DataStore::new(loco_ctrl),
            sensor,
            drive,
            lidar,
            tm_server,
            grid_worker,
        })
    }

    pub fn data_store(&self) -> &DataStore {
        &self.ds
    }

    pub fn grid(&self) -> &Arc<OccupancyGrid> {
        self.grid_worker.grid()
    }

    pub fn tm_server(&self) -> &TmServer {
        &self.tm_server
    }

    /// Run one cycle.
    pub fn cycle(&mut self) -> Result<CycleStatus, ExecError> {
        self.ds.cycle_start();

        // ---- TELECOMMAND PROCESSING ----

        for tc in self.tm_server.poll_tcs() {
            tc_processor::exec(&mut self.ds, &tc);
        }

        // ---- DATA INPUT ----

        for update in self.sensor.poll()? {
            match update {
                SensorUpdate::Measurement(m) => {
                    self.ds.sensor = Some(m);
                    self.tm_server.send(&Tm::Sensor {
                        left: m.left,
                        right: m.right,
                        rot: m.heading,
                    });
                }
                SensorUpdate::ModeButton => {
                    let halt = self.ds.toggle_mode(self.params.mode_switch_settle_s);
                    self.send_drive(&halt)?;
                    self.tm_server
                        .send(&Tm::message(format!("Mode: {:?}", self.ds.mode)));
                }
            }
        }

        let scan = self.lidar.poll()?;

        // ---- AUTONOMY PROCESSING ----

        if self.ds.mode == RobotMode::Autonomous {
            if !self.ds.auto_ready {
                self.autonomous_init(scan);
            } else if self.navigate(scan.unwrap_or_default())? == CycleStatus::Complete {
                return Ok(CycleStatus::Complete);
            }
        } else if scan.is_some() {
            trace!("Rangefinder revolution discarded in manual mode");
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match self.ds.loco_ctrl.proc(&self.ds.loco_ctrl_input) {
            Ok((o, r)) => {
                self.ds.loco_ctrl_output = o;
                self.ds.loco_ctrl_status_rpt = r;
            }
            Err(e) => warn!("Error during LocoCtrl processing: {}", e),
        }

        if let Some(demand) = self.ds.loco_ctrl_output.demand {
            self.send_drive(&demand)?;
        }

        // ---- TELEMETRY ----

        let changes = self.grid_worker.drain_changes();
        self.tm_server.send_tile_changes(&changes);

        self.ds.cycle_end();

        Ok(CycleStatus::Running)
    }

    /// Stop the vehicle and the grid worker, returning the final map.
    ///
    /// Equipment failures are logged so the worker is always joined.
    pub fn shutdown(mut self) -> Result<GridSnapshot, ExecError> {
        if let Err(e) = self.drive.halt() {
            warn!("Could not halt the drive: {}", e);
        }
        if let Err(e) = self.lidar.stop() {
            warn!("Could not stop the rangefinder: {}", e);
        }

        if self.ds.complete {
            self.tm_server.send(&Tm::message("Maze complete"));
        }

        self.grid_worker.stop()?;
        info!(
            "Grid worker stopped, {} scans were dropped",
            self.grid_worker.num_dropped()
        );

        Ok(self.grid_worker.grid().snapshot())
    }

    /// Staged initialisation of autonomy, one stage checked per cycle so the loop never blocks.
    ///
    /// Waits for the mode change to settle, for a first revolution and for the right wall, then
    /// zeroes the pose and the heading.
    fn autonomous_init(&mut self, scan: Option<Vec<ScanSample>>) {
        if self.ds.time_s < self.ds.settle_until_s {
            return;
        }

        if let Some(scan) = scan {
            self.ds.scan_cache.ingest(scan);
        }
        if !self.ds.scan_cache.has_scan() {
            trace!("Autonomy waiting for the rangefinder");
            return;
        }

        match self.ds.sensor {
            Some(m) if m.right != 0 => (),
            _ => {
                trace!("Autonomy waiting for the right wall");
                return;
            }
        }

        self.ds.pose = Pose::default();
        self.ds.nav_state = NavState::default();
        self.sensor.zero_heading();
        self.ds.sensor = self.sensor.latest();
        self.ds.auto_ready = true;

        info!("Autonomous mode initialised");
        self.tm_server.send(&Tm::message("Autonomous mode initialised"));
    }

    /// Run the navigation controller on this cycle's revolution.
    fn navigate(&mut self, scan: Vec<ScanSample>) -> Result<CycleStatus, ExecError> {
        let measurement = match self.ds.sensor {
            Some(m) => m,
            None => return Ok(CycleStatus::Running),
        };

        let (_, is_fresh) = self.ds.scan_cache.ingest(scan);

        let input = NavInput {
            scan: self.ds.scan_cache.scan(),
            heading: measurement.heading,
            right: measurement.right,
        };
        let output = self
            .nav_ctrl
            .step(&mut self.ds.nav_state, &mut self.ds.pose, &input);
        self.ds.nav_output = output;

        if output.complete {
            info!("Back at the start, maze complete");
            self.ds.complete = true;
            return Ok(CycleStatus::Complete);
        }

        if let Some(turn) = output.turn {
            debug!("Turn {:?} at {:?}", turn, self.ds.pose);

            // Turns start on a tile corner, mark it for the operator
            if turn != Turn::None {
                if let Some((col, row)) = self.pose_cell() {
                    self.tm_server.send(&Tm::Point { col, row });
                }
            }
        }

        self.ds.loco_ctrl_input.turn = output.turn;
        self.ds.loco_ctrl_input.regulation = output.regulation;
        self.ds.loco_ctrl_input.rotate_toward_deg = output.rotate_toward_deg;

        if is_fresh {
            let scan = self.ds.scan_cache.scan().to_vec();

            self.tm_server.send(&Tm::Rplidar {
                nodes: scan.clone(),
            });
            self.tm_server
                .send_robot(&self.ds.pose, measurement.heading);

            let job = ScanJob {
                origin: RayOrigin::new(&self.ds.pose, measurement.heading),
                scan,
            };
            self.grid_worker.submit(job)?;

            self.tm_server
                .send_map(self.grid_worker.grid(), self.ds.time_s);
        }

        Ok(CycleStatus::Running)
    }

    /// Send a demand to the drive and to the operators.
    fn send_drive(&mut self, demand: &SteeringControl) -> Result<(), ExecError> {
        self.drive.send(demand)?;
        self.tm_server.send(&Tm::Steering(*demand));
        Ok(())
    }

    /// Grid cell the vehicle is in, the same cell its rays start from.
    fn pose_cell(&self) -> Option<(usize, usize)> {
        let (x, y) = self.ds.pose.tile_position();
        self.grid().cell_at(x, y)
    }
}
