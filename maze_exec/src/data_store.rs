//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::SteeringControl;
use log::info;

use crate::{
    eqpt::SensorMeasurement,
    loco_ctrl,
    nav::{NavOutput, NavState, Pose, ScanCache},
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Who is in control of the drive.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum RobotMode {
    /// The operator drives with manual commands.
    Manual,

    /// The navigation controller follows the right wall.
    Autonomous,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Session elapsed time at the start of this cycle
    pub time_s: f64,

    // Mode management
    pub mode: RobotMode,

    /// Autonomy will not initialise before this time.
    pub settle_until_s: f64,

    /// Autonomous initialisation is complete
    pub auto_ready: bool,

    // Sensing
    /// Latest measurement from the sensor module
    pub sensor: Option<SensorMeasurement>,

    pub scan_cache: ScanCache,

    // Navigation
    pub pose: Pose,
    pub nav_state: NavState,
    pub nav_output: NavOutput,

    /// The vehicle has returned to its start, the run is over.
    pub complete: bool,

    // LocoCtrl
    pub loco_ctrl: loco_ctrl::LocoCtrl,
    pub loco_ctrl_input: loco_ctrl::InputData,
    pub loco_ctrl_output: loco_ctrl::OutputData,
    pub loco_ctrl_status_rpt: loco_ctrl::StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for DataStore {
    fn default() -> Self {
        Self::new(loco_ctrl::LocoCtrl::default())
    }
}

impl DataStore {
    /// Create the store around an already initialised LocoCtrl, starting in autonomous mode.
    pub fn new(loco_ctrl: loco_ctrl::LocoCtrl) -> Self {
        Self {
            num_cycles: 0,
            time_s: 0.0,
            mode: RobotMode::Autonomous,
            settle_until_s: 0.0,
            auto_ready: false,
            sensor: None,
            scan_cache: ScanCache::new(),
            pose: Pose::default(),
            nav_state: NavState::default(),
            nav_output: NavOutput::default(),
            complete: false,
            loco_ctrl,
            loco_ctrl_input: loco_ctrl::InputData::default(),
            loco_ctrl_output: loco_ctrl::OutputData::default(),
            loco_ctrl_status_rpt: loco_ctrl::StatusReport::default(),
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle.
    pub fn cycle_start(&mut self) {
        self.loco_ctrl_input = loco_ctrl::InputData {
            autonomous: self.mode == RobotMode::Autonomous,
            ..Default::default()
        };
        self.loco_ctrl_output = loco_ctrl::OutputData::default();
        self.loco_ctrl_status_rpt = loco_ctrl::StatusReport::default();
        self.nav_output = NavOutput::default();

        self.time_s = util::session::get_elapsed_seconds();
    }

    /// Switch between manual and autonomous mode.
    ///
    /// The drive is stopped and autonomy has to initialise again once `settle_s` has passed.
    /// Returns the halt demand for the drive.
    pub fn toggle_mode(&mut self, settle_s: f64) -> SteeringControl {
        self.mode = match self.mode {
            RobotMode::Manual => RobotMode::Autonomous,
            RobotMode::Autonomous => RobotMode::Manual,
        };
        info!("Mode changed to {:?}", self.mode);

        self.settle_until_s = self.time_s + settle_s;
        self.auto_ready = false;
        self.loco_ctrl_input.autonomous = self.mode == RobotMode::Autonomous;

        self.loco_ctrl.reset()
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_toggle_mode() {
        let mut ds = DataStore::default();
        ds.auto_ready = true;
        ds.time_s = 3.0;

        let halt = ds.toggle_mode(1.0);
        assert_eq!(ds.mode, RobotMode::Manual);
        assert!(!ds.auto_ready);
        assert_eq!(ds.settle_until_s, 4.0);
        assert_eq!(halt.left_speed, 0.0);
        assert!(!ds.loco_ctrl_input.autonomous);

        ds.toggle_mode(1.0);
        assert_eq!(ds.mode, RobotMode::Autonomous);
    }

    #[test]
    fn test_cycle_start_clears_inputs() {
        let mut ds = DataStore::default();
        ds.loco_ctrl_input.calibration = Some((1.0, 1.0));

        ds.cycle_start();
        assert_eq!(ds.loco_ctrl_input.calibration, None);
        assert!(ds.loco_ctrl_input.autonomous);
    }
}
