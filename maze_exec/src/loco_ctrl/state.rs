//! Implementations for the LocoCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::{eqpt::drive::SteeringControl, tc::DriveCommand};
use log::{debug, trace, warn};
use serde::Serialize;

// Internal
use super::{LocoCtrlError, Params, SPEED_EPSILON};
use crate::nav::{Regulation, Turn};
use util::{
    maths::{clamp, lin_map},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control module state
#[derive(Debug, Clone)]
pub struct LocoCtrl {
    pub(crate) params: Params,

    kp: f32,
    kd: f32,

    /// Rotation currently being executed
    turn: Turn,

    /// Last regulation inputs from navigation, kept between cycles.
    regulation: Option<Regulation>,

    /// Demand currently applied to the drive
    current: SteeringControl,
}

/// Input data to Locomotion Control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Whether navigation is in control of the drive.
    pub autonomous: bool,

    /// A new rotation demanded by navigation.
    pub turn: Option<Turn>,

    /// New regulation inputs from navigation.
    pub regulation: Option<Regulation>,

    /// Remaining rotation of the current turn.
    ///
    /// Units: degrees
    pub rotate_toward_deg: Option<f64>,

    /// Manual command from the operator, ignored while autonomous.
    pub manual: Option<DriveCommand>,

    /// New regulator gains as `(kp, kd)`.
    pub calibration: Option<(f32, f32)>,
}

/// Output of LocoCtrl.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputData {
    /// The demand to send to the drive, `None` if it did not change this cycle.
    pub demand: Option<SteeringControl>,
}

/// Status report for LocoCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub side_dist_limited: bool,
    pub heading_error_limited: bool,
    pub output_limited: bool,
    pub near_wall: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LocoCtrl {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

impl State for LocoCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = LocoCtrlError;

    /// Initialise the LocoCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        *self = Self::with_params(params::load(init_data)?);
        Ok(())
    }

    /// Perform cyclic processing of Locomotion Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();

        if let Some((kp, kd)) = input_data.calibration {
            if let Err(e) = self.calibrate(kp, kd) {
                warn!("Calibration rejected: {}", e);
            }
        }

        let mut demand = self.current;

        if input_data.autonomous {
            if let Some(reg) = input_data.regulation {
                self.regulation = Some(reg);
            }

            match input_data.turn {
                Some(turn) if turn != self.turn => {
                    self.turn = turn;
                    demand = self.turn_demand(turn);
                    debug!("Drive turn changed to {:?}", turn);
                }
                _ => {
                    if self.turn == Turn::None {
                        if let Some(reg) = self.regulation {
                            demand = self.regulated_forward(&reg, &mut report);
                        }
                    }
                }
            }

            if let Some(remaining) = input_data.rotate_toward_deg {
                let speed = self.rotate_speed(remaining);
                demand.left_speed = speed;
                demand.right_speed = speed;
            }
        } else if let Some(cmd) = input_data.manual {
            demand = self.manual_demand(cmd);
            debug!("Manual drive command {:?}", cmd);
        }

        let output = if demand != self.current {
            self.current = demand;
            trace!("Drive demand: {:?}", demand);
            OutputData {
                demand: Some(demand),
            }
        } else {
            OutputData::default()
        };

        Ok((output, report))
    }
}

impl LocoCtrl {
    /// Create a new controller from already loaded parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            kp: params.kp,
            kd: params.kd,
            params,
            turn: Turn::None,
            regulation: None,
            current: SteeringControl::default(),
        }
    }

    /// Set new regulator gains.
    pub fn calibrate(&mut self, kp: f32, kd: f32) -> Result<(), LocoCtrlError> {
        if !kp.is_finite() || !kd.is_finite() || kp < 0.0 || kd < 0.0 {
            return Err(LocoCtrlError::InvalidCalibration(kp, kd));
        }

        debug!("Regulator calibrated: kp = {}, kd = {}", kp, kd);
        self.kp = kp;
        self.kd = kd;
        Ok(())
    }

    /// Current regulator gains as `(kp, kd)`.
    pub fn gains(&self) -> (f32, f32) {
        (self.kp, self.kd)
    }

    /// Demand currently applied to the drive.
    pub fn current(&self) -> SteeringControl {
        self.current
    }

    /// Forget the current turn and regulation and stop.
    ///
    /// Returns the halt demand to send to the drive.
    pub fn reset(&mut self) -> SteeringControl {
        self.turn = Turn::None;
        self.regulation = None;
        self.current = self.manual_demand(DriveCommand::Halt);
        self.current
    }

    /// Demand at the start of a new rotation.
    fn turn_demand(&self, turn: Turn) -> SteeringControl {
        let (speed, left_forward, right_forward) = match turn {
            Turn::None => (self.params.forward_speed, true, true),
            Turn::Left => (self.params.rot_speed, false, true),
            Turn::Right => (self.params.rot_speed, true, false),
        };

        SteeringControl {
            left_speed: speed,
            right_speed: speed,
            left_forward,
            right_forward,
        }
    }

    /// Rotation speed proportional to the remaining angle.
    fn rotate_speed(&self, remaining_deg: f64) -> f32 {
        let p = &self.params;
        let speed = lin_map((0.0, 90.0), (0.0, p.rot_max_speed), remaining_deg as f32);
        clamp(speed, p.rot_min_speed, p.rot_max_speed)
    }

    /// Forward demand holding the side distance and heading.
    fn regulated_forward(&self, reg: &Regulation, report: &mut StatusReport) -> SteeringControl {
        let p = &self.params;

        if !reg.regulate {
            return SteeringControl {
                left_speed: p.creep_speed,
                right_speed: p.creep_speed,
                left_forward: true,
                right_forward: true,
            };
        }

        // An unknown front distance counts as far
        report.near_wall = matches!(reg.front_dist, Some(d) if (d as f32) < p.near_wall_dist_mm);
        let max = if report.near_wall {
            p.near_wall_speed
        } else {
            p.max_speed
        };

        let side = if reg.side_dist == 0 {
            p.side_lost_mm
        } else {
            reg.side_dist as f32
        };
        let side_min = p.side_target_mm - p.side_range_mm;
        let side_max = p.side_target_mm + p.side_range_mm;
        let side_clamped = clamp(side, side_min, side_max);
        report.side_dist_limited = side_clamped != side;

        let heading_error = reg.heading_error as f32;
        let heading_clamped = clamp(heading_error, -p.heading_range_deg, p.heading_range_deg);
        report.heading_error_limited = heading_clamped != heading_error;

        let kp = self.kp * max / p.side_range_mm;
        let kd = self.kd * max / p.heading_range_deg;

        let raw = kp * (side_clamped - p.side_target_mm) + kd * heading_clamped;
        let out = clamp(raw, -max, max);
        report.output_limited = out != raw;

        SteeringControl {
            left_speed: max + out + SPEED_EPSILON,
            right_speed: max - out + SPEED_EPSILON,
            left_forward: true,
            right_forward: true,
        }
    }

    /// Demand for a manual operator command.
    fn manual_demand(&self, cmd: DriveCommand) -> SteeringControl {
        let rot = self.params.manual_rot_speed;
        let drive = self.params.manual_drive_speed;

        let (speed, left_forward, right_forward) = match cmd {
            DriveCommand::RotateLeft => (rot, false, true),
            DriveCommand::RotateRight => (rot, true, false),
            DriveCommand::Forward => (drive, true, true),
            DriveCommand::Backward => (drive, false, false),
            DriveCommand::Left => (drive, true, true),
            DriveCommand::Right => (drive, true, true),
            DriveCommand::Halt => (0.0, true, true),
        };

        SteeringControl {
            left_speed: speed,
            right_speed: speed,
            left_forward,
            right_forward,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
