//! Navigation state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::rplidar::ScanSample;
use log::{debug, trace, warn};
use serde::Serialize;

use super::{distance_at, Facing, NavCtrlParams, Pose, PoseTracker};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller state carried between cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavState {
    pub mode: NavMode,

    /// Remaining distance of a fixed-length drive, active while positive.
    ///
    /// Units: millimeters
    pub target_dist: i32,

    /// Previous forward distance, `None` until a reading has been taken.
    ///
    /// Units: millimeters
    pub prev_dist: Option<i32>,

    /// Whether the forward drive regulates on the side wall.
    pub regulate: bool,

    /// The current left rotation corrects an over-rotation to the right.
    pub adjust_left: bool,

    /// The current right rotation corrects an over-rotation to the left.
    pub adjust_right: bool,

    /// Heading seen in the previous cycle.
    ///
    /// Units: degrees
    pub prev_heading: f64,

    /// The vehicle has left the start tile.
    pub started: bool,
}

/// Inputs to one cycle of the state machine.
#[derive(Debug, Clone, Copy)]
pub struct NavInput<'a> {
    /// Effective rangefinder revolution for this cycle.
    pub scan: &'a [ScanSample],

    /// Current unwrapped heading.
    ///
    /// Units: degrees
    pub heading: f64,

    /// Right side distance from the sensor module, `0` when the wall is lost.
    ///
    /// Units: millimeters
    pub right: u16,
}

/// Demands produced by one cycle of the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavOutput {
    /// A new rotation for the drive, if it changed.
    pub turn: Option<Turn>,

    /// New forward regulation inputs.
    pub regulation: Option<Regulation>,

    /// Remaining rotation to scale the turn speed with.
    ///
    /// Units: degrees
    pub rotate_toward_deg: Option<f64>,

    /// The vehicle is back in the start tile facing north, the maze is done.
    pub complete: bool,
}

/// Inputs to the forward drive regulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Regulation {
    /// Units: millimeters
    pub side_dist: u16,

    /// Heading minus target heading.
    ///
    /// Units: degrees
    pub heading_error: f64,

    pub regulate: bool,

    /// Units: millimeters
    pub front_dist: Option<u32>,
}

/// Distances around the vehicle, used for logging.
#[derive(Debug, Clone, Copy)]
struct Surroundings {
    front: Option<u32>,
    right: Option<u32>,
    behind: Option<u32>,
    left: Option<u32>,
}

/// The navigation controller.
#[derive(Debug, Clone)]
pub struct NavCtrl {
    params: NavCtrlParams,
    tracker: PoseTracker,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavMode {
    /// Following the right wall.
    Moving,

    /// Rotating 90 degrees left in front of a wall.
    RotatingLeft,

    /// Driving clear of the end of the right wall.
    RotatingRight1,

    /// Rotating 90 degrees right.
    RotatingRight2,

    /// Driving into the new corridor after a right turn.
    RotatingRight3,
}

/// Rotation demand for the drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Turn {
    None,
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for NavState {
    fn default() -> Self {
        Self {
            mode: NavMode::Moving,
            target_dist: 0,
            prev_dist: None,
            regulate: true,
            adjust_left: false,
            adjust_right: false,
            prev_heading: 0.0,
            started: false,
        }
    }
}

impl NavCtrl {
    pub fn new(params: NavCtrlParams) -> Self {
        Self {
            tracker: PoseTracker::new(&params),
            params,
        }
    }

    pub fn params(&self) -> &NavCtrlParams {
        &self.params
    }

    /// Run one cycle of the state machine.
    pub fn step(&self, state: &mut NavState, pose: &mut Pose, input: &NavInput) -> NavOutput {
        let mut output = NavOutput::default();

        if self.is_complete(state, pose) {
            output.complete = true;
            return output;
        }

        let exit = self.params.start_exit_dist_mm;
        if !state.started
            && (pose.x >= exit || pose.y >= exit || pose.x <= -exit || pose.y <= -exit)
        {
            debug!("Left the start tile");
            state.started = true;
        }

        let heading = input.heading;
        let around = self.surroundings(input.scan, heading, pose);
        trace!("NavCtrl {:?}: {:?}, right sensor {}", state.mode, around, input.right);

        let prev_mode = state.mode;

        match state.mode {
            NavMode::Moving => {
                self.tracker.update(input.scan, heading, pose, state);

                if input.right == 0 {
                    // Passed the end of the right wall
                    state.target_dist = self.params.right_turn_clearance_mm;
                    state.regulate = false;
                    state.mode = NavMode::RotatingRight1;
                } else if around
                    .front
                    .map_or(false, |f| (f as i32) < self.params.stop_dist_mm)
                {
                    pose.correct_position();
                    state.mode = NavMode::RotatingLeft;
                    pose.facing = pose.facing.left();
                    state.prev_dist = around.left.map(|d| d as i32);
                    pose.heading_target += 90.0;
                    output.turn = Some(Turn::Left);
                }

                output.regulation = Some(Regulation {
                    side_dist: input.right,
                    heading_error: heading - pose.heading_target,
                    regulate: state.regulate,
                    front_dist: distance_at(0.0, input.scan, heading, pose.heading_target),
                });
            }
            NavMode::RotatingLeft => {
                if self.in_band(heading, pose) {
                    if state.adjust_left {
                        state.mode = NavMode::RotatingRight2;
                        state.adjust_left = false;
                        output.turn = Some(Turn::Right);
                    } else {
                        state.mode = NavMode::Moving;
                        output.turn = Some(Turn::None);
                    }
                } else if heading >= pose.heading_target + self.params.heading_tolerance_deg {
                    warn!("Turned too far left ({:.1} deg), adjusting", heading);
                    state.mode = NavMode::RotatingRight2;
                    output.turn = Some(Turn::Right);
                    state.adjust_left = false;
                    state.adjust_right = true;
                } else if state.prev_heading != heading {
                    output.rotate_toward_deg = Some((pose.heading_target - heading).abs());
                }
            }
            NavMode::RotatingRight1 => {
                self.tracker.update(input.scan, heading, pose, state);

                if input.right != 0 {
                    warn!("Right wall reappeared ({} mm), resuming", input.right);
                    state.mode = NavMode::Moving;
                    state.regulate = true;
                } else if state.target_dist <= 0 {
                    pose.correct_position();
                    state.mode = NavMode::RotatingRight2;
                    pose.facing = pose.facing.right();
                    pose.heading_target -= 90.0;
                    output.turn = Some(Turn::Right);
                }
            }
            NavMode::RotatingRight2 => {
                if self.in_band(heading, pose) {
                    if state.adjust_right {
                        state.mode = NavMode::Moving;
                        state.adjust_right = false;
                    } else {
                        state.mode = NavMode::RotatingRight3;
                        state.target_dist = self.params.right_turn_approach_mm;
                        state.prev_dist = around.front.map(|d| d as i32);
                    }
                    output.turn = Some(Turn::None);
                } else if heading <= pose.heading_target - self.params.heading_tolerance_deg {
                    warn!("Turned too far right ({:.1} deg), adjusting", heading);
                    state.mode = NavMode::RotatingLeft;
                    output.turn = Some(Turn::Left);
                    state.adjust_left = true;
                } else if state.prev_heading != heading {
                    output.rotate_toward_deg = Some((pose.heading_target - heading).abs());
                }
            }
            NavMode::RotatingRight3 => {
                self.tracker.update(input.scan, heading, pose, state);

                if state.target_dist <= 0 {
                    state.regulate = true;
                    state.mode = NavMode::Moving;
                }
            }
        }

        // Corrections never outlive the turn they belong to
        if state.mode == NavMode::Moving {
            state.adjust_left = false;
            state.adjust_right = false;
        }

        if state.mode != prev_mode {
            debug!(
                "NavCtrl {:?} -> {:?} at ({}, {}) facing {:?}",
                prev_mode, state.mode, pose.x, pose.y, pose.facing
            );
        }

        state.prev_heading = heading;

        output
    }

    /// True when the vehicle is back in the middle of the start tile, facing north, after having
    /// left it.
    pub fn is_complete(&self, state: &NavState, pose: &Pose) -> bool {
        let half = self.params.finish_zone_half_width_mm;

        state.started
            && pose.facing == Facing::North
            && -half < pose.x
            && pose.x < half
            && -half < pose.y
            && pose.y < half
    }

    fn in_band(&self, heading: f64, pose: &Pose) -> bool {
        let tol = self.params.heading_tolerance_deg;

        heading >= pose.heading_target - tol && heading <= pose.heading_target + tol
    }

    fn surroundings(&self, scan: &[ScanSample], heading: f64, pose: &Pose) -> Surroundings {
        let at = |bearing| distance_at(bearing, scan, heading, pose.heading_target);

        Surroundings {
            front: at(0.0),
            right: at(90.0),
            behind: at(180.0),
            left: at(270.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(bearing: f64, distance: u32) -> ScanSample {
        ScanSample {
            distance,
            bearing,
            quality: 15,
        }
    }

    /// A scan of a corridor with the given distances ahead and to the left.
    fn corridor(front: u32, left: u32) -> Vec<ScanSample> {
        vec![
            sample(0.2, front),
            sample(90.0, 130),
            sample(180.0, 1200),
            sample(270.0, left),
        ]
    }

    fn ctrl() -> NavCtrl {
        NavCtrl::new(NavCtrlParams::default())
    }

    #[test]
    fn test_moving_lost_right_wall() {
        let mut state = NavState::default();
        let mut pose = Pose::default();
        let scan = corridor(1000, 600);

        let out = ctrl().step(
            &mut state,
            &mut pose,
            &NavInput {
                scan: &scan,
                heading: 0.0,
                right: 0,
            },
        );

        assert_eq!(state.mode, NavMode::RotatingRight1);
        assert_eq!(state.target_dist, 150);
        assert!(!state.regulate);
        assert_eq!(out.turn, None);
        assert!(!out.regulation.unwrap().regulate);
    }

    #[test]
    fn test_moving_wall_ahead() {
        let mut state = NavState {
            prev_dist: Some(210),
            ..NavState::default()
        };
        let mut pose = Pose {
            x: 10,
            y: 390,
            ..Pose::default()
        };
        let scan = corridor(200, 600);

        let out = ctrl().step(
            &mut state,
            &mut pose,
            &NavInput {
                scan: &scan,
                heading: 0.0,
                right: 130,
            },
        );

        assert_eq!(state.mode, NavMode::RotatingLeft);
        assert_eq!(pose.facing, Facing::West);
        assert_eq!(pose.heading_target, 90.0);
        assert_eq!((pose.x, pose.y), (0, 400));
        assert_eq!(state.prev_dist, Some(600));
        assert_eq!(out.turn, Some(Turn::Left));
    }

    #[test]
    fn test_moving_regulates() {
        let mut state = NavState::default();
        let mut pose = Pose::default();
        let scan = corridor(1000, 600);

        let out = ctrl().step(
            &mut state,
            &mut pose,
            &NavInput {
                scan: &scan,
                heading: 2.0,
                right: 140,
            },
        );

        assert_eq!(state.mode, NavMode::Moving);
        assert_eq!(
            out.regulation,
            Some(Regulation {
                side_dist: 140,
                heading_error: 2.0,
                regulate: true,
                front_dist: Some(1000),
            })
        );
    }

    #[test]
    fn test_rotating_left_done() {
        let mut state = NavState {
            mode: NavMode::RotatingLeft,
            ..NavState::default()
        };
        let mut pose = Pose {
            heading_target: 90.0,
            facing: Facing::West,
            ..Pose::default()
        };
        let scan = corridor(1000, 600);

        let out = ctrl().step(
            &mut state,
            &mut pose,
            &NavInput {
                scan: &scan,
                heading: 90.0,
                right: 130,
            },
        );

        assert_eq!(state.mode, NavMode::Moving);
        assert_eq!(out.turn, Some(Turn::None));
    }

    #[test]
    fn test_rotating_left_overshoot_and_recover() {
        let nav = ctrl();
        let mut state = NavState {
            mode: NavMode::RotatingLeft,
            ..NavState::default()
        };
        let mut pose = Pose {
            heading_target: 90.0,
            facing: Facing::West,
            ..Pose::default()
        };
        let scan = corridor(1000, 600);
        let input = |heading| NavInput {
            scan: &scan,
            heading,
            right: 130,
        };

        // Still turning, proportional rotation
        let out = nav.step(&mut state, &mut pose, &input(60.0));
        assert_eq!(out.rotate_toward_deg, Some(30.0));

        // Heading unchanged, no new rotation demand
        let out = nav.step(&mut state, &mut pose, &input(60.0));
        assert_eq!(out.rotate_toward_deg, None);

        // Overshoot
        let out = nav.step(&mut state, &mut pose, &input(93.0));
        assert_eq!(state.mode, NavMode::RotatingRight2);
        assert!(state.adjust_right);
        assert_eq!(out.turn, Some(Turn::Right));

        // Correction reaches the band, straight back to following the wall
        let out = nav.step(&mut state, &mut pose, &input(90.5));
        assert_eq!(state.mode, NavMode::Moving);
        assert!(!state.adjust_right);
        assert_eq!(out.turn, Some(Turn::None));
    }

    #[test]
    fn test_right_turn_sequence() {
        let nav = ctrl();
        let mut state = NavState::default();
        let mut pose = Pose::default();

        // Wall on the right ends
        let scan = corridor(1000, 600);
        nav.step(&mut state, &mut pose, &input(&scan, 0.0, 0));
        assert_eq!(state.mode, NavMode::RotatingRight1);

        // Drive 150 mm clear of the corner
        for (i, front) in [960u32, 920, 880, 840].iter().enumerate() {
            let scan = corridor(*front, 600);
            let out = nav.step(&mut state, &mut pose, &input(&scan, 0.0, 0));

            if i < 3 {
                assert_eq!(state.mode, NavMode::RotatingRight1);
                assert_eq!(out.turn, None);
            } else {
                assert_eq!(state.mode, NavMode::RotatingRight2);
                assert_eq!(out.turn, Some(Turn::Right));
            }
        }
        assert_eq!(pose.facing, Facing::East);
        assert_eq!(pose.heading_target, -90.0);
        assert_eq!((pose.x, pose.y), (0, 0));

        // Turn complete with 1000 mm of corridor ahead
        let scan = corridor(1000, 600);
        let out = nav.step(&mut state, &mut pose, &input(&scan, -90.0, 0));
        assert_eq!(state.mode, NavMode::RotatingRight3);
        assert_eq!(state.target_dist, 275);
        assert_eq!(state.prev_dist, Some(1000));
        assert_eq!(out.turn, Some(Turn::None));

        // Drive the approach distance
        for front in [950u32, 900, 850, 800, 750, 720].iter() {
            let scan = corridor(*front, 600);
            nav.step(&mut state, &mut pose, &input(&scan, -90.0, 0));
        }
        assert_eq!(state.mode, NavMode::Moving);
        assert!(state.regulate);
        assert_eq!(pose.x, 280);
    }

    #[test]
    fn test_right_wall_reappears() {
        let mut state = NavState {
            mode: NavMode::RotatingRight1,
            target_dist: 150,
            regulate: false,
            ..NavState::default()
        };
        let mut pose = Pose::default();
        let scan = corridor(1000, 600);

        ctrl().step(
            &mut state,
            &mut pose,
            &NavInput {
                scan: &scan,
                heading: 0.0,
                right: 120,
            },
        );

        assert_eq!(state.mode, NavMode::Moving);
        assert!(state.regulate);
    }

    #[test]
    fn test_complete() {
        let nav = ctrl();
        let scan = corridor(1000, 600);
        let input = NavInput {
            scan: &scan,
            heading: 0.0,
            right: 130,
        };

        let mut state = NavState {
            started: true,
            ..NavState::default()
        };
        let mut pose = Pose {
            x: 120,
            y: -250,
            heading_target: 360.0,
            facing: Facing::North,
        };
        assert!(nav.step(&mut state, &mut pose, &input).complete);

        // Not started yet
        let mut state = NavState::default();
        assert!(!nav.step(&mut state, &mut pose, &input).complete);

        // Wrong facing
        let mut state = NavState {
            started: true,
            ..NavState::default()
        };
        pose.facing = Facing::East;
        assert!(!nav.step(&mut state, &mut pose, &input).complete);
    }

    #[test]
    fn test_started() {
        let nav = ctrl();
        let scan = corridor(1000, 600);
        let mut state = NavState::default();
        let mut pose = Pose {
            y: 400,
            ..Pose::default()
        };

        nav.step(
            &mut state,
            &mut pose,
            &NavInput {
                scan: &scan,
                heading: 0.0,
                right: 130,
            },
        );

        assert!(state.started);
    }

    #[test]
    fn test_rotating_right_undershoot_and_recover() {
        let nav = ctrl();
        let mut state = NavState {
            mode: NavMode::RotatingRight2,
            ..NavState::default()
        };
        let mut pose = Pose {
            heading_target: -90.0,
            facing: Facing::East,
            ..Pose::default()
        };
        let scan = corridor(1000, 600);

        // Turned too far right, correct to the left
        let out = nav.step(&mut state, &mut pose, &input(&scan, -92.0, 0));
        assert_eq!(state.mode, NavMode::RotatingLeft);
        assert_eq!(out.turn, Some(Turn::Left));
        assert!(state.adjust_left);
        assert!(!state.adjust_right);

        // Back in the band, the correction hands back to the right turn
        let out = nav.step(&mut state, &mut pose, &input(&scan, -90.5, 0));
        assert_eq!(state.mode, NavMode::RotatingRight2);
        assert_eq!(out.turn, Some(Turn::Right));
        assert!(!state.adjust_left);
        assert!(!state.adjust_right);

        // Right turn completes normally with the approach leg
        let out = nav.step(&mut state, &mut pose, &input(&scan, -90.0, 0));
        assert_eq!(state.mode, NavMode::RotatingRight3);
        assert_eq!(out.turn, Some(Turn::None));
        assert_eq!(state.target_dist, 275);
        assert!(!state.adjust_left);
        assert!(!state.adjust_right);
    }

    #[test]
    fn test_corrections_cleared_before_next_turn() {
        let nav = ctrl();
        let mut state = NavState {
            mode: NavMode::RotatingRight2,
            ..NavState::default()
        };
        let mut pose = Pose {
            heading_target: -90.0,
            facing: Facing::East,
            ..Pose::default()
        };
        let scan = corridor(1000, 600);

        // Undershoot, then the left correction overshoots in turn
        nav.step(&mut state, &mut pose, &input(&scan, -93.0, 0));
        assert_eq!(state.mode, NavMode::RotatingLeft);
        assert!(state.adjust_left);

        let out = nav.step(&mut state, &mut pose, &input(&scan, -88.0, 0));
        assert_eq!(state.mode, NavMode::RotatingRight2);
        assert_eq!(out.turn, Some(Turn::Right));
        assert!(!state.adjust_left);
        assert!(state.adjust_right);

        let out = nav.step(&mut state, &mut pose, &input(&scan, -90.0, 130));
        assert_eq!(state.mode, NavMode::Moving);
        assert_eq!(out.turn, Some(Turn::None));
        assert!(!state.adjust_left);
        assert!(!state.adjust_right);

        // An ordinary left turn at the next wall ends in Moving, with no approach leg
        let scan = corridor(200, 600);
        nav.step(&mut state, &mut pose, &input(&scan, -90.0, 130));
        assert_eq!(state.mode, NavMode::RotatingLeft);
        assert_eq!(pose.heading_target, 0.0);

        let out = nav.step(&mut state, &mut pose, &input(&scan, 0.0, 130));
        assert_eq!(state.mode, NavMode::Moving);
        assert_eq!(out.turn, Some(Turn::None));
    }

    fn input(scan: &[ScanSample], heading: f64, right: u16) -> NavInput {
        NavInput {
            scan,
            heading,
            right,
        }
    }
}
