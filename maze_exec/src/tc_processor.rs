//! # Telecommand processor module
//!
//! The telecommand processor handles the TCs coming from the operators.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use crate::data_store::{DataStore, RobotMode};
use comms_if::tc::Tc;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {
    match tc {
        Tc::Command { cmd } => {
            if ds.mode == RobotMode::Manual {
                debug!("Received manual command {:?}", cmd);
                ds.loco_ctrl_input.manual = Some(*cmd);
            } else {
                debug!("Ignoring manual command {:?} in autonomous mode", cmd);
            }
        }
        Tc::Calibration { kp, kd } => {
            debug!("Received calibration kp = {}, kd = {}", kp, kd);
            ds.loco_ctrl_input.calibration = Some((*kp, *kd));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::DriveCommand;

    #[test]
    fn test_manual_only_in_manual_mode() {
        let mut ds = DataStore::default();
        let tc = Tc::Command {
            cmd: DriveCommand::Forward,
        };

        exec(&mut ds, &tc);
        assert_eq!(ds.loco_ctrl_input.manual, None);

        ds.mode = RobotMode::Manual;
        exec(&mut ds, &tc);
        assert_eq!(ds.loco_ctrl_input.manual, Some(DriveCommand::Forward));
    }

    #[test]
    fn test_calibration_in_any_mode() {
        let mut ds = DataStore::default();
        exec(&mut ds, &Tc::Calibration { kp: 2.0, kd: 0.5 });
        assert_eq!(ds.loco_ctrl_input.calibration, Some((2.0, 0.5)));
    }
}
