//! Main maze vehicle executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Identify which serial port each piece of equipment is attached to
//!     - Initialise all modules
//!     - Main loop, see `maze_lib::exec`
//!     - Stop the vehicle and save the final map
//!
//! # Modules
//!
//! Cyclic modules (e.g. `loco_ctrl`) provide a public struct implementing the `util::module::State`
//! trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{error, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

// Internal
use maze_lib::{
    eqpt::{self, Identified, Link, SerialLink},
    exec::{CycleStatus, MazeExec},
    loco_ctrl::LocoCtrl,
    nav::NavCtrlParams,
    params::MazeExecParams,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("maze_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Maze Vehicle Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // Stop cleanly on SIGINT or SIGTERM
    let quit = Arc::new(AtomicBool::new(false));
    let q = Arc::clone(&quit);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        q.store(true, Ordering::Relaxed);
    })
    .wrap_err("Failed to set the shutdown signal handler")?;

    // ---- LOAD PARAMETERS ----

    let exec_params: MazeExecParams =
        util::params::load("maze_exec.toml").wrap_err("Could not load exec params")?;
    let nav_params: NavCtrlParams =
        util::params::load("nav_ctrl.toml").wrap_err("Could not load nav params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut loco_ctrl = LocoCtrl::default();
    loco_ctrl
        .init("loco_ctrl.toml", &session)
        .wrap_err("Failed to initialise LocoCtrl")?;
    info!("LocoCtrl init complete");

    // ---- IDENTIFY EQUIPMENT ----

    let links = exec_params
        .serial_ports
        .iter()
        .map(|path| SerialLink::open(path, exec_params.module_baud))
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("Failed to open the serial ports")?;

    let Identified {
        drive,
        sensor,
        rangefinder,
    } = eqpt::identify(
        links,
        Duration::from_secs_f64(exec_params.identify_poll_interval_s),
        &quit,
    )
    .wrap_err("Failed to identify the equipment")?;

    // The rangefinder runs at a different baud rate, reopen it
    let lidar_path = rangefinder.name().to_string();
    drop(rangefinder);
    let rangefinder = SerialLink::open(&lidar_path, exec_params.lidar_baud)
        .wrap_err("Failed to open the rangefinder")?;

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    let mut exec = MazeExec::new(
        exec_params,
        nav_params,
        loco_ctrl,
        Identified {
            drive,
            sensor,
            rangefinder,
        },
    )
    .wrap_err("Failed to initialise the executive")?;

    info!("Initialisation complete");

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut num_consec_cycle_overruns = 0u64;

    let loop_result = loop {
        if quit.load(Ordering::Relaxed) {
            info!("Stop requested");
            break Ok(());
        }

        let cycle_start_instant = Instant::now();

        match exec.cycle() {
            Ok(CycleStatus::Running) => (),
            Ok(CycleStatus::Complete) => break Ok(()),
            Err(e) => {
                error!("Error during cyclic processing: {}", e);
                break Err(e);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                num_consec_cycle_overruns += 1;
                warn!(
                    "Cycle overran by {:.06} s ({} consecutive)",
                    (cycle_dur - cycle_period).as_secs_f64(),
                    num_consec_cycle_overruns
                );
            }
        }
    };

    // ---- SHUTDOWN ----

    info!("Shutting down");

    let snapshot = exec.shutdown().wrap_err("Failed to shut down the executive")?;
    session.save("map/final_map.json", snapshot);
    session.exit();

    info!("End of execution");

    loop_result.wrap_err("The executive stopped on an error")
}
