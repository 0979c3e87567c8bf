//! # Remote control console
//!
//! Line based console connecting to the vehicle's operator link. Sends manual drive commands and
//! regulator gains, prints messages from the vehicle and keeps count of the other telemetry.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::StructOpt;

use comms_if::{
    net::{PcClient, PcClientError},
    tc::{DriveCommand, Tc},
    tm::Tm,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "maze $ ";
const HISTORY_PATH: &str = ".remote_ctrl_history";

/// Period at which telemetry is read from the vehicle.
const TM_POLL_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "remote_ctrl", about = "Operator console for the maze vehicle")]
struct Opt {
    /// Address of the vehicle's operator link
    #[structopt(short, long, default_value = "127.0.0.1:8000")]
    address: String,
}

/// Telemetry received so far.
#[derive(Debug, Default)]
struct TmSummary {
    counts: BTreeMap<&'static str, u64>,
    last_robot: Option<(f64, f64, f64)>,
    last_sensor: Option<(u16, u16, f64)>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// A console command.
#[derive(Debug, StructOpt)]
enum Cmd {
    #[structopt(flatten)]
    Drive(DriveCommand),

    /// Set the drive regulator gains
    #[structopt(name = "cal")]
    Calibration { kp: f32, kd: f32 },

    /// Summarise the telemetry received so far
    #[structopt(name = "status")]
    Status,

    /// Leave the console
    #[structopt(name = "quit")]
    Quit,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    let opt = Opt::from_args();

    let client = PcClient::connect(&opt.address).wrap_err("Could not connect to the vehicle")?;
    println!("Connected to {}", opt.address);

    let client = Arc::new(Mutex::new(client));
    let summary = Arc::new(Mutex::new(TmSummary::default()));
    let stop = Arc::new(AtomicBool::new(false));

    let tm_jh = {
        let client = client.clone();
        let summary = summary.clone();
        let stop = stop.clone();
        thread::Builder::new()
            .name("tm_reader".into())
            .spawn(move || tm_reader(client, summary, stop))
            .wrap_err("Could not start the telemetry thread")?
    };

    let mut rl = DefaultEditor::new().wrap_err("Could not start the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        if stop.load(Ordering::Relaxed) {
            println!("Connection to the vehicle lost");
            break;
        }

        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).wrap_err("Could not read the command line"),
        };

        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str()).ok();

        let args = std::iter::once("maze").chain(line.split_whitespace());
        let cmd = match Cmd::from_iter_safe(args) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e.message);
                continue;
            }
        };

        let tc = match cmd {
            Cmd::Drive(cmd) => Tc::Command { cmd },
            Cmd::Calibration { kp, kd } => Tc::Calibration { kp, kd },
            Cmd::Status => {
                print_status(&summary);
                continue;
            }
            Cmd::Quit => break,
        };

        let mut client = client
            .lock()
            .map_err(|_| eyre!("The telemetry thread panicked"))?;
        client.send(&tc).wrap_err("Could not send the command")?;
    }

    stop.store(true, Ordering::Relaxed);
    if tm_jh.join().is_err() {
        println!("The telemetry thread panicked");
    }

    rl.save_history(HISTORY_PATH).ok();
    println!("Exiting...");

    Ok(())
}

/// Read telemetry until `stop` is set or the connection is lost.
fn tm_reader(client: Arc<Mutex<PcClient>>, summary: Arc<Mutex<TmSummary>>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        let tms = match client.lock() {
            Ok(mut c) => c.poll::<Tm>(),
            Err(_) => break,
        };

        match tms {
            Ok(tms) => {
                if let Ok(mut s) = summary.lock() {
                    for tm in tms {
                        s.record(tm);
                    }
                }
            }
            Err(PcClientError::Disconnected) => {
                stop.store(true, Ordering::Relaxed);
                break;
            }
            Err(e) => println!("Telemetry error: {}", e),
        }

        thread::sleep(TM_POLL_PERIOD);
    }
}

fn print_status(summary: &Arc<Mutex<TmSummary>>) {
    let s = match summary.lock() {
        Ok(s) => s,
        Err(_) => return,
    };

    if let Some((x, y, r)) = s.last_robot {
        println!("Robot at ({:.2}, {:.2}) tiles, heading {:.1} deg", x, y, r.to_degrees());
    }
    if let Some((left, right, rot)) = s.last_sensor {
        println!("Sensor left {} mm, right {} mm, rot {:.1} deg", left, right, rot);
    }
    for (kind, count) in s.counts.iter() {
        println!("{:>8}: {}", kind, count);
    }
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl TmSummary {
    fn record(&mut self, tm: Tm) {
        let kind = match tm {
            Tm::Message { text } => {
                println!("[vehicle] {}", text);
                "message"
            }
            Tm::Robot { x, y, r } => {
                self.last_robot = Some((x, y, r));
                "robot"
            }
            Tm::Sensor { left, right, rot } => {
                self.last_sensor = Some((left, right, rot));
                "sensor"
            }
            Tm::Map { .. } => "map",
            Tm::Rplidar { .. } => "rplidar",
            Tm::Steering(_) => "steering",
            Tm::TileUpdate { .. } => "tile",
            Tm::Point { .. } => "point",
        };

        *self.counts.entry(kind).or_insert(0) += 1;
    }
}
