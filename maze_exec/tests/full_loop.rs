//! Drives the whole executive with in-memory equipment and a real operator connection.

use std::{
    sync::atomic::AtomicBool,
    thread,
    time::{Duration, Instant},
};

use comms_if::{
    eqpt::{
        drive, rplidar::{encode_node, ScanSample, REQ_SCAN, REQ_STOP, SCAN_DESCRIPTOR},
        sensor,
    },
    net::{NetParams, PcClient},
    tc::{DriveCommand, Tc},
    tm::Tm,
};
use maze_lib::{
    data_store::RobotMode,
    eqpt::{identify, mock::MockLink},
    exec::{CycleStatus, MazeExec},
    loco_ctrl::LocoCtrl,
    nav::{Facing, NavCtrlParams, NavMode},
    params::MazeExecParams,
};

// ------------------------------------------------------------------------------------------------
// HELPERS
// ------------------------------------------------------------------------------------------------

struct Rig {
    exec: MazeExec<MockLink>,
    sensor: MockLink,
    drive: MockLink,
    lidar: MockLink,
}

fn rig() -> Rig {
    let links = vec![
        MockLink::new("/dev/ttyUSB0"),
        MockLink::new("/dev/ttyUSB1"),
        MockLink::new("/dev/ttyUSB2"),
    ];
    links[0].push_rx(&[sensor::MODULE_ID]);
    links[2].push_rx(&[drive::MODULE_ID]);

    let (sensor, lidar, drive) = (links[0].clone(), links[1].clone(), links[2].clone());

    let quit = AtomicBool::new(false);
    let identified = identify(links, Duration::from_millis(1), &quit).unwrap();

    let params = MazeExecParams {
        net: NetParams {
            bind_address: String::from("127.0.0.1:0"),
            max_clients: 2,
            ..Default::default()
        },
        mode_switch_settle_s: 0.0,
        ..Default::default()
    };

    let exec = MazeExec::new(
        params,
        NavCtrlParams::default(),
        LocoCtrl::default(),
        identified,
    )
    .unwrap();

    Rig {
        exec,
        sensor,
        drive,
        lidar,
    }
}

fn measurement(heading_raw: i16, right: u16, left: u16) -> Vec<u8> {
    let mut bytes = vec![sensor::MSG_MEASUREMENT];
    bytes.extend_from_slice(&heading_raw.to_be_bytes());
    bytes.extend_from_slice(&right.to_be_bytes());
    bytes.extend_from_slice(&left.to_be_bytes());
    bytes
}

/// A corridor revolution with `front` mm ahead.
fn revolution(front: u32) -> Vec<u8> {
    [(0.5, front), (90.0, 130), (180.0, 1000), (270.0, 300)]
        .iter()
        .enumerate()
        .flat_map(|(i, &(bearing, distance))| {
            let sample = ScanSample {
                distance,
                bearing,
                quality: 15,
            };
            encode_node(&sample, i == 0).to_vec()
        })
        .collect()
}

/// Last drive frame written, or `None` if nothing was written.
fn last_drive_frame(link: &MockLink) -> Option<Vec<u8>> {
    let tx = link.take_tx();
    if tx.len() < 6 {
        return None;
    }
    Some(tx[tx.len() - 6..].to_vec())
}

/// Poll the client until a message matching `pred` arrives or a second passes.
fn wait_for_tm(client: &mut PcClient, pred: impl Fn(&Tm) -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(1) {
        if client.poll::<Tm>().unwrap().iter().any(|tm| pred(tm)) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[test]
fn test_startup() {
    let rig = rig();

    assert_eq!(rig.drive.take_tx(), vec![drive::IDENTIFIED]);
    assert_eq!(rig.sensor.take_tx(), vec![sensor::IDENTIFIED]);
    assert_eq!(rig.lidar.take_tx(), REQ_SCAN.to_vec());
    assert!(rig.lidar.motor_on());

    let ds = rig.exec.data_store();
    assert_eq!(ds.mode, RobotMode::Autonomous);
    assert!(!ds.auto_ready);
}

#[test]
fn test_autonomous_run() {
    let mut rig = rig();
    rig.drive.take_tx();

    // Nothing from the equipment yet, autonomy keeps waiting
    assert_eq!(rig.exec.cycle().unwrap(), CycleStatus::Running);
    assert!(!rig.exec.data_store().auto_ready);

    // A revolution completes when the next one starts, so each push completes the previous one
    rig.sensor.push_rx(&measurement(10, 130, 300));
    let mut bytes = SCAN_DESCRIPTOR.to_vec();
    bytes.extend(revolution(2000));
    bytes.extend(revolution(2000));
    rig.lidar.push_rx(&bytes);

    rig.exec.cycle().unwrap();
    let ds = rig.exec.data_store();
    assert!(ds.auto_ready);
    assert_eq!(ds.sensor.map(|m| m.heading), Some(0.0));

    // Regulated driving along the corridor
    rig.lidar.push_rx(&revolution(1950));
    rig.exec.cycle().unwrap();
    assert_eq!(last_drive_frame(&rig.drive), Some(vec![0x01, 123, 123, 0x02, 1, 1]));

    rig.lidar.push_rx(&revolution(1900));
    rig.exec.cycle().unwrap();
    assert_eq!(rig.exec.data_store().pose.y, 50);

    rig.lidar.push_rx(&revolution(200));
    rig.exec.cycle().unwrap();
    assert_eq!(rig.exec.data_store().pose.y, 100);

    // Wall ahead, turn left
    rig.lidar.push_rx(&revolution(200));
    rig.exec.cycle().unwrap();
    let ds = rig.exec.data_store();
    assert_eq!(ds.nav_state.mode, NavMode::RotatingLeft);
    assert_eq!(ds.pose.facing, Facing::West);
    assert_eq!(ds.pose.y, 0);
    assert_eq!(last_drive_frame(&rig.drive), Some(vec![0x01, 123, 123, 0x02, 0, 1]));

    // Part way round, the rotation slows down
    rig.sensor.push_rx(&measurement(70, 130, 300));
    rig.exec.cycle().unwrap();
    assert_eq!(last_drive_frame(&rig.drive), Some(vec![0x01, 115, 115, 0x02, 0, 1]));

    // Turn complete, drive on
    rig.sensor.push_rx(&measurement(100, 130, 300));
    rig.exec.cycle().unwrap();
    assert_eq!(rig.exec.data_store().nav_state.mode, NavMode::Moving);
    assert_eq!(last_drive_frame(&rig.drive), Some(vec![0x01, 115, 115, 0x02, 1, 1]));

    let snapshot = rig.exec.shutdown().unwrap();
    assert!(serde_json::to_string(&snapshot).is_ok());
    assert!(!rig.lidar.motor_on());
    assert!(rig.lidar.take_tx().ends_with(&REQ_STOP));
    assert_eq!(last_drive_frame(&rig.drive), Some(vec![0x01, 0, 0, 0x02, 1, 1]));
}

#[test]
fn test_manual_mode_over_operator_link() {
    let mut rig = rig();
    rig.drive.take_tx();

    let addr = rig.exec.tm_server().local_addr().unwrap();
    let mut client = PcClient::connect(&addr.to_string()).unwrap();

    // Accept the operator
    let start = Instant::now();
    while rig.exec.tm_server().num_clients() == 0 && start.elapsed() < Duration::from_secs(1) {
        rig.exec.cycle().unwrap();
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(rig.exec.tm_server().num_clients(), 1);

    // Manual commands are ignored while autonomous
    client
        .send(&Tc::Command {
            cmd: DriveCommand::Forward,
        })
        .unwrap();
    thread::sleep(Duration::from_millis(20));
    rig.exec.cycle().unwrap();
    assert_eq!(last_drive_frame(&rig.drive), None);

    // Mode button
    rig.sensor.push_rx(&[sensor::MSG_MODE_BUTTON]);
    rig.exec.cycle().unwrap();
    assert_eq!(rig.exec.data_store().mode, RobotMode::Manual);
    assert_eq!(last_drive_frame(&rig.drive), Some(vec![0x01, 0, 0, 0x02, 1, 1]));
    assert!(wait_for_tm(&mut client, |tm| matches!(
        tm,
        Tm::Message { text } if text == "Mode: Manual"
    )));

    client
        .send(&Tc::Command {
            cmd: DriveCommand::Forward,
        })
        .unwrap();

    let start = Instant::now();
    let mut frame = None;
    while frame.is_none() && start.elapsed() < Duration::from_secs(1) {
        thread::sleep(Duration::from_millis(5));
        rig.exec.cycle().unwrap();
        frame = last_drive_frame(&rig.drive);
    }
    assert_eq!(frame, Some(vec![0x01, 177, 177, 0x02, 1, 1]));
    assert!(wait_for_tm(&mut client, |tm| matches!(tm, Tm::Steering(s) if s.left_speed == 0.5)));

    rig.exec.shutdown().unwrap();
}
