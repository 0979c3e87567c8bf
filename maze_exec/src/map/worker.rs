//! Worker thread applying scans to the grid without blocking the control cycle.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::{
    sync::{
        mpsc::{channel, sync_channel, Receiver, Sender, SyncSender, TrySendError},
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::eqpt::rplidar::ScanSample;
use log::{debug, info, warn};

use super::{ray_cast_scan, GridError, OccupancyGrid, RayOrigin, TileChange};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A revolution to cast, with the pose it was taken from.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub origin: RayOrigin,
    pub scan: Vec<ScanSample>,
}

/// Owns the thread that writes to the occupancy grid.
///
/// Jobs are queued on a bounded channel. When the queue is full new jobs are dropped, so the
/// control cycle never waits for the map.
#[derive(Debug)]
pub struct GridWorker {
    grid: Arc<OccupancyGrid>,
    sender: SyncSender<WorkerSignal>,
    change_receiver: Receiver<TileChange>,
    worker_jh: Option<JoinHandle<Result<(), GridWorkerError>>>,
    num_dropped: u64,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum WorkerSignal {
    /// Cast a new revolution
    Scan(Box<ScanJob>),

    /// Stop once the queued work is done
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum GridWorkerError {
    #[error("Could not start the grid worker thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The grid worker thread has stopped")]
    WorkerStopped,

    #[error("The grid worker thread panicked")]
    WorkerPanicked,

    #[error("Grid error: {0}")]
    GridError(#[from] GridError),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl GridWorker {
    /// Start the worker with room for `queue_depth` pending scans.
    pub fn new(grid: Arc<OccupancyGrid>, queue_depth: usize) -> Result<Self, GridWorkerError> {
        let (sender, receiver) = sync_channel(queue_depth);
        let (change_sender, change_receiver) = channel();

        let worker_grid = grid.clone();
        let worker_jh = thread::Builder::new()
            .name("map::worker".into())
            .spawn(move || worker_thread(worker_grid, receiver, change_sender))
            .map_err(GridWorkerError::SpawnError)?;

        Ok(Self {
            grid,
            sender,
            change_receiver,
            worker_jh: Some(worker_jh),
            num_dropped: 0,
        })
    }

    /// The grid the worker writes to.
    pub fn grid(&self) -> &Arc<OccupancyGrid> {
        &self.grid
    }

    /// Queue a scan. Returns `Ok(false)` if the queue was full and the scan was dropped.
    pub fn submit(&mut self, job: ScanJob) -> Result<bool, GridWorkerError> {
        match self.sender.try_send(WorkerSignal::Scan(Box::new(job))) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                self.num_dropped += 1;
                warn!(
                    "Grid worker is behind, dropping scan ({} dropped so far)",
                    self.num_dropped
                );
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(GridWorkerError::WorkerStopped),
        }
    }

    /// Take every classification change committed since the last call.
    pub fn drain_changes(&self) -> Vec<TileChange> {
        self.change_receiver.try_iter().collect()
    }

    /// Number of scans dropped because the queue was full.
    pub fn num_dropped(&self) -> u64 {
        self.num_dropped
    }

    /// Stop the worker after it has finished the queued scans, and wait for it.
    pub fn stop(&mut self) -> Result<(), GridWorkerError> {
        let jh = match self.worker_jh.take() {
            Some(jh) => jh,
            None => return Ok(()),
        };

        // A stopped worker has dropped its receiver, its result is collected by the join
        self.sender.send(WorkerSignal::Stop).ok();

        match jh.join() {
            Ok(r) => r,
            Err(_) => Err(GridWorkerError::WorkerPanicked),
        }
    }
}

impl Drop for GridWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Grid worker stopped with an error: {}", e);
        }
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn worker_thread(
    grid: Arc<OccupancyGrid>,
    receiver: Receiver<WorkerSignal>,
    change_sender: Sender<TileChange>,
) -> Result<(), GridWorkerError> {
    info!("Grid worker started");

    while let Ok(signal) = receiver.recv() {
        match signal {
            WorkerSignal::Stop => break,
            WorkerSignal::Scan(job) => {
                let changes = ray_cast_scan(&grid, &job.origin, &job.scan)?;

                if !changes.is_empty() {
                    debug!("{} tiles changed classification", changes.len());
                }

                for change in changes {
                    // The owner may already be gone during shutdown
                    change_sender.send(change).ok();
                }
            }
        }
    }

    info!("Grid worker stopped");

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        map::{MAP_ORIGIN, MAP_SIZE},
        nav::Pose,
    };
    use comms_if::tm::Tile;

    fn job() -> ScanJob {
        ScanJob {
            origin: RayOrigin::new(&Pose::default(), 0.0),
            scan: vec![ScanSample {
                distance: 1000,
                bearing: 0.0,
                quality: 15,
            }],
        }
    }

    #[test]
    fn test_worker_applies_scans() {
        let grid = Arc::new(OccupancyGrid::default());
        let mut worker = GridWorker::new(grid.clone(), 16).unwrap();

        let mut accepted = 0;
        for _ in 0..10 {
            if worker.submit(job()).unwrap() {
                accepted += 1;
            }
        }
        worker.stop().unwrap();

        let wall = grid.cell(MAP_ORIGIN, MAP_ORIGIN + 3).unwrap();
        assert_eq!(wall.wall_votes, accepted);
        assert_eq!(accepted as u64 + worker.num_dropped(), 10);

        if accepted == 10 {
            assert_eq!(wall.class, Tile::Wall);
            let changes = worker.drain_changes();
            assert_eq!(changes.len(), 4);
        }
    }

    #[test]
    fn test_full_queue_drops() {
        let grid = Arc::new(OccupancyGrid::new(MAP_SIZE, 10));
        let mut worker = GridWorker::new(grid, 1).unwrap();

        // With a queue of one some of a burst must be dropped or all were consumed in time,
        // either way nothing blocks and every scan is accounted for
        let accepted = (0..200).filter(|_| worker.submit(job()).unwrap()).count();
        assert_eq!(accepted as u64 + worker.num_dropped(), 200);

        worker.stop().unwrap();
        assert!(worker.submit(job()).is_err());
    }
}
