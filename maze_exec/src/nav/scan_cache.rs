//! Rangefinder scan cache

use comms_if::eqpt::rplidar::ScanSample;

/// Holds the most recent full rangefinder revolution.
#[derive(Debug, Default)]
pub struct ScanCache {
    scan: Vec<ScanSample>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer this cycle's revolution to the cache.
    ///
    /// A non-empty revolution replaces the cached one and is reported as fresh. An empty one
    /// leaves the cache unchanged and the previous revolution is returned instead.
    pub fn ingest(&mut self, new_scan: Vec<ScanSample>) -> (&[ScanSample], bool) {
        let is_fresh = !new_scan.is_empty();

        if is_fresh {
            self.scan = new_scan;
        }

        (&self.scan, is_fresh)
    }

    /// True once at least one revolution has been received.
    pub fn has_scan(&self) -> bool {
        !self.scan.is_empty()
    }

    pub fn scan(&self) -> &[ScanSample] {
        &self.scan
    }
}
