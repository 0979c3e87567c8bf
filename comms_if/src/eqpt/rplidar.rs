//! # Rangefinder protocol
//!
//! Codec for the RPLIDAR standard scan mode. The host sends a scan request, the device answers
//! with a response descriptor and then streams five byte measurement nodes until it is told to
//! stop. Nodes are grouped into revolutions using the start flag carried by the first node of
//! every revolution.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Start a standard scan.
pub const REQ_SCAN: [u8; 2] = [0xA5, 0x20];

/// Stop scanning.
pub const REQ_STOP: [u8; 2] = [0xA5, 0x25];

/// Soft reset the core.
pub const REQ_RESET: [u8; 2] = [0xA5, 0x40];

/// Response descriptor preceding the node stream of a standard scan.
pub const SCAN_DESCRIPTOR: [u8; 7] = [0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81];

/// Size of one measurement node.
pub const NODE_LEN: usize = 5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One rangefinder sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSample {
    /// Distance to the hit in millimeters, `0` if the device got no return.
    #[serde(rename = "dist")]
    pub distance: u32,

    /// Bearing of the sample relative to the device zero, degrees in `[0, 360)`.
    #[serde(rename = "angle")]
    pub bearing: f64,

    pub quality: u8,
}

/// Incremental decoder turning the byte stream into full revolutions.
#[derive(Debug, Default)]
pub struct ScanDecoder {
    descriptor_matched: usize,
    buffer: Vec<u8>,
    revolution: Vec<ScanSample>,
    num_resyncs: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ScanDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any partial descriptor, node or revolution, used after a new scan request.
    pub fn reset(&mut self) {
        self.descriptor_matched = 0;
        self.buffer.clear();
        self.revolution.clear();
    }

    /// Number of bytes dropped to regain node alignment since creation.
    pub fn num_resyncs(&self) -> u64 {
        self.num_resyncs
    }

    /// Push received bytes, returning every revolution completed by them.
    ///
    /// Revolutions are sorted by ascending bearing.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<ScanSample>> {
        let mut revolutions = Vec::new();
        let mut rest = bytes;

        // Consume the response descriptor first
        while self.descriptor_matched < SCAN_DESCRIPTOR.len() {
            let (&b, tail) = match rest.split_first() {
                Some(s) => s,
                None => return revolutions,
            };
            rest = tail;

            if b == SCAN_DESCRIPTOR[self.descriptor_matched] {
                self.descriptor_matched += 1;
            } else if b == SCAN_DESCRIPTOR[0] {
                self.descriptor_matched = 1;
            } else {
                self.descriptor_matched = 0;
            }

            if self.descriptor_matched == SCAN_DESCRIPTOR.len() {
                debug!("Rangefinder scan descriptor received");
            }
        }

        self.buffer.extend_from_slice(rest);

        let mut start = 0;
        while self.buffer.len() - start >= NODE_LEN {
            let node = &self.buffer[start..start + NODE_LEN];

            match parse_node(node) {
                Some((sample, is_start)) => {
                    if is_start && !self.revolution.is_empty() {
                        let mut rev = std::mem::take(&mut self.revolution);
                        rev.sort_by(|a, b| {
                            a.bearing.partial_cmp(&b.bearing).unwrap_or(Ordering::Equal)
                        });
                        revolutions.push(rev);
                    }
                    self.revolution.push(sample);
                    start += NODE_LEN;
                }
                None => {
                    trace!("Invalid rangefinder node, resyncing");
                    self.num_resyncs += 1;
                    start += 1;
                }
            }
        }
        self.buffer.drain(..start);

        revolutions
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a single node, returning the sample and whether it starts a new revolution.
///
/// Returns `None` if the start flag and its inverse agree or if the check bit is clear.
pub fn parse_node(node: &[u8]) -> Option<(ScanSample, bool)> {
    if node.len() < NODE_LEN {
        return None;
    }

    let start = node[0] & 0x01 == 1;
    let inv_start = (node[0] >> 1) & 0x01 == 1;
    let check = node[1] & 0x01 == 1;

    if start == inv_start || !check {
        return None;
    }

    let angle_q6 = ((node[2] as u16) << 7) | (node[1] as u16 >> 1);
    let distance_q2 = LittleEndian::read_u16(&node[3..5]);

    Some((
        ScanSample {
            distance: distance_q2 as u32 / 4,
            bearing: angle_q6 as f64 / 64.0,
            quality: node[0] >> 2,
        },
        start,
    ))
}

/// Encode a node, the inverse of `parse_node`. Used by test doubles of the device.
pub fn encode_node(sample: &ScanSample, is_start: bool) -> [u8; NODE_LEN] {
    let angle_q6 = (sample.bearing * 64.0).round() as u16;
    let distance_q2 = (sample.distance * 4).min(u16::MAX as u32) as u16;

    let flags = if is_start { 0b01 } else { 0b10 };
    let mut dist = [0u8; 2];
    LittleEndian::write_u16(&mut dist, distance_q2);

    [
        (sample.quality << 2) | flags,
        (((angle_q6 & 0x7F) as u8) << 1) | 0x01,
        (angle_q6 >> 7) as u8,
        dist[0],
        dist[1],
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(distance: u32, bearing: f64) -> ScanSample {
        ScanSample {
            distance,
            bearing,
            quality: 15,
        }
    }

    #[test]
    fn test_parse_node() {
        // quality 15, start, angle 90 deg (q6 5760), distance 1000 mm (q2 4000)
        let node = [0x3D, 0x01, 0x2D, 0xA0, 0x0F];

        let (s, is_start) = parse_node(&node).unwrap();
        assert!(is_start);
        assert_eq!(s, sample(1000, 90.0));

        assert_eq!(encode_node(&s, true), node);

        // Start and inverse start both set
        assert!(parse_node(&[0x3F, 0x01, 0x2D, 0xA0, 0x0F]).is_none());
        // Check bit clear
        assert!(parse_node(&[0x3D, 0x00, 0x2D, 0xA0, 0x0F]).is_none());
    }

    #[test]
    fn test_revolutions() {
        let mut dec = ScanDecoder::new();

        let mut bytes = SCAN_DESCRIPTOR.to_vec();
        bytes.extend_from_slice(&encode_node(&sample(500, 350.0), true));
        bytes.extend_from_slice(&encode_node(&sample(600, 10.0), false));
        bytes.extend_from_slice(&encode_node(&sample(700, 180.0), false));

        // No revolution until the next start flag
        assert!(dec.push(&bytes).is_empty());

        // Split the next start node across two pushes
        let next = encode_node(&sample(800, 0.5), true);
        assert!(dec.push(&next[..2]).is_empty());
        let revs = dec.push(&next[2..]);

        assert_eq!(revs.len(), 1);
        let bearings: Vec<f64> = revs[0].iter().map(|s| s.bearing).collect();
        assert_eq!(bearings, vec![10.0, 180.0, 350.0]);
    }

    #[test]
    fn test_resync() {
        let mut dec = ScanDecoder::new();

        let mut bytes = SCAN_DESCRIPTOR.to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(&encode_node(&sample(500, 20.0), true));
        bytes.extend_from_slice(&encode_node(&sample(500, 40.0), true));

        let revs = dec.push(&bytes);

        assert_eq!(revs, vec![vec![sample(500, 20.0)]]);
        assert!(dec.num_resyncs() >= 1);
    }
}
