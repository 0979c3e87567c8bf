//! # Network Module
//!
//! The operator link is plain TCP. Every message is a JSON document followed by the
//! [`FRAME_END`] sentinel, so a reader splits the stream on the sentinel and parses each piece.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod client;
mod server;

pub use client::{PcClient, PcClientError};
pub use server::{PcServer, PcServerError};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Sentinel terminating every frame on the operator link.
pub const FRAME_END: &str = "__MSG_END__";

/// Largest partial frame a [`FrameBuffer`] holds before giving up on the peer.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters for the operator link.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Address the operator server binds to, e.g. `0.0.0.0:8000`.
    pub bind_address: String,

    /// Maximum number of simultaneously connected operators.
    pub max_clients: usize,

    /// Maximum length of a telecommand frame in bytes. Operators exceeding it are dropped.
    pub max_frame_len: usize,
}

/// Accumulates received bytes and splits them into frames.
#[derive(Debug)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    max_len: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("Could not serialise the message: {0}")]
    SerialiseError(serde_json::Error),

    #[error("Frame is not valid JSON or not a known message: {0}")]
    DeserialiseError(serde_json::Error),

    #[error("{0} bytes received without a frame end, the limit is {1}")]
    FrameTooLong(usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:8000"),
            max_clients: 30,
            max_frame_len: 64 * 1024,
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::with_max_len(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_len,
        }
    }

    /// Append received bytes and return every complete frame, without the sentinel.
    ///
    /// A trailing partial frame stays buffered until the rest of it arrives. If it grows past
    /// the maximum frame length it is discarded and an error returned.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, FrameError> {
        self.pending.extend_from_slice(bytes);

        let sentinel = FRAME_END.as_bytes();
        let mut frames = Vec::new();
        let mut start = 0;

        while let Some(pos) = find(&self.pending[start..], sentinel) {
            let frame = &self.pending[start..start + pos];
            frames.push(String::from_utf8_lossy(frame).into_owned());
            start += pos + sentinel.len();
        }

        self.pending.drain(..start);

        if self.pending.len() > self.max_len {
            let len = self.pending.len();
            self.pending.clear();
            return Err(FrameError::FrameTooLong(len, self.max_len));
        }

        Ok(frames)
    }

    /// Number of bytes waiting for the end of their frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Serialise a message into a frame ready to be written to the link.
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>, FrameError> {
    let mut bytes = serde_json::to_vec(msg).map_err(FrameError::SerialiseError)?;
    bytes.extend_from_slice(FRAME_END.as_bytes());
    Ok(bytes)
}

/// Parse a frame into a message.
pub fn decode_frame<T: DeserializeOwned>(frame: &str) -> Result<T, FrameError> {
    serde_json::from_str(frame).map_err(FrameError::DeserialiseError)
}

/// Parse every frame, logging and skipping the ones that can't be parsed.
pub(crate) fn decode_frames<T: DeserializeOwned>(frames: Vec<String>, source: &str) -> Vec<T> {
    frames
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .filter_map(|f| match decode_frame(&f) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Ignoring frame from {}: {}", source, e);
                None
            }
        })
        .collect()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
