//! Operator link client

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de::DeserializeOwned, Serialize};
use std::{
    io::{ErrorKind, Read, Write},
    net::TcpStream,
};

use super::{decode_frames, encode_frame, FrameBuffer, FrameError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Connection from an operator to the vehicle.
pub struct PcClient {
    stream: TcpStream,
    address: String,
    frames: FrameBuffer,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum PcClientError {
    #[error("Could not connect to {0}: {1}")]
    ConnectError(String, std::io::Error),

    #[error("The connection was closed by the vehicle")]
    Disconnected,

    #[error("Socket error: {0}")]
    SocketError(std::io::Error),

    #[error("Frame error: {0}")]
    FrameError(FrameError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PcClient {
    /// Connect to the vehicle at `address` (`host:port`).
    pub fn connect(address: &str) -> Result<Self, PcClientError> {
        let stream = TcpStream::connect(address)
            .map_err(|e| PcClientError::ConnectError(address.to_string(), e))?;
        stream
            .set_nonblocking(true)
            .map_err(PcClientError::SocketError)?;

        Ok(Self {
            stream,
            address: address.to_string(),
            frames: FrameBuffer::new(),
        })
    }

    /// Send one message.
    pub fn send<T: Serialize>(&mut self, msg: &T) -> Result<(), PcClientError> {
        let frame = encode_frame(msg).map_err(PcClientError::FrameError)?;

        // The socket is non-blocking for reads, block while writing the frame
        self.stream
            .set_nonblocking(false)
            .map_err(PcClientError::SocketError)?;
        let result = self.stream.write_all(&frame);
        self.stream
            .set_nonblocking(true)
            .map_err(PcClientError::SocketError)?;

        result.map_err(PcClientError::SocketError)
    }

    /// Read everything received so far and return the parsed messages.
    pub fn poll<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, PcClientError> {
        let mut msgs = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(PcClientError::Disconnected),
                Ok(n) => {
                    let frames = self.frames.push(&buf[..n]).map_err(PcClientError::FrameError)?;
                    msgs.extend(decode_frames(frames, &self.address));
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(PcClientError::SocketError(e)),
            }
        }

        Ok(msgs)
    }
}
