//! Operator link server

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    io::{ErrorKind, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
};

use super::{decode_frames, encode_frame, FrameBuffer, FrameError, NetParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Non-blocking TCP server broadcasting telemetry to every operator and collecting their
/// telecommands.
///
/// The server never spawns threads, it is polled once per cycle by its owner.
pub struct PcServer {
    listener: TcpListener,
    max_clients: usize,
    max_frame_len: usize,
    clients: Vec<Client>,
}

struct Client {
    stream: TcpStream,
    addr: SocketAddr,
    frames: FrameBuffer,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum PcServerError {
    #[error("Could not bind the operator server to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Could not configure the operator server socket: {0}")]
    SocketError(std::io::Error),

    #[error("Could not encode the frame: {0}")]
    FrameError(FrameError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PcServer {
    /// Bind a new server.
    pub fn new(params: &NetParams) -> Result<Self, PcServerError> {
        let listener = TcpListener::bind(&params.bind_address)
            .map_err(|e| PcServerError::BindError(params.bind_address.clone(), e))?;
        listener
            .set_nonblocking(true)
            .map_err(PcServerError::SocketError)?;

        info!("Operator server listening on {}", params.bind_address);

        Ok(Self {
            listener,
            max_clients: params.max_clients,
            max_frame_len: params.max_frame_len,
            clients: Vec::new(),
        })
    }

    /// Address the server is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, PcServerError> {
        self.listener.local_addr().map_err(PcServerError::SocketError)
    }

    /// Number of connected operators.
    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    /// Accept pending connections, then read and parse every complete frame from every client.
    ///
    /// Clients which disconnected, failed to read or sent an oversized frame are dropped.
    pub fn poll<T: DeserializeOwned>(&mut self) -> Vec<T> {
        self.accept_pending();

        let mut msgs = Vec::new();
        let mut buf = [0u8; 1024];

        self.clients.retain_mut(|client| loop {
            match client.stream.read(&mut buf) {
                Ok(0) => {
                    info!("Operator {} disconnected", client.addr);
                    return false;
                }
                Ok(n) => match client.frames.push(&buf[..n]) {
                    Ok(frames) => msgs.extend(decode_frames(frames, &client.addr.to_string())),
                    Err(e) => {
                        warn!("Dropping operator {}: {}", client.addr, e);
                        return false;
                    }
                },
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return true,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Dropping operator {}, read failed: {}", client.addr, e);
                    return false;
                }
            }
        });

        msgs
    }

    /// Send a message to every client, dropping those which can't be written to.
    pub fn broadcast<T: Serialize>(&mut self, msg: &T) -> Result<(), PcServerError> {
        if self.clients.is_empty() {
            return Ok(());
        }

        let frame = encode_frame(msg).map_err(PcServerError::FrameError)?;

        self.clients.retain_mut(|client| match client.stream.write_all(&frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping operator {}, write failed: {}", client.addr, e);
                false
            }
        });

        Ok(())
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.clients.len() >= self.max_clients {
                        warn!(
                            "Refusing operator {}, already serving {} clients",
                            addr, self.max_clients
                        );
                        continue;
                    }

                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("Could not make operator {} non-blocking: {}", addr, e);
                        continue;
                    }

                    info!("Operator {} connected", addr);
                    self.clients.push(Client {
                        stream,
                        addr,
                        frames: FrameBuffer::with_max_len(self.max_frame_len),
                    });
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Error accepting operator connection: {}", e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        net::FRAME_END,
        tc::{DriveCommand, Tc},
        tm::Tm,
    };
    use std::{
        thread,
        time::{Duration, Instant},
    };

    fn local_server(max_clients: usize) -> PcServer {
        PcServer::new(&NetParams {
            bind_address: String::from("127.0.0.1:0"),
            max_clients,
            max_frame_len: 256,
        })
        .unwrap()
    }

    /// Poll the server until it has at least `n` clients or a second has passed.
    fn wait_clients(server: &mut PcServer, n: usize) {
        let start = Instant::now();
        while server.num_clients() < n && start.elapsed() < Duration::from_secs(1) {
            let _: Vec<Tc> = server.poll();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_receive_and_broadcast() {
        let mut server = local_server(30);
        let addr = server.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        wait_clients(&mut server, 1);
        assert_eq!(server.num_clients(), 1);

        client
            .write_all(b"{\"id\":\"command\",\"type\":6}__MSG_END__{\"id\":\"bogus\"}__MSG_END__")
            .unwrap();

        let mut tcs: Vec<Tc> = Vec::new();
        let start = Instant::now();
        while tcs.is_empty() && start.elapsed() < Duration::from_secs(1) {
            tcs = server.poll();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(
            tcs,
            vec![Tc::Command {
                cmd: DriveCommand::Halt
            }]
        );

        server.broadcast(&Tm::message("hello")).unwrap();

        let mut buf = vec![0u8; 256];
        client
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let n = client.read(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.ends_with(FRAME_END));
        assert!(text.contains("\"hello\""));
    }

    #[test]
    fn test_max_clients() {
        let mut server = local_server(1);
        let addr = server.local_addr().unwrap();

        let _a = TcpStream::connect(addr).unwrap();
        wait_clients(&mut server, 1);
        let _b = TcpStream::connect(addr).unwrap();
        wait_clients(&mut server, 2);

        assert_eq!(server.num_clients(), 1);
    }

    #[test]
    fn test_drop_client_without_frame_end() {
        let mut server = local_server(30);
        let addr = server.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        wait_clients(&mut server, 1);
        assert_eq!(server.num_clients(), 1);

        client.write_all(&[b'x'; 1024]).unwrap();

        let start = Instant::now();
        while server.num_clients() > 0 && start.elapsed() < Duration::from_secs(1) {
            let tcs: Vec<Tc> = server.poll();
            assert!(tcs.is_empty());
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(server.num_clients(), 0);
    }
}
