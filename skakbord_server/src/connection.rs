//! Connection records and the blocking helpers used during role negotiation.

use std::fmt::Display;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::TcpStream;
use thiserror::Error;

use crate::frame::{self, FrameError, FrameReader};

/// What a connection is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    White,
    Black,
    Spectator,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::White => "white",
            Role::Black => "black",
            Role::Spectator => "spectator",
        })
    }
}

/// One TCP peer: its socket, role, partially-read inbound frame and
/// partially-written outbound bytes. The socket is owned here and closed
/// exactly once, on drop.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    pub role: Role,
    reader: FrameReader,
    send_queue: Vec<u8>,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, role: Role) -> Self {
        Self {
            stream,
            peer,
            role,
            reader: FrameReader::new(),
            send_queue: Vec::new(),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Appends a framed message to the send queue. Nothing hits the socket
    /// until [`flush`](Self::flush) runs.
    pub fn queue(&mut self, payload: &str) {
        frame::enqueue(&mut self.send_queue, payload);
    }

    /// Writes as much queued output as the socket accepts.
    pub fn flush(&mut self) -> Result<(), FrameError> {
        frame::drain_into(&mut self.send_queue, &mut self.stream)
    }

    /// Keeps flushing until the queue empties or `deadline` passes. Used at
    /// shutdown, when there will be no more writable events.
    pub fn flush_until(&mut self, deadline: Instant) -> Result<(), FrameError> {
        loop {
            self.flush()?;
            if self.send_queue.is_empty() || Instant::now() >= deadline {
                return Ok(());
            }
            std::thread::sleep(NAP);
        }
    }

    pub fn queue_empty(&self) -> bool {
        self.send_queue.is_empty()
    }

    /// Attempts to complete the next inbound frame.
    pub fn read_frame(&mut self) -> Result<Option<String>, FrameError> {
        self.reader.read_from(&mut self.stream)
    }
}

/// How long the synchronous role negotiation may take.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(500);

const NAP: Duration = Duration::from_millis(2);

/// Failures during role negotiation; all of them abort the connection.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("timed out waiting for the client")]
    TimedOut,
    #[error("client answered with {0:?}, which is not an available role")]
    BadChoice(String),
    #[error(transparent)]
    Wire(#[from] FrameError),
}

/// Writes one frame to a non-blocking socket, spinning until it is fully
/// out or `deadline` passes. Only used on freshly accepted sockets during
/// negotiation, where the loop has nothing else to service.
pub fn write_frame_blocking(
    stream: &mut TcpStream,
    payload: &str,
    deadline: Instant,
) -> Result<(), HandshakeError> {
    let mut queue = Vec::new();
    frame::enqueue(&mut queue, payload);

    loop {
        frame::drain_into(&mut queue, stream)?;
        if queue.is_empty() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(HandshakeError::TimedOut);
        }
        std::thread::sleep(NAP);
    }
}

/// Reads one frame from a non-blocking socket, spinning until it arrives or
/// `deadline` passes.
pub fn read_frame_blocking(
    stream: &mut TcpStream,
    deadline: Instant,
) -> Result<String, HandshakeError> {
    let mut reader = FrameReader::new();

    loop {
        if let Some(payload) = reader.read_from(stream)? {
            return Ok(payload);
        }
        if Instant::now() >= deadline {
            return Err(HandshakeError::TimedOut);
        }
        std::thread::sleep(NAP);
    }
}
