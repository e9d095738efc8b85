//! Length-prefixed ASCII framing.
//!
//! Every message in either direction is three ASCII decimal digits giving
//! the payload length (left-padded with `0`), immediately followed by that
//! many payload bytes. There is no terminator.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Size of the length prefix.
pub const HEADER_LEN: usize = 3;
/// Largest payload the three-digit header can describe.
pub const MAX_PAYLOAD: usize = 999;
/// Receive buffer size; enough for a header plus a maximum payload.
const BUF_LEN: usize = 1024;

/// Errors surfaced by the framed reader and writer.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the connection (a read or write of 0 bytes).
    #[error("peer closed the connection")]
    Closed,
    /// The length prefix contained a non-digit; the stream cannot be
    /// resynchronized after this.
    #[error("frame header is not three ASCII digits")]
    BadHeader,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Payload,
}

/// Incremental frame parser for a non-blocking byte stream.
///
/// Keeps two cursors: `want`, the number of bytes the current phase needs
/// (3 while reading the prefix, then the payload length), and `got`, how
/// many of them have arrived so far. Arbitrary TCP fragmentation is fine;
/// partial frames simply stay buffered until more bytes show up.
#[derive(Debug)]
pub struct FrameReader {
    buf: [u8; BUF_LEN],
    want: usize,
    got: usize,
    phase: Phase,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buf: [0; BUF_LEN],
            want: HEADER_LEN,
            got: 0,
            phase: Phase::Header,
        }
    }

    /// Pulls bytes from `src` until a frame completes or the source would
    /// block. Returns `Ok(Some(payload))` for a completed frame and
    /// `Ok(None)` when the source ran dry mid-frame.
    pub fn read_from<R: Read>(&mut self, src: &mut R) -> Result<Option<String>, FrameError> {
        loop {
            if self.got == self.want {
                if let Some(payload) = self.advance()? {
                    return Ok(Some(payload));
                }
                continue;
            }

            match src.read(&mut self.buf[self.got..self.want]) {
                Ok(0) => return Err(FrameError::Closed),
                Ok(n) => self.got += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The current phase is complete: reinterpret the prefix as a payload
    /// length, or emit the payload and reset to prefix mode.
    fn advance(&mut self) -> Result<Option<String>, FrameError> {
        match self.phase {
            Phase::Header => {
                let mut length = 0;
                for &digit in &self.buf[..HEADER_LEN] {
                    if !digit.is_ascii_digit() {
                        return Err(FrameError::BadHeader);
                    }
                    length = length * 10 + usize::from(digit - b'0');
                }
                self.phase = Phase::Payload;
                self.want = length;
                self.got = 0;
                Ok(None)
            }
            Phase::Payload => {
                // Payloads are ASCII by contract; anything else is mangled
                // here and bounced by the dispatcher rather than killing the
                // connection.
                let payload = String::from_utf8_lossy(&self.buf[..self.want]).into_owned();
                self.phase = Phase::Header;
                self.want = HEADER_LEN;
                self.got = 0;
                Ok(Some(payload))
            }
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends `payload` as a length-prefixed frame to a send queue.
pub fn enqueue(queue: &mut Vec<u8>, payload: &str) {
    debug_assert!(payload.len() <= MAX_PAYLOAD);
    queue.extend_from_slice(format!("{:03}{payload}", payload.len()).as_bytes());
}

/// Writes as much of `queue` as `sink` accepts, removing the written prefix.
/// Stops without error when the sink would block.
pub fn drain_into<W: Write>(queue: &mut Vec<u8>, sink: &mut W) -> Result<(), FrameError> {
    while !queue.is_empty() {
        match sink.write(queue) {
            Ok(0) => return Err(FrameError::Closed),
            Ok(n) => {
                queue.drain(..n);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Hands out at most `chunk` bytes per read, then reports `WouldBlock`.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Trickle {
        fn new(data: impl Into<Vec<u8>>, chunk: usize) -> Self {
            Self {
                data: data.into(),
                pos: 0,
                chunk,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos == self.data.len() {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = (self.data.len() - self.pos).min(self.chunk).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    /// A sink that accepts at most `chunk` bytes per write.
    struct Dribble {
        written: Vec<u8>,
        chunk: usize,
        blocked: bool,
    }

    impl Write for Dribble {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.blocked {
                self.blocked = false;
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.chunk);
            self.written.extend_from_slice(&buf[..n]);
            self.blocked = true;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn encode_pads_the_header() {
        let mut queue = Vec::new();
        enqueue(&mut queue, "ready");
        assert_eq!(queue, b"005ready");

        let mut queue = Vec::new();
        enqueue(&mut queue, "");
        assert_eq!(queue, b"000");
    }

    #[test]
    fn whole_frame_in_one_read() {
        let mut src = Trickle::new(&b"005ready"[..], 1024);
        let mut reader = FrameReader::new();

        assert_eq!(reader.read_from(&mut src).unwrap(), Some("ready".into()));
        assert_eq!(reader.read_from(&mut src).unwrap(), None);
    }

    #[test]
    fn byte_at_a_time_fragmentation() {
        let mut src = Trickle::new(&b"012hello world!"[..], 1);
        let mut reader = FrameReader::new();

        let mut result = None;
        for _ in 0..100 {
            if let Some(payload) = reader.read_from(&mut src).unwrap() {
                result = Some(payload);
                break;
            }
        }
        assert_eq!(result, Some("hello world!".into()));
    }

    #[test]
    fn queued_frames_come_out_in_order_unmerged() {
        let mut queue = Vec::new();
        enqueue(&mut queue, "e2e4");
        enqueue(&mut queue, "moves e2");
        enqueue(&mut queue, "e7e8=Q");

        let mut src = Trickle::new(queue, 7);
        let mut reader = FrameReader::new();
        let mut frames = Vec::new();
        while frames.len() < 3 {
            if let Some(payload) = reader.read_from(&mut src).unwrap() {
                frames.push(payload);
            }
        }

        assert_eq!(frames, vec!["e2e4", "moves e2", "e7e8=Q"]);
    }

    #[test]
    fn empty_frame_is_emitted() {
        let mut src = Trickle::new(&b"000005after"[..], 1024);
        let mut reader = FrameReader::new();

        assert_eq!(reader.read_from(&mut src).unwrap(), Some("".into()));
        assert_eq!(reader.read_from(&mut src).unwrap(), Some("after".into()));
    }

    #[test]
    fn non_digit_header_is_an_error() {
        let mut src = Trickle::new(&b"0x5ready"[..], 1024);
        let mut reader = FrameReader::new();

        assert!(matches!(
            reader.read_from(&mut src),
            Err(FrameError::BadHeader)
        ));
    }

    #[test]
    fn closed_source_is_an_error() {
        struct Eof;
        impl Read for Eof {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Ok(0)
            }
        }

        let mut reader = FrameReader::new();
        assert!(matches!(
            reader.read_from(&mut Eof),
            Err(FrameError::Closed)
        ));
    }

    #[test]
    fn drain_handles_partial_writes() {
        let mut queue = Vec::new();
        enqueue(&mut queue, "e2e4");
        enqueue(&mut queue, "ok");

        let mut sink = Dribble {
            written: Vec::new(),
            chunk: 3,
            blocked: false,
        };

        while !queue.is_empty() {
            drain_into(&mut queue, &mut sink).unwrap();
        }
        assert_eq!(sink.written, b"004e2e4002ok");
    }

    #[test]
    fn drain_reports_a_closed_sink() {
        struct Dead;
        impl Write for Dead {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut queue = Vec::new();
        enqueue(&mut queue, "e2e4");
        assert!(matches!(
            drain_into(&mut queue, &mut Dead),
            Err(FrameError::Closed)
        ));
    }
}
