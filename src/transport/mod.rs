//! Transport module: the command/response boundary between host and device.
//!
//! `Transport::exchange` takes `&mut self`, so a handle carries exactly one
//! command at a time. Nothing here retries; a timeout or disconnect is
//! surfaced to the caller as-is.
//!
//! `TcpTransport` speaks the Speculos emulator APDU framing:
//!
//! ```text
//! request:  len: u32 BE | apdu[len]
//! response: len: u32 BE | data[len] | SW1 SW2
//! ```
//!
//! The response length excludes the two status bytes.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::apdu::{ApduAnswer, ApduCommand};
use crate::error::LedgerError;

/// Upper bound on any frame; APDUs here are at most a few hundred bytes.
const MAX_FRAME_LEN: usize = 4096;

pub trait Transport {
    fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, LedgerError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, LedgerError> {
        (**self).exchange(command)
    }
}

// ── TcpTransport ───────────────────────────────────────────────────────────

pub struct TcpTransport {
    stream: TcpStream,
    /// Set once a frame failed midway; the stream is out of step from then on.
    poisoned: bool,
}

impl TcpTransport {
    /// Connect to `endpoint` (`host:port`). `timeout` bounds the connect and
    /// every subsequent read and write.
    pub fn connect(endpoint: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let addrs = endpoint
            .to_socket_addrs()
            .map_err(|e| LedgerError::Transport(format!("cannot resolve {}: {}", endpoint, e)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(%addr, "connected to device");
                    return Ok(TcpTransport {
                        stream,
                        poisoned: false,
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => Err(LedgerError::Timeout),
            Some(e) => Err(LedgerError::Transport(format!(
                "cannot connect to {}: {}",
                endpoint, e
            ))),
            None => Err(LedgerError::Transport(format!(
                "{} resolved to no addresses",
                endpoint
            ))),
        }
    }
}

impl Transport for TcpTransport {
    fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, LedgerError> {
        if self.poisoned {
            return Err(LedgerError::Transport(
                "connection desynchronised after previous failure".into(),
            ));
        }
        let apdu = command.encode()?;
        trace!(apdu = %hex::encode(&apdu), "=>");
        let raw = match self.round_trip(&apdu) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "exchange failed, closing connection");
                self.poisoned = true;
                let _ = self.stream.shutdown(Shutdown::Both);
                return Err(e.into());
            }
        };
        trace!(answer = %hex::encode(&raw), "<=");
        ApduAnswer::decode(&raw)
    }
}

impl TcpTransport {
    fn round_trip(&mut self, apdu: &[u8]) -> io::Result<Vec<u8>> {
        write_request(&mut self.stream, apdu)?;
        read_response(&mut self.stream)
    }
}

// ── Framing ────────────────────────────────────────────────────────────────

pub fn write_request<W: Write>(writer: &mut W, apdu: &[u8]) -> io::Result<()> {
    writer.write_all(&frame_len(apdu.len())?.to_be_bytes())?;
    writer.write_all(apdu)?;
    writer.flush()
}

/// Read one request frame. `Ok(None)` means the peer closed the connection
/// between frames.
pub fn read_request<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = checked_len(u32::from_be_bytes(len))?;
    let mut apdu = vec![0u8; len];
    reader.read_exact(&mut apdu)?;
    Ok(Some(apdu))
}

/// Write an encoded answer (`data || SW1 SW2`).
pub fn write_response<W: Write>(writer: &mut W, answer: &[u8]) -> io::Result<()> {
    if answer.len() < 2 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "answer must end with a status word",
        ));
    }
    writer.write_all(&frame_len(answer.len() - 2)?.to_be_bytes())?;
    writer.write_all(answer)?;
    writer.flush()
}

/// Read one response frame and return `data || SW1 SW2`.
pub fn read_response<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let len = checked_len(u32::from_be_bytes(len))?;
    let mut answer = vec![0u8; len + 2];
    reader.read_exact(&mut answer)?;
    Ok(answer)
}

fn frame_len(len: usize) -> io::Result<u32> {
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds {}", len, MAX_FRAME_LEN),
        ));
    }
    Ok(len as u32)
}

fn checked_len(len: u32) -> io::Result<usize> {
    let len = len as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("peer announced a {}-byte frame (limit {})", len, MAX_FRAME_LEN),
        ));
    }
    Ok(len)
}
