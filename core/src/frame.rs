//! Serial framing for SHDLC.
//!
//! A frame on the wire is `START | stuffed content | STOP`, where the content is
//! `address, command, [state,] length, data.., checksum`. The state byte only
//! exists in MISO (slave to master) frames.

use std::io;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{ShdlcError, ShdlcResult};

pub const START_STOP_BYTE: u8 = 0x7E;
pub const ESCAPE_BYTE: u8 = 0x7D;
pub const ESCAPE_XOR: u8 = 0x20;
const CHARS_TO_ESCAPE: [u8; 4] = [START_STOP_BYTE, ESCAPE_BYTE, 0x11, 0x13];

pub const MAX_DATA_LENGTH: usize = 255;

/// Longest raw MISO frame, with every content byte stuffed:
/// START + 2 * (ADDRESS + COMMAND + STATE + LENGTH + DATA + CHECKSUM) + STOP.
pub const MAX_RAW_FRAME_LENGTH: usize = 1 + 2 * (1 + 1 + 1 + 1 + MAX_DATA_LENGTH + 1) + 1;

pub fn checksum(content: &[u8]) -> u8 {
    let sum = content.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    !sum
}

pub fn format_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("0x{b:02X}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn stuff_into(dst: &mut Vec<u8>, content: &[u8]) {
    for &b in content {
        if CHARS_TO_ESCAPE.contains(&b) {
            dst.push(ESCAPE_BYTE);
            dst.push(b ^ ESCAPE_XOR);
        } else {
            dst.push(b);
        }
    }
}

fn unstuff(stuffed: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(stuffed.len());
    let mut xor = 0x00;
    for &b in stuffed {
        if b == ESCAPE_BYTE {
            xor = ESCAPE_XOR;
        } else {
            data.push(b ^ xor);
            xor = 0x00;
        }
    }
    data
}

fn wrap_frame(content: &mut Vec<u8>) -> Vec<u8> {
    content.push(checksum(content));
    let mut raw = Vec::with_capacity(2 + content.len() * 2);
    raw.push(START_STOP_BYTE);
    stuff_into(&mut raw, content);
    raw.push(START_STOP_BYTE);
    raw
}

/// Stuffed content between the first two delimiters.
fn frame_content(raw: &[u8]) -> &[u8] {
    let mut parts = raw.split(|b| *b == START_STOP_BYTE);
    parts.next();
    parts.next().unwrap_or(&[])
}

/// Request frame sent by the master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosiFrame {
    pub address: u8,
    pub command_id: u8,
    pub data: Vec<u8>,
}

impl MosiFrame {
    pub fn new(address: u8, command_id: u8, data: &[u8]) -> ShdlcResult<Self> {
        if data.len() > MAX_DATA_LENGTH {
            return Err(ShdlcError::PayloadTooLong(data.len()));
        }
        Ok(Self {
            address,
            command_id,
            data: data.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::with_capacity(4 + self.data.len());
        content.push(self.address);
        content.push(self.command_id);
        content.push(self.data.len() as u8);
        content.extend_from_slice(&self.data);
        wrap_frame(&mut content)
    }

    /// Parse a complete raw request, as a slave would.
    pub fn decode(raw: &[u8]) -> ShdlcResult<Self> {
        let unstuffed = unstuff(frame_content(raw));
        if unstuffed.len() < 4 {
            return Err(ShdlcError::response_with_data("Request is too short.", raw));
        }
        let (frame, chk) = unstuffed.split_at(unstuffed.len() - 1);
        let length = frame[2] as usize;
        let data = &frame[3..];
        if length != data.len() {
            return Err(ShdlcError::response_with_data("Wrong length.", raw));
        }
        if chk[0] != checksum(frame) {
            return Err(ShdlcError::response_with_data("Wrong checksum.", raw));
        }
        Ok(Self {
            address: frame[0],
            command_id: frame[1],
            data: data.to_vec(),
        })
    }
}

/// Response frame received from a slave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisoFrame {
    pub address: u8,
    pub command_id: u8,
    pub state: u8,
    pub data: Vec<u8>,
}

impl MisoFrame {
    pub fn to_bytes(&self) -> ShdlcResult<Vec<u8>> {
        if self.data.len() > MAX_DATA_LENGTH {
            return Err(ShdlcError::PayloadTooLong(self.data.len()));
        }
        let mut content = Vec::with_capacity(5 + self.data.len());
        content.push(self.address);
        content.push(self.command_id);
        content.push(self.state);
        content.push(self.data.len() as u8);
        content.extend_from_slice(&self.data);
        Ok(wrap_frame(&mut content))
    }
}

/// Accumulates raw bytes from a port until a complete MISO frame arrived.
#[derive(Debug, Default)]
pub struct MisoFrameBuilder {
    data: Vec<u8>,
}

impl MisoFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn start_received(&self) -> bool {
        self.data.contains(&START_STOP_BYTE)
    }

    /// Append received bytes and report whether a complete frame is buffered.
    pub fn add_data(&mut self, data: &[u8]) -> ShdlcResult<bool> {
        self.data.extend_from_slice(data);

        let delimiters = self.data.iter().filter(|b| **b == START_STOP_BYTE).count();
        if delimiters >= 2 {
            Ok(true)
        } else if self.data.len() > MAX_RAW_FRAME_LENGTH {
            // Endless rubbish without frame delimiters.
            Err(ShdlcError::response_with_data(
                "Response is too long.",
                &self.data,
            ))
        } else {
            Ok(false)
        }
    }

    pub fn interpret_data(&self) -> ShdlcResult<MisoFrame> {
        let unstuffed = unstuff(frame_content(&self.data));
        if unstuffed.len() < 5 {
            return Err(ShdlcError::response_with_data(
                "Response is too short.",
                &self.data,
            ));
        }
        let (frame, chk) = unstuffed.split_at(unstuffed.len() - 1);
        let length = frame[3] as usize;
        let data = &frame[4..];
        if length != data.len() {
            return Err(ShdlcError::response_with_data("Wrong length.", &self.data));
        }
        if chk[0] != checksum(frame) {
            return Err(ShdlcError::response_with_data("Wrong checksum.", &self.data));
        }
        Ok(MisoFrame {
            address: frame[0],
            command_id: frame[1],
            state: frame[2],
            data: data.to_vec(),
        })
    }
}

/// Read a MISO frame from a transport.
///
/// `read` receives a buffer and the time left until `timeout` expires, and
/// returns the number of bytes read. `Ok(0)` or a `TimedOut`/`WouldBlock`
/// error means nothing arrived within that time.
pub fn receive_frame<F>(mut read: F, timeout: Duration) -> ShdlcResult<MisoFrame>
where
    F: FnMut(&mut [u8], Duration) -> io::Result<usize>,
{
    let deadline = Instant::now() + timeout;
    let mut builder = MisoFrameBuilder::new();
    let mut buf = [0u8; 1024];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ShdlcError::Timeout);
        }

        let n = match read(&mut buf, remaining) {
            Ok(n) => n,
            Err(err)
                if err.kind() == io::ErrorKind::TimedOut
                    || err.kind() == io::ErrorKind::WouldBlock =>
            {
                0
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };

        if n > 0 && builder.add_data(&buf[..n])? {
            debug!("SHDLC received raw: [{}]", format_bytes(builder.data()));
            return builder.interpret_data();
        }
    }
}
