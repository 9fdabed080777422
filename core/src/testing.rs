//! Scripted in-memory port for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ihex::Record;
use tempfile::NamedTempFile;

use crate::error::{ShdlcError, ShdlcResult};
use crate::frame::MisoFrame;
use crate::port::ShdlcPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub address: u8,
    pub command_id: u8,
    pub data: Vec<u8>,
    pub timeout: Duration,
    pub bitrate: Option<u32>,
}

type Responder = Box<dyn FnMut(&Request) -> ShdlcResult<MisoFrame> + Send>;

/// Port which answers with queued frames, or with a responder callback once
/// the queue is empty.
pub struct MockPort {
    pub open: bool,
    pub bitrate: Option<u32>,
    pub queued: VecDeque<ShdlcResult<MisoFrame>>,
    pub responder: Option<Responder>,
    pub requests: Arc<Mutex<Vec<Request>>>,
    pub bitrate_changes: Arc<Mutex<Vec<u32>>>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            open: true,
            bitrate: Some(115200),
            queued: VecDeque::new(),
            responder: None,
            requests: Arc::new(Mutex::new(Vec::new())),
            bitrate_changes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Port which confirms every request with an empty, error free response.
    pub fn acknowledging() -> Self {
        Self::new().with_responder(|req| Ok(reply(req, 0x00, &[])))
    }

    pub fn without_bitrate(mut self) -> Self {
        self.bitrate = None;
        self
    }

    pub fn with_responder(
        mut self,
        responder: impl FnMut(&Request) -> ShdlcResult<MisoFrame> + Send + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn queue(mut self, response: ShdlcResult<MisoFrame>) -> Self {
        self.queued.push_back(response);
        self
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<Request>>> {
        Arc::clone(&self.requests)
    }

    pub fn bitrate_changes(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.bitrate_changes)
    }
}

pub fn reply(req: &Request, state: u8, data: &[u8]) -> MisoFrame {
    MisoFrame {
        address: req.address,
        command_id: req.command_id,
        state,
        data: data.to_vec(),
    }
}

pub fn recorded<T: Clone>(list: &Arc<Mutex<Vec<T>>>) -> Vec<T> {
    list.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

impl ShdlcPort for MockPort {
    fn description(&self) -> String {
        "mock".to_string()
    }

    fn bitrate(&self) -> ShdlcResult<u32> {
        self.bitrate.ok_or_else(|| ShdlcError::BitrateUnsupported {
            port: self.description(),
        })
    }

    fn set_bitrate(&mut self, bitrate: u32) -> ShdlcResult<()> {
        if self.bitrate.is_none() {
            return Err(ShdlcError::BitrateUnsupported {
                port: self.description(),
            });
        }
        self.bitrate = Some(bitrate);
        self.bitrate_changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bitrate);
        Ok(())
    }

    fn open(&mut self) -> ShdlcResult<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn transceive(
        &mut self,
        slave_address: u8,
        command_id: u8,
        data: &[u8],
        response_timeout: Duration,
    ) -> ShdlcResult<MisoFrame> {
        let request = Request {
            address: slave_address,
            command_id,
            data: data.to_vec(),
            timeout: response_timeout,
            bitrate: self.bitrate,
        };
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(response) = self.queued.pop_front() {
            return response;
        }
        match self.responder.as_mut() {
            Some(responder) => responder(&request),
            None => Err(ShdlcError::Timeout),
        }
    }
}

/// Intel HEX text containing `segments` of (address, bytes).
pub fn hex_image(segments: &[(u32, &[u8])]) -> String {
    let mut records = Vec::new();
    let mut upper = None;
    for (start, bytes) in segments {
        let mut address = *start;
        let mut rest: &[u8] = bytes;
        while !rest.is_empty() {
            let high = (address >> 16) as u16;
            if upper != Some(high) {
                records.push(Record::ExtendedLinearAddress(high));
                upper = Some(high);
            }
            // Never cross a 16-byte line or a 64 KiB page.
            let len = (16 - (address % 16) as usize).min(rest.len());
            records.push(Record::Data {
                offset: address as u16,
                value: rest[..len].to_vec(),
            });
            rest = &rest[len..];
            address += len as u32;
        }
    }
    records.push(Record::EndOfFile);
    ihex::create_object_file_representation(&records).unwrap()
}

pub fn hex_file(hex: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, hex.as_bytes()).unwrap();
    file
}
