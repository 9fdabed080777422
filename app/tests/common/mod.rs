//! Test helper module for E2E tests
//!
//! Provides `TestFixture` for temp files and running the `shdlc` CLI, and
//! `FakeDevice`, an SHDLC device served over TCP.

#![allow(dead_code)] // Test helpers may not be used in all test modules
#![allow(deprecated)] // cargo_bin() deprecation - the new API requires more investigation

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use ihex::Record;
use shdlc_core::frame::{MisoFrame, MosiFrame, START_STOP_BYTE};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

/// Test fixture providing a temporary directory and the `shdlc` CLI.
pub struct TestFixture {
    pub dir: TempDir,
}

impl TestFixture {
    /// Create a new test environment with a fresh temp directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write a hex file containing `segments` of (address, bytes)
    pub fn add_hex(&self, path: &str, segments: &[(u32, &[u8])]) -> PathBuf {
        let file = self.dir.child(path);
        file.write_str(&hex_image(segments)).unwrap();
        file.path().to_path_buf()
    }

    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let file = self.dir.child(path);
        file.write_str(content).unwrap();
        file.path().to_path_buf()
    }

    /// `shdlc` without any port configured from the environment
    pub fn shdlc(&self) -> Command {
        let mut cmd = Command::cargo_bin("shdlc").unwrap();
        cmd.current_dir(self.root())
            .env_remove("SHDLC_SERIAL")
            .env_remove("SHDLC_TCP")
            .env_remove("SHDLC_LOG_PATH")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `shdlc --tcp <device>`
    pub fn shdlc_on(&self, device: &FakeDevice) -> Command {
        let mut cmd = self.shdlc();
        cmd.arg("--tcp").arg(device.address());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Application image as the bootloader expects it: signature, product type,
/// version and body.
pub fn application(product_type: u32, major: u8, minor: u8, body: &[u8]) -> Vec<u8> {
    let mut app = vec![0x4A, 0x47, 0x4F, 0x4B];
    app.extend_from_slice(&product_type.to_le_bytes());
    app.extend_from_slice(&[minor, major]);
    app.extend_from_slice(body);
    app
}

pub fn hex_image(segments: &[(u32, &[u8])]) -> String {
    let mut records = Vec::new();
    for (start, bytes) in segments {
        for (i, chunk) in bytes.chunks(16).enumerate() {
            let address = start + (i * 16) as u32;
            records.push(Record::ExtendedLinearAddress((address >> 16) as u16));
            records.push(Record::Data {
                offset: address as u16,
                value: chunk.to_vec(),
            });
        }
    }
    records.push(Record::EndOfFile);
    ihex::create_object_file_representation(&records).unwrap()
}

type Handler = dyn Fn(&MosiFrame) -> MisoFrame + Send + Sync;

/// SHDLC device behind a TCP socket, answering requests with `handler`.
pub struct FakeDevice {
    port: u16,
    requests: Arc<Mutex<Vec<MosiFrame>>>,
}

impl FakeDevice {
    pub fn spawn(handler: impl Fn(&MosiFrame) -> MisoFrame + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let handler = Arc::clone(&handler);
                let recorded = Arc::clone(&recorded);
                thread::spawn(move || serve(stream, &*handler, &recorded));
            }
        });

        Self { port, requests }
    }

    /// A device knowing the common commands, with product type 00080000.
    pub fn standard() -> Self {
        Self::spawn(standard_response)
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<MosiFrame> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve(mut stream: TcpStream, handler: &Handler, recorded: &Mutex<Vec<MosiFrame>>) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        pending.extend_from_slice(&buf[..n]);

        while let Some(end) = frame_end(&pending) {
            let raw: Vec<u8> = pending.drain(..=end).collect();
            let Ok(request) = MosiFrame::decode(&raw) else {
                continue;
            };
            recorded.lock().unwrap().push(request.clone());
            let response = handler(&request);
            if stream.write_all(&response.to_bytes().unwrap()).is_err() {
                return;
            }
        }
    }
}

/// Index of the delimiter closing the first complete frame.
fn frame_end(data: &[u8]) -> Option<usize> {
    let start = data.iter().position(|b| *b == START_STOP_BYTE)?;
    data[start + 1..]
        .iter()
        .position(|b| *b == START_STOP_BYTE)
        .map(|i| start + 1 + i)
}

pub fn respond(request: &MosiFrame, state: u8, data: &[u8]) -> MisoFrame {
    MisoFrame {
        address: request.address,
        command_id: request.command_id,
        state,
        data: data.to_vec(),
    }
}

pub fn standard_response(request: &MosiFrame) -> MisoFrame {
    let ok = |data: &[u8]| respond(request, 0x00, data);
    match (request.command_id, request.data.as_slice()) {
        (0xD0, [0x00]) => ok(b"00080000\0"),
        (0xD0, [0x01]) => ok(b"SFM3019\0"),
        (0xD0, [0x02]) => ok(b"1-101-001\0"),
        (0xD0, [0x03]) => ok(b"2A3F0007\0"),
        (0xD0, [0x04]) => ok(&[0x01]),
        (0xD1, []) => ok(&[5, 8, 0, 3, 0, 1, 0]),
        (0xD2, [_]) => ok(&[0x00, 0x00, 0x00, 0x00, 0x00]),
        (0x90, []) => ok(&[request.address]),
        (0x91, []) => ok(&115200u32.to_be_bytes()),
        (0x93, []) => ok(&3600u32.to_be_bytes()),
        (0x95, []) => ok(&[0x00, 0x64]),
        (0x90 | 0x91 | 0x95 | 0xD3 | 0xF3, _) => ok(&[]),
        _ => respond(request, 0x02, &[]),
    }
}
