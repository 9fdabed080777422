//! Intel HEX firmware images for the SHDLC bootloader.
//!
//! An image contains the bootloader and the application. Only the application
//! part, without its leading signature, is sent to the device during an
//! update.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use ihex::{Reader, Record};
use tracing::debug;

use crate::error::{ShdlcError, ShdlcResult};
use crate::types::FirmwareVersion;

/// Identifies images made for the SHDLC bootloader.
pub const DEFAULT_SIGNATURE: [u8; 4] = [0x4A, 0x47, 0x4F, 0x4B];
pub const DEFAULT_BL_VERSION_OFFSET: u32 = 0x1004;

const PADDING: u8 = 0xFF;
/// Largest padded address range materialized from an image.
const MAX_RANGE_LEN: u64 = 16 * 1024 * 1024;

/// Memory layout of a product's firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImageOptions {
    pub bl_start_addr: u32,
    pub app_start_addr: u32,
    pub signature: Vec<u8>,
    /// Offset of the bootloader version, relative to `bl_start_addr`.
    pub bl_version_offset: u32,
}

impl FirmwareImageOptions {
    pub fn new(bl_start_addr: u32, app_start_addr: u32) -> Self {
        Self {
            bl_start_addr,
            app_start_addr,
            signature: DEFAULT_SIGNATURE.to_vec(),
            bl_version_offset: DEFAULT_BL_VERSION_OFFSET,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_bl_version_offset(mut self, offset: u32) -> Self {
        self.bl_version_offset = offset;
        self
    }
}

/// Sparse memory contents of a HEX file.
struct Memory(BTreeMap<u32, u8>);

impl Memory {
    fn parse(hex: &str) -> ShdlcResult<Self> {
        let mut bytes = BTreeMap::new();
        let mut base: u32 = 0;
        for record in Reader::new(hex) {
            let record = record.map_err(|e| ShdlcError::FirmwareImage(e.to_string()))?;
            match record {
                Record::Data { offset, value } => {
                    for (i, byte) in value.into_iter().enumerate() {
                        let address = base.wrapping_add(u32::from(offset)).wrapping_add(i as u32);
                        bytes.insert(address, byte);
                    }
                }
                Record::ExtendedSegmentAddress(segment) => base = u32::from(segment) << 4,
                Record::ExtendedLinearAddress(upper) => base = u32::from(upper) << 16,
                Record::EndOfFile => break,
                Record::StartSegmentAddress { .. } | Record::StartLinearAddress(_) => {}
            }
        }
        Ok(Self(bytes))
    }

    fn get(&self, address: u32) -> u8 {
        self.0.get(&address).copied().unwrap_or(PADDING)
    }

    /// Inclusive range, padded.
    fn range(&self, start: u32, end: u32) -> ShdlcResult<Vec<u8>> {
        if end < start {
            return Ok(Vec::new());
        }
        if u64::from(end - start) + 1 > MAX_RANGE_LEN {
            return Err(ShdlcError::FirmwareImage(format!(
                "application range too large (0x{start:08X}..=0x{end:08X})"
            )));
        }
        Ok((start..=end).map(|address| self.get(address)).collect())
    }

    fn min_address(&self) -> Option<u32> {
        self.0.keys().next().copied()
    }

    fn max_address(&self) -> Option<u32> {
        self.0.keys().next_back().copied()
    }

    fn read_u32_le(&self, address: u32) -> u32 {
        u32::from_le_bytes([
            self.get(address),
            self.get(address.wrapping_add(1)),
            self.get(address.wrapping_add(2)),
            self.get(address.wrapping_add(3)),
        ])
    }

    fn read_version(&self, minor_address: u32) -> FirmwareVersion {
        FirmwareVersion {
            major: self.get(minor_address.wrapping_add(1)),
            minor: self.get(minor_address),
            debug: false,
        }
    }
}

/// A parsed firmware image, readable in blocks like a file.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    product_type: u32,
    bootloader_version: FirmwareVersion,
    application_version: FirmwareVersion,
    app_data: Vec<u8>,
    checksum: u8,
    position: usize,
}

impl FirmwareImage {
    pub fn from_path(path: impl AsRef<Path>, options: &FirmwareImageOptions) -> ShdlcResult<Self> {
        let path = path.as_ref();
        let hex = fs::read_to_string(path)?;
        debug!("Loading hex file {}.", path.display());
        Self::from_hex_str(&hex, options)
    }

    pub fn from_reader(mut reader: impl Read, options: &FirmwareImageOptions) -> ShdlcResult<Self> {
        let mut hex = String::new();
        reader.read_to_string(&mut hex)?;
        Self::from_hex_str(&hex, options)
    }

    pub fn from_hex_str(hex: &str, options: &FirmwareImageOptions) -> ShdlcResult<Self> {
        if options.signature.is_empty() {
            return Err(ShdlcError::FirmwareImage("empty signature".to_string()));
        }
        let memory = Memory::parse(hex)?;
        let (Some(min_address), Some(max_address)) = (memory.min_address(), memory.max_address())
        else {
            return Err(ShdlcError::FirmwareImage("file contains no data".to_string()));
        };
        debug!("Loaded hex file [minaddr=0x{min_address:08X}, maxaddr=0x{max_address:08X}]");

        let sig_len = options.signature.len() as u32;
        let app_start = options.app_start_addr;
        let signature = memory.range(app_start, app_start.saturating_add(sig_len).saturating_sub(1))?;
        if signature != options.signature {
            return Err(ShdlcError::FirmwareImageSignature { signature });
        }
        debug!("Signature: OK");

        let header = app_start.saturating_add(sig_len);
        let product_type = memory.read_u32_le(header);
        debug!("Product type: 0x{product_type:08X}");

        let bootloader_version = memory.read_version(
            options
                .bl_start_addr
                .saturating_add(options.bl_version_offset),
        );
        debug!("Bootloader version: {bootloader_version}");

        let application_version = memory.read_version(header.saturating_add(4));
        debug!("Application version: {application_version}");

        // The signature must not be sent to the bootloader.
        let end = if options.bl_start_addr > app_start {
            options.bl_start_addr - 1
        } else {
            max_address
        };
        let app_data = memory.range(header, end)?;
        debug!("Application size: {:.2} kB", app_data.len() as f64 / 1024.0);

        let checksum = application_checksum(&app_data);
        debug!("Application checksum: 0x{checksum:02X}");

        Ok(Self {
            product_type,
            bootloader_version,
            application_version,
            app_data,
            checksum,
            position: 0,
        })
    }

    /// Product type the firmware is made for.
    pub fn product_type(&self) -> u32 {
        self.product_type
    }

    pub fn bootloader_version(&self) -> FirmwareVersion {
        self.bootloader_version
    }

    pub fn application_version(&self) -> FirmwareVersion {
        self.application_version
    }

    /// Checksum over the application data, as expected by the bootloader.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Application size in bytes.
    pub fn size(&self) -> usize {
        self.app_data.len()
    }

    /// Bytes not read yet.
    pub fn available_bytes(&self) -> usize {
        self.app_data.len() - self.position
    }

    /// Next block of at most `max` bytes; empty once everything was read.
    pub fn read(&mut self, max: usize) -> &[u8] {
        let end = self.position + max.min(self.available_bytes());
        let block = &self.app_data[self.position..end];
        self.position = end;
        block
    }

    pub fn read_all(&mut self) -> &[u8] {
        self.read(self.available_bytes())
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

fn application_checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    sum ^ 0xFF
}
