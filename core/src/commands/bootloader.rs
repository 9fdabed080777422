//! Commands of the SHDLC bootloader (0xF3), used for firmware updates.

use std::time::Duration;

use super::{BOOTLOADER_ID, empty_response};
use crate::command::RawCommand;

#[derive(Debug, Clone)]
pub struct EnterBootloader(RawCommand);

impl EnterBootloader {
    pub fn new() -> Self {
        Self(
            RawCommand::new(BOOTLOADER_ID, vec![], Duration::from_millis(100))
                .with_response_length(0, 0)
                .with_post_processing_time(Duration::from_secs(2)),
        )
    }
}

impl Default for EnterBootloader {
    fn default() -> Self {
        Self::new()
    }
}

empty_response!(EnterBootloader);

/// Erases the application flash, hence the long timeout.
#[derive(Debug, Clone)]
pub struct FirmwareUpdateStart(RawCommand);

impl FirmwareUpdateStart {
    pub fn new() -> Self {
        Self(
            RawCommand::new(BOOTLOADER_ID, vec![0x01], Duration::from_secs(20))
                .with_response_length(0, 0),
        )
    }
}

impl Default for FirmwareUpdateStart {
    fn default() -> Self {
        Self::new()
    }
}

empty_response!(FirmwareUpdateStart);

#[derive(Debug, Clone)]
pub struct FirmwareUpdateData(RawCommand);

impl FirmwareUpdateData {
    pub fn new(data: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(0x02);
        payload.extend_from_slice(data);
        Self(
            RawCommand::new(BOOTLOADER_ID, payload, Duration::from_secs(1))
                .with_response_length(0, 0),
        )
    }
}

empty_response!(FirmwareUpdateData);

/// Finishes the update; the bootloader verifies `checksum` and starts the
/// new application.
#[derive(Debug, Clone)]
pub struct FirmwareUpdateStop(RawCommand);

impl FirmwareUpdateStop {
    pub fn new(checksum: u8) -> Self {
        Self(
            RawCommand::new(BOOTLOADER_ID, vec![0x03, checksum], Duration::from_secs(1))
                .with_response_length(0, 0)
                .with_post_processing_time(Duration::from_secs(2)),
        )
    }
}

empty_response!(FirmwareUpdateStop);
