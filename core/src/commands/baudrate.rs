use std::time::Duration;

use super::{BAUDRATE_ID, empty_response};
use crate::command::{RawCommand, ShdlcCommand, fixed};
use crate::error::ShdlcResult;

/// Reads the device baudrate in bit/s.
#[derive(Debug, Clone)]
pub struct GetBaudrate(RawCommand);

impl GetBaudrate {
    pub fn new() -> Self {
        Self(
            RawCommand::new(BAUDRATE_ID, vec![], Duration::from_millis(50))
                .with_response_length(4, 4),
        )
    }
}

impl Default for GetBaudrate {
    fn default() -> Self {
        Self::new()
    }
}

impl ShdlcCommand for GetBaudrate {
    type Response = u32;

    fn raw(&self) -> &RawCommand {
        &self.0
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<u32> {
        Ok(u32::from_be_bytes(fixed(data)?))
    }
}

#[derive(Debug, Clone)]
pub struct SetBaudrate(RawCommand);

impl SetBaudrate {
    pub fn new(baudrate: u32) -> Self {
        Self(
            RawCommand::new(
                BAUDRATE_ID,
                baudrate.to_be_bytes().to_vec(),
                Duration::from_millis(50),
            )
            .with_response_length(0, 0),
        )
    }
}

empty_response!(SetBaudrate);
