use std::time::Duration;

use super::SYSTEM_UP_TIME_ID;
use crate::command::{RawCommand, ShdlcCommand, fixed};
use crate::error::ShdlcResult;

/// Reads the system up time in seconds.
#[derive(Debug, Clone)]
pub struct GetSystemUpTime(RawCommand);

impl GetSystemUpTime {
    pub fn new() -> Self {
        Self(
            RawCommand::new(SYSTEM_UP_TIME_ID, vec![], Duration::from_millis(50))
                .with_response_length(4, 4),
        )
    }
}

impl Default for GetSystemUpTime {
    fn default() -> Self {
        Self::new()
    }
}

impl ShdlcCommand for GetSystemUpTime {
    type Response = u32;

    fn raw(&self) -> &RawCommand {
        &self.0
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<u32> {
        Ok(u32::from_be_bytes(fixed(data)?))
    }
}
