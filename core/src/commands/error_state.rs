use std::time::Duration;

use super::ERROR_STATE_ID;
use crate::command::{RawCommand, ShdlcCommand, fixed};
use crate::error::ShdlcResult;
use crate::types::ErrorState;

/// Reads the device state flags and the last error, optionally clearing them.
#[derive(Debug, Clone)]
pub struct GetErrorState(RawCommand);

impl GetErrorState {
    pub fn new(clear: bool) -> Self {
        Self(
            RawCommand::new(
                ERROR_STATE_ID,
                vec![u8::from(clear)],
                Duration::from_millis(500),
            )
            .with_response_length(5, 5),
        )
    }
}

impl ShdlcCommand for GetErrorState {
    type Response = ErrorState;

    fn raw(&self) -> &RawCommand {
        &self.0
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<ErrorState> {
        let bytes: [u8; 5] = fixed(data)?;
        Ok(ErrorState {
            state: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            last_error: bytes[4],
        })
    }
}
