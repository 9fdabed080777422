use std::time::Duration;

use super::{REPLY_DELAY_ID, empty_response};
use crate::command::{RawCommand, ShdlcCommand, fixed};
use crate::error::ShdlcResult;

/// Reads the reply delay in microseconds.
#[derive(Debug, Clone)]
pub struct GetReplyDelay(RawCommand);

impl GetReplyDelay {
    pub fn new() -> Self {
        Self(
            RawCommand::new(REPLY_DELAY_ID, vec![], Duration::from_millis(50))
                .with_response_length(2, 2),
        )
    }
}

impl Default for GetReplyDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ShdlcCommand for GetReplyDelay {
    type Response = u16;

    fn raw(&self) -> &RawCommand {
        &self.0
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<u16> {
        Ok(u16::from_be_bytes(fixed(data)?))
    }
}

#[derive(Debug, Clone)]
pub struct SetReplyDelay(RawCommand);

impl SetReplyDelay {
    pub fn new(reply_delay_us: u16) -> Self {
        Self(
            RawCommand::new(
                REPLY_DELAY_ID,
                reply_delay_us.to_be_bytes().to_vec(),
                Duration::from_millis(50),
            )
            .with_response_length(0, 0),
        )
    }
}

empty_response!(SetReplyDelay);
