use std::time::Duration;

use super::{SLAVE_ADDRESS_ID, empty_response};
use crate::command::{RawCommand, ShdlcCommand};
use crate::error::ShdlcResult;

#[derive(Debug, Clone)]
pub struct GetSlaveAddress(RawCommand);

impl GetSlaveAddress {
    pub fn new() -> Self {
        Self(
            RawCommand::new(SLAVE_ADDRESS_ID, vec![], Duration::from_millis(50))
                .with_response_length(1, 1),
        )
    }
}

impl Default for GetSlaveAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl ShdlcCommand for GetSlaveAddress {
    type Response = u8;

    fn raw(&self) -> &RawCommand {
        &self.0
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<u8> {
        let [address] = crate::command::fixed::<1>(data)?;
        Ok(address)
    }
}

#[derive(Debug, Clone)]
pub struct SetSlaveAddress(RawCommand);

impl SetSlaveAddress {
    pub fn new(slave_address: u8) -> Self {
        Self(
            RawCommand::new(SLAVE_ADDRESS_ID, vec![slave_address], Duration::from_millis(50))
                .with_response_length(0, 0),
        )
    }
}

empty_response!(SetSlaveAddress);
