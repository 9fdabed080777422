use std::time::Duration;

use super::DEVICE_VERSION_ID;
use crate::command::{RawCommand, ShdlcCommand, fixed};
use crate::error::ShdlcResult;
use crate::types::Version;

/// Reads firmware, hardware and protocol versions.
#[derive(Debug, Clone)]
pub struct GetVersion(RawCommand);

impl GetVersion {
    pub fn new() -> Self {
        Self(
            RawCommand::new(DEVICE_VERSION_ID, vec![], Duration::from_millis(500))
                .with_response_length(7, 7),
        )
    }
}

impl Default for GetVersion {
    fn default() -> Self {
        Self::new()
    }
}

impl ShdlcCommand for GetVersion {
    type Response = Version;

    fn raw(&self) -> &RawCommand {
        &self.0
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<Version> {
        Ok(Version::from_bytes(fixed(data)?))
    }
}
