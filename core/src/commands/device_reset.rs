use std::time::Duration;

use super::{DEVICE_RESET_ID, empty_response};
use crate::command::RawCommand;

/// Reboots the firmware, similar to a power cycle.
#[derive(Debug, Clone)]
pub struct DeviceReset(RawCommand);

impl DeviceReset {
    pub fn new() -> Self {
        Self(
            RawCommand::new(DEVICE_RESET_ID, vec![], Duration::from_millis(500))
                .with_response_length(0, 0)
                .with_post_processing_time(Duration::from_secs(2)),
        )
    }
}

impl Default for DeviceReset {
    fn default() -> Self {
        Self::new()
    }
}

empty_response!(DeviceReset);
