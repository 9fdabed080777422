use std::time::Duration;

use super::{FACTORY_RESET_ID, empty_response};
use crate::command::RawCommand;

/// Restores the off-the-shelf factory configuration.
#[derive(Debug, Clone)]
pub struct FactoryReset(RawCommand);

impl FactoryReset {
    pub fn new() -> Self {
        Self(
            RawCommand::new(FACTORY_RESET_ID, vec![], Duration::from_secs(2))
                .with_response_length(0, 0)
                .with_post_processing_time(Duration::from_secs(2)),
        )
    }
}

impl Default for FactoryReset {
    fn default() -> Self {
        Self::new()
    }
}

empty_response!(FactoryReset);
