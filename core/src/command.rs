use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::{ShdlcError, ShdlcResult};
use crate::frame::MAX_DATA_LENGTH;

/// Request parameters shared by every SHDLC command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    id: u8,
    data: Vec<u8>,
    max_response_time: Duration,
    response_length: RangeInclusive<usize>,
    post_processing_time: Duration,
}

impl RawCommand {
    pub fn new(id: u8, data: impl Into<Vec<u8>>, max_response_time: Duration) -> Self {
        Self {
            id,
            data: data.into(),
            max_response_time,
            response_length: 0..=MAX_DATA_LENGTH,
            post_processing_time: Duration::ZERO,
        }
    }

    pub fn with_response_length(mut self, min: usize, max: usize) -> Self {
        self.response_length = min..=max;
        self
    }

    /// Time the device keeps working after it responded, e.g. during a reset.
    pub fn with_post_processing_time(mut self, time: Duration) -> Self {
        self.post_processing_time = time;
        self
    }
}

/// A command which can be executed on an SHDLC device.
///
/// Implementors provide the request parameters through [`ShdlcCommand::raw`]
/// and convert the response payload in [`ShdlcCommand::interpret_response`].
pub trait ShdlcCommand {
    type Response;

    fn raw(&self) -> &RawCommand;

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<Self::Response>;

    fn id(&self) -> u8 {
        self.raw().id
    }

    fn data(&self) -> &[u8] {
        &self.raw().data
    }

    fn max_response_time(&self) -> Duration {
        self.raw().max_response_time
    }

    fn post_processing_time(&self) -> Duration {
        self.raw().post_processing_time
    }

    fn check_response_length(&self, data: &[u8]) -> ShdlcResult<()> {
        let range = &self.raw().response_length;
        if range.contains(&data.len()) {
            return Ok(());
        }
        Err(ShdlcError::response_with_data(
            format!(
                "Wrong response length (expected {}..{} bytes, got {}).",
                range.start(),
                range.end(),
                data.len()
            ),
            data,
        ))
    }
}

impl ShdlcCommand for RawCommand {
    /// The payload, or `None` if the device sent no data.
    type Response = Option<Vec<u8>>;

    fn raw(&self) -> &RawCommand {
        self
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<Self::Response> {
        Ok((!data.is_empty()).then(|| data.to_vec()))
    }
}

pub(crate) fn fixed<const N: usize>(data: &[u8]) -> ShdlcResult<[u8; N]> {
    data.try_into().map_err(|_| {
        ShdlcError::response_with_data(
            format!("Expected {N} bytes, got {}.", data.len()),
            data,
        )
    })
}

pub(crate) fn nul_trimmed_string(data: &[u8]) -> ShdlcResult<String> {
    let text = std::str::from_utf8(data)
        .map_err(|_| ShdlcError::response_with_data("Response is not valid UTF-8.", data))?;
    Ok(text.trim_end_matches('\0').to_string())
}
