use std::borrow::Cow;
use std::io;

use thiserror::Error;
use tracing::debug;

use crate::frame::format_bytes;

/// Error reported by the device in the state byte of a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SHDLC device error 0x{code:02X}: {message}")]
pub struct DeviceError {
    code: u8,
    message: Cow<'static, str>,
}

impl DeviceError {
    pub const fn with_message(code: u8, message: &'static str) -> Self {
        Self {
            code,
            message: Cow::Borrowed(message),
        }
    }

    /// Error for a code without a registered description.
    pub fn new(code: u8) -> Self {
        Self::with_message(code, "Unknown error.")
    }

    pub fn custom(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Cow::Owned(message.into()),
        }
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub const COMMAND_DATA_SIZE_ERROR: DeviceError = DeviceError::with_message(
    0x01,
    "Illegal data size of the MOSI frame. Either an invalid frame was sent or \
     the parameter value is out of range.",
);
pub const UNKNOWN_COMMAND_ERROR: DeviceError =
    DeviceError::with_message(0x02, "The device does not know this command.");
pub const ACCESS_RIGHT_ERROR: DeviceError =
    DeviceError::with_message(0x03, "No access right for this command.");
pub const COMMAND_PARAMETER_ERROR: DeviceError = DeviceError::with_message(
    0x04,
    "Illegal command parameter or parameter out of allowed range.",
);
pub const CHECKSUM_ERROR: DeviceError =
    DeviceError::with_message(0x05, "Checksum of the received MOSI frame is wrong.");
pub const FIRMWARE_UPDATE_ERROR: DeviceError =
    DeviceError::with_message(0x06, "Firmware update failed.");

/// Errors every SHDLC device may report.
pub const STANDARD_DEVICE_ERRORS: [DeviceError; 6] = [
    COMMAND_DATA_SIZE_ERROR,
    UNKNOWN_COMMAND_ERROR,
    ACCESS_RIGHT_ERROR,
    COMMAND_PARAMETER_ERROR,
    CHECKSUM_ERROR,
    FIRMWARE_UPDATE_ERROR,
];

#[derive(Debug, Error)]
pub enum ShdlcError {
    #[error(
        "Timeout while waiting for response from SHDLC device. Check connection to device \
         and make sure it is powered on."
    )]
    Timeout,

    #[error("Invalid data received from the SHDLC device: {message}")]
    Response {
        message: String,
        received_data: Option<Vec<u8>>,
    },

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Payload of {0} bytes exceeds the SHDLC limit of 255 bytes.")]
    PayloadTooLong(usize),

    #[error("Invalid signature in firmware image: [{}]", format_bytes(.signature))]
    FirmwareImageSignature { signature: Vec<u8> },

    #[error(
        "Firmware image is not compatible with device: image product type 0x{image_type:08X} \
         does not match device product type 0x{device_type:08X}."
    )]
    FirmwareImageIncompatibility { image_type: u32, device_type: u32 },

    #[error("invalid firmware image: {0}")]
    FirmwareImage(String),

    #[error("The port '{port}' does not support changing the bitrate.")]
    BitrateUnsupported { port: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ShdlcError {
    pub fn response(message: impl Into<String>) -> Self {
        ShdlcError::Response {
            message: message.into(),
            received_data: None,
        }
    }

    pub fn response_with_data(message: impl Into<String>, data: &[u8]) -> Self {
        debug!("Invalid SHDLC response raw data: [{}]", format_bytes(data));
        ShdlcError::Response {
            message: message.into(),
            received_data: Some(data.to_vec()),
        }
    }

    /// The raw bytes attached to a response error, if any.
    pub fn received_data(&self) -> Option<&[u8]> {
        match self {
            ShdlcError::Response { received_data, .. } => received_data.as_deref(),
            _ => None,
        }
    }

    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            ShdlcError::Device(err) => Some(err),
            _ => None,
        }
    }
}

pub type ShdlcResult<T> = Result<T, ShdlcError>;
