pub mod command;
pub mod commands;
pub mod connection;
pub mod device;
pub mod error;
pub mod firmware_image;
pub mod firmware_update;
pub mod frame;
pub mod port;
pub mod types;

#[cfg(test)]
mod testing;

pub use command::{RawCommand, ShdlcCommand};
pub use connection::{ConnectionGuard, ShdlcConnection};
pub use device::ShdlcDevice;
pub use error::{DeviceError, ShdlcError, ShdlcResult};
pub use firmware_image::{FirmwareImage, FirmwareImageOptions};
pub use firmware_update::FirmwareUpdate;
pub use frame::{MisoFrame, MosiFrame};
pub use port::ShdlcPort;
pub use types::{ErrorState, FirmwareVersion, Version};
