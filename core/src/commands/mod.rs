//! Commands supported by every SHDLC device.

mod baudrate;
mod bootloader;
mod device_info;
mod device_reset;
mod device_version;
mod error_state;
mod factory_reset;
mod reply_delay;
mod slave_address;
mod system_up_time;

pub use baudrate::{GetBaudrate, SetBaudrate};
pub use bootloader::{EnterBootloader, FirmwareUpdateData, FirmwareUpdateStart, FirmwareUpdateStop};
pub use device_info::{
    GetArticleCode, GetProductName, GetProductSubType, GetProductType, GetSerialNumber,
};
pub use device_reset::DeviceReset;
pub use device_version::GetVersion;
pub use error_state::GetErrorState;
pub use factory_reset::FactoryReset;
pub use reply_delay::{GetReplyDelay, SetReplyDelay};
pub use slave_address::{GetSlaveAddress, SetSlaveAddress};
pub use system_up_time::GetSystemUpTime;

pub const SLAVE_ADDRESS_ID: u8 = 0x90;
pub const BAUDRATE_ID: u8 = 0x91;
pub const FACTORY_RESET_ID: u8 = 0x92;
pub const SYSTEM_UP_TIME_ID: u8 = 0x93;
pub const REPLY_DELAY_ID: u8 = 0x95;
pub const DEVICE_INFO_ID: u8 = 0xD0;
pub const DEVICE_VERSION_ID: u8 = 0xD1;
pub const ERROR_STATE_ID: u8 = 0xD2;
pub const DEVICE_RESET_ID: u8 = 0xD3;
pub const BOOTLOADER_ID: u8 = 0xF3;

/// Implements [`ShdlcCommand`](crate::command::ShdlcCommand) for a command
/// without response data.
macro_rules! empty_response {
    ($name:ident) => {
        impl $crate::command::ShdlcCommand for $name {
            type Response = ();

            fn raw(&self) -> &$crate::command::RawCommand {
                &self.0
            }

            fn interpret_response(&self, _data: &[u8]) -> $crate::error::ShdlcResult<()> {
                Ok(())
            }
        }
    };
}

pub(crate) use empty_response;
