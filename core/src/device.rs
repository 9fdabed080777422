use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::command::ShdlcCommand;
use crate::commands::{
    DeviceReset, FactoryReset, GetArticleCode, GetBaudrate, GetErrorState, GetProductName,
    GetProductSubType, GetProductType, GetReplyDelay, GetSerialNumber, GetSlaveAddress,
    GetSystemUpTime, GetVersion, SetBaudrate, SetReplyDelay, SetSlaveAddress,
};
use crate::connection::{ConnectionGuard, ShdlcConnection};
use crate::error::{DeviceError, STANDARD_DEVICE_ERRORS, ShdlcError, ShdlcResult};
use crate::port::ShdlcPort;
use crate::types::{ErrorState, Version};

/// One addressed device on an SHDLC bus.
///
/// Provides the commands every SHDLC device supports. Device specific drivers
/// build on [`ShdlcDevice::execute`] and [`ShdlcDevice::register_device_errors`].
pub struct ShdlcDevice<P> {
    connection: Arc<ShdlcConnection<P>>,
    slave_address: u8,
    last_error_flag: AtomicBool,
    device_errors: HashMap<u8, DeviceError>,
}

impl<P: ShdlcPort> ShdlcDevice<P> {
    /// Creates the device without communicating with it.
    pub fn new(connection: Arc<ShdlcConnection<P>>, slave_address: u8) -> Self {
        let mut device = Self {
            connection,
            slave_address,
            last_error_flag: AtomicBool::new(false),
            device_errors: HashMap::new(),
        };
        device.register_device_errors(STANDARD_DEVICE_ERRORS);
        device
    }

    pub fn connection(&self) -> &Arc<ShdlcConnection<P>> {
        &self.connection
    }

    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    /// Error flag of the most recent response.
    pub fn last_error_flag(&self) -> bool {
        self.last_error_flag.load(Ordering::Relaxed)
    }

    /// Adds device specific errors; existing codes are overwritten.
    pub fn register_device_errors(&mut self, errors: impl IntoIterator<Item = DeviceError>) {
        for error in errors {
            self.device_errors.insert(error.code(), error);
        }
    }

    /// The registered error for `code`, or a generic one for unknown codes.
    /// Code 0 means "no error".
    pub fn device_error(&self, code: u8) -> Option<DeviceError> {
        if code == 0 {
            return None;
        }
        Some(
            self.device_errors
                .get(&code)
                .cloned()
                .unwrap_or_else(|| DeviceError::new(code)),
        )
    }

    pub fn execute<C: ShdlcCommand>(&self, command: &C) -> ShdlcResult<C::Response> {
        let mut guard = self.connection.lock();
        self.execute_on(&mut guard, command, true)
    }

    /// Like [`ShdlcDevice::execute`], on a bus the caller already locked.
    pub fn execute_on<C: ShdlcCommand>(
        &self,
        guard: &mut ConnectionGuard<'_, P>,
        command: &C,
        wait_post_process: bool,
    ) -> ShdlcResult<C::Response> {
        match guard.execute(self.slave_address, command, wait_post_process) {
            Ok((response, error_flag)) => {
                self.last_error_flag.store(error_flag, Ordering::Relaxed);
                Ok(response)
            }
            Err(ShdlcError::Device(err)) => Err(self
                .device_error(err.code())
                .unwrap_or(err)
                .into()),
            Err(err) => Err(err),
        }
    }

    pub fn get_product_type(&self) -> ShdlcResult<String> {
        self.execute(&GetProductType::new())
    }

    pub fn get_product_type_as_int(&self) -> ShdlcResult<u32> {
        parse_product_type(&self.get_product_type()?)
    }

    pub fn get_product_subtype(&self) -> ShdlcResult<u8> {
        self.execute(&GetProductSubType::new())
    }

    pub fn get_product_name(&self) -> ShdlcResult<String> {
        self.execute(&GetProductName::new())
    }

    pub fn get_article_code(&self) -> ShdlcResult<String> {
        self.execute(&GetArticleCode::new())
    }

    pub fn get_serial_number(&self) -> ShdlcResult<String> {
        self.execute(&GetSerialNumber::new())
    }

    pub fn get_version(&self) -> ShdlcResult<Version> {
        self.execute(&GetVersion::new())
    }

    pub fn get_error_state(&self, clear: bool) -> ShdlcResult<ErrorState> {
        self.execute(&GetErrorState::new(clear))
    }

    /// Device state flags and the last error looked up in the registry.
    pub fn get_error_state_as_error(&self, clear: bool) -> ShdlcResult<(u32, Option<DeviceError>)> {
        let state = self.get_error_state(clear)?;
        Ok((state.state, self.device_error(state.last_error)))
    }

    pub fn get_slave_address(&self) -> ShdlcResult<u8> {
        self.execute(&GetSlaveAddress::new())
    }

    /// With `update_driver` this driver talks to the new address afterwards.
    pub fn set_slave_address(&mut self, slave_address: u8, update_driver: bool) -> ShdlcResult<()> {
        self.execute(&SetSlaveAddress::new(slave_address))?;
        if update_driver {
            debug!(
                "Slave address changed from {} to {slave_address}.",
                self.slave_address
            );
            self.slave_address = slave_address;
        }
        Ok(())
    }

    pub fn get_baudrate(&self) -> ShdlcResult<u32> {
        self.execute(&GetBaudrate::new())
    }

    /// With `update_driver` the port bitrate follows the device.
    pub fn set_baudrate(&self, baudrate: u32, update_driver: bool) -> ShdlcResult<()> {
        let mut guard = self.connection.lock();
        self.execute_on(&mut guard, &SetBaudrate::new(baudrate), true)?;
        if update_driver {
            guard.port_mut().set_bitrate(baudrate)?;
        }
        Ok(())
    }

    /// Reply delay in microseconds.
    pub fn get_reply_delay(&self) -> ShdlcResult<u16> {
        self.execute(&GetReplyDelay::new())
    }

    pub fn set_reply_delay(&self, reply_delay_us: u16) -> ShdlcResult<()> {
        self.execute(&SetReplyDelay::new(reply_delay_us))
    }

    /// Seconds since the last power on or reset.
    pub fn get_system_up_time(&self) -> ShdlcResult<u32> {
        self.execute(&GetSystemUpTime::new())
    }

    pub fn device_reset(&self) -> ShdlcResult<()> {
        self.execute(&DeviceReset::new())?;
        self.last_error_flag.store(false, Ordering::Relaxed);
        Ok(())
    }

    pub fn factory_reset(&self) -> ShdlcResult<()> {
        self.execute(&FactoryReset::new())?;
        self.last_error_flag.store(false, Ordering::Relaxed);
        Ok(())
    }
}

/// Parses a product type string like "00080000" or "0x00080000".
pub fn parse_product_type(product_type: &str) -> ShdlcResult<u32> {
    let trimmed = product_type.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).map_err(|_| {
        ShdlcError::response_with_data(
            format!("Invalid product type '{product_type}'."),
            product_type.as_bytes(),
        )
    })
}
