use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::command::ShdlcCommand;
use crate::error::{DeviceError, ShdlcError, ShdlcResult};
use crate::port::ShdlcPort;

const ERROR_FLAG_MASK: u8 = 0x80;
const ERROR_CODE_MASK: u8 = 0x7F;

/// Connection to one SHDLC bus.
///
/// A single connection is shared by all devices on the bus. Every transfer
/// takes the port lock, so devices may be used from several threads.
#[derive(Debug)]
pub struct ShdlcConnection<P> {
    port: Mutex<P>,
}

impl<P: ShdlcPort> ShdlcConnection<P> {
    /// Wraps the port; nothing is sent or received here.
    pub fn new(port: P) -> Self {
        debug!("Opened ShdlcConnection on '{}'.", port.description());
        Self {
            port: Mutex::new(port),
        }
    }

    /// Exclusive access to the bus until the guard is dropped.
    pub fn lock(&self) -> ConnectionGuard<'_, P> {
        ConnectionGuard {
            port: self.port.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn into_port(self) -> P {
        self.port.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transceive(
        &self,
        slave_address: u8,
        command_id: u8,
        data: &[u8],
        response_timeout: Duration,
    ) -> ShdlcResult<(Vec<u8>, bool)> {
        self.lock()
            .transceive(slave_address, command_id, data, response_timeout)
    }

    /// Execute a command and return its interpreted response together with
    /// the device error flag.
    pub fn execute<C: ShdlcCommand>(
        &self,
        slave_address: u8,
        command: &C,
        wait_post_process: bool,
    ) -> ShdlcResult<(C::Response, bool)> {
        self.lock()
            .execute(slave_address, command, wait_post_process)
    }
}

pub struct ConnectionGuard<'a, P> {
    port: MutexGuard<'a, P>,
}

impl<P: ShdlcPort> ConnectionGuard<'_, P> {
    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn transceive(
        &mut self,
        slave_address: u8,
        command_id: u8,
        data: &[u8],
        response_timeout: Duration,
    ) -> ShdlcResult<(Vec<u8>, bool)> {
        let frame = self
            .port
            .transceive(slave_address, command_id, data, response_timeout)?;

        if frame.address != slave_address {
            return Err(ShdlcError::response(format!(
                "Received slave address {} instead of {}.",
                frame.address, slave_address
            )));
        }
        if frame.command_id != command_id {
            return Err(ShdlcError::response(format!(
                "Received command ID 0x{:02X} instead of 0x{:02X}.",
                frame.command_id, command_id
            )));
        }

        let error_flag = frame.state & ERROR_FLAG_MASK != 0;
        if error_flag {
            warn!("SHDLC device with address {slave_address} is in error state.");
        }
        let error_code = frame.state & ERROR_CODE_MASK;
        if error_code != 0 {
            warn!("SHDLC device with address {slave_address} returned error {error_code}.");
            return Err(DeviceError::new(error_code).into());
        }

        Ok((frame.data, error_flag))
    }

    pub fn execute<C: ShdlcCommand>(
        &mut self,
        slave_address: u8,
        command: &C,
        wait_post_process: bool,
    ) -> ShdlcResult<(C::Response, bool)> {
        let (data, error_flag) = self.transceive(
            slave_address,
            command.id(),
            command.data(),
            command.max_response_time(),
        )?;

        let post_processing = command.post_processing_time();
        if wait_post_process && !post_processing.is_zero() {
            // Device is not ready for the next command before this elapsed.
            thread::sleep(post_processing);
        }

        command.check_response_length(&data)?;
        Ok((command.interpret_response(&data)?, error_flag))
    }
}
