//! Flashing a new application through the SHDLC bootloader.

use shdlc_progress::UpdateEvent;
use tracing::debug;

use crate::command::ShdlcCommand;
use crate::commands::{
    EnterBootloader, FirmwareUpdateData, FirmwareUpdateStart, FirmwareUpdateStop, GetProductType,
};
use crate::connection::ConnectionGuard;
use crate::device::{ShdlcDevice, parse_product_type};
use crate::error::{ShdlcError, ShdlcResult};
use crate::firmware_image::FirmwareImage;
use crate::port::ShdlcPort;

pub const BOOTLOADER_BITRATE: u32 = 115200;
pub const BOOTLOADER_SLAVE_ADDRESS: u8 = 0;
/// One byte of the 255 byte payload is taken by the sub command.
pub const DATA_CHUNK_SIZE: usize = 254;

const PROGRESS_COMPATIBLE: f64 = 4.0;
const PROGRESS_BOOTLOADER: f64 = 7.0;
const PROGRESS_WRITE_START: f64 = 10.0;
const PROGRESS_WRITE_END: f64 = 90.0;
const PROGRESS_DONE: f64 = 100.0;

type Listener<'a> = Box<dyn FnMut(&UpdateEvent) + Send + 'a>;

/// Firmware update of one device.
///
/// The bus stays locked for the whole update. An aborted update leaves the
/// device in its bootloader; run it again with `emergency` set to recover.
pub struct FirmwareUpdate<'a, P> {
    device: &'a ShdlcDevice<P>,
    image: &'a mut FirmwareImage,
    listener: Option<Listener<'a>>,
}

impl<'a, P: ShdlcPort> FirmwareUpdate<'a, P> {
    pub fn new(device: &'a ShdlcDevice<P>, image: &'a mut FirmwareImage) -> Self {
        Self {
            device,
            image,
            listener: None,
        }
    }

    /// Receives status messages and progress in percent.
    pub fn with_listener(mut self, listener: impl FnMut(&UpdateEvent) + Send + 'a) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// `emergency` must be set if the device already runs its bootloader.
    pub fn execute(mut self, emergency: bool) -> ShdlcResult<()> {
        let device = self.device;
        let mut guard = device.connection().lock();

        let old_bitrate = guard.port().bitrate()?;
        guard.port_mut().set_bitrate(old_bitrate)?;

        if !emergency {
            self.check_product_type(&mut guard)?;
            self.enter_bootloader(&mut guard)?;
        }

        guard.port_mut().set_bitrate(BOOTLOADER_BITRATE)?;
        let result = self.flash(&mut guard);
        let restored = guard.port_mut().set_bitrate(old_bitrate);
        drop(guard);
        result?;
        restored?;

        self.status("Finished!");
        Ok(())
    }

    fn check_product_type(&mut self, guard: &mut ConnectionGuard<'_, P>) -> ShdlcResult<()> {
        self.status("Check compatibility...");
        let product_type = self.device.execute_on(guard, &GetProductType::new(), true)?;
        let device_type = parse_product_type(&product_type)?;
        let image_type = self.image.product_type();
        if device_type != image_type {
            return Err(ShdlcError::FirmwareImageIncompatibility {
                image_type,
                device_type,
            });
        }
        self.progress(PROGRESS_COMPATIBLE);
        Ok(())
    }

    fn enter_bootloader(&mut self, guard: &mut ConnectionGuard<'_, P>) -> ShdlcResult<()> {
        self.status("Enter bootloader...");
        guard.execute(self.device.slave_address(), &EnterBootloader::new(), true)?;
        self.progress(PROGRESS_BOOTLOADER);
        Ok(())
    }

    fn flash(&mut self, guard: &mut ConnectionGuard<'_, P>) -> ShdlcResult<()> {
        self.status("Clear flash...");
        send(guard, &FirmwareUpdateStart::new())?;
        self.progress(PROGRESS_WRITE_START);

        self.status("Write new firmware...");
        self.image.rewind();
        let size = self.image.size();
        while self.image.available_bytes() > 0 {
            let command = FirmwareUpdateData::new(self.image.read(DATA_CHUNK_SIZE));
            send(guard, &command)?;

            let written = size - self.image.available_bytes();
            let ratio = written as f64 / size as f64;
            self.status(&format!(
                "Write new firmware: {:.2} kB of {:.2} kB",
                written as f64 / 1024.0,
                size as f64 / 1024.0
            ));
            self.progress(PROGRESS_WRITE_START + ratio * (PROGRESS_WRITE_END - PROGRESS_WRITE_START));
        }

        self.status("Verify checksum...");
        send(guard, &FirmwareUpdateStop::new(self.image.checksum()))?;
        self.progress(PROGRESS_DONE);
        Ok(())
    }

    fn status(&mut self, status: &str) {
        debug!("SHDLC firmware update: {status}");
        if let Some(listener) = self.listener.as_mut() {
            listener(&UpdateEvent::status(status));
        }
    }

    fn progress(&mut self, percent: f64) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&UpdateEvent::progress(percent));
        }
    }
}

fn send<P: ShdlcPort, C: ShdlcCommand>(
    guard: &mut ConnectionGuard<'_, P>,
    command: &C,
) -> ShdlcResult<C::Response> {
    let (response, _) = guard.execute(BOOTLOADER_SLAVE_ADDRESS, command, true)?;
    Ok(response)
}
