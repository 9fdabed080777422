use std::time::Duration;

use crate::error::{ShdlcError, ShdlcResult};
use crate::frame::MisoFrame;

/// A transport able to exchange SHDLC frames, e.g. a serial port.
pub trait ShdlcPort: Send {
    fn description(&self) -> String;

    /// Current bitrate in bit/s. Ports without a bitrate report
    /// [`ShdlcError::BitrateUnsupported`].
    fn bitrate(&self) -> ShdlcResult<u32> {
        Err(ShdlcError::BitrateUnsupported {
            port: self.description(),
        })
    }

    fn set_bitrate(&mut self, _bitrate: u32) -> ShdlcResult<()> {
        Err(ShdlcError::BitrateUnsupported {
            port: self.description(),
        })
    }

    /// Opening an already open port does nothing.
    fn open(&mut self) -> ShdlcResult<()>;

    /// Closing an already closed port does nothing.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Send one request frame and wait for the response frame.
    ///
    /// `response_timeout` is the maximum time the device may need to respond.
    fn transceive(
        &mut self,
        slave_address: u8,
        command_id: u8,
        data: &[u8],
        response_timeout: Duration,
    ) -> ShdlcResult<MisoFrame>;
}

impl<P: ShdlcPort + ?Sized> ShdlcPort for Box<P> {
    fn description(&self) -> String {
        (**self).description()
    }

    fn bitrate(&self) -> ShdlcResult<u32> {
        (**self).bitrate()
    }

    fn set_bitrate(&mut self, bitrate: u32) -> ShdlcResult<()> {
        (**self).set_bitrate(bitrate)
    }

    fn open(&mut self) -> ShdlcResult<()> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn transceive(
        &mut self,
        slave_address: u8,
        command_id: u8,
        data: &[u8],
        response_timeout: Duration,
    ) -> ShdlcResult<MisoFrame> {
        (**self).transceive(slave_address, command_id, data, response_timeout)
    }
}
