use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use shdlc_core::frame::{MosiFrame, format_bytes, receive_frame};
use shdlc_core::{MisoFrame, ShdlcPort, ShdlcResult};
use tracing::debug;

pub const DEFAULT_ADDITIONAL_RESPONSE_TIME: Duration = Duration::from_millis(100);

/// SHDLC over a serial port (UART, RS232, RS485).
pub struct ShdlcSerialPort {
    name: String,
    bitrate: u32,
    additional_response_time: Duration,
    serial: Option<Box<dyn SerialPort>>,
}

impl ShdlcSerialPort {
    /// Creates the port without opening it.
    pub fn new(name: impl Into<String>, bitrate: u32) -> Self {
        Self {
            name: name.into(),
            bitrate,
            additional_response_time: DEFAULT_ADDITIONAL_RESPONSE_TIME,
            serial: None,
        }
    }

    pub fn connect(name: impl Into<String>, bitrate: u32) -> ShdlcResult<Self> {
        let mut port = Self::new(name, bitrate);
        port.open()?;
        Ok(port)
    }

    /// Added to every response timeout to cover latency of USB adapters.
    pub fn additional_response_time(&self) -> Duration {
        self.additional_response_time
    }

    pub fn set_additional_response_time(&mut self, time: Duration) {
        self.additional_response_time = time;
    }

    fn serial(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        let name = &self.name;
        self.serial.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("serial port '{name}' is not open"),
            )
        })
    }
}

impl ShdlcPort for ShdlcSerialPort {
    fn description(&self) -> String {
        format!("{}@{}", self.name, self.bitrate)
    }

    fn bitrate(&self) -> ShdlcResult<u32> {
        Ok(self.bitrate)
    }

    fn set_bitrate(&mut self, bitrate: u32) -> ShdlcResult<()> {
        if let Some(serial) = self.serial.as_mut() {
            serial.set_baud_rate(bitrate).map_err(io::Error::from)?;
        }
        self.bitrate = bitrate;
        Ok(())
    }

    fn open(&mut self) -> ShdlcResult<()> {
        if self.serial.is_some() {
            return Ok(());
        }
        debug!(
            "Open ShdlcSerialPort on '{}' with {} bit/s.",
            self.name, self.bitrate
        );
        let serial = serialport::new(&self.name, self.bitrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(io::Error::from)?;
        self.serial = Some(serial);
        Ok(())
    }

    fn close(&mut self) {
        if self.serial.take().is_some() {
            debug!("Closed ShdlcSerialPort on '{}'.", self.name);
        }
    }

    fn is_open(&self) -> bool {
        self.serial.is_some()
    }

    fn transceive(
        &mut self,
        slave_address: u8,
        command_id: u8,
        data: &[u8],
        response_timeout: Duration,
    ) -> ShdlcResult<MisoFrame> {
        let tx = MosiFrame::new(slave_address, command_id, data)?.to_bytes();
        let timeout = response_timeout + self.additional_response_time;
        let serial = self.serial()?;

        serial.clear(ClearBuffer::Input).map_err(io::Error::from)?;
        debug!("ShdlcSerialPort send raw: [{}]", format_bytes(&tx));
        serial.write_all(&tx)?;
        serial.flush()?;

        receive_frame(
            |buf, remaining| {
                serial.set_timeout(remaining).map_err(io::Error::from)?;
                serial.read(buf)
            },
            timeout,
        )
    }
}

impl Drop for ShdlcSerialPort {
    fn drop(&mut self) {
        self.close();
    }
}
