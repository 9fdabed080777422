use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use shdlc_core::frame::{MosiFrame, format_bytes, receive_frame};
use shdlc_core::{MisoFrame, ShdlcPort, ShdlcResult};
use tracing::debug;

pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// SHDLC over a TCP bridge, e.g. a serial device server.
pub struct ShdlcTcpPort {
    host: String,
    port: u16,
    socket_timeout: Duration,
    stream: Option<TcpStream>,
}

impl ShdlcTcpPort {
    /// Creates the port without connecting.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            stream: None,
        }
    }

    pub fn connect(host: impl Into<String>, port: u16) -> ShdlcResult<Self> {
        let mut tcp = Self::new(host, port);
        tcp.open()?;
        Ok(tcp)
    }

    /// Timeout for connecting and sending.
    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    pub fn set_socket_timeout(&mut self, timeout: Duration) {
        self.socket_timeout = timeout;
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        let description = format!("{}:{}", self.host, self.port);
        self.stream.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("TCP port {description} is not open"),
            )
        })
    }
}

impl ShdlcPort for ShdlcTcpPort {
    fn description(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open(&mut self) -> ShdlcResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        debug!("Open ShdlcTcpPort on {}.", self.description());
        let addrs = (self.host.as_str(), self.port).to_socket_addrs()?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.socket_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_write_timeout(Some(self.socket_timeout))?;
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err
            .unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no address found for {}", self.description()),
                )
            })
            .into())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Closed ShdlcTcpPort on {}.", self.description());
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn transceive(
        &mut self,
        slave_address: u8,
        command_id: u8,
        data: &[u8],
        response_timeout: Duration,
    ) -> ShdlcResult<MisoFrame> {
        let tx = MosiFrame::new(slave_address, command_id, data)?.to_bytes();
        let stream = self.stream()?;
        discard_input(stream)?;

        debug!("ShdlcTcpPort send raw: [{}]", format_bytes(&tx));
        stream.write_all(&tx)?;
        stream.flush()?;

        receive_frame(
            |buf, remaining| {
                stream.set_read_timeout(Some(remaining))?;
                match stream.read(buf)? {
                    0 => Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed by peer",
                    )),
                    n => Ok(n),
                }
            },
            response_timeout,
        )
    }
}

/// Drops bytes already buffered on the socket, e.g. a reply that arrived
/// after the previous exchange timed out.
fn discard_input(stream: &mut TcpStream) -> io::Result<()> {
    stream.set_nonblocking(true)?;
    let mut buf = [0u8; 256];
    let result = loop {
        match stream.read(&mut buf) {
            // Peer closed; the following read reports it.
            Ok(0) => break Ok(()),
            Ok(n) => debug!("ShdlcTcpPort discarded {n} stale bytes."),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break Ok(()),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => break Err(err),
        }
    };
    stream.set_nonblocking(false)?;
    result
}
