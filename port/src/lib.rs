pub mod serial;
pub mod tcp;

pub use serial::ShdlcSerialPort;
pub use tcp::ShdlcTcpPort;
