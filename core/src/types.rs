use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    /// False for official releases.
    pub debug: bool,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.debug {
            f.write_str("-debug")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for HardwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Everything reported by the "Get Version" command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub firmware: FirmwareVersion,
    pub hardware: HardwareVersion,
    pub protocol: ProtocolVersion,
}

impl Version {
    pub fn from_bytes(data: [u8; 7]) -> Self {
        Self {
            firmware: FirmwareVersion {
                major: data[0],
                minor: data[1],
                debug: data[2] != 0,
            },
            hardware: HardwareVersion {
                major: data[3],
                minor: data[4],
            },
            protocol: ProtocolVersion {
                major: data[5],
                minor: data[6],
            },
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Firmware {}, Hardware {}, Protocol {}",
            self.firmware, self.hardware, self.protocol
        )
    }
}

/// Device state flags and the last error code, as read by "Get Error State".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    pub state: u32,
    pub last_error: u8,
}
