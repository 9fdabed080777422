use std::time::Duration;

use super::DEVICE_INFO_ID;
use crate::command::{RawCommand, ShdlcCommand, fixed, nul_trimmed_string};
use crate::error::ShdlcResult;

fn device_info(sub_command: u8) -> RawCommand {
    RawCommand::new(DEVICE_INFO_ID, vec![sub_command], Duration::from_millis(500))
}

macro_rules! string_info {
    ($(#[$meta:meta])* $name:ident, $sub_command:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(RawCommand);

        impl $name {
            pub fn new() -> Self {
                Self(device_info($sub_command))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ShdlcCommand for $name {
            type Response = String;

            fn raw(&self) -> &RawCommand {
                &self.0
            }

            fn interpret_response(&self, data: &[u8]) -> ShdlcResult<String> {
                nul_trimmed_string(data)
            }
        }
    };
}

string_info!(
    /// Product type as a hex string, e.g. "00080000".
    GetProductType,
    0x00
);
string_info!(GetProductName, 0x01);
string_info!(GetArticleCode, 0x02);
string_info!(GetSerialNumber, 0x03);

/// Distinguishes slightly different variants of the same product type.
#[derive(Debug, Clone)]
pub struct GetProductSubType(RawCommand);

impl GetProductSubType {
    pub fn new() -> Self {
        Self(device_info(0x04).with_response_length(1, 1))
    }
}

impl Default for GetProductSubType {
    fn default() -> Self {
        Self::new()
    }
}

impl ShdlcCommand for GetProductSubType {
    type Response = u8;

    fn raw(&self) -> &RawCommand {
        &self.0
    }

    fn interpret_response(&self, data: &[u8]) -> ShdlcResult<u8> {
        let [subtype] = fixed::<1>(data)?;
        Ok(subtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_commands_select_sub_command() {
        assert_eq!(GetProductType::new().data(), b"\x00");
        assert_eq!(GetProductName::new().data(), b"\x01");
        assert_eq!(GetArticleCode::new().data(), b"\x02");
        assert_eq!(GetSerialNumber::new().data(), b"\x03");
        assert_eq!(GetProductSubType::new().data(), b"\x04");
    }

    #[test]
    fn get_product_type() {
        let cmd = GetProductType::new();
        assert_eq!(cmd.id(), 0xD0);
        assert_eq!(cmd.max_response_time(), Duration::from_millis(500));
        assert_eq!(cmd.post_processing_time(), Duration::ZERO);
        cmd.check_response_length(b"").unwrap();
        assert_eq!(cmd.interpret_response(b"00080000\0").unwrap(), "00080000");
        assert_eq!(cmd.interpret_response(b"").unwrap(), "");
    }

    #[test]
    fn get_article_code() {
        let cmd = GetArticleCode::new();
        assert_eq!(cmd.interpret_response(b"1-101-\0\0\0").unwrap(), "1-101-");
        assert!(cmd.interpret_response(b"\xC3\x28").is_err());
    }

    #[test]
    fn get_product_subtype() {
        let cmd = GetProductSubType::new();
        assert_eq!(cmd.id(), 0xD0);
        assert!(cmd.check_response_length(b"").is_err());
        assert!(cmd.check_response_length(b"\x00\x00").is_err());
        assert!(cmd.check_response_length(b"\xFF\xFF\xFF").is_err());
        for subtype in [0x00, 0x05, 0xFF] {
            cmd.check_response_length(&[subtype]).unwrap();
            assert_eq!(cmd.interpret_response(&[subtype]).unwrap(), subtype);
        }
    }
}
