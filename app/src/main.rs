use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

mod cli;

use crate::cli::{CliResult, init_tracing_cli, parse_number, run};

/// How to reach the bus. Without arguments, `SHDLC_SERIAL` or `SHDLC_TCP`
/// from the environment is used.
#[derive(ClapArgs, Debug, Clone)]
pub struct PortArgs {
    /// Serial port, e.g. /dev/ttyUSB0 or COM3
    #[arg(long, global = true, env = "SHDLC_SERIAL")]
    pub serial: Option<String>,
    /// SHDLC-over-TCP bridge as HOST:PORT, preferred over --serial
    #[arg(long, global = true, env = "SHDLC_TCP")]
    pub tcp: Option<String>,
    /// Serial bitrate in bit/s
    #[arg(long, global = true, default_value_t = 115200, value_parser = parse_number::<u32>)]
    pub baudrate: u32,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ImageArgs {
    /// Intel HEX file containing bootloader and application
    pub hex: PathBuf,
    /// Start address of the bootloader
    #[arg(long, value_parser = parse_number::<u32>)]
    pub bl_addr: u32,
    /// Start address of the application
    #[arg(long, value_parser = parse_number::<u32>)]
    pub app_addr: u32,
    /// Image signature as hex bytes (default 4A474F4B)
    #[arg(long)]
    pub signature: Option<String>,
    /// Offset of the bootloader version from the bootloader start
    #[arg(long, default_value_t = 0x1004, value_parser = parse_number::<u32>)]
    pub bl_version_offset: u32,
}

#[derive(Subcommand, Debug)]
pub enum FirmwareCommand {
    /// Print the metadata of a firmware image without touching a device
    Inspect {
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Flash a firmware image to the device
    Update {
        #[command(flatten)]
        image: ImageArgs,
        /// The device already runs its bootloader, e.g. after an aborted update
        #[arg(long)]
        emergency: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print product type, name, article code, serial number and version
    Info,
    /// Print firmware, hardware and protocol version
    Version,
    /// Print the device state and last error (clears them unless --keep)
    ErrorState {
        #[arg(long)]
        keep: bool,
    },
    /// Print seconds since power on or last reset
    Uptime,
    /// Get or set the slave address
    Address {
        #[arg(long, value_parser = parse_number::<u8>)]
        set: Option<u8>,
    },
    /// Get or set the device baudrate
    Baudrate {
        #[arg(long, value_parser = parse_number::<u32>)]
        set: Option<u32>,
    },
    /// Get or set the reply delay in microseconds
    ReplyDelay {
        #[arg(long, value_parser = parse_number::<u16>)]
        set: Option<u16>,
    },
    /// Restart the device
    Reset,
    /// Restore factory settings
    FactoryReset,
    /// Send an arbitrary command and print the response payload
    Raw {
        /// Command ID
        #[arg(value_parser = parse_number::<u8>)]
        command: u8,
        /// Payload as hex bytes, e.g. "01 02" or "0102"
        data: Option<String>,
        /// Maximum response time
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
    },
    /// Inspect or flash firmware images
    Firmware {
        #[command(subcommand)]
        action: FirmwareCommand,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "shdlc",
    about = "shdlc: talk to Sensirion SHDLC devices over serial or TCP",
    version,
    long_about = None
)]
pub struct Args {
    #[command(flatten)]
    pub port: PortArgs,
    /// Slave address of the device
    #[arg(long, global = true, default_value_t = 0, value_parser = parse_number::<u8>)]
    pub address: u8,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let args = Args::parse();
    init_tracing_cli();

    if let Err(err) = run(args).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    Ok(())
}
