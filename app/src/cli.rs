use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use shdlc_core::frame::format_bytes;
use shdlc_core::{
    FirmwareImage, FirmwareImageOptions, FirmwareUpdate, FirmwareVersion, RawCommand,
    ShdlcConnection, ShdlcDevice, ShdlcError, ShdlcPort, ShdlcResult, Version,
};
use shdlc_port::{ShdlcSerialPort, ShdlcTcpPort};
use shdlc_progress::{UpdateEvent, UpdateSnapshot};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{Args, Command, FirmwareCommand, ImageArgs, PortArgs};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

type Device = ShdlcDevice<Box<dyn ShdlcPort>>;

/// Initialize tracing for the CLI.
///
/// Logs go to stderr and respect RUST_LOG, defaulting to `info`. If
/// `SHDLC_LOG_PATH` is set, logs are appended to that file instead.
pub fn init_tracing_cli() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_file = match std::env::var("SHDLC_LOG_PATH") {
        Ok(p) if !p.trim().is_empty() => OpenOptions::new().create(true).append(true).open(p).ok(),
        _ => None,
    };

    match log_file {
        Some(file) => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Decimal or `0x` prefixed hex number.
pub fn parse_number<T: TryFrom<u64>>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    }
    .map_err(|err| format!("invalid number '{text}': {err}"))?;
    T::try_from(parsed).map_err(|_| format!("number {text} is out of range"))
}

/// Hex bytes, optionally separated by whitespace, e.g. "4A 47 4F 4B".
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, String> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).map_err(|err| format!("invalid hex bytes '{text}': {err}"))
}

fn open_port(args: &PortArgs) -> CliResult<Box<dyn ShdlcPort>> {
    if let Some(addr) = &args.tcp {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| format!("invalid TCP address '{addr}', expected HOST:PORT"))?;
        let port = parse_number::<u16>(port)?;
        return Ok(Box::new(ShdlcTcpPort::connect(host, port)?));
    }
    if let Some(path) = &args.serial {
        return Ok(Box::new(ShdlcSerialPort::connect(path.as_str(), args.baudrate)?));
    }
    Err("no port given, use --serial or --tcp (or SHDLC_SERIAL / SHDLC_TCP)".into())
}

/// Opens the port and runs `f` on a blocking thread.
async fn with_device<T, F>(port: PortArgs, address: u8, f: F) -> CliResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Device) -> CliResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let port = open_port(&port)?;
        debug!("Using port {}", port.description());
        let mut device = ShdlcDevice::new(Arc::new(ShdlcConnection::new(port)), address);
        f(&mut device)
    })
    .await?
}

fn print_output<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DeviceInfo {
    product_type: String,
    product_subtype: Option<u8>,
    product_name: String,
    article_code: String,
    serial_number: String,
    version: Version,
}

#[derive(Debug, Serialize)]
struct ErrorStateOutput {
    state: u32,
    last_error: Option<LastError>,
}

#[derive(Debug, Serialize)]
struct LastError {
    code: u8,
    message: String,
}

#[derive(Debug, Serialize)]
struct ImageSummary {
    product_type: u32,
    bootloader_version: FirmwareVersion,
    application_version: FirmwareVersion,
    size: usize,
    checksum: u8,
}

impl ImageSummary {
    fn of(image: &FirmwareImage) -> Self {
        Self {
            product_type: image.product_type(),
            bootloader_version: image.bootloader_version(),
            application_version: image.application_version(),
            size: image.size(),
            checksum: image.checksum(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Value<T> {
    value: T,
}

fn image_options(args: &ImageArgs) -> CliResult<FirmwareImageOptions> {
    let mut options = FirmwareImageOptions::new(args.bl_addr, args.app_addr)
        .with_bl_version_offset(args.bl_version_offset);
    if let Some(signature) = &args.signature {
        options = options.with_signature(parse_hex_bytes(signature)?);
    }
    Ok(options)
}

fn load_image(args: &ImageArgs) -> CliResult<FirmwareImage> {
    let options = image_options(args)?;
    info!("Loading firmware image {}", args.hex.display());
    Ok(FirmwareImage::from_path(&args.hex, &options)?)
}

fn read_info(device: &Device) -> ShdlcResult<DeviceInfo> {
    let product_type = device.get_product_type()?;
    // Older firmware does not know the subtype.
    let product_subtype = match device.get_product_subtype() {
        Ok(subtype) => Some(subtype),
        Err(ShdlcError::Device(_)) => None,
        Err(err) => return Err(err),
    };
    Ok(DeviceInfo {
        product_type,
        product_subtype,
        product_name: device.get_product_name()?,
        article_code: device.get_article_code()?,
        serial_number: device.get_serial_number()?,
        version: device.get_version()?,
    })
}

pub async fn run(args: Args) -> CliResult<()> {
    let Args {
        port,
        address,
        json,
        command,
    } = args;

    match command {
        Command::Info => {
            let info = with_device(port, address, |dev| Ok(read_info(dev)?)).await?;
            print_output(json, &info, |info| {
                let subtype = info
                    .product_subtype
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "Product type:    {}\nProduct subtype: {}\nProduct name:    {}\n\
                     Article code:    {}\nSerial number:   {}\nVersion:         {}",
                    info.product_type,
                    subtype,
                    info.product_name,
                    info.article_code,
                    info.serial_number,
                    info.version
                )
            })
        }
        Command::Version => {
            let version = with_device(port, address, |dev| Ok(dev.get_version()?)).await?;
            print_output(json, &version, |v| v.to_string())
        }
        Command::ErrorState { keep } => {
            let output = with_device(port, address, move |dev| {
                let (state, error) = dev.get_error_state_as_error(!keep)?;
                Ok(ErrorStateOutput {
                    state,
                    last_error: error.map(|e| LastError {
                        code: e.code(),
                        message: e.message().to_string(),
                    }),
                })
            })
            .await?;
            print_output(json, &output, |o| {
                let last = match &o.last_error {
                    Some(e) => format!("0x{:02X} ({})", e.code, e.message),
                    None => "none".to_string(),
                };
                format!("State:      0x{:08X}\nLast error: {last}", o.state)
            })
        }
        Command::Uptime => {
            let seconds = with_device(port, address, |dev| Ok(dev.get_system_up_time()?)).await?;
            print_output(json, &Value { value: seconds }, |v| format!("{} s", v.value))
        }
        Command::Address { set } => match set {
            Some(new_address) => {
                with_device(port, address, move |dev| {
                    Ok(dev.set_slave_address(new_address, false)?)
                })
                .await?;
                info!("Slave address set to {new_address}");
                Ok(())
            }
            None => {
                let current = with_device(port, address, |dev| Ok(dev.get_slave_address()?)).await?;
                print_output(json, &Value { value: current }, |v| v.value.to_string())
            }
        },
        Command::Baudrate { set } => match set {
            Some(baudrate) => {
                with_device(port, address, move |dev| Ok(dev.set_baudrate(baudrate, false)?))
                    .await?;
                info!("Device baudrate set to {baudrate} bit/s, reconnect with --baudrate {baudrate}");
                Ok(())
            }
            None => {
                let current = with_device(port, address, |dev| Ok(dev.get_baudrate()?)).await?;
                print_output(json, &Value { value: current }, |v| v.value.to_string())
            }
        },
        Command::ReplyDelay { set } => match set {
            Some(delay) => {
                with_device(port, address, move |dev| Ok(dev.set_reply_delay(delay)?)).await?;
                info!("Reply delay set to {delay} us");
                Ok(())
            }
            None => {
                let current = with_device(port, address, |dev| Ok(dev.get_reply_delay()?)).await?;
                print_output(json, &Value { value: current }, |v| format!("{} us", v.value))
            }
        },
        Command::Reset => {
            with_device(port, address, |dev| Ok(dev.device_reset()?)).await?;
            info!("Device reset");
            Ok(())
        }
        Command::FactoryReset => {
            with_device(port, address, |dev| Ok(dev.factory_reset()?)).await?;
            info!("Factory reset done");
            Ok(())
        }
        Command::Raw {
            command,
            data,
            timeout_ms,
        } => {
            let payload = match data {
                Some(hex) => parse_hex_bytes(&hex)?,
                None => Vec::new(),
            };
            let raw = RawCommand::new(command, payload, Duration::from_millis(timeout_ms));
            let response = with_device(port, address, move |dev| Ok(dev.execute(&raw)?)).await?;
            let response = response.unwrap_or_default();
            print_output(json, &Value { value: &response }, |v| format_bytes(v.value))
        }
        Command::Firmware { action } => match action {
            FirmwareCommand::Inspect { image } => {
                let image = load_image(&image)?;
                print_output(json, &ImageSummary::of(&image), |s| {
                    format!(
                        "Product type:        0x{:08X}\nBootloader version:  {}\n\
                         Application version: {}\nSize:                {} bytes\n\
                         Checksum:            0x{:02X}",
                        s.product_type,
                        s.bootloader_version,
                        s.application_version,
                        s.size,
                        s.checksum
                    )
                })
            }
            FirmwareCommand::Update { image, emergency } => {
                let image = load_image(&image)?;
                run_update(port, address, json, image, emergency).await
            }
        },
    }
}

async fn run_update(
    port: PortArgs,
    address: u8,
    json: bool,
    mut image: FirmwareImage,
    emergency: bool,
) -> CliResult<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<UpdateEvent>();

    let update = tokio::spawn(with_device(port, address, move |dev| {
        FirmwareUpdate::new(dev, &mut image)
            .with_listener(move |event| {
                // A closed receiver means the CLI is exiting anyway.
                let _ = tx.send(event.clone());
            })
            .execute(emergency)?;
        Ok(())
    }));

    let mut snapshot = UpdateSnapshot::default();
    while let Some(event) = rx.recv().await {
        snapshot.apply(&event);
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            match event {
                UpdateEvent::Status(message) => println!("{message}"),
                UpdateEvent::Progress(percent) => debug!("Progress: {percent:.1}%"),
            }
        }
    }

    update.await??;
    info!(
        events = snapshot.events,
        finished = snapshot.is_finished(),
        "Firmware update done"
    );
    Ok(())
}
