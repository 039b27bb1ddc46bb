use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use bpaf::Bpaf;
use realforce_core::{hex, parse_int, KeyboardError, Transport};
use realforce_gx1::discovery::{self, DeviceRef};
use realforce_gx1::{Identity, Keyboard};
use realforce_protocol::{known_pages, Setting};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DeviceConfig};
use crate::detection::{collect_until_quiet, device_row, print_devices, table, DEVICE_HEADER};

mod config;
mod detection;

/// A 16 bit id given as decimal or `0x` hex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Id(u16);

impl FromStr for Id {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_int(s)
            .map(Self)
            .ok_or_else(|| format!("expected a decimal or 0x-prefixed hex id up to 0xffff: {s}"))
    }
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(group_help("Device selection (0 matches any):"))]
struct DeviceArgs {
    /// Vendor id [default: 0x0853]
    #[bpaf(long, argument("ID"))]
    vendor_id: Option<Id>,
    /// Product id [default: 0x0317]
    #[bpaf(long, argument("ID"))]
    product_id: Option<Id>,
    /// HID usage page [default: 0xff00]
    #[bpaf(long, argument("ID"))]
    usage_page: Option<Id>,
    /// HID usage [default: 0x01]
    #[bpaf(long, argument("ID"))]
    usage: Option<Id>,
    /// Only the device at this platform path. There is no location id filter,
    /// on macOS the path carries the IORegistry entry id instead
    #[bpaf(long, argument("PATH"))]
    path: Option<String>,
    /// Give up waiting for a reply after this long, e.g. 500ms
    #[bpaf(long, argument("DURATION"))]
    timeout: Option<humantime::Duration>,
}

impl DeviceArgs {
    /// Override config values with the ones given on the command line
    fn apply(&self, config: &mut DeviceConfig) {
        let fields = [
            (self.vendor_id, &mut config.vendor_id),
            (self.product_id, &mut config.product_id),
            (self.usage_page, &mut config.usage_page),
            (self.usage, &mut config.usage),
        ];
        for (arg, value) in fields {
            if let Some(Id(id)) = arg {
                *value = id;
            }
        }
        if let Some(path) = &self.path {
            config.path = Some(path.clone());
        }
    }
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(fallback(Command::List))]
enum Command {
    /// List matching devices (default)
    #[bpaf(command)]
    List,
    /// Show model, firmware and name of every matching keyboard
    #[bpaf(command)]
    Info,
    /// Hex dump pages of the matching keyboard
    #[bpaf(command)]
    Dump {
        /// Page names or numbers, every known page if none are given
        #[bpaf(positional("PAGE"))]
        pages: Vec<Setting>,
    },
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    /// Log protocol traffic, RUST_LOG takes precedence
    #[bpaf(short, long)]
    verbose: bool,
    #[bpaf(external(device_args))]
    device: DeviceArgs,
    #[bpaf(external(command))]
    command: Command,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Model, firmware and name, read without opening an edit session
async fn describe<T: Transport>(keyboard: &Keyboard<T>) -> Result<[String; 3], KeyboardError> {
    let Identity { model, firmware } = keyboard.info().await?;
    let name = keyboard.name().await?;
    Ok([model, firmware, name])
}

async fn show_info(
    devices: &[DeviceRef],
    timeout: Option<Duration>,
) -> Result<(), Box<dyn Error>> {
    let mut rows = Vec::with_capacity(devices.len());
    for device in devices {
        let keyboard = Keyboard::open(device, timeout)?;
        let mut row = device_row(device);
        row.extend(describe(&keyboard).await?);
        rows.push(row);
    }
    let header: Vec<&str> = DEVICE_HEADER
        .into_iter()
        .chain(["Model", "Firmware", "Name"])
        .collect();
    print!("{}", table(&header, &rows));
    Ok(())
}

/// One `page: hex` line per page
///
/// Reads only, so edits the keyboard holds from another session are left alone.
async fn dump_pages<T: Transport>(
    keyboard: &Keyboard<T>,
    pages: &[Setting],
) -> Result<Vec<String>, KeyboardError> {
    let mut lines = Vec::with_capacity(pages.len());
    for &page in pages {
        let data = keyboard.raw_page(page).await?;
        lines.push(format!("{page}: {}", hex(&data)));
    }
    Ok(lines)
}

async fn dump(
    device: &DeviceRef,
    timeout: Option<Duration>,
    pages: Vec<Setting>,
) -> Result<(), Box<dyn Error>> {
    let pages = if pages.is_empty() {
        known_pages().collect()
    } else {
        pages
    };
    let keyboard = Keyboard::open(device, timeout)?;
    for line in dump_pages(&keyboard, &pages).await? {
        println!("{line}");
    }
    Ok(())
}

async fn run(cli: Cli, mut config: Config) -> Result<(), Box<dyn Error>> {
    cli.device.apply(&mut config.device);
    let timeout = cli.device.timeout.map(Into::into).or(config.exchange.timeout);

    let events = discovery::watch(config.device.criteria(), config.discovery.poll)?;
    let devices = collect_until_quiet(
        events,
        config.discovery.first_event,
        config.discovery.between_events,
    )
    .await;
    debug!(count = devices.len(), "enumeration complete");

    match cli.command {
        Command::List => print_devices(&devices),
        Command::Info => {
            if devices.is_empty() {
                return Err(KeyboardError::DeviceNotFound.into());
            }
            show_info(&devices, timeout).await?;
        },
        Command::Dump { pages } => match devices.as_slice() {
            [] => return Err(KeyboardError::DeviceNotFound.into()),
            [device] => dump(device, timeout, pages).await?,
            many => return Err(KeyboardError::MultipleDevices(many.len()).into()),
        },
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = cli().run();
    init_logging(cli.verbose);
    let config = Config::load_or_create()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, config))
}
