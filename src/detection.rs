//! Device enumeration and listing.

use std::time::Duration;

use futures::{Stream, StreamExt};
use realforce_gx1::discovery::{DeviceEvent, DeviceRef};

/// Collect devices from a hot-plug stream until it goes quiet.
///
/// Enumeration has no explicit end, so it is considered complete once no
/// event arrives for `first` (before any device was seen) or `between`
/// (after the most recent event). Removals drop devices seen earlier.
pub async fn collect_until_quiet<S>(
    events: S,
    first: Duration,
    between: Duration,
) -> Vec<DeviceRef>
where
    S: Stream<Item = DeviceEvent> + Unpin,
{
    let mut events = events;
    let mut devices: Vec<DeviceRef> = Vec::new();
    let mut wait = first;
    while let Ok(Some(event)) = tokio::time::timeout(wait, events.next()).await {
        match event {
            DeviceEvent::Added(device) => {
                if !devices.contains(&device) {
                    devices.push(device);
                }
            },
            DeviceEvent::Removed(device) => devices.retain(|d| *d != device),
        }
        wait = between;
    }
    devices
}

pub const DEVICE_HEADER: [&str; 7] = [
    "VendorID",
    "ProductID",
    "UsagePage",
    "Usage",
    "Path",
    "Manufacturer",
    "Product",
];

/// Cells under [`DEVICE_HEADER`]
pub fn device_row(device: &DeviceRef) -> Vec<String> {
    vec![
        format!("0x{:04x}", device.vendor_id),
        format!("0x{:04x}", device.product_id),
        format!("0x{:04x}", device.usage_page),
        format!("0x{:04x}", device.usage),
        device.path_str(),
        device.manufacturer.clone().unwrap_or_default(),
        device.product.clone().unwrap_or_default(),
    ]
}

/// Print the device table
pub fn print_devices(devices: &[DeviceRef]) {
    let rows: Vec<Vec<String>> = devices.iter().map(device_row).collect();
    print!("{}", table(&DEVICE_HEADER, &rows));
}

/// Left aligned columns padded to their widest cell
pub fn table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:width$}"))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };
    let mut out = line(header.to_vec());
    for row in rows {
        out += &line(row.iter().map(String::as_str).collect());
    }
    out
}
