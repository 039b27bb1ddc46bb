//! Device enumeration and hot-plug events over hidapi.

use std::collections::HashSet;
use std::ffi::CString;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use hidapi::{DeviceInfo, HidApi};
use realforce_core::{DeviceCriteria, KeyboardError, Result};
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

static API: Mutex<Option<HidApi>> = Mutex::new(None);

/// Run `f` against the process wide hidapi context, creating it on first use
pub(crate) fn with_api<R>(f: impl FnOnce(&mut HidApi) -> Result<R>) -> Result<R> {
    let mut guard = API.lock().unwrap_or_else(PoisonError::into_inner);
    let api = match &mut *guard {
        Some(api) => api,
        slot @ None => slot.insert(HidApi::new()?),
    };
    f(api)
}

/// Identity of one HID interface as seen during enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceRef {
    pub path: CString,
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl DeviceRef {
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn from_info(info: &DeviceInfo) -> Self {
        Self {
            path: info.path().to_owned(),
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            usage_page: info.usage_page(),
            usage: info.usage(),
            manufacturer: info.manufacturer_string().map(str::to_owned),
            product: info.product_string().map(str::to_owned),
        }
    }
}

/// Devices currently attached that match `criteria`
pub fn devices(criteria: &DeviceCriteria) -> Result<Vec<DeviceRef>> {
    with_api(|api| {
        api.refresh_devices()?;
        Ok(api
            .device_list()
            .filter(|info| {
                criteria.matches(
                    info.vendor_id(),
                    info.product_id(),
                    info.usage_page(),
                    info.usage(),
                    &info.path().to_string_lossy(),
                )
            })
            .map(DeviceRef::from_info)
            .collect())
    })
}

/// The single device matching `criteria`
pub fn find_one(criteria: &DeviceCriteria) -> Result<DeviceRef> {
    let mut found = devices(criteria)?;
    match found.len() {
        0 => Err(KeyboardError::DeviceNotFound),
        1 => Ok(found.remove(0)),
        n => Err(KeyboardError::MultipleDevices(n)),
    }
}

/// A change in the set of matching devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Added(DeviceRef),
    Removed(DeviceRef),
}

/// Changes between two enumerations, removals first
pub fn diff(before: &HashSet<DeviceRef>, after: &HashSet<DeviceRef>) -> Vec<DeviceEvent> {
    let removed = before
        .difference(after)
        .cloned()
        .map(DeviceEvent::Removed);
    let added = after.difference(before).cloned().map(DeviceEvent::Added);
    removed.chain(added).collect()
}

/// Watch for matching devices.
///
/// Yields an `Added` event for every device present now, then polls every
/// `interval` and yields the differences. Polling stops once the stream is
/// dropped.
pub fn watch(
    criteria: DeviceCriteria,
    interval: Duration,
) -> Result<BoxStream<'static, DeviceEvent>> {
    let mut known: HashSet<DeviceRef> = devices(&criteria)?.into_iter().collect();
    let (tx, rx) = unbounded_channel();
    for device in &known {
        let _ = tx.send(DeviceEvent::Added(device.clone()));
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }
            let scan = criteria.clone();
            let current = match tokio::task::spawn_blocking(move || devices(&scan)).await {
                Ok(Ok(current)) => current.into_iter().collect(),
                Ok(Err(e)) => {
                    warn!(error = %e, "enumeration failed");
                    continue;
                },
                Err(e) => {
                    warn!(error = %e, "enumeration task died");
                    break;
                },
            };
            for event in diff(&known, &current) {
                debug!(?event, "hot-plug");
                if tx.send(event).is_err() {
                    return;
                }
            }
            known = current;
        }
    });

    Ok(UnboundedReceiverStream::new(rx).boxed())
}
