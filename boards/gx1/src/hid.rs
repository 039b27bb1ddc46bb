//! hidapi backed transport.
//!
//! The device handle is owned by one I/O thread. It alternates between
//! draining queued output reports and polling for input reports, which are
//! timestamped on arrival and fanned out to subscribers.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::BoxStream;
use hidapi::HidDevice;
use realforce_core::{
    hex, Fanout, KeyboardError, Notification, Packet, Result, Transport, PACKET_SIZE,
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::discovery::{with_api, DeviceRef};

/// Report descriptor of the vendor configuration interface (taken from a GX1
/// with firmware A0.15). Any other layout means the protocol does not apply.
pub const EXPECTED_DESCRIPTOR: [u8; 34] = [
    0x06, 0x00, 0xFF, 0x09, 0x01, 0xA1, 0x01, 0x09, 0x02, 0x15, 0x00, 0x26, 0xFF, 0x00, 0x75, 0x08,
    0x95, 0x40, 0x81, 0x02, 0x09, 0x03, 0x15, 0x00, 0x26, 0xFF, 0x00, 0x75, 0x08, 0x95, 0x40, 0x91,
    0x02, 0xC0,
];

/// How long one input poll blocks the I/O thread
const POLL_MS: i32 = 10;
const MAX_DESCRIPTOR_SIZE: usize = 4096;

type Outgoing = (Packet, oneshot::Sender<Result<()>>);

/// An open configuration session with one keyboard
pub struct HidTransport {
    outbox: Sender<Outgoing>,
    fanout: Arc<Fanout>,
}

impl HidTransport {
    /// Open the device and start its I/O thread.
    ///
    /// Fails with [`KeyboardError::CannotSeize`] if the device cannot be
    /// opened, and with [`KeyboardError::UnexpectedDescriptor`] if it is not
    /// the interface this protocol was written against.
    pub fn open(device: &DeviceRef) -> Result<Self> {
        let hid = with_api(|api| {
            api.open_path(&device.path)
                .map_err(|e| KeyboardError::CannotSeize(e.to_string()))
        })?;

        let mut descriptor = [0u8; MAX_DESCRIPTOR_SIZE];
        let len = hid.get_report_descriptor(&mut descriptor)?;
        if descriptor[..len] != EXPECTED_DESCRIPTOR {
            return Err(KeyboardError::UnexpectedDescriptor(descriptor[..len].to_vec()));
        }

        let fanout = Arc::new(Fanout::new());
        let (outbox, inbox) = mpsc::channel();
        let thread_fanout = Arc::clone(&fanout);
        std::thread::Builder::new()
            .name(format!("hid {}", device.path_str()))
            .spawn(move || io_loop(hid, inbox, &thread_fanout))
            .map_err(|e| KeyboardError::TaskFailed(e.to_string()))?;
        debug!(path = %device.path_str(), "opened");

        Ok(Self { outbox, fanout })
    }
}

impl Transport for HidTransport {
    async fn send(&self, packet: &Packet) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.outbox
            .send((*packet, tx))
            .map_err(|_| KeyboardError::DeviceRemoved)?;
        rx.await.map_err(|_| KeyboardError::DeviceRemoved)?
    }

    fn reports(&self) -> BoxStream<'static, Notification> {
        self.fanout.subscribe()
    }
}

/// Runs until the transport is dropped or the device goes away
fn io_loop(device: HidDevice, inbox: Receiver<Outgoing>, fanout: &Fanout) {
    let mut buf = [0u8; PACKET_SIZE];
    'io: loop {
        loop {
            match inbox.try_recv() {
                Ok((packet, done)) => {
                    // report id 0 goes in front
                    let mut report = [0u8; PACKET_SIZE + 1];
                    report[1..].copy_from_slice(&packet);
                    let result = device.write(&report).map(drop).map_err(Into::into);
                    let _ = done.send(result);
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'io,
            }
        }

        match device.read_timeout(&mut buf, POLL_MS) {
            Ok(0) => {},
            Ok(len) => fanout.publish(Notification::InputReport {
                timestamp: Instant::now(),
                data: buf[..len].to_vec(),
            }),
            Err(e) => {
                warn!(error = %e, last = %hex(&buf), "read failed, treating device as removed");
                fanout.publish(Notification::DeviceRemoved);
                break;
            },
        }
    }
    fanout.close();
}
